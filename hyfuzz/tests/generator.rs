use std::collections::HashSet;

use hyfuzz::expr::Expr;
use hyfuzz::prelude::*;
use hyfuzz::walker::walk_no_input;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const ROOT_TYPES: [ValueType; 6] = [
    ValueType::String,
    ValueType::String,
    ValueType::Int,
    ValueType::Int,
    ValueType::Bool,
    ValueType::Bool,
];

fn standard() -> (OperatorCatalog, ConstantPool) {
    (
        OperatorCatalog::standard().unwrap(),
        ConstantPool::standard().unwrap(),
    )
}

fn generate(
    catalog: &OperatorCatalog,
    constants: &ConstantPool,
    target: ValueType,
    max_depth: usize,
    seed: u64,
) -> (ExprRef, RootSlots) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut slots = RootSlots::new(&ROOT_TYPES).unwrap();
    let tree = TreeGenerator::new(catalog, constants, max_depth).generate(target, &mut slots, &mut rng);
    (tree, slots)
}

#[test]
fn depth_never_exceeds_max_depth() {
    let (catalog, constants) = standard();
    for max_depth in 0..=5 {
        for seed in 0..200 {
            let (tree, _) = generate(&catalog, &constants, ValueType::Bool, max_depth, seed);
            assert!(
                tree.depth() <= max_depth,
                "seed {seed}: depth {} > {max_depth} for {tree}",
                tree.depth()
            );
        }
    }
}

#[test]
fn generated_trees_have_the_requested_type() {
    let (catalog, constants) = standard();
    for target in [
        ValueType::Bool,
        ValueType::Int,
        ValueType::String,
        ValueType::DateTime,
    ] {
        for seed in 0..100 {
            let (tree, _) = generate(&catalog, &constants, target, 4, seed);
            assert_eq!(tree.value_type(), Ok(target), "seed {seed}: {tree}");
        }
    }
}

/// Whether some catalog entry, applied to the children of `node`, builds exactly `node`.
fn built_by_catalog(catalog: &OperatorCatalog, node: &Expr) -> bool {
    let Ok(result) = node.value_type() else {
        return false;
    };
    let from_binary = |lhs: &ExprRef, rhs: &ExprRef| {
        let (Ok(l), Ok(r)) = (lhs.value_type(), rhs.value_type()) else {
            return false;
        };
        catalog
            .binaries_of(result)
            .iter()
            .any(|d| d.inputs == (l, r) && *d.build(lhs.clone(), rhs.clone()) == *node)
    };
    let from_unary = |operand: &ExprRef| {
        let Ok(t) = operand.value_type() else {
            return false;
        };
        catalog
            .unaries_of(result)
            .iter()
            .any(|d| d.input == t && *d.build(operand.clone()) == *node)
    };

    match node {
        Expr::Binary { lhs, rhs, .. } => from_binary(lhs, rhs),
        Expr::Unary { inner, .. } => from_unary(inner),
        // Calls come from binary entries (`Like`) or unary ones (`AtTimeZone(_, "UTC")`)
        Expr::Call { args, .. } => match args.as_slice() {
            [a, b] => from_binary(a, b) || from_unary(a),
            _ => false,
        },
        _ => true,
    }
}

#[test]
fn every_application_matches_a_catalog_entry() {
    let (catalog, constants) = standard();
    for seed in 0..200 {
        let (tree, _) = generate(&catalog, &constants, ValueType::Bool, 4, seed);
        walk_no_input(&tree, |node| {
            assert!(
                built_by_catalog(&catalog, node.expr()),
                "seed {seed}: `{}` has no catalog entry in {tree}",
                node.expr()
            );
            node.for_each_child(|c| c.schedule_visit(()));
        });
    }
}

#[test]
fn a_seed_determines_the_tree() {
    let (catalog, constants) = standard();
    for seed in [0, 1, 12345, u64::MAX] {
        let (a, slots_a) = generate(&catalog, &constants, ValueType::Bool, 3, seed);
        let (b, slots_b) = generate(&catalog, &constants, ValueType::Bool, 3, seed);
        assert_eq!(a, b);
        assert_eq!(slots_a.usage_order(), slots_b.usage_order());
    }

    let distinct: HashSet<String> = (0..64)
        .map(|seed| generate(&catalog, &constants, ValueType::Bool, 3, seed).0.to_string())
        .collect();
    assert!(distinct.len() > 1);
}

#[test]
fn roots_are_reused_only_once_their_type_is_exhausted() {
    let (catalog, constants) = standard();
    for seed in 0..300 {
        let (tree, slots) = generate(&catalog, &constants, ValueType::Bool, 5, seed);
        let mut seen: HashSet<u16> = HashSet::new();
        for &index in slots.usage_order() {
            if seen.contains(&index) {
                let ty = ROOT_TYPES[index as usize];
                let all_used = ROOT_TYPES
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| **t == ty)
                    .all(|(i, _)| seen.contains(&(i as u16)));
                assert!(all_used, "seed {seed}: slot {index} reused early in {tree}");
            }
            seen.insert(index);
        }

        // Every placeholder in the tree was handed out by the pool
        let roots: Vec<u16> = tree.roots().iter().map(|r| r.index).collect();
        assert_eq!(roots.len(), slots.usage_order().len());
        for r in tree.roots() {
            assert_eq!(r.ty, ROOT_TYPES[r.index as usize]);
            assert!(slots.is_used(r.index));
        }
    }
}

#[test]
fn terminals_fall_back_to_constants_without_slots() {
    let (catalog, constants) = standard();
    let mut rng = ChaCha8Rng::seed_from_u64(99);
    for _ in 0..100 {
        let mut slots = RootSlots::new(&[]).unwrap();
        let tree = TreeGenerator::new(&catalog, &constants, 3).generate(
            ValueType::DateTime,
            &mut slots,
            &mut rng,
        );
        assert!(tree.roots().is_empty());
        assert_eq!(tree.value_type(), Ok(ValueType::DateTime));
    }
}

#[test]
fn odds_of_one_make_every_second_operand_a_literal() {
    let (catalog, constants) = standard();
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    for _ in 0..100 {
        let mut slots = RootSlots::new(&ROOT_TYPES).unwrap();
        let tree = TreeGenerator::new(&catalog, &constants, 4)
            .with_constant_operand_odds(1)
            .generate(ValueType::Bool, &mut slots, &mut rng);
        assert!(!tree.any(|e| matches!(e, Expr::Binary { rhs, .. } if !rhs.is_constant())));
    }
}

#[test]
fn catalog_matching_respects_declared_input_types() {
    // `Not` is registered on `bool` only, so an `int` complement has no entry
    let catalog = OperatorCatalog::new([OperatorDescriptor::unary(
        "Not",
        ValueType::Bool,
        ValueType::Bool,
        not,
    )])
    .unwrap();
    assert!(built_by_catalog(&catalog, &not(root(4, ValueType::Bool))));
    assert!(!built_by_catalog(&catalog, &not(root(2, ValueType::Int))));
    assert!(!built_by_catalog(&catalog, &negate(root(2, ValueType::Int))));

    let standard = OperatorCatalog::standard().unwrap();
    let utc = at_utc(root(0, ValueType::DateTime));
    assert!(built_by_catalog(&standard, &utc));
    let other_zone = at_time_zone(root(0, ValueType::DateTime), lit("+02:00"));
    assert!(!built_by_catalog(&standard, &other_zone));
}
