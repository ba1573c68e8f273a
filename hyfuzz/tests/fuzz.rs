use hyfuzz::expr::Expr;
use hyfuzz::prelude::*;

/// Turns `a < b` into `a <= b`.
struct LooseComparison;

impl RewriteRule for LooseComparison {
    fn name(&self) -> &'static str {
        "loose-comparison"
    }

    fn rewrite(&self, node: &Expr) -> Option<ExprRef> {
        match node {
            Expr::Binary {
                op: BinaryOp::LessThan,
                lhs,
                rhs,
            } => Some(less_than_or_equal(lhs.clone(), rhs.clone())),
            _ => None,
        }
    }
}

#[test]
fn reference_run_is_clean() {
    let fuzzer = Fuzzer::standard(FuzzConfig::default()).unwrap();
    let report = fuzzer.run().unwrap();
    assert_eq!(report.iterations, 100);
    assert_eq!(report.equivalent + report.skipped, 100);
    assert!(report.equivalent > 0);
}

#[test]
fn projections_of_every_type_are_clean() {
    for target in [
        ValueType::Int,
        ValueType::Bool,
        ValueType::String,
        ValueType::DateTime,
    ] {
        let config = FuzzConfig {
            iterations: 40,
            max_depth: 4,
            target,
            shape: QueryShape::Project,
            root_types: vec![
                ValueType::String,
                ValueType::Int,
                ValueType::Int,
                ValueType::Bool,
                ValueType::DateTime,
            ],
            ..FuzzConfig::default()
        };
        let report = Fuzzer::standard(config).unwrap().run().unwrap();
        assert_eq!(report.iterations, 40, "target {target}");
    }
}

#[test]
fn runs_are_reproducible() {
    let fuzzer = Fuzzer::standard(FuzzConfig {
        iterations: 25,
        ..FuzzConfig::default()
    })
    .unwrap();
    assert_eq!(fuzzer.run().unwrap(), fuzzer.run().unwrap());

    let a = fuzzer.generate_case(42, 0).unwrap();
    let b = fuzzer.generate_case(42, 0).unwrap();
    assert_eq!(a.tree, b.tree);
    assert_eq!(a.seed, 42);
    assert_eq!(a.max_depth, 3);
}

#[test]
fn failures_report_a_replayable_seed() {
    let fuzzer = Fuzzer::standard(FuzzConfig {
        iterations: 500,
        max_depth: 4,
        ..FuzzConfig::default()
    })
    .unwrap()
    .with_rewriter(Rewriter::standard().with_rule(LooseComparison));

    let err = fuzzer.run().unwrap_err();
    let report = err.report().expect("a broken rewrite is caught").clone();
    assert!(err.is_divergence());

    // Replaying the seed alone reproduces the failure
    let replayed = fuzzer.run_seed(report.seed, report.iteration).unwrap_err();
    assert_eq!(replayed.report().map(|r| &r.kind), Some(&report.kind));
    assert_eq!(replayed.report().map(|r| &r.tree), Some(&report.tree));
}

#[test]
fn runs_can_be_interrupted_between_iterations() {
    let fuzzer = Fuzzer::standard(FuzzConfig::default()).unwrap();
    let mut polls = 0;
    let report = fuzzer
        .run_until(|| {
            polls += 1;
            polls > 5
        })
        .unwrap();
    assert_eq!(report.iterations, 5);
}

const VALUE_TYPES: [ValueType; 4] = [
    ValueType::Int,
    ValueType::Bool,
    ValueType::String,
    ValueType::DateTime,
];

#[test]
fn binary_sweep_visits_every_predicate() {
    let fuzzer = Fuzzer::standard(FuzzConfig::default()).unwrap();
    let expected: Vec<String> = fuzzer
        .catalog()
        .binaries_of(ValueType::Bool)
        .iter()
        .map(|op| format!("{}({}, {})", op.name, op.inputs.0, op.inputs.1))
        .collect();

    let guarded = fuzzer.sweep_binaries(true).unwrap();
    assert_eq!(guarded.cases, expected);
    assert_eq!(guarded.equivalent + guarded.skipped, expected.len() as u64);

    // `null == null` holds, so the guard drops rows the bare predicate keeps
    let bare = fuzzer.sweep_binaries(false).unwrap();
    assert_eq!(bare.cases, expected);
    assert_eq!(bare.equivalent + bare.skipped, expected.len() as u64);
    assert!(guarded.rows_compared < bare.rows_compared);
}

#[test]
fn binary_then_unary_sweep_visits_every_composition() {
    let fuzzer = Fuzzer::standard(FuzzConfig::default()).unwrap();
    let catalog = fuzzer.catalog();
    let mut expected = Vec::new();
    for result in VALUE_TYPES {
        for binary in catalog.binaries_of(result) {
            for ty in VALUE_TYPES {
                for unary in catalog.unaries_of(ty).iter().filter(|u| u.input == result) {
                    expected.push((binary.name, binary.inputs, unary.name, unary.input));
                }
            }
        }
    }
    assert!(!expected.is_empty());

    for filter_nulls in [true, false] {
        let report = fuzzer.sweep_binary_then_unary(filter_nulls).unwrap();
        assert_eq!(report.cases.len(), expected.len());
        for (name, (lhs, rhs), unary, input) in &expected {
            let label = format!("{name}({lhs}, {rhs}) then {unary}({input})");
            assert!(report.cases.contains(&label), "{label} was not checked");
        }
        assert_eq!(report.equivalent + report.skipped, expected.len() as u64);
    }
}

#[test]
fn sweeps_catch_a_broken_rewrite() {
    let fuzzer = Fuzzer::standard(FuzzConfig::default())
        .unwrap()
        .with_rewriter(Rewriter::standard().with_rule(LooseComparison));

    // Equal integers satisfy `<=` but not `<`
    let err = fuzzer.sweep_binaries(true).unwrap_err();
    assert!(err.is_divergence());
    assert!(fuzzer.sweep_binary_then_unary(true).unwrap_err().is_divergence());
}
