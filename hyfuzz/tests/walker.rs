use hyfuzz::expr::{Expr, ExprKind};
use hyfuzz::prelude::*;

fn sample() -> ExprRef {
    // ($0 + 1) < -$2
    less_than(
        add(root(0, ValueType::Int), lit(1)),
        negate(root(2, ValueType::Int)),
    )
}

#[test]
fn walk_counts_nodes() {
    let tree = sample();
    let mut count = 0usize;
    walk_no_input(&tree, |node| {
        count += 1;
        node.for_each_child(|c| c.schedule_visit(()));
    });
    assert_eq!(count, 6);
    assert_eq!(tree.node_count(), 6);
}

#[test]
fn for_each_child_gives_left_to_right_preorder() {
    let tree = sample();
    let mut kinds = Vec::new();
    walk_no_input(&tree, |node| {
        kinds.push(node.kind());
        node.for_each_child(|c| c.schedule_immediate(()));
    });
    assert_eq!(
        kinds,
        vec![
            ExprKind::Binary,
            ExprKind::Binary,
            ExprKind::Root,
            ExprKind::Constant,
            ExprKind::Unary,
            ExprKind::Root,
        ]
    );
}

#[test]
fn deferred_scheduling_is_breadth_first() {
    let tree = sample();
    let mut depths = Vec::new();
    walk(&tree, 0usize, |depth, node| {
        depths.push(depth);
        node.for_each_child(|c| c.schedule_deferred(depth + 1));
    });
    assert_eq!(depths, vec![0, 1, 1, 2, 2, 2]);
}

#[test]
fn parents_are_reported() {
    let tree = sample();
    walk_no_input(&tree, |node| {
        match node.expr() {
            Expr::Root(r) if r.index == 2 => {
                assert!(node.parent().is_some_and(|p| p.is_unary()));
            }
            _ if node.is_root() => assert!(std::ptr::eq(node.expr(), &*tree)),
            _ => assert!(node.parent().is_some()),
        }
        node.for_each_child(|c| c.schedule_visit(()));
    });
}

#[test]
fn stop_and_pruning() {
    let tree = sample();
    assert!(tree.any(|e| matches!(e, Expr::Unary { .. })));
    assert!(!tree.any(|e| matches!(e, Expr::Call { .. })));

    // Only descend into the left operand
    let mut visited = 0usize;
    walk_no_input(&tree, |node| {
        visited += 1;
        if let Expr::Binary { .. } = node.expr() {
            let mut first = true;
            node.for_each_child(|c| {
                // Children are offered right to left
                if !first {
                    c.schedule_visit(());
                }
                first = false;
            });
        }
    });
    // root, $0 + 1, $0
    assert_eq!(visited, 3);
}

#[test]
fn structural_queries() {
    let tree = sample();
    assert_eq!(tree.depth(), 2);
    assert_eq!(lit(1).depth(), 0);
    let roots: Vec<u16> = tree.roots().iter().map(|r| r.index).collect();
    assert_eq!(roots, vec![0, 2]);
}
