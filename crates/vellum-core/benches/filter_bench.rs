use criterion::{criterion_group, criterion_main, Criterion};
use vellum_core::{
    ops, Comparison, DocumentColumn, FilterNode, FilterOperator, FilterValue, Group,
    LogicOperator, NodeId,
};

/// A root AND group holding `groups` OR groups of `leaves` comparisons each,
/// roughly the shape of a heavily-edited interactive filter.
fn build_tree(groups: usize, leaves: usize) -> Group<DocumentColumn> {
    let mut root = Group::new_root();
    for g in 0..groups {
        let mut inner = Group::empty();
        inner.logic_operator = LogicOperator::Or;
        for l in 0..leaves {
            inner.items.push(FilterNode::Comparison(Comparison::named(
                DocumentColumn::Name,
                FilterOperator::Contains,
                FilterValue::Text(format!("term_{g}_{l}")),
            )));
        }
        root.items.push(FilterNode::Group(inner));
    }
    root
}

fn last_leaf_id(root: &Group<DocumentColumn>) -> NodeId {
    let ids = ops::collect_ids(root);
    ids.last().cloned().unwrap_or_else(NodeId::root)
}

fn bench_find(c: &mut Criterion) {
    // 10 groups of 5 leaves: ~60 nodes, worst-case lookup at the far end.
    let tree = build_tree(10, 5);
    let target = last_leaf_id(&tree);

    c.bench_function("find_deepest_of_60", |b| {
        b.iter(|| {
            let found = ops::find(&tree, &target);
            assert!(found.is_some());
        });
    });
}

fn bench_delete(c: &mut Criterion) {
    c.bench_function("delete_deepest_of_60", |b| {
        b.iter_batched(
            || {
                let tree = build_tree(10, 5);
                let target = last_leaf_id(&tree);
                (tree, target)
            },
            |(mut tree, target)| {
                assert!(ops::delete(&mut tree, &target));
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

fn bench_add_comparison(c: &mut Criterion) {
    let template = Comparison::named(
        DocumentColumn::Name,
        FilterOperator::Contains,
        FilterValue::Text(String::new()),
    );

    c.bench_function("add_comparison_to_60", |b| {
        b.iter_batched(
            || build_tree(10, 5),
            |mut tree| {
                ops::add_comparison(&mut tree, &NodeId::root(), &template);
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

fn bench_wire_roundtrip(c: &mut Criterion) {
    let tree = build_tree(10, 5);

    c.bench_function("wire_roundtrip_60", |b| {
        b.iter(|| {
            let payload = tree.to_wire_json();
            let decoded = Group::<DocumentColumn>::from_wire_json(&payload).unwrap();
            assert_eq!(decoded.items.len(), tree.items.len());
        });
    });
}

criterion_group!(
    benches,
    bench_find,
    bench_delete,
    bench_add_comparison,
    bench_wire_roundtrip,
);
criterion_main!(benches);
