use std::sync::Arc;

use graphbench_edge_index::SortedArray;
use graphbench_storage::{Container, TwoPhaseLockManager, VectorIndex};
use graphbench_txn::Transaction;

type TestManager = TwoPhaseLockManager<VectorIndex<SortedArray>, SortedArray>;

#[test]
fn basic_container_and_transaction_round_trip() {
    let mgr = TestManager::new(Arc::new(Container::new()));

    let mut setup = mgr.begin();
    for id in 0..10u64 {
        setup.stage_insert_vertex(id);
    }
    for id in 0..9u64 {
        setup.stage_insert_edge(id, id + 1, id as f64);
    }
    setup.commit().unwrap();

    let reader = mgr.begin();
    for id in 0..9u64 {
        assert!(reader.has_edge(id, id + 1).unwrap());
    }
    assert_eq!(reader.degree(0).unwrap(), 1);
    assert_eq!(reader.degree(9).unwrap(), 0);
}

#[test]
fn second_transaction_builds_on_the_first() {
    let mgr = TestManager::new(Arc::new(Container::new()));

    let mut first = mgr.begin();
    first.stage_insert_vertex(0);
    first.stage_insert_vertex(1);
    first.stage_insert_vertex(2);
    first.commit().unwrap();

    let mut second = mgr.begin();
    second.stage_insert_edge(0, 1, 1.0);
    second.stage_insert_edge(0, 2, 2.0);
    second.commit().unwrap();

    let reader = mgr.begin();
    assert_eq!(reader.degree(0).unwrap(), 2);
    let mut seen = Vec::new();
    reader
        .edges(0, |dest, weight| {
            seen.push((dest, weight));
            true
        })
        .unwrap();
    seen.sort_by_key(|(d, _)| *d);
    assert_eq!(seen, vec![(1, 1.0), (2, 2.0)]);
}
