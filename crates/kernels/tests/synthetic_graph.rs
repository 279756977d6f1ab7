use std::sync::Arc;

use graphbench_edge_index::SortedArray;
use graphbench_kernels::{bfs::bfs, pagerank::pagerank, sssp::sssp, tc, wcc::wcc};
use graphbench_storage::{Container, Snapshot, VectorIndex};

type TestContainer = Container<VectorIndex<SortedArray>, SortedArray>;

/// A small directed graph with one cycle (0-1-2-0), a pendant (2-3), and an isolated vertex (4).
fn build() -> Arc<TestContainer> {
    let c = Arc::new(TestContainer::new());
    for id in 0..5u64 {
        c.insert_vertex(id, 1).unwrap();
    }
    for (a, b, w) in [(0u64, 1u64, 1.0), (1, 2, 1.0), (2, 0, 1.0), (2, 3, 4.0)] {
        c.insert_edge(a, b, w, 1).unwrap();
    }
    c
}

#[test]
fn kernels_agree_on_a_shared_synthetic_graph() {
    let c = build();
    let snap = Snapshot::detached(c, 1);

    let dist = bfs(&snap, 0).unwrap();
    assert_eq!(dist, vec![0, 1, 2, 3, usize::MAX]);

    let weighted = sssp(&snap, 0).unwrap();
    assert_eq!(weighted[3], 6.0);
    assert!(weighted[4].is_infinite());

    let labels = wcc(&snap).unwrap();
    assert_eq!(labels[0], labels[1]);
    assert_eq!(labels[1], labels[2]);
    assert_eq!(labels[2], labels[3]);
    assert_ne!(labels[4], labels[0]);

    let scores = pagerank(&snap, 0.85, 30).unwrap();
    let total: f64 = scores.iter().sum();
    assert!((total - 1.0).abs() < 1e-6);

    // No triangles: the only cycle has length 3 but is directed one-way, so no vertex pair in it
    // has edges both directions, which both triangle-counting variants must agree on.
    assert_eq!(tc::count_via_intersect(&snap).unwrap(), 0);
    assert_eq!(tc::count_via_merge(&snap).unwrap(), 0);
}
