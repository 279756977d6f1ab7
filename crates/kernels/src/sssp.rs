//! Single-source shortest paths over a weighted snapshot (Dijkstra).

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::{GraphView, KernelResult};

#[derive(PartialEq)]
struct HeapEntry {
    dist: f64,
    vertex: u64,
}

impl Eq for HeapEntry {}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so `BinaryHeap` (a max-heap) pops the smallest distance first.
        other.dist.total_cmp(&self.dist)
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Shortest weighted distance from `source` to every (dense, 0-indexed) vertex; unreached
/// vertices keep `f64::INFINITY`. Assumes non-negative edge weights.
pub fn sssp<G: GraphView>(view: &G, source: u64) -> KernelResult<Vec<f64>> {
    let size = view.vertex_count() as usize;
    let mut dist = vec![f64::INFINITY; size];
    if (source as usize) >= size {
        return Ok(dist);
    }
    dist[source as usize] = 0.0;

    let mut heap = BinaryHeap::new();
    heap.push(HeapEntry { dist: 0.0, vertex: source });

    while let Some(HeapEntry { dist: cur_dist, vertex: cur }) = heap.pop() {
        if cur_dist > dist[cur as usize] {
            continue;
        }
        let mut to_push = Vec::new();
        view.edges(cur, &mut |dest, weight| {
            let next_dist = cur_dist + weight;
            let slot = dest as usize;
            if slot < dist.len() && next_dist < dist[slot] {
                dist[slot] = next_dist;
                to_push.push((dest, next_dist));
            }
            true
        })?;
        for (vertex, d) in to_push {
            heap.push(HeapEntry { dist: d, vertex });
        }
    }

    Ok(dist)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use approx::assert_relative_eq;
    use graphbench_edge_index::SortedArray;
    use graphbench_storage::{Container, Snapshot, VectorIndex};

    use super::*;

    type TestContainer = Container<VectorIndex<SortedArray>, SortedArray>;

    #[test]
    fn picks_the_cheaper_of_two_paths() {
        let c = Arc::new(TestContainer::new());
        for id in 0..4u64 {
            c.insert_vertex(id, 1).unwrap();
        }
        c.insert_edge(0, 1, 5.0, 1).unwrap();
        c.insert_edge(0, 2, 1.0, 1).unwrap();
        c.insert_edge(2, 1, 1.0, 1).unwrap();
        c.insert_edge(1, 3, 1.0, 1).unwrap();

        let snap = Snapshot::detached(c, 1);
        let dist = sssp(&snap, 0).unwrap();
        assert_relative_eq!(dist[0], 0.0);
        assert_relative_eq!(dist[1], 2.0);
        assert_relative_eq!(dist[2], 1.0);
        assert_relative_eq!(dist[3], 3.0);
    }

    #[test]
    fn unreachable_vertex_stays_infinite() {
        let c = Arc::new(TestContainer::new());
        c.insert_vertex(0, 1).unwrap();
        c.insert_vertex(1, 1).unwrap();
        let snap = Snapshot::detached(c, 1);
        let dist = sssp(&snap, 0).unwrap();
        assert!(dist[1].is_infinite());
    }
}
