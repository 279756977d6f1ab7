//! Breadth-first search over a snapshot, unweighted shortest-hop distances from one source.

use std::collections::VecDeque;

use crate::{GraphView, KernelResult};

/// Distance in hops from `source` to every other (dense, 0-indexed) vertex; unreached vertices
/// keep `usize::MAX`.
pub fn bfs<G: GraphView>(view: &G, source: u64) -> KernelResult<Vec<usize>> {
    let size = view.vertex_count() as usize;
    let mut dist = vec![usize::MAX; size];
    if (source as usize) >= size {
        return Ok(dist);
    }
    dist[source as usize] = 0;

    let mut queue = VecDeque::new();
    queue.push_back(source);

    while let Some(cur) = queue.pop_front() {
        let level = dist[cur as usize] + 1;
        view.edges(cur, &mut |dest, _weight| {
            let slot = dest as usize;
            if slot < dist.len() && dist[slot] == usize::MAX {
                dist[slot] = level;
                queue.push_back(dest);
            }
            true
        })?;
    }

    Ok(dist)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use graphbench_edge_index::SortedArray;
    use graphbench_storage::{Container, Snapshot, VectorIndex};

    use super::*;

    type TestContainer = Container<VectorIndex<SortedArray>, SortedArray>;

    fn chain_of(n: u64) -> Arc<TestContainer> {
        let c = Arc::new(TestContainer::new());
        for id in 0..n {
            c.insert_vertex(id, 1).unwrap();
        }
        for id in 0..n.saturating_sub(1) {
            c.insert_edge(id, id + 1, 1.0, 1).unwrap();
        }
        c
    }

    #[test]
    fn distances_increase_by_one_along_a_chain() {
        let c = chain_of(5);
        let snap = Snapshot::detached(c, 1);
        let dist = bfs(&snap, 0).unwrap();
        assert_eq!(dist, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn unreachable_vertices_stay_at_max() {
        let c = Arc::new(TestContainer::new());
        c.insert_vertex(0, 1).unwrap();
        c.insert_vertex(1, 1).unwrap();
        let snap = Snapshot::detached(c, 1);
        let dist = bfs(&snap, 0).unwrap();
        assert_eq!(dist[0], 0);
        assert_eq!(dist[1], usize::MAX);
    }
}
