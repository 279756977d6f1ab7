//! Weakly connected components via union-find, treating every edge as undirected.

use crate::{GraphView, KernelResult};

struct UnionFind {
    root: Vec<u64>,
}

impl UnionFind {
    fn new(size: usize) -> Self {
        Self {
            root: (0..size as u64).collect(),
        }
    }

    fn find(&mut self, x: u64) -> u64 {
        if self.root[x as usize] == x {
            return x;
        }
        let r = self.find(self.root[x as usize]);
        self.root[x as usize] = r;
        r
    }

    fn unite(&mut self, x: u64, y: u64) {
        let rx = self.find(x);
        let ry = self.find(y);
        if rx != ry {
            self.root[ry as usize] = rx;
        }
    }
}

/// Assigns each (dense, 0-indexed) vertex a component id in `0..num_components`. Component ids
/// have no relation to vertex ids beyond grouping.
pub fn wcc<G: GraphView>(view: &G) -> KernelResult<Vec<u64>> {
    let size = view.vertex_count() as usize;
    let mut uf = UnionFind::new(size);

    for src in 0..size as u64 {
        view.edges(src, &mut |dest, _weight| {
            uf.unite(src, dest);
            true
        })?;
    }

    let mut labels = vec![u64::MAX; size];
    let mut next_component = 0u64;
    for i in 0..size as u64 {
        let root = uf.find(i);
        if labels[root as usize] == u64::MAX {
            labels[root as usize] = next_component;
            next_component += 1;
        }
        labels[i as usize] = labels[root as usize];
    }

    Ok(labels)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use graphbench_edge_index::SortedArray;
    use graphbench_storage::{Container, Snapshot, VectorIndex};

    use super::*;

    type TestContainer = Container<VectorIndex<SortedArray>, SortedArray>;

    #[test]
    fn two_disjoint_chains_form_two_components() {
        let c = Arc::new(TestContainer::new());
        for id in 0..6u64 {
            c.insert_vertex(id, 1).unwrap();
        }
        c.insert_edge(0, 1, 1.0, 1).unwrap();
        c.insert_edge(1, 2, 1.0, 1).unwrap();
        c.insert_edge(3, 4, 1.0, 1).unwrap();
        c.insert_edge(4, 5, 1.0, 1).unwrap();

        let snap = Snapshot::detached(c, 1);
        let labels = wcc(&snap).unwrap();
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[1], labels[2]);
        assert_eq!(labels[3], labels[4]);
        assert_eq!(labels[4], labels[5]);
        assert_ne!(labels[0], labels[3]);
    }

    #[test]
    fn isolated_vertex_is_its_own_component() {
        let c = Arc::new(TestContainer::new());
        c.insert_vertex(0, 1).unwrap();
        c.insert_vertex(1, 1).unwrap();
        c.insert_vertex(2, 1).unwrap();
        c.insert_edge(0, 1, 1.0, 1).unwrap();

        let snap = Snapshot::detached(c, 1);
        let labels = wcc(&snap).unwrap();
        assert_eq!(labels[0], labels[1]);
        assert_ne!(labels[2], labels[0]);
    }
}
