//! PageRank over a snapshot: standard power-iteration with uniform random-jump damping and
//! dangling-mass redistribution, matching the GAP-benchmark-style formulation the rest of the
//! kernel suite follows.

use crate::{GraphView, KernelError, KernelResult};

pub fn pagerank<G: GraphView>(view: &G, damping_factor: f64, num_iterations: usize) -> KernelResult<Vec<f64>> {
    let size = view.vertex_count() as usize;
    if size == 0 {
        return Err(KernelError::EmptyGraph);
    }

    let mut degree = vec![0usize; size];
    for id in 0..size as u64 {
        degree[id as usize] = view.degree(id)?;
    }

    let init_score = 1.0 / size as f64;
    let base_score = (1.0 - damping_factor) / size as f64;
    let mut score = vec![init_score; size];
    let mut outgoing_contrib = vec![0.0; size];

    for _ in 0..num_iterations {
        let mut dangling_sum = 0.0;
        for src in 0..size {
            if degree[src] == 0 {
                dangling_sum += score[src];
            } else {
                outgoing_contrib[src] = score[src] / degree[src] as f64;
            }
        }
        dangling_sum /= size as f64;

        for v in score.iter_mut() {
            *v = base_score + damping_factor * dangling_sum;
        }
        for src in 0..size as u64 {
            view.edges(src, &mut |dest, _weight| {
                score[dest as usize] += damping_factor * outgoing_contrib[src as usize];
                true
            })?;
        }
    }

    Ok(score)
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
    fn scores_sum_to_roughly_one() {
        let c = Arc::new(TestContainer::new());
        for id in 0..4u64 {
            c.insert_vertex(id, 1).unwrap();
        }
        c.insert_edge(0, 1, 1.0, 1).unwrap();
        c.insert_edge(1, 2, 1.0, 1).unwrap();
        c.insert_edge(2, 0, 1.0, 1).unwrap();
        c.insert_edge(2, 3, 1.0, 1).unwrap();

        let snap = Snapshot::detached(c, 1);
        let score = pagerank(&snap, 0.85, 50).unwrap();
        let total: f64 = score.iter().sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn higher_in_degree_yields_higher_score() {
        let c = Arc::new(TestContainer::new());
        for id in 0..3u64 {
            c.insert_vertex(id, 1).unwrap();
        }
        // 0 and 1 both point at 2, so 2 accumulates two in-contributions while 0 and 1 get none.
        c.insert_edge(0, 2, 1.0, 1).unwrap();
        c.insert_edge(1, 2, 1.0, 1).unwrap();

        let snap = Snapshot::detached(c, 1);
        let score = pagerank(&snap, 0.85, 50).unwrap();
        let total: f64 = score.iter().sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-6);
        assert!(score[2] > score[0]);
        assert!(score[2] > score[1]);
        assert_relative_eq!(score[0], score[1], epsilon = 1e-9);
    }

    #[test]
    fn empty_graph_is_rejected() {
        let c = Arc::new(TestContainer::new());
        let snap = Snapshot::detached(c, 1);
        assert!(matches!(pagerank(&snap, 0.85, 10), Err(KernelError::EmptyGraph)));
    }
}
