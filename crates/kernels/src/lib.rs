//! Graph-analytic kernels (BFS, SSSP, PageRank, WCC, Triangle Counting) executed against a
//! read-only graph view. Every kernel is generic over [`GraphView`] rather than tied to any one
//! edge-index or vertex-index variant, so the same algorithm runs unmodified regardless of which
//! `Container` configuration produced the snapshot it reads.

pub mod bfs;
pub mod error;
pub mod pagerank;
pub mod sssp;
pub mod tc;
pub mod wcc;

pub use error::{KernelError, KernelResult};

use graphbench_edge_index::EdgeIndex;
use graphbench_storage::{Snapshot, VertexIndex};

/// The read surface a kernel needs. Implemented for [`graphbench_storage::Snapshot`]; kernels
/// never see a `Container` or transaction manager directly.
pub trait GraphView {
    fn vertex_count(&self) -> u64;

    fn degree(&self, id: u64) -> KernelResult<usize>;

    /// Visits every visible out-neighbor of `src`. `cb` returning `false` stops the scan early.
    fn edges(&self, src: u64, cb: &mut dyn FnMut(u64, f64) -> bool) -> KernelResult<usize>;

    fn intersect(&self, a: u64, b: u64) -> KernelResult<usize>;
}

impl<V: VertexIndex<E>, E: EdgeIndex> GraphView for Snapshot<V, E> {
    fn vertex_count(&self) -> u64 {
        Snapshot::vertex_count(self)
    }

    fn degree(&self, id: u64) -> KernelResult<usize> {
        Ok(Snapshot::degree(self, id)?)
    }

    fn edges(&self, src: u64, cb: &mut dyn FnMut(u64, f64) -> bool) -> KernelResult<usize> {
        Ok(Snapshot::edges(self, src, cb)?)
    }

    fn intersect(&self, a: u64, b: u64) -> KernelResult<usize> {
        Ok(Snapshot::intersect(self, a, b)?)
    }
}
