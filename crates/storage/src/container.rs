//! The `Container`: a graph generic over a vertex-index variant and an edge-index variant, with
//! no knowledge of which transaction manager sits on top of it. All methods take `&self` — every
//! mutation goes through the index's or a vertex's own interior-mutable lock, which is what lets
//! both the 2PL and COW transaction managers share this same container type.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use graphbench_edge_index::EdgeIndex;
use parking_lot::{RwLock, RwLockWriteGuard};

use crate::error::{StorageError, StorageResult};
use crate::vertex::VertexEntry;
use crate::vertex_index::VertexIndex;

#[derive(Debug)]
pub struct Container<V, E> {
    vertices: RwLock<V>,
    vertex_count: AtomicU64,
    edge_count: AtomicU64,
    _marker: std::marker::PhantomData<E>,
}

impl<V: VertexIndex<E>, E: EdgeIndex> Default for Container<V, E> {
    fn default() -> Self {
        Self {
            vertices: RwLock::new(V::new()),
            vertex_count: AtomicU64::new(0),
            edge_count: AtomicU64::new(0),
            _marker: std::marker::PhantomData,
        }
    }
}

/// Sorts `edges` by `(src, dest)` and groups them into per-source adjacency runs — a CSR pack —
/// so a multi-source batch insert applies one run per vertex instead of taking and releasing that
/// vertex's edge lock once per individual edge. Shared by [`Container::insert_edge_batch_multi`]
/// and the 2PL commit path, which packs the same way but applies each run against a guard it
/// already holds rather than re-locking through `insert_edge_batch`.
pub(crate) fn csr_pack(edges: &[(u64, u64, f64)]) -> Vec<(u64, Vec<(u64, f64)>)> {
    let mut sorted: Vec<(u64, u64, f64)> = edges.to_vec();
    sorted.sort_unstable_by_key(|&(src, dest, _)| (src, dest));
    let mut packed: Vec<(u64, Vec<(u64, f64)>)> = Vec::new();
    for (src, dest, weight) in sorted {
        match packed.last_mut() {
            Some((last_src, run)) if *last_src == src => run.push((dest, weight)),
            _ => packed.push((src, vec![(dest, weight)])),
        }
    }
    packed
}

impl<V: VertexIndex<E>, E: EdgeIndex> Container<V, E> {
    pub fn new() -> Self {
        Self::default()
    }

    fn vertex(&self, id: u64) -> StorageResult<Arc<VertexEntry<E>>> {
        self.vertices.read().get(id).ok_or(StorageError::VertexMissing(id))
    }

    /// Exposed for a commit path (the 2PL manager) that needs to hold a vertex's edge-lock guard
    /// itself across several ops rather than re-enter through `insert_edge`/`remove_edge` and lock
    /// a second time.
    pub fn vertex_entry(&self, id: u64) -> StorageResult<Arc<VertexEntry<E>>> {
        self.vertex(id)
    }

    pub fn edges_arc(&self, id: u64) -> StorageResult<Arc<RwLock<E>>> {
        Ok(self.vertex(id)?.edges_arc())
    }

    /// Exclusive access to the whole vertex index, for the commit path's `INDEX_LOCK` acquisition
    /// (a staged `insert_vertex` mutates index membership itself, not one vertex's edges).
    pub fn lock_index_for_write(&self) -> RwLockWriteGuard<'_, V> {
        self.vertices.write()
    }

    pub fn insert_vertex_locked(&self, guard: &mut V, id: u64, t: u64) -> StorageResult<()> {
        guard.insert(id, t)?;
        self.vertex_count.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    pub fn insert_edge_locked(&self, vertex: &VertexEntry<E>, guard: &mut E, dest: u64, weight: f64, t: u64) -> StorageResult<bool> {
        let created = vertex.apply_insert_edge_locked(guard, dest, t, weight)?;
        if created {
            self.edge_count.fetch_add(1, Ordering::AcqRel);
        }
        Ok(created)
    }

    pub fn remove_edge_locked(&self, vertex: &VertexEntry<E>, guard: &mut E, dest: u64, t: u64) -> StorageResult<bool> {
        let removed = vertex.apply_remove_edge_locked(guard, dest, t)?;
        if removed {
            self.edge_count.fetch_sub(1, Ordering::AcqRel);
        }
        Ok(removed)
    }

    pub fn insert_edge_batch_locked(&self, vertex: &VertexEntry<E>, guard: &mut E, edges: &[(u64, f64)], t: u64) -> StorageResult<usize> {
        let created = vertex.apply_insert_edge_batch_locked(guard, edges, t)?;
        self.edge_count.fetch_add(created as u64, Ordering::AcqRel);
        Ok(created)
    }

    pub fn insert_vertex(&self, id: u64, t: u64) -> StorageResult<()> {
        self.vertices.write().insert(id, t)?;
        self.vertex_count.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    pub fn has_vertex(&self, id: u64, t: u64) -> bool {
        self.vertices.read().get(id).is_some_and(|v| v.is_visible(t))
    }

    pub fn has_edge(&self, src: u64, dest: u64, t: u64) -> StorageResult<bool> {
        Ok(self.vertex(src)?.has_edge(dest, t))
    }

    pub fn insert_edge(&self, src: u64, dest: u64, weight: f64, t: u64) -> StorageResult<bool> {
        let created = self.vertex(src)?.insert_edge(dest, t, weight)?;
        if created {
            self.edge_count.fetch_add(1, Ordering::AcqRel);
        }
        Ok(created)
    }

    /// Optional capability: fails with `StorageError::EdgeIndex(FunctionNotImplemented(..))` under
    /// edge-index variants that don't support removal.
    pub fn remove_edge(&self, src: u64, dest: u64, t: u64) -> StorageResult<bool> {
        let removed = self.vertex(src)?.remove_edge(dest, t)?;
        if removed {
            self.edge_count.fetch_sub(1, Ordering::AcqRel);
        }
        Ok(removed)
    }

    pub fn insert_edge_batch(&self, src: u64, edges: &[(u64, f64)], t: u64) -> StorageResult<usize> {
        let created = self.vertex(src)?.insert_edge_batch(edges, t)?;
        self.edge_count.fetch_add(created as u64, Ordering::AcqRel);
        Ok(created)
    }

    /// Bulk-loads `edges` from any mix of sources (an edge list straight off disk, unsorted) by
    /// CSR-packing it into one run per source and calling [`Self::insert_edge_batch`] once per
    /// run, instead of once per edge — the entry point a loader should reach for over looping
    /// `insert_edge` when staging a fresh batch of edges that span many vertices.
    pub fn insert_edge_batch_multi(&self, edges: &[(u64, u64, f64)], t: u64) -> StorageResult<usize> {
        let mut total = 0;
        for (src, run) in csr_pack(edges) {
            total += self.insert_edge_batch(src, &run, t)?;
        }
        Ok(total)
    }

    pub fn edges<F>(&self, src: u64, t: u64, cb: F) -> StorageResult<usize>
    where
        F: FnMut(u64, f64) -> bool,
    {
        Ok(self.vertex(src)?.edges(t, cb))
    }

    pub fn intersect(&self, a: u64, b: u64, t: u64) -> StorageResult<usize> {
        let va = self.vertex(a)?;
        let vb = self.vertex(b)?;
        Ok(va.intersect(&vb, t))
    }

    pub fn get_degree(&self, id: u64, t: u64) -> StorageResult<usize> {
        Ok(self.vertex(id)?.degree(t))
    }

    pub fn vertex_count(&self) -> u64 {
        self.vertex_count.load(Ordering::Acquire)
    }

    pub fn edge_count(&self) -> u64 {
        self.edge_count.load(Ordering::Acquire)
    }

    pub fn for_each_vertex(&self, f: &mut dyn FnMut(&VertexEntry<E>)) {
        self.vertices.read().for_each(f);
    }

    /// Trims version history no longer reachable by any open transaction.
    pub fn gc_all(&self, safe_t: u64) {
        self.vertices.read().for_each(&mut |v| v.gc(safe_t));
    }
}
