//! Two-phase-locked transaction manager. Writes are staged against a transaction and applied as
//! one atomic batch at commit time. Under the `lock` feature (on by default), commit acquires a
//! real [`parking_lot::RwLock`] write guard per distinct vertex the staged writes touch — taken in
//! the transaction's ascending lock order, with [`INDEX_LOCK`] (if staged) acquired last — so two
//! commits touching disjoint vertices run concurrently; only commits that share a vertex
//! serialize on that vertex's guard. The `commit_lock` mutex is scoped to nothing but the
//! timestamp fetch-add, so it never blocks on index or edge-index work. With `lock` disabled,
//! commit falls back to applying each staged write through the container's own per-call locking,
//! with no cross-op atomicity — useful as the unlocked baseline in a 2PL-vs-COW comparison.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use graphbench_edge_index::EdgeIndex;
use graphbench_txn::{IsolationLevel, Timestamp, TimestampCounter, Transaction};
#[cfg(feature = "lock")]
use parking_lot::RwLockWriteGuard;
use parking_lot::Mutex;

use crate::container::Container;
use crate::error::{StorageError, StorageResult};
use crate::reader_registry::ReaderRegistry;
use crate::snapshot::Snapshot;
#[cfg(feature = "lock")]
use crate::vertex::VertexEntry;
use crate::vertex::INDEX_LOCK;
use crate::vertex_index::VertexIndex;

/// Background reclamation runs every this many commits.
#[cfg(feature = "gc")]
const GC_INTERVAL_COMMITS: u64 = 50;

enum WriteOp {
    InsertVertex { id: u64 },
    InsertEdge { src: u64, dest: u64, weight: f64 },
    InsertEdgeBatch { src: u64, edges: Vec<(u64, f64)> },
    InsertEdgeBatchMulti { edges: Vec<(u64, u64, f64)> },
    RemoveEdge { src: u64, dest: u64 },
}

impl WriteOp {
    #[cfg(not(feature = "lock"))]
    fn apply<V: VertexIndex<E>, E: EdgeIndex>(&self, container: &Container<V, E>, t: u64) -> StorageResult<()> {
        match self {
            WriteOp::InsertVertex { id } => container.insert_vertex(*id, t),
            WriteOp::InsertEdge { src, dest, weight } => container.insert_edge(*src, *dest, *weight, t).map(|_| ()),
            WriteOp::InsertEdgeBatch { src, edges } => container.insert_edge_batch(*src, edges, t).map(|_| ()),
            WriteOp::InsertEdgeBatchMulti { edges } => container.insert_edge_batch_multi(edges, t).map(|_| ()),
            WriteOp::RemoveEdge { src, dest } => container.remove_edge(*src, *dest, t).map(|_| ()),
        }
    }

    /// Same staged writes, applied against lock guards the commit path already holds (acquired in
    /// ascending lock order up front) instead of re-entering the container's self-locking methods.
    #[cfg(feature = "lock")]
    fn apply_locked<V: VertexIndex<E>, E: EdgeIndex>(
        &self,
        container: &Container<V, E>,
        index_guard: Option<&mut V>,
        vertex_ids: &[u64],
        vertex_entries: &[Arc<VertexEntry<E>>],
        vertex_guards: &mut [RwLockWriteGuard<'_, E>],
        t: u64,
    ) -> StorageResult<()> {
        match self {
            WriteOp::InsertVertex { id } => {
                let guard = index_guard.expect("INDEX_LOCK is held whenever an InsertVertex op is staged");
                container.insert_vertex_locked(guard, *id, t)
            }
            WriteOp::InsertEdge { src, dest, weight } => {
                let idx = vertex_ids.iter().position(|id| id == src).expect("src is locked in commit's lock order");
                container
                    .insert_edge_locked(&vertex_entries[idx], &mut vertex_guards[idx], *dest, *weight, t)
                    .map(|_| ())
            }
            WriteOp::InsertEdgeBatch { src, edges } => {
                let idx = vertex_ids.iter().position(|id| id == src).expect("src is locked in commit's lock order");
                container
                    .insert_edge_batch_locked(&vertex_entries[idx], &mut vertex_guards[idx], edges, t)
                    .map(|_| ())
            }
            WriteOp::InsertEdgeBatchMulti { edges } => {
                for (src, run) in crate::container::csr_pack(edges) {
                    let idx = vertex_ids.iter().position(|id| *id == src).expect("src is locked in commit's lock order");
                    container.insert_edge_batch_locked(&vertex_entries[idx], &mut vertex_guards[idx], &run, t)?;
                }
                Ok(())
            }
            WriteOp::RemoveEdge { src, dest } => {
                let idx = vertex_ids.iter().position(|id| id == src).expect("src is locked in commit's lock order");
                container
                    .remove_edge_locked(&vertex_entries[idx], &mut vertex_guards[idx], *dest, t)
                    .map(|_| ())
            }
        }
    }
}

pub struct TwoPhaseLockManager<V, E> {
    pub container: Arc<Container<V, E>>,
    clock: TimestampCounter,
    readers: Arc<ReaderRegistry>,
    commit_lock: Mutex<()>,
    #[cfg(feature = "gc")]
    commits_since_gc: AtomicU64,
}

impl<V: VertexIndex<E>, E: EdgeIndex> TwoPhaseLockManager<V, E> {
    pub fn new(container: Arc<Container<V, E>>) -> Arc<Self> {
        Arc::new(Self {
            container,
            clock: TimestampCounter::new(),
            readers: Arc::new(ReaderRegistry::new()),
            commit_lock: Mutex::new(()),
            #[cfg(feature = "gc")]
            commits_since_gc: AtomicU64::new(0),
        })
    }

    pub fn begin(self: &Arc<Self>) -> TwoPhaseLockTxn<V, E> {
        let read_ts = self.clock.current();
        self.readers.register(read_ts.raw());
        TwoPhaseLockTxn {
            manager: self.clone(),
            read_ts,
            lock_order: Vec::new(),
            pending: Vec::new(),
            finished: false,
        }
    }

    /// A long-lived read-only view pinned to the current timestamp, tracked in the same
    /// reader-watermark registry transactions use, so background reclamation won't outrun it.
    pub fn snapshot(&self) -> Snapshot<V, E> {
        let read_ts = self.clock.current().raw();
        Snapshot::open(self.container.clone(), self.readers.clone(), read_ts)
    }

    pub fn watermark(&self) -> u64 {
        self.readers.watermark(self.clock.current().raw())
    }

    fn commit(&self, read_ts: Timestamp, lock_order: Vec<u64>, pending: Vec<WriteOp>) -> StorageResult<Timestamp> {
        #[cfg(feature = "lock")]
        let commit_ts = self.commit_locked(&lock_order, &pending)?;
        #[cfg(not(feature = "lock"))]
        let commit_ts = {
            let _ = lock_order;
            let _guard = self.commit_lock.lock();
            let commit_ts = self.clock.next();
            drop(_guard);
            for op in &pending {
                op.apply(&self.container, commit_ts.raw())?;
            }
            commit_ts
        };
        self.readers.unregister(read_ts.raw());
        #[cfg(feature = "gc")]
        self.maybe_gc();
        Ok(commit_ts)
    }

    /// Resolves every touched vertex's entry before taking any lock (an index write guard taken
    /// first would deadlock against the vertex lookup it needs for the other staged ops), then
    /// acquires per-vertex write guards in ascending id order, then the index guard if
    /// [`INDEX_LOCK`] was staged, assigns the commit timestamp, applies the staged writes against
    /// the held guards, and releases the index guard before the vertex guards in descending id
    /// order.
    #[cfg(feature = "lock")]
    fn commit_locked(&self, lock_order: &[u64], pending: &[WriteOp]) -> StorageResult<Timestamp> {
        let created_ids: Vec<u64> = pending
            .iter()
            .filter_map(|op| match op {
                WriteOp::InsertVertex { id } => Some(*id),
                _ => None,
            })
            .collect();

        // Vertices this same commit is about to create don't exist yet and can't be looked up —
        // resolve only the ones that already exist, in ascending order, before taking any lock.
        let existing_ids: Vec<u64> =
            lock_order.iter().copied().filter(|id| *id != INDEX_LOCK && !created_ids.contains(id)).collect();
        let mut vertex_ids = existing_ids.clone();
        let mut vertex_entries: Vec<Arc<VertexEntry<E>>> =
            existing_ids.iter().map(|&id| self.container.vertex_entry(id)).collect::<StorageResult<_>>()?;
        let edge_locks: Vec<_> = vertex_entries.iter().map(|v| v.edges_arc()).collect();
        let mut new_locks: Vec<_> = Vec::new();
        let mut vertex_guards: Vec<RwLockWriteGuard<'_, E>> = edge_locks.iter().map(|lock| lock.write()).collect();

        let needs_index_lock = lock_order.last() == Some(&INDEX_LOCK);
        let mut index_guard = needs_index_lock.then(|| self.container.lock_index_for_write());

        let commit_ts = {
            let _guard = self.commit_lock.lock();
            self.clock.next()
        };

        // Vertex inserts first, so edge inserts against a vertex created in this same commit find
        // it. A vertex only just created under the index guard isn't visible to, or contended by,
        // any other transaction yet, so locking its edges here (after the existing, shared
        // vertices are already locked ascending) introduces no deadlock risk.
        let mut newly_created = Vec::new();
        for op in pending {
            if let WriteOp::InsertVertex { id } = op {
                let guard = index_guard.as_deref_mut().expect("INDEX_LOCK is held whenever an InsertVertex op is staged");
                self.container.insert_vertex_locked(guard, *id, commit_ts.raw())?;
                if lock_order.contains(id) {
                    let entry = index_guard
                        .as_deref()
                        .expect("index guard still held")
                        .get(*id)
                        .ok_or(StorageError::VertexMissing(*id))?;
                    newly_created.push((*id, entry));
                }
            }
        }
        for (id, entry) in newly_created {
            new_locks.push(entry.edges_arc());
            vertex_ids.push(id);
            vertex_entries.push(entry);
        }
        for lock in &new_locks {
            vertex_guards.push(lock.write());
        }

        for op in pending {
            if matches!(op, WriteOp::InsertVertex { .. }) {
                continue;
            }
            op.apply_locked(
                &self.container,
                index_guard.as_deref_mut(),
                &vertex_ids,
                &vertex_entries,
                &mut vertex_guards,
                commit_ts.raw(),
            )?;
        }

        Ok(commit_ts)
    }

    fn abort(&self, read_ts: Timestamp) {
        self.readers.unregister(read_ts.raw());
    }

    #[cfg(feature = "gc")]
    fn maybe_gc(&self) {
        if self.commits_since_gc.fetch_add(1, Ordering::AcqRel) + 1 < GC_INTERVAL_COMMITS {
            return;
        }
        self.commits_since_gc.store(0, Ordering::Release);
        self.container.gc_all(self.watermark());
    }
}

pub struct TwoPhaseLockTxn<V, E> {
    manager: Arc<TwoPhaseLockManager<V, E>>,
    read_ts: Timestamp,
    lock_order: Vec<u64>,
    pending: Vec<WriteOp>,
    finished: bool,
}

impl<V: VertexIndex<E>, E: EdgeIndex> TwoPhaseLockTxn<V, E> {
    fn note_lock(&mut self, id: u64) {
        #[cfg(feature = "lock")]
        if let Err(pos) = self.lock_order.binary_search(&id) {
            self.lock_order.insert(pos, id);
        }
        #[cfg(not(feature = "lock"))]
        let _ = id;
    }

    /// The vertex ids (ascending, `INDEX_LOCK` last) this transaction's staged writes will lock
    /// at apply time. Exposed for introspection and tests.
    pub fn lock_order(&self) -> &[u64] {
        &self.lock_order
    }

    pub fn stage_insert_vertex(&mut self, id: u64) {
        self.note_lock(INDEX_LOCK);
        self.pending.push(WriteOp::InsertVertex { id });
    }

    pub fn stage_insert_edge(&mut self, src: u64, dest: u64, weight: f64) {
        self.note_lock(src);
        self.pending.push(WriteOp::InsertEdge { src, dest, weight });
    }

    pub fn stage_insert_edge_batch(&mut self, src: u64, edges: Vec<(u64, f64)>) {
        self.note_lock(src);
        self.pending.push(WriteOp::InsertEdgeBatch { src, edges });
    }

    /// Stages a multi-source batch: `edges` is an arbitrary `(src, dest, weight)` list spanning
    /// any number of distinct sources, in any order. Every distinct source gets locked (in the
    /// transaction's usual ascending order) so commit can CSR-pack and apply the whole batch under
    /// guards already held, instead of re-locking per source or per edge.
    pub fn stage_insert_edge_batch_multi(&mut self, edges: Vec<(u64, u64, f64)>) {
        for &(src, _, _) in &edges {
            self.note_lock(src);
        }
        self.pending.push(WriteOp::InsertEdgeBatchMulti { edges });
    }

    pub fn stage_remove_edge(&mut self, src: u64, dest: u64) {
        self.note_lock(src);
        self.pending.push(WriteOp::RemoveEdge { src, dest });
    }

    pub fn has_vertex(&self, id: u64) -> bool {
        self.manager.container.has_vertex(id, self.read_ts.raw())
    }

    pub fn has_edge(&self, src: u64, dest: u64) -> StorageResult<bool> {
        self.manager.container.has_edge(src, dest, self.read_ts.raw())
    }

    pub fn degree(&self, id: u64) -> StorageResult<usize> {
        self.manager.container.get_degree(id, self.read_ts.raw())
    }

    pub fn edges<F>(&self, src: u64, cb: F) -> StorageResult<usize>
    where
        F: FnMut(u64, f64) -> bool,
    {
        self.manager.container.edges(src, self.read_ts.raw(), cb)
    }

    pub fn intersect(&self, a: u64, b: u64) -> StorageResult<usize> {
        self.manager.container.intersect(a, b, self.read_ts.raw())
    }
}

impl<V: VertexIndex<E>, E: EdgeIndex> Transaction for TwoPhaseLockTxn<V, E> {
    type Error = StorageError;

    fn read_ts(&self) -> Timestamp {
        self.read_ts
    }

    fn isolation_level(&self) -> IsolationLevel {
        IsolationLevel::Serializable
    }

    fn commit(mut self) -> Result<Timestamp, Self::Error> {
        self.finished = true;
        let lock_order = std::mem::take(&mut self.lock_order);
        let pending = std::mem::take(&mut self.pending);
        self.manager.commit(self.read_ts, lock_order, pending)
    }

    fn abort(mut self) -> Result<(), Self::Error> {
        self.finished = true;
        self.manager.abort(self.read_ts);
        Ok(())
    }
}

impl<V, E> Drop for TwoPhaseLockTxn<V, E> {
    fn drop(&mut self) {
        if !self.finished {
            self.manager.abort(self.read_ts);
        }
    }
}

#[cfg(test)]
mod tests {
    use graphbench_edge_index::SortedArray;

    use super::*;
    use crate::vertex_index::VectorIndex;

    type TestManager = TwoPhaseLockManager<VectorIndex<SortedArray>, SortedArray>;

    #[test]
    fn commit_applies_staged_writes_at_one_new_timestamp() {
        let mgr = TestManager::new(Arc::new(Container::new()));
        let mut txn = mgr.begin();
        txn.stage_insert_vertex(0);
        txn.stage_insert_vertex(1);
        txn.stage_insert_edge(0, 1, 4.0);
        let commit_ts = txn.commit().unwrap();

        let reader = mgr.begin();
        assert!(reader.has_edge(0, 1).unwrap());
        assert_eq!(reader.degree(0).unwrap(), 1);
        assert_eq!(commit_ts.raw(), 1);
    }

    #[test]
    fn reader_opened_before_commit_does_not_see_it() {
        let mgr = TestManager::new(Arc::new(Container::new()));
        let mut setup = mgr.begin();
        setup.stage_insert_vertex(0);
        setup.stage_insert_vertex(1);
        setup.commit().unwrap();

        let reader = mgr.begin();
        let mut writer = mgr.begin();
        writer.stage_insert_edge(0, 1, 1.0);
        writer.commit().unwrap();

        assert!(!reader.has_edge(0, 1).unwrap());
        let later = mgr.begin();
        assert!(later.has_edge(0, 1).unwrap());
    }

    #[test]
    fn abort_discards_staged_writes() {
        let mgr = TestManager::new(Arc::new(Container::new()));
        let mut setup = mgr.begin();
        setup.stage_insert_vertex(0);
        setup.stage_insert_vertex(1);
        setup.commit().unwrap();

        let mut txn = mgr.begin();
        txn.stage_insert_edge(0, 1, 1.0);
        Transaction::abort(txn).unwrap();

        let reader = mgr.begin();
        assert!(!reader.has_edge(0, 1).unwrap());
    }

    #[test]
    fn multi_source_batch_commits_atomically_across_sources() {
        let mgr = TestManager::new(Arc::new(Container::new()));
        let mut setup = mgr.begin();
        for id in 0..3 {
            setup.stage_insert_vertex(id);
        }
        setup.commit().unwrap();

        let mut txn = mgr.begin();
        txn.stage_insert_edge_batch_multi(vec![(2, 0, 0.0), (0, 1, 0.0), (0, 2, 0.0), (1, 2, 0.0)]);
        assert_eq!(txn.lock_order(), &[0, 1, 2]);
        txn.commit().unwrap();

        let reader = mgr.begin();
        assert_eq!(reader.degree(0).unwrap(), 2);
        assert_eq!(reader.degree(1).unwrap(), 1);
        assert_eq!(reader.degree(2).unwrap(), 1);
        assert!(reader.has_edge(0, 1).unwrap());
        assert!(reader.has_edge(2, 0).unwrap());
    }

    #[test]
    fn lock_order_is_ascending_with_index_lock_last() {
        let mgr = TestManager::new(Arc::new(Container::new()));
        let mut txn = mgr.begin();
        txn.stage_insert_edge(5, 1, 0.0);
        txn.stage_insert_edge(2, 1, 0.0);
        txn.stage_insert_vertex(9);
        assert_eq!(txn.lock_order(), &[2, 5, INDEX_LOCK]);
    }
}
