//! Copy-on-write transaction manager: a single-writer gate (an `AtomicBool`, not a blocking
//! mutex — a second concurrent writer is rejected rather than queued) instead of per-vertex
//! locks. With only one writer ever active, there is no lock-acquisition order to worry about,
//! which is why [`IsolationLevel::Snapshot`] is reported here instead of `Serializable`: the
//! absence of concurrent writers makes the distinction moot, but the history produced is in fact
//! always serializable too.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use graphbench_edge_index::EdgeIndex;
use graphbench_txn::{IsolationLevel, Timestamp, TimestampCounter, Transaction};

use crate::container::Container;
use crate::error::{StorageError, StorageResult};
use crate::reader_registry::ReaderRegistry;
use crate::snapshot::Snapshot;
use crate::vertex_index::VertexIndex;

enum WriteOp {
    InsertVertex { id: u64 },
    InsertEdge { src: u64, dest: u64, weight: f64 },
    InsertEdgeBatch { src: u64, edges: Vec<(u64, f64)> },
    InsertEdgeBatchMulti { edges: Vec<(u64, u64, f64)> },
    RemoveEdge { src: u64, dest: u64 },
}

impl WriteOp {
    fn apply<V: VertexIndex<E>, E: EdgeIndex>(&self, container: &Container<V, E>, t: u64) -> StorageResult<()> {
        match self {
            WriteOp::InsertVertex { id } => container.insert_vertex(*id, t),
            WriteOp::InsertEdge { src, dest, weight } => container.insert_edge(*src, *dest, *weight, t).map(|_| ()),
            WriteOp::InsertEdgeBatch { src, edges } => container.insert_edge_batch(*src, edges, t).map(|_| ()),
            WriteOp::InsertEdgeBatchMulti { edges } => container.insert_edge_batch_multi(edges, t).map(|_| ()),
            WriteOp::RemoveEdge { src, dest } => container.remove_edge(*src, *dest, t).map(|_| ()),
        }
    }
}

pub struct CowManager<V, E> {
    pub container: Arc<Container<V, E>>,
    clock: TimestampCounter,
    readers: Arc<ReaderRegistry>,
    writer_active: AtomicBool,
}

impl<V: VertexIndex<E>, E: EdgeIndex> CowManager<V, E> {
    pub fn new(container: Arc<Container<V, E>>) -> Arc<Self> {
        Arc::new(Self {
            container,
            clock: TimestampCounter::new(),
            readers: Arc::new(ReaderRegistry::new()),
            writer_active: AtomicBool::new(false),
        })
    }

    /// A long-lived read-only view pinned to the current timestamp, tracked in the same
    /// reader-watermark registry transactions use.
    pub fn snapshot(&self) -> Snapshot<V, E> {
        let read_ts = self.clock.current().raw();
        Snapshot::open(self.container.clone(), self.readers.clone(), read_ts)
    }

    pub fn begin_read(self: &Arc<Self>) -> CowReadTxn<V, E> {
        let read_ts = self.clock.current();
        self.readers.register(read_ts.raw());
        CowReadTxn {
            manager: self.clone(),
            read_ts,
            finished: false,
        }
    }

    pub fn begin_write(self: &Arc<Self>) -> StorageResult<CowWriteTxn<V, E>> {
        if self.writer_active.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_err() {
            return Err(StorageError::WriterBusy);
        }
        let read_ts = self.clock.current();
        self.readers.register(read_ts.raw());
        Ok(CowWriteTxn {
            manager: self.clone(),
            read_ts,
            pending: Vec::new(),
            finished: false,
        })
    }

    pub fn watermark(&self) -> u64 {
        self.readers.watermark(self.clock.current().raw())
    }
}

pub struct CowReadTxn<V, E> {
    manager: Arc<CowManager<V, E>>,
    read_ts: Timestamp,
    finished: bool,
}

impl<V: VertexIndex<E>, E: EdgeIndex> CowReadTxn<V, E> {
    pub fn has_vertex(&self, id: u64) -> bool {
        self.manager.container.has_vertex(id, self.read_ts.raw())
    }

    pub fn has_edge(&self, src: u64, dest: u64) -> StorageResult<bool> {
        self.manager.container.has_edge(src, dest, self.read_ts.raw())
    }

    pub fn degree(&self, id: u64) -> StorageResult<usize> {
        self.manager.container.get_degree(id, self.read_ts.raw())
    }
}

impl<V, E> Drop for CowReadTxn<V, E> {
    fn drop(&mut self) {
        if !self.finished {
            self.finished = true;
            self.manager.readers.unregister(self.read_ts.raw());
        }
    }
}

pub struct CowWriteTxn<V, E> {
    manager: Arc<CowManager<V, E>>,
    read_ts: Timestamp,
    pending: Vec<WriteOp>,
    finished: bool,
}

impl<V: VertexIndex<E>, E: EdgeIndex> CowWriteTxn<V, E> {
    pub fn stage_insert_vertex(&mut self, id: u64) {
        self.pending.push(WriteOp::InsertVertex { id });
    }

    pub fn stage_insert_edge(&mut self, src: u64, dest: u64, weight: f64) {
        self.pending.push(WriteOp::InsertEdge { src, dest, weight });
    }

    pub fn stage_insert_edge_batch(&mut self, src: u64, edges: Vec<(u64, f64)>) {
        self.pending.push(WriteOp::InsertEdgeBatch { src, edges });
    }

    /// Stages a multi-source batch: `edges` is an arbitrary `(src, dest, weight)` list spanning
    /// any number of distinct sources. With only one writer ever active there's no lock order to
    /// track here; commit CSR-packs the whole batch and applies one run per source.
    pub fn stage_insert_edge_batch_multi(&mut self, edges: Vec<(u64, u64, f64)>) {
        self.pending.push(WriteOp::InsertEdgeBatchMulti { edges });
    }

    pub fn stage_remove_edge(&mut self, src: u64, dest: u64) {
        self.pending.push(WriteOp::RemoveEdge { src, dest });
    }
}

impl<V: VertexIndex<E>, E: EdgeIndex> Transaction for CowWriteTxn<V, E> {
    type Error = StorageError;

    fn read_ts(&self) -> Timestamp {
        self.read_ts
    }

    fn isolation_level(&self) -> IsolationLevel {
        IsolationLevel::Snapshot
    }

    fn commit(mut self) -> Result<Timestamp, Self::Error> {
        self.finished = true;
        let commit_ts = self.manager.clock.next();
        for op in &self.pending {
            op.apply(&self.manager.container, commit_ts.raw())?;
        }
        self.manager.readers.unregister(self.read_ts.raw());
        self.manager.writer_active.store(false, Ordering::Release);
        Ok(commit_ts)
    }

    fn abort(mut self) -> Result<(), Self::Error> {
        self.finished = true;
        self.manager.readers.unregister(self.read_ts.raw());
        self.manager.writer_active.store(false, Ordering::Release);
        Ok(())
    }
}

impl<V, E> Drop for CowWriteTxn<V, E> {
    fn drop(&mut self) {
        if !self.finished {
            self.finished = true;
            self.manager.readers.unregister(self.read_ts.raw());
            self.manager.writer_active.store(false, Ordering::Release);
        }
    }
}

#[cfg(test)]
mod tests {
    use graphbench_edge_index::SortedArray;

    use super::*;
    use crate::vertex_index::VectorIndex;

    type TestManager = CowManager<VectorIndex<SortedArray>, SortedArray>;

    #[test]
    fn second_concurrent_writer_is_rejected() {
        let mgr = TestManager::new(Arc::new(Container::new()));
        let _writer = mgr.begin_write().unwrap();
        assert!(matches!(mgr.begin_write(), Err(StorageError::WriterBusy)));
    }

    #[test]
    fn dropping_writer_without_commit_releases_the_gate() {
        let mgr = TestManager::new(Arc::new(Container::new()));
        {
            let _writer = mgr.begin_write().unwrap();
        }
        assert!(mgr.begin_write().is_ok());
    }

    #[test]
    fn multi_source_batch_commits_across_sources() {
        let mgr = TestManager::new(Arc::new(Container::new()));
        let mut writer = mgr.begin_write().unwrap();
        for id in 0..3 {
            writer.stage_insert_vertex(id);
        }
        writer.stage_insert_edge_batch_multi(vec![(2, 0, 0.0), (0, 1, 0.0), (0, 2, 0.0), (1, 2, 0.0)]);
        Transaction::commit(writer).unwrap();

        let reader = mgr.begin_read();
        assert_eq!(reader.degree(0).unwrap(), 2);
        assert_eq!(reader.degree(1).unwrap(), 1);
        assert_eq!(reader.degree(2).unwrap(), 1);
        assert!(reader.has_edge(0, 1).unwrap());
        assert!(reader.has_edge(2, 0).unwrap());
    }

    #[test]
    fn commit_is_visible_to_subsequent_readers_only() {
        let mgr = TestManager::new(Arc::new(Container::new()));
        let mut writer = mgr.begin_write().unwrap();
        writer.stage_insert_vertex(0);
        writer.stage_insert_vertex(1);
        writer.stage_insert_edge(0, 1, 1.0);
        let early_reader = mgr.begin_read();
        Transaction::commit(writer).unwrap();

        assert!(!early_reader.has_vertex(0));
        let later_reader = mgr.begin_read();
        assert!(later_reader.has_vertex(0));
        assert!(later_reader.has_edge(0, 1).unwrap());
    }
}
