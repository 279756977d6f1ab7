//! A long-lived, read-only view pinned to one timestamp. Cheap to open under either transaction
//! manager: it just registers a read timestamp and borrows the shared `Container`, relying on
//! MVCC visibility rather than copying anything. Behind the `flat-snapshot` feature, `flatten`
//! additionally walks the whole graph once and materializes a plain adjacency map, trading the
//! open-time cost for O(1) repeated lookups — useful for a kernel that re-reads the same vertex
//! many times over a run that must not observe concurrent writes.

use std::sync::Arc;

use graphbench_edge_index::EdgeIndex;
#[cfg(feature = "flat-snapshot")]
use hashbrown::HashMap;

use crate::container::Container;
use crate::error::StorageResult;
use crate::reader_registry::ReaderRegistry;
use crate::vertex_index::VertexIndex;

pub struct Snapshot<V, E> {
    container: Arc<Container<V, E>>,
    readers: Option<Arc<ReaderRegistry>>,
    read_ts: u64,
    vertex_count: u64,
    edge_count: u64,
    finished: bool,
}

impl<V: VertexIndex<E>, E: EdgeIndex> Snapshot<V, E> {
    pub fn open(container: Arc<Container<V, E>>, readers: Arc<ReaderRegistry>, read_ts: u64) -> Self {
        readers.register(read_ts);
        let vertex_count = container.vertex_count();
        let edge_count = container.edge_count();
        Self {
            container,
            readers: Some(readers),
            read_ts,
            vertex_count,
            edge_count,
            finished: false,
        }
    }

    /// Builds a snapshot that does not participate in reader-watermark tracking. Intended for
    /// one-off reads against a container not owned by a transaction manager (tests, offline
    /// analysis of a container built outside the transactional path).
    pub fn detached(container: Arc<Container<V, E>>, read_ts: u64) -> Self {
        let vertex_count = container.vertex_count();
        let edge_count = container.edge_count();
        Self {
            container,
            readers: None,
            read_ts,
            vertex_count,
            edge_count,
            finished: false,
        }
    }

    pub fn read_ts(&self) -> u64 {
        self.read_ts
    }

    /// Vertex and edge counts as observed when the snapshot was opened. These do not move even if
    /// the live container keeps growing underneath — the graph's MVCC visibility already hides the
    /// newer vertices and edges from reads at `read_ts`, so this is just a cheap cached summary.
    pub fn vertex_count(&self) -> u64 {
        self.vertex_count
    }

    pub fn edge_count(&self) -> u64 {
        self.edge_count
    }

    pub fn has_vertex(&self, id: u64) -> bool {
        self.container.has_vertex(id, self.read_ts)
    }

    pub fn has_edge(&self, src: u64, dest: u64) -> StorageResult<bool> {
        self.container.has_edge(src, dest, self.read_ts)
    }

    pub fn degree(&self, id: u64) -> StorageResult<usize> {
        self.container.get_degree(id, self.read_ts)
    }

    pub fn edges<F>(&self, src: u64, cb: F) -> StorageResult<usize>
    where
        F: FnMut(u64, f64) -> bool,
    {
        self.container.edges(src, self.read_ts, cb)
    }

    pub fn intersect(&self, a: u64, b: u64) -> StorageResult<usize> {
        self.container.intersect(a, b, self.read_ts)
    }

    pub fn for_each_vertex(&self, f: &mut dyn FnMut(&crate::vertex::VertexEntry<E>)) {
        self.container.for_each_vertex(f);
    }

    #[cfg(feature = "flat-snapshot")]
    pub fn flatten(&self) -> FlatSnapshot {
        let mut adjacency = HashMap::new();
        self.container.for_each_vertex(&mut |v| {
            if !v.is_visible(self.read_ts) {
                return;
            }
            let mut out = Vec::new();
            v.edges(self.read_ts, |dest, weight| {
                out.push((dest, weight));
                true
            });
            adjacency.insert(v.id, out);
        });
        FlatSnapshot { adjacency }
    }
}

/// Cloning a snapshot registers a fresh occurrence of the same read timestamp, so the clone can
/// be handed to another thread (or outlive the original) and still unregister itself correctly on
/// drop — the reader registry is a multiset keyed by timestamp, not a single owning slot.
impl<V, E> Clone for Snapshot<V, E> {
    fn clone(&self) -> Self {
        if let Some(readers) = &self.readers {
            readers.register(self.read_ts);
        }
        Self {
            container: self.container.clone(),
            readers: self.readers.clone(),
            read_ts: self.read_ts,
            vertex_count: self.vertex_count,
            edge_count: self.edge_count,
            finished: false,
        }
    }
}

impl<V, E> Drop for Snapshot<V, E> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        if let Some(readers) = &self.readers {
            readers.unregister(self.read_ts);
        }
    }
}

/// A fully materialized adjacency map captured at one instant. Owns its data outright, so reading
/// it never touches the live container's locks again.
#[cfg(feature = "flat-snapshot")]
pub struct FlatSnapshot {
    adjacency: HashMap<u64, Vec<(u64, f64)>>,
}

#[cfg(feature = "flat-snapshot")]
impl FlatSnapshot {
    pub fn degree(&self, id: u64) -> usize {
        self.adjacency.get(&id).map_or(0, Vec::len)
    }

    pub fn neighbors(&self, id: u64) -> &[(u64, f64)] {
        self.adjacency.get(&id).map_or(&[], Vec::as_slice)
    }

    pub fn vertex_count(&self) -> usize {
        self.adjacency.len()
    }
}

#[cfg(test)]
mod tests {
    use graphbench_edge_index::SortedArray;

    use super::*;
    use crate::vertex_index::VectorIndex;

    type TestContainer = Container<VectorIndex<SortedArray>, SortedArray>;

    #[test]
    fn snapshot_counts_are_pinned_at_open_time() {
        let container = Arc::new(TestContainer::new());
        container.insert_vertex(0, 1).unwrap();
        container.insert_vertex(1, 1).unwrap();
        container.insert_edge(0, 1, 1.0, 1).unwrap();

        let readers = Arc::new(ReaderRegistry::new());
        let snap = Snapshot::open(container.clone(), readers.clone(), 1);
        assert_eq!(snap.vertex_count(), 2);
        assert_eq!(snap.edge_count(), 1);

        container.insert_vertex(2, 2).unwrap();
        assert_eq!(snap.vertex_count(), 2);
        assert!(!snap.has_vertex(2));
    }

    #[test]
    fn dropping_snapshot_unregisters_its_read_timestamp() {
        let container = Arc::new(TestContainer::new());
        let readers = Arc::new(ReaderRegistry::new());
        {
            let _snap = Snapshot::open(container.clone(), readers.clone(), 5);
            assert_eq!(readers.open_count(), 1);
        }
        assert_eq!(readers.open_count(), 0);
    }

    #[test]
    fn clone_registers_its_own_occurrence_of_the_read_timestamp() {
        let container = Arc::new(TestContainer::new());
        let readers = Arc::new(ReaderRegistry::new());
        let snap = Snapshot::open(container, readers.clone(), 5);
        let clone = snap.clone();
        assert_eq!(readers.open_count(), 1, "same timestamp, still one multiset slot");

        drop(snap);
        assert_eq!(readers.open_count(), 1, "the clone still holds the timestamp open");
        drop(clone);
        assert_eq!(readers.open_count(), 0);
    }

    #[cfg(feature = "flat-snapshot")]
    #[test]
    fn flatten_materializes_visible_adjacency() {
        let container = Arc::new(TestContainer::new());
        container.insert_vertex(0, 1).unwrap();
        container.insert_vertex(1, 1).unwrap();
        container.insert_edge(0, 1, 3.0, 1).unwrap();

        let snap = Snapshot::detached(container, 1);
        let flat = snap.flatten();
        assert_eq!(flat.degree(0), 1);
        assert_eq!(flat.neighbors(0), &[(1, 3.0)]);
        assert_eq!(flat.vertex_count(), 2);
    }
}
