//! A vertex slot: a vertex id plus the adjacency container backing its out-edges, generic over
//! whichever [`EdgeIndex`] variant the container was built with.

use std::sync::Arc;

use graphbench_edge_index::{EdgeIndex, EdgeIndexResult};
use parking_lot::RwLock;

/// Sentinel vertex id meaning "the vertex index itself" rather than any single vertex's
/// adjacency — the lock a writer takes when admitting a brand new vertex, since that mutates the
/// index's membership rather than an existing slot. Ascending lock order always sorts this last.
pub const INDEX_LOCK: u64 = u64::MAX;

/// `(timestamp, degree)` pairs, newest first, strictly decreasing timestamps. Lets `degree(t)`
/// answer a point-in-time query in a short backward scan instead of re-walking the whole edge
/// index on every call; a reader pinned to an old snapshot still sees the out-degree as of its
/// own read timestamp rather than whatever the live vertex has grown to since.
#[derive(Debug)]
struct DegreeChain {
    entries: RwLock<Vec<(u64, u64)>>,
}

impl DegreeChain {
    fn new(created_at: u64) -> Self {
        Self {
            entries: RwLock::new(vec![(created_at, 0)]),
        }
    }

    fn degree_at(&self, t: u64) -> usize {
        let chain = self.entries.read();
        chain
            .iter()
            .find(|&&(ts, _)| ts <= t)
            .map_or(0, |&(_, d)| d as usize)
    }

    /// Records that the degree changed by `delta` as of `t`. Multiple changes landing at the same
    /// `t` (a batch insert applied under one commit timestamp) collapse into one chain entry.
    fn apply_delta(&self, t: u64, delta: i64) {
        let mut chain = self.entries.write();
        let current = chain.first().map_or(0, |&(_, d)| d as i64);
        let updated = (current + delta).max(0) as u64;
        match chain.first_mut() {
            Some((ts, d)) if *ts == t => *d = updated,
            _ => chain.insert(0, (t, updated)),
        }
    }

    /// Keeps every entry `>= safe_t` plus the newest entry `< safe_t` (if any), mirroring
    /// [`graphbench_edge_index::VersionChainEntry::gc`]'s reclamation rule.
    fn gc(&self, safe_t: u64) {
        let mut chain = self.entries.write();
        if chain.len() <= 1 {
            return;
        }
        let cut = chain.iter().position(|&(ts, _)| ts < safe_t).unwrap_or(chain.len());
        let keep = (cut + 1).min(chain.len());
        chain.truncate(keep);
    }
}

#[derive(Debug)]
pub struct VertexEntry<E> {
    pub id: u64,
    pub created_at: u64,
    edges: Arc<RwLock<E>>,
    degree_chain: DegreeChain,
}

impl<E: EdgeIndex> VertexEntry<E> {
    pub fn new(id: u64, created_at: u64) -> Self {
        Self {
            id,
            created_at,
            edges: Arc::new(RwLock::new(E::new())),
            degree_chain: DegreeChain::new(created_at),
        }
    }

    pub fn is_visible(&self, t: u64) -> bool {
        self.created_at <= t
    }

    pub fn degree(&self, t: u64) -> usize {
        self.degree_chain.degree_at(t)
    }

    pub fn has_edge(&self, dest: u64, t: u64) -> bool {
        self.edges.read().has_edge(dest, t)
    }

    pub fn insert_edge(&self, dest: u64, t: u64, weight: f64) -> EdgeIndexResult<bool> {
        let mut guard = self.edges.write();
        let created = guard.insert_edge(dest, t, weight)?;
        if created {
            self.degree_chain.apply_delta(t, 1);
        }
        Ok(created)
    }

    /// Optional capability: see [`EdgeIndex::remove_edge`].
    pub fn remove_edge(&self, dest: u64, t: u64) -> EdgeIndexResult<bool> {
        let mut guard = self.edges.write();
        let removed = guard.remove_edge(dest, t)?;
        if removed {
            self.degree_chain.apply_delta(t, -1);
        }
        Ok(removed)
    }

    pub fn insert_edge_batch(&self, edges_in: &[(u64, f64)], t: u64) -> EdgeIndexResult<usize> {
        let mut guard = self.edges.write();
        let created = guard.insert_edge_batch(edges_in, t)?;
        if created > 0 {
            self.degree_chain.apply_delta(t, created as i64);
        }
        Ok(created)
    }

    pub fn edges<F>(&self, t: u64, cb: F) -> usize
    where
        F: FnMut(u64, f64) -> bool,
    {
        self.edges.read().edges(t, cb)
    }

    pub fn intersect(&self, other: &Self, t: u64) -> usize {
        self.edges.read().intersect(&other.edges.read(), t)
    }

    pub fn gc(&self, safe_t: u64) {
        self.edges.write().gc(safe_t);
        self.degree_chain.gc(safe_t);
    }

    /// The `Arc`'d lock backing this vertex's out-edges, for a caller (the 2PL commit path) that
    /// needs to hold its own write guard across several ops rather than re-lock per call.
    pub fn edges_arc(&self) -> Arc<RwLock<E>> {
        self.edges.clone()
    }

    /// Same as [`Self::insert_edge`], but against an edge-index guard the caller already holds
    /// (acquired up front, in commit's ascending lock order) instead of locking `self.edges` again.
    pub fn apply_insert_edge_locked(&self, guard: &mut E, dest: u64, t: u64, weight: f64) -> EdgeIndexResult<bool> {
        let created = guard.insert_edge(dest, t, weight)?;
        if created {
            self.degree_chain.apply_delta(t, 1);
        }
        Ok(created)
    }

    pub fn apply_remove_edge_locked(&self, guard: &mut E, dest: u64, t: u64) -> EdgeIndexResult<bool> {
        let removed = guard.remove_edge(dest, t)?;
        if removed {
            self.degree_chain.apply_delta(t, -1);
        }
        Ok(removed)
    }

    pub fn apply_insert_edge_batch_locked(&self, guard: &mut E, edges_in: &[(u64, f64)], t: u64) -> EdgeIndexResult<usize> {
        let created = guard.insert_edge_batch(edges_in, t)?;
        if created > 0 {
            self.degree_chain.apply_delta(t, created as i64);
        }
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use graphbench_edge_index::SortedArray;

    use super::*;

    #[test]
    fn degree_reflects_point_in_time_not_current() {
        let v: VertexEntry<SortedArray> = VertexEntry::new(0, 1);
        assert_eq!(v.degree(1), 0);

        v.insert_edge(10, 2, 0.0).unwrap();
        v.insert_edge(11, 3, 0.0).unwrap();
        assert_eq!(v.degree(1), 0);
        assert_eq!(v.degree(2), 1);
        assert_eq!(v.degree(3), 2);
        assert_eq!(v.degree(100), 2);

        v.remove_edge(10, 4).unwrap();
        assert_eq!(v.degree(3), 2, "a reader pinned before the removal still sees it");
        assert_eq!(v.degree(4), 1);
    }

    #[test]
    fn batch_insert_collapses_into_one_chain_entry_at_shared_timestamp() {
        let v: VertexEntry<SortedArray> = VertexEntry::new(0, 1);
        v.insert_edge_batch(&[(1, 0.0), (2, 0.0), (3, 0.0)], 5).unwrap();
        assert_eq!(v.degree(4), 0);
        assert_eq!(v.degree(5), 3);
        assert_eq!(v.degree_chain.entries.read().len(), 2);
    }

    #[test]
    fn gc_drops_degree_history_older_than_safe_t() {
        let v: VertexEntry<SortedArray> = VertexEntry::new(0, 1);
        v.insert_edge(1, 2, 0.0).unwrap();
        v.insert_edge(2, 3, 0.0).unwrap();
        v.insert_edge(3, 4, 0.0).unwrap();
        assert_eq!(v.degree_chain.entries.read().len(), 4);

        v.gc(4);
        // keeps every entry >= 4 plus the newest entry below it (ts=3), dropping ts=1 and ts=2.
        assert_eq!(v.degree_chain.entries.read().len(), 2);
        assert_eq!(v.degree(4), 3);
        assert_eq!(v.degree(3), 2, "ts=3 is the newest surviving entry below the safe watermark");
    }
}
