//! The `EdgeIndex` capability: every neighbor-list container implements this same surface,
//! regardless of its internal data structure — a capability, not a class hierarchy. The
//! container (`graphbench-storage`) is generic over this trait rather than boxing a trait object,
//! so the hot iteration path is monomorphized per chosen variant.

use crate::error::EdgeIndexResult;

pub trait EdgeIndex: Sized + Send + Sync {
    /// Borrowed iterator over `(destination, weight)` pairs visible at a given timestamp, in the
    /// variant's natural order (ascending destination for every variant but log-block, which
    /// iterates in append order).
    type Iter<'a>: Iterator<Item = (u64, f64)>
    where
        Self: 'a;

    fn new() -> Self;

    /// `true` iff an edge to `dest` is visible at `t`.
    fn has_edge(&self, dest: u64, t: u64) -> bool;

    /// Inserts (or, if already present, revises the version of) an edge to `dest` with the given
    /// weight, committed at `t`. Returns `true` iff this created a brand new edge (a destination
    /// not previously present at any timestamp).
    fn insert_edge(&mut self, dest: u64, t: u64, weight: f64) -> EdgeIndexResult<bool>;

    /// Inserts a batch of (not necessarily sorted) `(dest, weight)` pairs committed at `t`.
    /// Returns the number of brand-new edges created (mirrors `insert_edge`'s return value,
    /// summed).
    fn insert_edge_batch(&mut self, edges: &[(u64, f64)], t: u64) -> EdgeIndexResult<usize>;

    /// Invokes `cb(dest, weight)` for every edge visible at `t`, stopping early if `cb` returns
    /// `false`. Returns the number of edges the callback was invoked on.
    fn edges<F>(&self, t: u64, cb: F) -> usize
    where
        F: FnMut(u64, f64) -> bool;

    /// Counts destinations visible at `t` that are present in both `self` and `other`.
    fn intersect(&self, other: &Self, t: u64) -> usize;

    /// A borrowing iterator equivalent to `edges` without a callback.
    fn iter(&self, t: u64) -> Self::Iter<'_>;

    /// Bulk-constructs an index from a (not necessarily sorted, not necessarily deduplicated)
    /// batch of edges, all committed at `t`. Equivalent to, but typically much faster than,
    /// `new()` followed by `insert_edge_batch`.
    fn init_bulk(edges: &[(u64, f64)], t: u64) -> Self;

    /// Trims version history no longer reachable by any reader at or after `safe_t`. Default
    /// no-op for variants without version chains to prune (none currently; provided for
    /// uniformity with the container's `gc_all`).
    fn gc(&mut self, safe_t: u64) {
        let _ = safe_t;
    }

    /// Optional capability: remove an edge outright. Variants that don't support it return
    /// `EdgeIndexError::FunctionNotImplemented`.
    fn remove_edge(&mut self, dest: u64, t: u64) -> EdgeIndexResult<bool> {
        let _ = (dest, t);
        Err(crate::error::EdgeIndexError::FunctionNotImplemented(
            "remove_edge",
        ))
    }
}
