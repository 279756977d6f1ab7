//! The edge entry: the unit every edge-index variant stores, orders, and versions.
//!
//! Four of the five variants (sorted array, PMA, skip list, PAM) use a *version-chain* entry:
//! a destination plus an ordered list of commit timestamps, newest first. The fifth (log block)
//! uses a *begin/end* entry instead, because it never mutates an existing physical record in
//! place — see [`BeginEndEntry`].

use crate::error::{EdgeIndexError, EdgeIndexResult};

/// Destination id sentinel meaning "invalid" / "no entry here".
pub const INVALID_DEST: u64 = u64::MAX;

/// A destination plus its MVCC version chain, newest timestamp first.
///
/// Invariant: `versions` is always non-empty and strictly decreasing.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionChainEntry {
    pub dest: u64,
    pub weight: f64,
    versions: Vec<u64>,
}

impl VersionChainEntry {
    pub fn new(dest: u64, weight: f64, created_at: u64) -> Self {
        Self {
            dest,
            weight,
            versions: vec![created_at],
        }
    }

    /// True iff any chain element is `<= t` (the newest element that has "happened" by `t`).
    pub fn check_version(&self, t: u64) -> bool {
        // versions is newest-first; the first element <= t is the visible one, so it suffices to
        // check whether the *oldest* (last) element is <= t, or scan for the first qualifying one.
        self.versions.iter().any(|&v| v <= t)
    }

    /// Returns the newest commit timestamp recorded for this entry.
    pub fn newest(&self) -> u64 {
        self.versions[0]
    }

    /// Prepends a new commit timestamp. Fails if `t` does not strictly follow the current
    /// newest version (a write-skew signal).
    pub fn update_version(&mut self, t: u64, weight: f64) -> EdgeIndexResult<()> {
        let newest = self.newest();
        if t <= newest {
            return Err(EdgeIndexError::InvalidTimestampOrder {
                newest,
                attempted: t,
            });
        }
        self.versions.insert(0, t);
        self.weight = weight;
        Ok(())
    }

    /// True iff this is the current (most recent) version as of `t`: equivalent to
    /// `check_version(t)` for a version-chain entry, since there is no separate "end" bound.
    pub fn is_newest_at(&self, t: u64) -> bool {
        self.newest() <= t
    }

    pub fn get_versions(&self, out: &mut Vec<u64>) {
        out.clear();
        out.extend_from_slice(&self.versions);
    }

    /// Keeps every version `>= safe_t` plus the newest version `< safe_t` (if any); drops the
    /// rest. This is the reclamation step run by the background GC task.
    pub fn gc(&mut self, safe_t: u64) {
        if self.versions.len() <= 1 {
            return;
        }
        let cut = self
            .versions
            .iter()
            .position(|&v| v < safe_t)
            .unwrap_or(self.versions.len());
        // Keep everything before `cut` (>= safe_t) plus the element at `cut` itself (the newest
        // version older than safe_t), if it exists.
        let keep = (cut + 1).min(self.versions.len());
        self.versions.truncate(keep);
    }

    #[cfg(test)]
    pub(crate) fn versions(&self) -> &[u64] {
        &self.versions
    }
}

/// A destination with a half-open `[begin, end)` visibility window, used by the log-block
/// variant. `end == u64::MAX` marks "current" (unbounded / still live).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeginEndEntry {
    pub dest: u64,
    pub weight: f64,
    pub begin: u64,
    pub end: u64,
}

impl BeginEndEntry {
    pub fn new(dest: u64, weight: f64, begin: u64) -> Self {
        Self {
            dest,
            weight,
            begin,
            end: u64::MAX,
        }
    }

    pub fn check_version(&self, t: u64) -> bool {
        self.begin <= t && t < self.end
    }

    pub fn is_newest_at(&self, t: u64) -> bool {
        self.begin <= t && self.end == u64::MAX
    }

    /// Closes this entry at `t`. Fails if the entry was already closed (`end != INFINITE`) or if
    /// `t` does not follow `begin` — a closed entry can never be reopened; a new entry must be
    /// inserted instead.
    pub fn update_version(&mut self, t: u64) -> EdgeIndexResult<()> {
        if self.end != u64::MAX {
            return Err(EdgeIndexError::InvalidTimestampOrder {
                newest: self.end,
                attempted: t,
            });
        }
        if t <= self.begin {
            return Err(EdgeIndexError::InvalidTimestampOrder {
                newest: self.begin,
                attempted: t,
            });
        }
        self.end = t;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_chain_visibility() {
        let mut e = VersionChainEntry::new(7, 1.0, 10);
        assert!(e.check_version(10));
        assert!(e.check_version(20));
        assert!(!e.check_version(5));

        e.update_version(20, 2.0).unwrap();
        assert_eq!(e.versions(), &[20, 10]);
        assert!(e.check_version(15)); // still visible via the ts=10 entry
        assert!(e.check_version(20));
    }

    #[test]
    fn version_chain_rejects_non_increasing() {
        let mut e = VersionChainEntry::new(7, 1.0, 10);
        assert_eq!(
            e.update_version(10, 2.0),
            Err(EdgeIndexError::InvalidTimestampOrder {
                newest: 10,
                attempted: 10
            })
        );
        assert_eq!(
            e.update_version(5, 2.0),
            Err(EdgeIndexError::InvalidTimestampOrder {
                newest: 10,
                attempted: 5
            })
        );
    }

    #[test]
    fn version_chain_gc_keeps_newest_before_safe_t() {
        let mut e = VersionChainEntry::new(1, 0.0, 5);
        e.update_version(10, 0.0).unwrap();
        e.update_version(15, 0.0).unwrap();
        e.update_version(20, 0.0).unwrap();
        // chain is [20, 15, 10, 5]; safe_t = 12 should keep [20, 15, 10]
        e.gc(12);
        assert_eq!(e.versions(), &[20, 15, 10]);

        // a safe_t above everything keeps only the newest entry below it... there is none below
        // 100 that isn't already kept, so gc keeps them all except entries strictly below the cut
        let mut e2 = VersionChainEntry::new(1, 0.0, 5);
        e2.update_version(10, 0.0).unwrap();
        e2.gc(100);
        assert_eq!(e2.versions(), &[10]);
    }

    #[test]
    fn begin_end_visibility_and_close() {
        let mut e = BeginEndEntry::new(3, 0.0, 10);
        assert!(e.check_version(10));
        assert!(e.check_version(50));
        assert!(!e.check_version(5));
        assert!(e.is_newest_at(50));

        e.update_version(20).unwrap();
        assert!(e.check_version(15));
        assert!(!e.check_version(20));
        assert!(!e.is_newest_at(15));

        assert!(e.update_version(25).is_err(), "closed entry cannot reopen");
    }
}
