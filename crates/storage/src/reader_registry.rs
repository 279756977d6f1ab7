//! Tracks the read timestamp of every open transaction (reader or writer) so the background
//! reclaimer can compute a watermark: the oldest timestamp any live transaction might still read
//! at. Versions strictly older than the watermark are unreachable and safe to garbage collect.

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_skiplist::SkipMap;

#[derive(Debug, Default)]
pub struct ReaderRegistry {
    /// read_ts -> number of open transactions currently reading at that timestamp.
    counts: SkipMap<u64, AtomicU64>,
}

impl ReaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, ts: u64) {
        self.counts
            .get_or_insert_with(ts, || AtomicU64::new(0))
            .value()
            .fetch_add(1, Ordering::AcqRel);
    }

    pub fn unregister(&self, ts: u64) {
        if let Some(entry) = self.counts.get(&ts) {
            if entry.value().fetch_sub(1, Ordering::AcqRel) == 1 {
                entry.remove();
            }
        }
    }

    /// The oldest outstanding read timestamp, or `fallback` (typically the current clock value)
    /// if there are no open transactions.
    pub fn watermark(&self, fallback: u64) -> u64 {
        self.counts.front().map(|e| *e.key()).unwrap_or(fallback)
    }

    pub fn open_count(&self) -> usize {
        self.counts.len()
    }
}
