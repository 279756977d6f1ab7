//! Timestamp type shared by the container/transaction layer and the driver.
//!
//! A `Timestamp` is a 64-bit monotonically increasing scalar assigned by a container on write
//! commit. Readers snapshot the current value when they open a transaction. The all-ones value
//! is reserved to mean "still live" (an edge/degree-chain entry that has not been superseded) or,
//! when used as a read bound, "read the latest state".

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// A commit timestamp or a snapshot read-bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Sentinel meaning "still live" (chain head) or "no upper bound" when read as a bound.
    pub const INFINITE: Timestamp = Timestamp(u64::MAX);

    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> u64 {
        self.0
    }

    pub const fn is_infinite(&self) -> bool {
        self.0 == u64::MAX
    }
}

impl From<u64> for Timestamp {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// Global, monotonically increasing timestamp counter owned by a single container.
///
/// Writers call [`next`](Self::next) exactly once per commit (a plain `fetch_add`, not a CAS
/// retry loop: assigning the next timestamp never needs to see what another concurrent commit
/// assigned, so there's nothing to retry on). Under the 2PL manager, commits touching disjoint
/// vertices run their per-vertex locking fully concurrently and do contend on this counter for the
/// instant each takes to fetch-add it; under COW, the single-writer gate means at most one commit
/// ever reaches `next` at a time.
#[derive(Debug, Default)]
pub struct TimestampCounter {
    counter: AtomicU64,
}

impl TimestampCounter {
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
        }
    }

    /// Returns the current timestamp without advancing it.
    pub fn current(&self) -> Timestamp {
        Timestamp(self.counter.load(Ordering::Acquire))
    }

    /// Atomically advances the counter and returns the newly assigned timestamp.
    pub fn next(&self) -> Timestamp {
        Timestamp(self.counter.fetch_add(1, Ordering::AcqRel) + 1)
    }
}
