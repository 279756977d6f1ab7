//! Transaction trait shared across the 2PL and COW transaction managers.

use serde::{Deserialize, Serialize};

use crate::Timestamp;

/// Snapshot vs. serializable isolation. The container's default write transaction always
/// produces a serializable history because the 2PL commit path holds every required lock before
/// assigning a commit timestamp; `Snapshot` exists for the COW manager, whose single-writer gate
/// makes the distinction moot but which still reports it for API symmetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IsolationLevel {
    Snapshot,
    Serializable,
}

/// Operations common to both the 2PL and COW transaction implementations.
pub trait Transaction {
    type Error;

    /// The timestamp this transaction reads at (readers) or was assigned at (writers, once
    /// committed).
    fn read_ts(&self) -> Timestamp;

    fn isolation_level(&self) -> IsolationLevel;

    /// Commit the transaction, returning the assigned commit timestamp.
    fn commit(self) -> Result<Timestamp, Self::Error>;

    /// Abort the transaction, discarding any buffered writes.
    fn abort(self) -> Result<(), Self::Error>;
}
