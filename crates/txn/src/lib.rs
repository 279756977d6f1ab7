//! Shared MVCC transaction primitives used by both the container/transaction layer
//! (`graphbench-storage`) and the workload driver (`graphbench-driver`).

pub mod error;
pub mod timestamp;
pub mod transaction;

pub use error::TxnError;
pub use timestamp::{Timestamp, TimestampCounter};
pub use transaction::{IsolationLevel, Transaction};
