//! MVCC graph storage: a `Container` generic over vertex-index and edge-index variants, plus two
//! interchangeable transaction managers (two-phase-locked and copy-on-write single-writer) and a
//! read-only `Snapshot` view, all sharing the same reader-watermark-driven reclamation scheme.

pub mod container;
pub mod cow_manager;
pub mod error;
pub mod reader_registry;
pub mod snapshot;
pub mod txn_manager;
pub mod vertex;
pub mod vertex_index;

pub use container::Container;
pub use cow_manager::{CowManager, CowReadTxn, CowWriteTxn};
pub use error::{StorageError, StorageResult};
pub use reader_registry::ReaderRegistry;
pub use snapshot::Snapshot;
#[cfg(feature = "flat-snapshot")]
pub use snapshot::FlatSnapshot;
pub use txn_manager::{TwoPhaseLockManager, TwoPhaseLockTxn};
pub use vertex::{VertexEntry, INDEX_LOCK};
pub use vertex_index::{CowIndex, VectorIndex, VertexIndex};
