//! Five interchangeable neighbor-list containers behind one [`EdgeIndex`] capability: a plain
//! [`SortedArray`], a [`Pma`] (Packed Memory Array), a [`SkipListIndex`] of fixed-capacity
//! blocks, an append-only [`LogBlock`] guarded by a Bloom filter, and a copy-on-write
//! [`PamIndex`]. Callers pick one variant and are generic over `EdgeIndex`, so the choice is
//! resolved at compile time rather than through dynamic dispatch.

pub mod capability;
pub mod entry;
pub mod error;
pub mod log_block;
pub mod pam;
pub mod pma;
pub mod skiplist;
pub mod sorted_array;

pub use capability::EdgeIndex;
pub use entry::{BeginEndEntry, VersionChainEntry, INVALID_DEST};
pub use error::{EdgeIndexError, EdgeIndexResult};
pub use log_block::LogBlock;
pub use pam::PamIndex;
pub use pma::Pma;
pub use skiplist::SkipListIndex;
pub use sorted_array::SortedArray;
