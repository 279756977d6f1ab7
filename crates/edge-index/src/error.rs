use thiserror::Error;

pub type EdgeIndexResult<T> = Result<T, EdgeIndexError>;

#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum EdgeIndexError {
    /// `update_version` was asked to record a timestamp that does not come after the entry's
    /// current newest version — a write-skew signal.
    #[error("invalid timestamp order: newest={newest} attempted={attempted}")]
    InvalidTimestampOrder { newest: u64, attempted: u64 },
    /// This edge-index variant does not support the requested capability (e.g. edge removal).
    #[error("function not implemented by this edge-index variant: {0}")]
    FunctionNotImplemented(&'static str),
}
