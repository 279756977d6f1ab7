use thiserror::Error;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("vertex {0} already exists")]
    VertexExists(u64),
    #[error("vertex {0} does not exist")]
    VertexMissing(u64),
    #[error(transparent)]
    EdgeIndex(#[from] graphbench_edge_index::EdgeIndexError),
    #[error("another write transaction is already active")]
    WriterBusy,
    #[error("operation not implemented by this configuration: {0}")]
    FunctionNotImplemented(&'static str),
}
