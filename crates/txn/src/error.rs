use thiserror::Error;

#[derive(Error, Debug)]
pub enum TxnError {
    #[error("vertex {0} already exists")]
    VertexExists(u64),
    #[error("vertex {0} does not exist")]
    VertexMissing(u64),
    #[error("write reordering violation: timestamp {attempted} is not after newest {newest}")]
    InvalidTimestampOrder { newest: u64, attempted: u64 },
    #[error("operation not implemented by this edge-index/container variant: {0}")]
    FunctionNotImplemented(&'static str),
}
