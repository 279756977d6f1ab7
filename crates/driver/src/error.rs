use thiserror::Error;

pub type DriverResult<T> = Result<T, DriverError>;

#[derive(Error, Debug)]
pub enum DriverError {
    #[error(transparent)]
    Storage(#[from] graphbench_storage::StorageError),
    #[error(transparent)]
    Kernel(#[from] graphbench_kernels::KernelError),
    #[error("invalid operation type in target stream: {0:?}")]
    InvalidOperation(crate::config::OperationKind),
    /// Surfaced by an external workload-stream or config-file loader; this crate never produces
    /// it itself, since reading files is explicitly out of scope here.
    #[error("I/O error: {0}")]
    Io(String),
    /// Surfaced by an external config-file loader for a malformed `DriverConfig` record.
    #[error("configuration error: {0}")]
    Config(String),
}
