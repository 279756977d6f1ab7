use thiserror::Error;

pub type KernelResult<T> = Result<T, KernelError>;

#[derive(Error, Debug)]
pub enum KernelError {
    #[error(transparent)]
    Storage(#[from] graphbench_storage::StorageError),
    #[error("pagerank requires at least one vertex")]
    EmptyGraph,
}
