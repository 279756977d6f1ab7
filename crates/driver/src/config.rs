//! Plain, `serde`-derivable records describing a workload run. Populating a `DriverConfig` from
//! a TOML/JSON file on disk, and generating the `Operation` streams it references by path, are
//! external collaborators — this crate only defines the shapes and consumes them in memory.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The kind of thing one `Operation` record asks the store to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    Insert,
    Delete,
    GetVertex,
    GetEdge,
    GetWeight,
    GetNeighbor,
    ScanNeighbor,
}

/// A single replayable unit of work: a source/destination/weight triple tagged with what to do
/// with it. Unused fields for a given `kind` (e.g. `weight` on a `GetVertex` lookup) are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub kind: OperationKind,
    pub source: u64,
    pub destination: u64,
    pub weight: f64,
}

impl Operation {
    pub fn insert(source: u64, destination: u64, weight: f64) -> Self {
        Self {
            kind: OperationKind::Insert,
            source,
            destination,
            weight,
        }
    }

    pub fn delete(source: u64, destination: u64) -> Self {
        Self {
            kind: OperationKind::Delete,
            source,
            destination,
            weight: 0.0,
        }
    }
}

/// Which graph kernel a query-style workload run should execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KernelKind {
    Bfs,
    Sssp,
    PageRank,
    Wcc,
    Tc,
    TcOpt,
}

/// Tags which pre-generated variant of a target stream a workload or its checkpoint output
/// corresponds to; purely a label carried through to file naming by the (external) stream
/// generator and output writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetStreamType {
    General,
    Skewed,
}

/// One reader or writer lane within a [`WorkloadKind::Concurrent`] run: how many threads replay
/// `target_stream_type`'s stream, and with what operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcurrentWorkloadSpec {
    pub workload_type: OperationKind,
    pub target_stream_type: TargetStreamType,
    pub num_threads: usize,
}

/// Configuration for one driver run. `workload_dir`/`output_dir` are carried only as typed
/// `PathBuf`s for an external loader/writer's use — this crate never opens them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    pub workload_dir: PathBuf,
    pub output_dir: PathBuf,

    pub insert_delete_num_threads: usize,
    pub insert_delete_checkpoint_size: usize,
    pub insert_batch_size: usize,

    pub update_num_threads: usize,
    pub update_checkpoint_size: usize,
    pub update_repeat_times: usize,

    pub microbenchmark_num_threads: Vec<usize>,
    pub mb_checkpoint_size: usize,
    pub mb_operation_types: Vec<OperationKind>,
    pub mb_ts_types: Vec<TargetStreamType>,
    pub repeat_times: usize,

    pub writer_threads: usize,
    pub reader_threads: usize,

    pub num_threads_search: usize,
    pub num_threads_scan: usize,

    pub concurrent_workloads: Vec<ConcurrentWorkloadSpec>,

    pub query_num_threads: Vec<usize>,
    pub query_kernels: Vec<KernelKind>,

    pub bfs_source: u64,
    pub sssp_source: u64,
    pub damping_factor: f64,
    pub num_iterations: usize,
    pub checkpoint_every: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            workload_dir: PathBuf::new(),
            output_dir: PathBuf::new(),
            insert_delete_num_threads: 1,
            insert_delete_checkpoint_size: usize::MAX,
            insert_batch_size: 1024,
            update_num_threads: 1,
            update_checkpoint_size: usize::MAX,
            update_repeat_times: 1,
            microbenchmark_num_threads: vec![1],
            mb_checkpoint_size: usize::MAX,
            mb_operation_types: Vec::new(),
            mb_ts_types: vec![TargetStreamType::General],
            repeat_times: 0,
            writer_threads: 1,
            reader_threads: 1,
            num_threads_search: 1,
            num_threads_scan: 1,
            concurrent_workloads: Vec::new(),
            query_num_threads: vec![1],
            query_kernels: Vec::new(),
            bfs_source: 0,
            sssp_source: 0,
            damping_factor: 0.85,
            num_iterations: 20,
            checkpoint_every: usize::MAX,
        }
    }
}
