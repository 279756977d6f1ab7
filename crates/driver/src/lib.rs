//! Workload driver: a thread-pool harness that replays pre-generated [`Operation`] streams
//! against a [`graphbench_storage::TwoPhaseLockManager`] and reports per-thread throughput. Each
//! `execute_*` method mirrors one workload shape from the original benchmark harness; none of
//! them read or write a file themselves, since file I/O and the CLI that would drive this crate
//! from `DriverConfig` records on disk are out of scope here.

pub mod config;
pub mod error;
pub mod workload;

pub use config::{ConcurrentWorkloadSpec, DriverConfig, KernelKind, Operation, OperationKind, TargetStreamType};
pub use error::{DriverError, DriverResult};
pub use workload::{Checkpointer, ThreadReport, WorkerChunk, WorkloadReport};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use graphbench_edge_index::EdgeIndex;
use graphbench_kernels::{bfs, pagerank, sssp, tc, wcc};
use graphbench_storage::{Snapshot, TwoPhaseLockManager, VertexIndex};
use graphbench_txn::Transaction;

/// Drives workloads against one shared graph. Generic over the vertex-index and edge-index
/// variants the same way `Container` is, so a driver can be instantiated over whichever
/// combination a benchmark run wants to measure.
pub struct Driver<V, E> {
    manager: Arc<TwoPhaseLockManager<V, E>>,
    config: DriverConfig,
}

impl<V, E> Driver<V, E>
where
    V: VertexIndex<E> + Send + Sync,
    E: EdgeIndex + Send + Sync,
{
    pub fn new(manager: Arc<TwoPhaseLockManager<V, E>>, config: DriverConfig) -> Self {
        Self { manager, config }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Replays `ops` (a mix of `Insert`/`Delete`) across `self.config.insert_delete_num_threads`
    /// threads, each owning a disjoint slice of the stream and committing one transaction per
    /// operation.
    pub fn execute_insert_delete(&self, ops: &[Operation]) -> WorkloadReport {
        let checkpoint_every = self.config.insert_delete_checkpoint_size;
        workload::run_chunked(ops.len(), self.config.insert_delete_num_threads, checkpoint_every, |chunk| {
            let mut checkpointer = Checkpointer::new(checkpoint_every);
            let mut errors = Vec::new();
            for op in &ops[chunk.start..chunk.end] {
                if let Err(e) = self.apply_single(op) {
                    errors.push(e);
                }
                checkpointer.tick();
            }
            (chunk.len(), errors)
        })
    }

    /// Replays `batches` (each a source vertex plus a run of destination/weight pairs) using
    /// `insert_edge_batch`, one transaction per batch rather than per edge.
    pub fn execute_batch_insert(&self, batches: &[(u64, Vec<(u64, f64)>)]) -> WorkloadReport {
        let checkpoint_every = self.config.insert_delete_checkpoint_size;
        let batch_size = self.config.insert_batch_size.max(1);
        workload::run_chunked(batches.len(), self.config.insert_delete_num_threads, checkpoint_every, |chunk| {
            let mut checkpointer = Checkpointer::new(checkpoint_every);
            let mut errors = Vec::new();
            for (src, edges) in &batches[chunk.start..chunk.end] {
                for group in edges.chunks(batch_size) {
                    let mut txn = self.manager.begin();
                    txn.stage_insert_edge_batch(*src, group.to_vec());
                    if let Err(e) = Transaction::commit(txn) {
                        errors.push(DriverError::from(e));
                    }
                }
                checkpointer.tick();
            }
            (chunk.len(), errors)
        })
    }

    /// Replays `ops` (weight-update-only insert edges, re-inserting the same endpoints with a
    /// fresh weight) `repeat_times` times over, to stress the version chains the MVCC index
    /// builds up under repeated overwrites of the same edge.
    pub fn execute_update(&self, ops: &[Operation]) -> WorkloadReport {
        let checkpoint_every = self.config.update_checkpoint_size;
        let repeat_times = self.config.update_repeat_times.max(1);
        workload::run_chunked(ops.len(), self.config.update_num_threads, checkpoint_every, |chunk| {
            let mut checkpointer = Checkpointer::new(checkpoint_every);
            let mut errors = Vec::new();
            for _ in 0..repeat_times {
                for op in &ops[chunk.start..chunk.end] {
                    if let Err(e) = self.apply_single(op) {
                        errors.push(e);
                    }
                    checkpointer.tick();
                }
            }
            (chunk.len() * repeat_times, errors)
        })
    }

    /// Replays one operation type in isolation across each thread count in
    /// `self.config.microbenchmark_num_threads`, returning one report per thread count. Read-only,
    /// so each worker thread opens its own snapshot once up front (cloned once off the manager's
    /// handle) and reads through it for every op in its chunk, rather than paying a fresh
    /// snapshot-open per op.
    pub fn execute_microbenchmarks(&self, ops: &[Operation], op_type: OperationKind) -> Vec<WorkloadReport> {
        let filtered: Vec<Operation> = ops.iter().copied().filter(|op| op.kind == op_type).collect();
        let checkpoint_every = self.config.mb_checkpoint_size;
        self.config
            .microbenchmark_num_threads
            .iter()
            .map(|&num_threads| {
                workload::run_chunked(filtered.len(), num_threads, checkpoint_every, |chunk| {
                    let snapshot = self.manager.snapshot().clone();
                    let mut checkpointer = Checkpointer::new(checkpoint_every);
                    let mut errors = Vec::new();
                    for op in &filtered[chunk.start..chunk.end] {
                        if let Err(e) = self.apply_or_read(&snapshot, op) {
                            errors.push(e);
                        }
                        checkpointer.tick();
                    }
                    (chunk.len(), errors)
                })
            })
            .collect()
    }

    /// Runs every spec in `self.config.concurrent_workloads` as its own lane of threads, all
    /// against the same live graph at once, and returns one report per spec in the same order.
    /// Every thread opens the same shared snapshot, taken once before any lane starts, so a
    /// reader lane never observes a write one of the other lanes commits mid-run.
    pub fn execute_concurrent(&self, streams: &[Vec<Operation>]) -> Vec<WorkloadReport> {
        assert_eq!(streams.len(), self.config.concurrent_workloads.len());
        let snapshot = self.manager.snapshot();
        std::thread::scope(|scope| {
            let handles: Vec<_> = self
                .config
                .concurrent_workloads
                .iter()
                .zip(streams)
                .map(|(spec, ops)| {
                    let snapshot = snapshot.clone();
                    scope.spawn(move || {
                        workload::run_chunked(ops.len(), spec.num_threads, self.config.checkpoint_every, |chunk| {
                            let mut errors = Vec::new();
                            for op in &ops[chunk.start..chunk.end] {
                                if let Err(e) = self.apply_or_read(&snapshot, op) {
                                    errors.push(e);
                                }
                            }
                            (chunk.len(), errors)
                        })
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().expect("concurrent lane panicked")).collect()
        })
    }

    /// Splits `self.config.writer_threads` write-capable threads and `self.config.reader_threads`
    /// read-only threads over one run: writers replay `write_ops` (`Insert`/`Delete`) while
    /// readers each clone the one snapshot taken at the start and loop running PageRank over it,
    /// timing each iteration, until the writer lane finishes — so both contend for the same
    /// container concurrently and the reader throughput reflects PageRank's cost under live
    /// writes rather than a fixed op count.
    pub fn execute_mixed_reader_writer(&self, write_ops: &[Operation]) -> (WorkloadReport, WorkloadReport) {
        let writers_done = AtomicBool::new(false);
        let snapshot = self.manager.snapshot();
        std::thread::scope(|scope| {
            let writer_handle = scope.spawn(|| {
                let report =
                    workload::run_chunked(write_ops.len(), self.config.writer_threads, self.config.checkpoint_every, |chunk| {
                        let mut errors = Vec::new();
                        for op in &write_ops[chunk.start..chunk.end] {
                            if let Err(e) = self.apply_single(op) {
                                errors.push(e);
                            }
                        }
                        (chunk.len(), errors)
                    });
                writers_done.store(true, Ordering::Release);
                report
            });

            let reader_handles: Vec<_> = (0..self.config.reader_threads)
                .map(|idx| {
                    let snapshot = snapshot.clone();
                    scope.spawn(move || {
                        let start = std::time::Instant::now();
                        let mut checkpoints = Vec::new();
                        let mut errors = Vec::new();
                        let mut iterations = 0usize;
                        while !writers_done.load(Ordering::Acquire) {
                            let iter_start = std::time::Instant::now();
                            if let Err(e) = pagerank::pagerank(&snapshot, self.config.damping_factor, self.config.num_iterations) {
                                errors.push(DriverError::from(e));
                            }
                            iterations += 1;
                            checkpoints.push(iter_start.elapsed().as_nanos());
                        }
                        ThreadReport {
                            elapsed_nanos: start.elapsed().as_nanos(),
                            checkpoints,
                            item_count: iterations,
                            errors,
                            core_hint: Some(idx),
                        }
                    })
                })
                .collect();

            let writer_report = writer_handle.join().expect("writer lane panicked");
            let reader_reports: Vec<ThreadReport> =
                reader_handles.into_iter().map(|h| h.join().expect("reader lane panicked")).collect();
            (writer_report, WorkloadReport::from_thread_reports(reader_reports))
        })
    }

    /// Quality-of-service style run: a point-lookup (`search`) stream and a neighbor-scan
    /// (`scan`) stream replayed concurrently at their own configured thread counts against one
    /// snapshot shared by both lanes, so scan throughput under search contention (and vice versa)
    /// can be measured without either lane's reads drifting onto a different graph version.
    pub fn execute_qos(&self, search_ops: &[Operation], scan_ops: &[Operation]) -> (WorkloadReport, WorkloadReport) {
        let snapshot = self.manager.snapshot();
        std::thread::scope(|scope| {
            let search_handle = scope.spawn(|| {
                let snapshot = snapshot.clone();
                workload::run_chunked(search_ops.len(), self.config.num_threads_search, 0, |chunk| {
                    let mut errors = Vec::new();
                    for op in &search_ops[chunk.start..chunk.end] {
                        if let Err(e) = self.apply_or_read(&snapshot, op) {
                            errors.push(e);
                        }
                    }
                    (chunk.len(), errors)
                })
            });
            let scan_handle = scope.spawn(|| {
                let snapshot = snapshot.clone();
                workload::run_chunked(scan_ops.len(), self.config.num_threads_scan, 0, |chunk| {
                    let mut errors = Vec::new();
                    for op in &scan_ops[chunk.start..chunk.end] {
                        if let Err(e) = self.apply_or_read(&snapshot, op) {
                            errors.push(e);
                        }
                    }
                    (chunk.len(), errors)
                })
            });
            (
                search_handle.join().expect("search lane panicked"),
                scan_handle.join().expect("scan lane panicked"),
            )
        })
    }

    /// Runs every kernel named in `self.config.query_kernels`, once per thread count in
    /// `self.config.query_num_threads`. Each run opens one snapshot and replays the kernel
    /// concurrently from that many threads against it, to measure query throughput under
    /// concurrent load rather than single-shot latency.
    pub fn execute_query(&self) -> Vec<DriverResult<(WorkloadReport, QueryResult)>> {
        self.config
            .query_kernels
            .iter()
            .flat_map(|&kernel| self.config.query_num_threads.iter().map(move |&num_threads| (kernel, num_threads)))
            .map(|(kernel, num_threads)| self.run_kernel(kernel, num_threads))
            .collect()
    }

    /// Runs `kernel` against one shared snapshot concurrently from `num_threads` threads, to
    /// measure query throughput under concurrent load rather than single-shot latency. Every
    /// thread computes the same deterministic result from the same immutable snapshot; the first
    /// one is kept and the rest discarded once all have finished.
    fn run_kernel(&self, kernel: KernelKind, num_threads: usize) -> DriverResult<(WorkloadReport, QueryResult)> {
        let num_threads = num_threads.max(1);
        let snapshot = self.manager.snapshot();
        let results: Vec<(ThreadReport, DriverResult<QueryResult>)> = std::thread::scope(|scope| {
            (0..num_threads)
                .map(|idx| {
                    scope.spawn(move || {
                        let start = std::time::Instant::now();
                        let outcome = self.run_kernel_once(kernel, &snapshot);
                        let elapsed_nanos = start.elapsed().as_nanos();
                        let report = ThreadReport {
                            elapsed_nanos,
                            checkpoints: Vec::new(),
                            item_count: 1,
                            errors: Vec::new(),
                            core_hint: Some(idx),
                        };
                        (report, outcome)
                    })
                })
                .collect::<Vec<_>>()
                .into_iter()
                .map(|h| h.join().expect("query thread panicked"))
                .collect()
        });
        let (reports, outcomes): (Vec<ThreadReport>, Vec<DriverResult<QueryResult>>) = results.into_iter().unzip();
        let report = WorkloadReport::from_thread_reports(reports);
        let first_result = outcomes.into_iter().next().expect("num_threads is always at least 1")?;
        Ok((report, first_result))
    }

    fn run_kernel_once(&self, kernel: KernelKind, snapshot: &Snapshot<V, E>) -> DriverResult<QueryResult> {
        Ok(match kernel {
            KernelKind::Bfs => QueryResult::Distances(bfs::bfs(snapshot, self.config.bfs_source)?),
            KernelKind::Sssp => QueryResult::Weights(sssp::sssp(snapshot, self.config.sssp_source)?),
            KernelKind::PageRank => {
                QueryResult::Weights(pagerank::pagerank(snapshot, self.config.damping_factor, self.config.num_iterations)?)
            }
            KernelKind::Wcc => QueryResult::Components(wcc::wcc(snapshot)?),
            KernelKind::Tc => QueryResult::TriangleCount(tc::count_via_intersect(snapshot)?),
            KernelKind::TcOpt => QueryResult::TriangleCount(tc::count_via_merge(snapshot)?),
        })
    }

    fn apply_single(&self, op: &Operation) -> DriverResult<()> {
        let mut txn = self.manager.begin();
        match op.kind {
            OperationKind::Insert => txn.stage_insert_edge(op.source, op.destination, op.weight),
            OperationKind::Delete => txn.stage_remove_edge(op.source, op.destination),
            other => return Err(DriverError::InvalidOperation(other)),
        }
        Transaction::commit(txn)?;
        Ok(())
    }

    /// Dispatches a read-kind op against an already-open `snapshot` (an `Insert`/`Delete` op still
    /// goes through its own short-lived transaction, since a snapshot can't write). Shared by every
    /// workload that reuses one snapshot across a thread's whole chunk instead of opening a fresh
    /// read transaction per op.
    fn apply_or_read(&self, snapshot: &Snapshot<V, E>, op: &Operation) -> DriverResult<()> {
        match op.kind {
            OperationKind::Insert | OperationKind::Delete => self.apply_single(op),
            OperationKind::GetVertex => {
                snapshot.has_vertex(op.source);
                Ok(())
            }
            OperationKind::GetEdge | OperationKind::GetWeight => {
                snapshot.has_edge(op.source, op.destination)?;
                Ok(())
            }
            OperationKind::GetNeighbor => {
                snapshot.degree(op.source)?;
                Ok(())
            }
            OperationKind::ScanNeighbor => {
                snapshot.edges(op.source, |_, _| true)?;
                Ok(())
            }
        }
    }
}

/// What one kernel invocation from [`Driver::execute_query`] produced. Triangle counting and PageRank
/// return scalar-ish results; BFS/SSSP/WCC return one value per vertex.
#[derive(Debug, Clone)]
pub enum QueryResult {
    Distances(Vec<usize>),
    Weights(Vec<f64>),
    Components(Vec<u64>),
    TriangleCount(u64),
}
