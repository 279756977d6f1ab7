//! Thread-pool harness shared by every workload entry point: splitting a stream of operations
//! into near-equal chunks, spawning one `std::thread::Builder` thread per chunk (not a `rayon`
//! pool — the storage and transaction crates underneath carry no such dependency either, and the
//! point of each workload is to measure raw thread throughput rather than hand scheduling to a
//! work-stealing runtime), and folding the per-thread timing into one report.

use std::thread;
use std::time::Instant;

use crate::error::DriverError;

/// One thread's share of a larger item range: `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerChunk {
    pub start: usize,
    pub end: usize,
}

impl WorkerChunk {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Splits `len` items across `num_threads` chunks as evenly as possible. The first `len %
/// num_threads` chunks absorb the remainder, so no chunk differs from another by more than one
/// item.
pub fn split_into_chunks(len: usize, num_threads: usize) -> Vec<WorkerChunk> {
    if num_threads == 0 {
        return Vec::new();
    }
    let base = len / num_threads;
    let remainder = len % num_threads;
    let mut chunks = Vec::with_capacity(num_threads);
    let mut start = 0;
    for i in 0..num_threads {
        let size = base + if i < remainder { 1 } else { 0 };
        let end = start + size;
        chunks.push(WorkerChunk { start, end });
        start = end;
    }
    chunks
}

/// What one worker thread observed during its run: how long it took, how many items it got
/// through, checkpoints taken every `checkpoint_every` items (elapsed nanoseconds at that point),
/// any per-item errors it chose to record rather than abort on, and the advisory core hint it was
/// launched with.
#[derive(Debug, Default)]
pub struct ThreadReport {
    pub elapsed_nanos: u128,
    pub checkpoints: Vec<u128>,
    pub item_count: usize,
    pub errors: Vec<DriverError>,
    pub core_hint: Option<usize>,
}

/// The union of every worker thread's report for one workload run, plus the aggregate figures the
/// original driver computed from them.
#[derive(Debug, Default)]
pub struct WorkloadReport {
    pub thread_reports: Vec<ThreadReport>,
    /// Wall-clock span of the run, in nanoseconds, from spawning the first thread to joining the
    /// last.
    pub global_duration_nanos: u128,
    /// Total items processed across all threads, divided by `global_duration_nanos`.
    pub global_speed: f64,
    /// Mean of each thread's own `item_count / elapsed_nanos`, unweighted by thread duration.
    pub average_speed: f64,
}

impl WorkloadReport {
    /// Builds a report from per-thread data plus the wall-clock span measured from just before
    /// the first thread was spawned to just after the last thread was joined — not simply the
    /// slowest thread's own elapsed time, since spawn/join overhead and thread-start skew both
    /// count against the run as a whole.
    pub fn new(thread_reports: Vec<ThreadReport>, global_duration_nanos: u128) -> Self {
        let total_items: usize = thread_reports.iter().map(|r| r.item_count).sum();
        let global_speed = if global_duration_nanos > 0 {
            total_items as f64 / (global_duration_nanos as f64 / 1e9)
        } else {
            0.0
        };
        let per_thread_speeds: Vec<f64> = thread_reports
            .iter()
            .filter(|r| r.elapsed_nanos > 0)
            .map(|r| r.item_count as f64 / (r.elapsed_nanos as f64 / 1e9))
            .collect();
        let average_speed = if per_thread_speeds.is_empty() {
            0.0
        } else {
            per_thread_speeds.iter().sum::<f64>() / per_thread_speeds.len() as f64
        };
        Self {
            thread_reports,
            global_duration_nanos,
            global_speed,
            average_speed,
        }
    }

    /// Convenience constructor for callers (tests, `execute_query`'s per-thread kernel fan-out)
    /// with only per-thread timings to hand: takes the slowest thread's elapsed time as the
    /// global duration, which is exact when every thread was spawned at essentially the same
    /// instant.
    pub fn from_thread_reports(thread_reports: Vec<ThreadReport>) -> Self {
        let global_duration_nanos = thread_reports.iter().map(|r| r.elapsed_nanos).max().unwrap_or(0);
        Self::new(thread_reports, global_duration_nanos)
    }
}

/// Runs `body` once per chunk of `[0, len)` on its own thread and folds the per-thread timings
/// into one [`WorkloadReport`]. `body` returns the number of items it actually processed and any
/// per-item errors it chose to record rather than abort on; checkpoints are reconstructed
/// afterward from `checkpoint_every` and the thread's total elapsed time (see
/// [`checkpoints_for`]). Callers that need checkpoints recorded at the exact moment each item
/// completes should use [`Checkpointer`] inside `body` instead and ignore the checkpoints this
/// function derives.
pub fn run_chunked<F>(len: usize, num_threads: usize, checkpoint_every: usize, body: F) -> WorkloadReport
where
    F: Fn(WorkerChunk) -> (usize, Vec<DriverError>) + Sync,
{
    let available_parallelism = thread::available_parallelism().map(std::num::NonZeroUsize::get).unwrap_or(1);
    let chunks = split_into_chunks(len, num_threads);
    let wall_clock_start = Instant::now();
    let reports: Vec<ThreadReport> = thread::scope(|scope| {
        let handles: Vec<_> = chunks
            .into_iter()
            .enumerate()
            .map(|(idx, chunk)| {
                let body = &body;
                thread::Builder::new()
                    .name(format!("graphbench-worker-{idx}"))
                    .spawn_scoped(scope, move || {
                        let start = Instant::now();
                        let (item_count, errors) = body(chunk);
                        let elapsed_nanos = start.elapsed().as_nanos();
                        ThreadReport {
                            elapsed_nanos,
                            checkpoints: checkpoints_for(item_count, checkpoint_every, elapsed_nanos),
                            item_count,
                            errors,
                            core_hint: Some(idx % available_parallelism),
                        }
                    })
                    .expect("failed to spawn worker thread")
            })
            .collect();
        handles.into_iter().map(|h| h.join().expect("worker thread panicked")).collect()
    });
    let global_duration_nanos = wall_clock_start.elapsed().as_nanos();
    WorkloadReport::new(reports, global_duration_nanos)
}

/// Reconstructs the checkpoint timeline after the fact for a chunk that did not record
/// checkpoints incrementally. Distributes `elapsed_nanos` linearly over the recorded multiples of
/// `checkpoint_every`, which is exact for a uniform per-item cost and a reasonable approximation
/// otherwise; callers needing true incremental checkpoints should record them inline via
/// [`Checkpointer`] instead.
fn checkpoints_for(item_count: usize, checkpoint_every: usize, elapsed_nanos: u128) -> Vec<u128> {
    if checkpoint_every == 0 || item_count == 0 {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut i = checkpoint_every;
    while i <= item_count {
        let fraction = i as f64 / item_count as f64;
        out.push((elapsed_nanos as f64 * fraction) as u128);
        i += checkpoint_every;
    }
    out
}

/// Incremental checkpoint recorder a worker closure can call after each processed item, mirroring
/// the original driver's "record a timestamp every `checkpoint_every` operations" behavior
/// exactly rather than approximating it after the fact.
pub struct Checkpointer {
    start: Instant,
    checkpoint_every: usize,
    processed: usize,
    pub checkpoints: Vec<u128>,
}

impl Checkpointer {
    pub fn new(checkpoint_every: usize) -> Self {
        Self {
            start: Instant::now(),
            checkpoint_every,
            processed: 0,
            checkpoints: Vec::new(),
        }
    }

    /// Call once per processed item. Records `elapsed().as_nanos()` whenever the running count is
    /// a multiple of `checkpoint_every`; a `checkpoint_every` of 0 disables checkpointing.
    pub fn tick(&mut self) {
        self.processed += 1;
        if self.checkpoint_every != 0 && self.processed % self.checkpoint_every == 0 {
            self.checkpoints.push(self.start.elapsed().as_nanos());
        }
    }

    pub fn elapsed_nanos(&self) -> u128 {
        self.start.elapsed().as_nanos()
    }
}
