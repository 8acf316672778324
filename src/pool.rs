//! Pool coordinator: load tasks, start workers, detect drain, shut down, join.

use std::io;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::error::PoolError;
use crate::executor::CommandExecutor;
use crate::log_sink::LogSink;
use crate::progress::{CompletedCounter, ProgressObserver};
use crate::stats::{self, CpuTimes};
use crate::task_queue::TaskQueue;
use crate::worker::{Worker, WorkerContext, WorkerReport};

/// Fixed sizing for one run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    pub workers: NonZeroUsize,
}

/// Outcome of a completed run.
#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    /// Tasks loaded at startup.
    pub total: usize,
    /// Final value of the completed counter.
    pub completed: usize,
    /// Tasks executed by each worker, indexed by worker number.
    pub per_worker: Vec<usize>,
    pub elapsed: Duration,
    /// CPU used by the executed commands, where the platform reports it.
    pub child_cpu: Option<CpuTimes>,
}

pub struct Pool {
    config: PoolConfig,
    executor: Arc<dyn CommandExecutor>,
    sink: Arc<dyn LogSink>,
    observer: Arc<dyn ProgressObserver>,
}

impl Pool {
    pub fn new(
        config: PoolConfig,
        executor: Arc<dyn CommandExecutor>,
        sink: Arc<dyn LogSink>,
        observer: Arc<dyn ProgressObserver>,
    ) -> Self {
        Self {
            config,
            executor,
            sink,
            observer,
        }
    }

    /// Execute every command exactly once and wait for all workers to finish.
    pub fn run<I, S>(&self, commands: I) -> Result<RunSummary, PoolError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.run_with(commands, |index, worker| {
            thread::Builder::new()
                .name(format!("worker-{index}"))
                .spawn(move || worker.run())
        })
    }

    fn run_with<I, S, F>(&self, commands: I, mut spawn: F) -> Result<RunSummary, PoolError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: FnMut(usize, Worker) -> io::Result<JoinHandle<WorkerReport>>,
    {
        let queue = Arc::new(TaskQueue::new());
        // Filled before any worker exists, so draining cannot race the load.
        let total = queue.load(commands)?;
        let ctx = WorkerContext {
            queue: Arc::clone(&queue),
            executor: Arc::clone(&self.executor),
            sink: Arc::clone(&self.sink),
            completed: Arc::new(CompletedCounter::new()),
            observer: Arc::clone(&self.observer),
        };
        let workers = self.config.workers.get();
        info!(total, workers, "starting pool");

        let cpu_start = stats::child_cpu_times();
        let start = Instant::now();

        let mut handles = Vec::with_capacity(workers);
        for index in 0..workers {
            match spawn(index, Worker::new(index, ctx.clone())) {
                Ok(handle) => handles.push(handle),
                Err(err) if handles.is_empty() => {
                    // Nobody would ever drain the queue.
                    error!(worker = index, error = %err, "failed to spawn any worker");
                    return Err(PoolError::Spawn(err));
                }
                Err(err) => {
                    warn!(
                        worker = index,
                        running = handles.len(),
                        error = %err,
                        "failed to spawn worker, continuing with fewer"
                    );
                    break;
                }
            }
        }

        queue.wait_until_drained();
        debug!("queue drained, signaling shutdown");
        queue.signal_shutdown()?;

        let mut per_worker = vec![0; workers];
        let mut panicked = None;
        for (index, handle) in handles.into_iter().enumerate() {
            match handle.join() {
                Ok(report) => per_worker[report.index] = report.executed,
                Err(_) => {
                    error!(worker = index, "worker panicked");
                    panicked.get_or_insert(PoolError::WorkerPanicked(index));
                }
            }
        }
        if let Some(err) = panicked {
            return Err(err);
        }

        let elapsed = start.elapsed();
        let completed = ctx.completed.get();
        let child_cpu = stats::cpu_delta(cpu_start, stats::child_cpu_times());
        self.observer.on_finish(completed);
        info!(completed, elapsed_ms = elapsed.as_millis() as u64, "pool finished");

        Ok(RunSummary {
            total,
            completed,
            per_worker,
            elapsed,
            child_cpu,
        })
    }
}
