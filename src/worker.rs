//! The loop each pool thread runs: wait, take, execute, log, count.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, error, trace};

use crate::executor::CommandExecutor;
use crate::log_sink::LogSink;
use crate::progress::{CompletedCounter, ProgressObserver};
use crate::task_queue::{TaskQueue, WaitOutcome};
use crate::types::Task;

/// Lifecycle of a single worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerState {
    Waiting,
    Executing,
    Terminated,
}

/// Everything a worker shares with the rest of the pool.
#[derive(Clone)]
pub struct WorkerContext {
    pub queue: Arc<TaskQueue>,
    pub executor: Arc<dyn CommandExecutor>,
    pub sink: Arc<dyn LogSink>,
    pub completed: Arc<CompletedCounter>,
    pub observer: Arc<dyn ProgressObserver>,
}

/// What one worker did before it terminated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkerReport {
    pub index: usize,
    pub executed: usize,
}

pub struct Worker {
    index: usize,
    state: WorkerState,
    ctx: WorkerContext,
}

impl Worker {
    pub fn new(index: usize, ctx: WorkerContext) -> Self {
        Self {
            index,
            state: WorkerState::Waiting,
            ctx,
        }
    }

    fn transition(&mut self, next: WorkerState) {
        trace!(worker = self.index, from = ?self.state, to = ?next, "state change");
        self.state = next;
    }

    fn execute_and_log(&self, task: &Task) {
        let output = panic::catch_unwind(AssertUnwindSafe(|| self.ctx.executor.execute(task)))
            .unwrap_or_else(|_| {
                error!(worker = self.index, task = task.id, "executor panicked, output dropped");
                Vec::new()
            });
        if let Err(err) = self.ctx.sink.append(task, &output) {
            error!(worker = self.index, task = task.id, "{err}");
        }
    }

    /// Drain the queue until it is empty and shutdown has been signaled.
    pub fn run(mut self) -> WorkerReport {
        let mut executed = 0usize;
        loop {
            self.transition(WorkerState::Waiting);
            if self.ctx.queue.wait_for_work_or_shutdown() == WaitOutcome::Shutdown {
                break;
            }
            // Another worker may have taken the task between wake-up and here.
            let Some(task) = self.ctx.queue.try_take() else {
                continue;
            };

            self.transition(WorkerState::Executing);
            debug!(worker = self.index, task = task.id, command = %task.command, "executing");
            // Panics stay inside the task: every taken task is counted and the
            // worker keeps draining.
            if panic::catch_unwind(AssertUnwindSafe(|| self.execute_and_log(&task))).is_err() {
                error!(worker = self.index, task = task.id, "log sink panicked, output dropped");
            }

            let completed = self.ctx.completed.increment();
            if panic::catch_unwind(AssertUnwindSafe(|| self.ctx.observer.on_progress(completed)))
                .is_err()
            {
                error!(worker = self.index, completed, "progress observer panicked");
            }
            executed += 1;
        }
        self.transition(WorkerState::Terminated);
        debug!(worker = self.index, executed, "worker terminated");
        WorkerReport {
            index: self.index,
            executed,
        }
    }
}
