//! Thread-safe FIFO task queue with a shutdown flag guarded by the same lock.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crate::error::QueueError;
use crate::types::{Task, TaskId};

/// What a waiting worker found when it woke up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitOutcome {
    /// At least one task was queued at wake-up time.
    Ready,
    /// The queue is empty and no more work will arrive.
    Shutdown,
}

/// A synchronized FIFO queue of shell commands.
pub struct TaskQueue {
    inner: Mutex<TaskQueueState>,
    available: Condvar,
    drained: Condvar,
}

struct TaskQueueState {
    queue: VecDeque<Task>,
    next_id: TaskId,
    shutdown: bool,
}

impl TaskQueue {
    /// Create an empty task queue.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(TaskQueueState {
                queue: VecDeque::new(),
                next_id: 0,
                shutdown: false,
            }),
            available: Condvar::new(),
            drained: Condvar::new(),
        }
    }

    // A worker that panicked mid-task never holds this lock, and the state is
    // consistent after every critical section, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, TaskQueueState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append one command to the tail and return its id.
    #[allow(dead_code)]
    pub fn enqueue(&self, command: impl Into<String>) -> Result<TaskId, QueueError> {
        let mut guard = self.lock();
        if guard.shutdown {
            return Err(QueueError::Closed);
        }
        let id = guard.next_id;
        guard.next_id += 1;
        guard.queue.push_back(Task::new(id, command));
        self.available.notify_one();
        Ok(id)
    }

    /// Populate the queue in one critical section; returns how many tasks were added.
    pub fn load<I, S>(&self, commands: I) -> Result<usize, QueueError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut guard = self.lock();
        if guard.shutdown {
            return Err(QueueError::Closed);
        }
        let before = guard.queue.len();
        for command in commands {
            let id = guard.next_id;
            guard.next_id += 1;
            guard.queue.push_back(Task::new(id, command));
        }
        let added = guard.queue.len() - before;
        if added > 0 {
            self.available.notify_all();
        }
        Ok(added)
    }

    /// Remove the head if there is one; never blocks on an empty queue.
    pub fn try_take(&self) -> Option<Task> {
        let mut guard = self.lock();
        let task = guard.queue.pop_front()?;
        if guard.queue.is_empty() {
            self.drained.notify_all();
        }
        Some(task)
    }

    /// Block until the queue has work or shutdown has been signaled.
    pub fn wait_for_work_or_shutdown(&self) -> WaitOutcome {
        let guard = self.lock();
        // wait_while re-checks the predicate after every wakeup, spurious or not.
        let guard = self
            .available
            .wait_while(guard, |state| state.queue.is_empty() && !state.shutdown)
            .unwrap_or_else(PoisonError::into_inner);
        if guard.queue.is_empty() {
            WaitOutcome::Shutdown
        } else {
            WaitOutcome::Ready
        }
    }

    /// Block until every queued task has been taken by some worker.
    pub fn wait_until_drained(&self) {
        let guard = self.lock();
        let _guard = self
            .drained
            .wait_while(guard, |state| !state.queue.is_empty())
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Mark the queue as finished and wake every blocked worker.
    ///
    /// Refused while tasks remain so no worker can exit ahead of pending work.
    /// Calling it again after success is a no-op.
    pub fn signal_shutdown(&self) -> Result<(), QueueError> {
        let mut guard = self.lock();
        if !guard.queue.is_empty() {
            return Err(QueueError::PendingTasks(guard.queue.len()));
        }
        guard.shutdown = true;
        self.available.notify_all();
        Ok(())
    }

    /// Whether shutdown has been signaled.
    #[allow(dead_code)]
    pub fn is_shutdown(&self) -> bool {
        self.lock().shutdown
    }

    /// Current number of queued tasks.
    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}
