//! Completed-task counter and the console observer that displays it.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// Number of tasks that finished, shared by every worker.
#[derive(Debug, Default)]
pub struct CompletedCounter {
    count: AtomicUsize,
}

impl CompletedCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completion and return the post-increment value.
    pub fn increment(&self) -> usize {
        self.count.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn get(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

/// Receives counter snapshots as tasks finish and the final total.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, completed: usize);
    fn on_finish(&self, total: usize);
}

/// Draws `Processed jobs: K` in place on stdout.
pub struct ConsoleProgress {
    live: bool,
    drawn: AtomicBool,
    console: Mutex<()>,
}

impl ConsoleProgress {
    /// `live = false` keeps only the final summary line.
    pub fn new(live: bool) -> Self {
        Self {
            live,
            drawn: AtomicBool::new(false),
            console: Mutex::new(()),
        }
    }
}

impl ProgressObserver for ConsoleProgress {
    fn on_progress(&self, completed: usize) {
        if !self.live {
            return;
        }
        let _guard = self.console.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stdout = io::stdout().lock();
        // Best effort: a closed stdout must not take a worker down.
        let _ = write!(stdout, "\rProcessed jobs: {completed}");
        let _ = stdout.flush();
        self.drawn.store(true, Ordering::SeqCst);
    }

    fn on_finish(&self, total: usize) {
        let _guard = self.console.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stdout = io::stdout().lock();
        if self.drawn.load(Ordering::SeqCst) {
            let _ = writeln!(stdout);
        }
        let _ = writeln!(stdout, "All jobs processed: {total}");
        let _ = stdout.flush();
    }
}
