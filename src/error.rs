use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Fatal problems found before any worker starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid max_parallel_jobs value `{0}`: expected a positive integer")]
    InvalidWorkerCount(String),

    #[error("error opening commands file {}: {source}", path.display())]
    CommandsFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Usage(#[from] clap::Error),
}

/// Misuse of the task queue protocol.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("queue already shut down")]
    Closed,

    #[error("shutdown requested with {0} task(s) still pending")]
    PendingTasks(usize),
}

/// A failed append to the log destination.
#[derive(Debug, Error)]
#[error("error writing log file {}: {source}", path.display())]
pub struct SinkError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Failures of the pool lifecycle itself (not of individual commands).
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] io::Error),

    #[error("worker-{0} panicked")]
    WorkerPanicked(usize),

    #[error(transparent)]
    Queue(#[from] QueueError),
}
