//! Shared identifiers and task model used across the system.

use std::fmt;

/// Identifier assigned to a task in load order.
pub type TaskId = u64;

/// One shell command waiting to run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Task {
    /// Stable identifier for logging, block headers and validation.
    pub id: TaskId,
    /// The command line handed to the executor verbatim.
    pub command: String,
}

impl Task {
    /// Construct a new task with the provided id and command.
    pub fn new(id: TaskId, command: impl Into<String>) -> Self {
        Self {
            id,
            command: command.into(),
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.id, self.command)
    }
}
