//! Runs one command and captures its merged stdout/stderr.

use std::ffi::OsString;
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use crate::types::Task;

/// Runs a task and returns whatever it printed.
///
/// Implementations never fail: a command that cannot be launched produces
/// empty output.
pub trait CommandExecutor: Send + Sync {
    fn execute(&self, task: &Task) -> Vec<u8>;
}

#[cfg(unix)]
const DEFAULT_SHELL: &str = "sh";
#[cfg(not(unix))]
const DEFAULT_SHELL: &str = "cmd";

/// Executes commands through the platform shell with stderr folded into stdout.
#[derive(Clone, Debug)]
pub struct ShellExecutor {
    shell: OsString,
}

impl ShellExecutor {
    /// Use the platform default shell (`sh` on Unix, `cmd` elsewhere).
    pub fn new() -> Self {
        Self::with_shell(DEFAULT_SHELL)
    }

    /// Use a specific shell program.
    pub fn with_shell(shell: impl Into<OsString>) -> Self {
        Self {
            shell: shell.into(),
        }
    }

    #[cfg(unix)]
    fn command(&self, line: &str) -> Command {
        let mut command = Command::new(&self.shell);
        // Redirect the shell's own stderr so every part of a compound line is merged.
        command.arg("-c").arg(format!("exec 2>&1\n{line}"));
        command
    }

    #[cfg(not(unix))]
    fn command(&self, line: &str) -> Command {
        let mut command = Command::new(&self.shell);
        command.arg("/C").arg(format!("({line}) 2>&1"));
        command
    }
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandExecutor for ShellExecutor {
    fn execute(&self, task: &Task) -> Vec<u8> {
        let output = self
            .command(&task.command)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output();
        match output {
            Ok(output) => {
                debug!(task = task.id, status = %output.status, bytes = output.stdout.len(), "command finished");
                output.stdout
            }
            Err(err) => {
                warn!(task = task.id, command = %task.command, error = %err, "failed to launch command");
                Vec::new()
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn captures_stdout() {
        let output = ShellExecutor::new().execute(&Task::new(0, "echo A"));
        assert_eq!(output, b"A\n");
    }

    #[test]
    fn merges_stderr_into_output() {
        let output = ShellExecutor::new().execute(&Task::new(0, "echo out; echo err >&2"));
        let text = String::from_utf8_lossy(&output);
        assert!(text.contains("out\n"), "missing stdout in {text:?}");
        assert!(text.contains("err\n"), "missing stderr in {text:?}");
    }

    #[test]
    fn missing_binary_reports_through_shell() {
        // The shell starts fine; its complaint is part of the captured stream.
        let output = ShellExecutor::new().execute(&Task::new(0, "definitely-not-a-real-binary-xyz"));
        assert!(!output.is_empty());
    }

    #[test]
    fn unlaunchable_shell_yields_empty_output() {
        let executor = ShellExecutor::with_shell("/nonexistent/shell-for-batchpool-tests");
        let output = executor.execute(&Task::new(0, "echo A"));
        assert!(output.is_empty());
    }

    #[test]
    fn stdin_is_closed() {
        // `cat` would block forever if it inherited the test's stdin.
        let output = ShellExecutor::new().execute(&Task::new(0, "cat; echo done"));
        assert_eq!(output, b"done\n");
    }
}
