//! Command-line surface and the commands-file reader.

use std::ffi::OsString;
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::thread;

use clap::Parser;
use tracing::warn;

use crate::error::ConfigError;

#[derive(Debug, Parser)]
#[command(name = "batchpool", version)]
#[command(about = "Run a list of shell commands on a fixed pool of workers")]
struct Cli {
    /// File with one command per line; empty lines are skipped
    commands_file: PathBuf,

    /// Number of commands to run at the same time (positive integer)
    #[arg(allow_hyphen_values = true)]
    max_parallel_jobs: String,

    /// File that collects every command's output (appended, created if missing)
    log_file: PathBuf,

    /// Precede each output block in the log with `==> [id] command <==`
    #[arg(long)]
    block_headers: bool,

    /// Only print the final summary line
    #[arg(short, long)]
    quiet: bool,

    /// Print timing and CPU usage after the summary
    #[arg(long)]
    stats: bool,

    /// Shell used to interpret each command
    #[arg(long, value_name = "PROGRAM")]
    shell: Option<OsString>,
}

/// Validated settings for one run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub commands_file: PathBuf,
    pub workers: NonZeroUsize,
    pub log_file: PathBuf,
    pub block_headers: bool,
    pub quiet: bool,
    pub stats: bool,
    pub shell: Option<OsString>,
}

impl Settings {
    /// Parse the process arguments (including the program name).
    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let cli = Cli::try_parse_from(args)?;
        let workers = parse_worker_count(&cli.max_parallel_jobs)?;
        if let Ok(cores) = thread::available_parallelism() {
            if workers > cores {
                warn!(workers = workers.get(), cores = cores.get(), "more workers than available CPUs");
            }
        }
        Ok(Self {
            commands_file: cli.commands_file,
            workers,
            log_file: cli.log_file,
            block_headers: cli.block_headers,
            quiet: cli.quiet,
            stats: cli.stats,
            shell: cli.shell,
        })
    }
}

/// Accept only integers >= 1.
pub fn parse_worker_count(raw: &str) -> Result<NonZeroUsize, ConfigError> {
    raw.trim()
        .parse::<NonZeroUsize>()
        .map_err(|_| ConfigError::InvalidWorkerCount(raw.to_string()))
}

/// Read one command per line, dropping line endings and fully empty lines.
pub fn load_commands(path: &Path) -> Result<Vec<String>, ConfigError> {
    let bytes = fs::read(path).map_err(|source| ConfigError::CommandsFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(String::from_utf8_lossy(&bytes)
        .lines()
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse(args: &[&str]) -> Result<Settings, ConfigError> {
        Settings::from_args(std::iter::once("batchpool").chain(args.iter().copied()))
    }

    #[test]
    fn parses_positionals_and_flags() {
        let settings = parse(&["cmds.txt", "4", "out.log", "--block-headers", "--stats"])
            .expect("valid arguments");
        assert_eq!(settings.commands_file, PathBuf::from("cmds.txt"));
        assert_eq!(settings.workers.get(), 4);
        assert_eq!(settings.log_file, PathBuf::from("out.log"));
        assert!(settings.block_headers);
        assert!(settings.stats);
        assert!(!settings.quiet);
        assert_eq!(settings.shell, None);
    }

    #[test]
    fn rejects_zero_negative_and_garbage_worker_counts() {
        for raw in ["0", "-1", "-8", "abc", "", "2.5"] {
            let err = parse(&["cmds.txt", raw, "out.log"]).expect_err(raw);
            assert!(
                matches!(err, ConfigError::InvalidWorkerCount(ref value) if value == raw),
                "unexpected error for {raw:?}: {err}"
            );
        }
    }

    #[test]
    fn wrong_argument_count_is_a_usage_error() {
        for args in [&["cmds.txt", "4"][..], &["cmds.txt", "4", "out.log", "extra"][..]] {
            match parse(args) {
                Err(ConfigError::Usage(err)) => assert_ne!(err.kind(), ErrorKind::DisplayHelp),
                other => panic!("expected usage error, got {other:?}"),
            }
        }
    }

    #[test]
    fn worker_count_is_not_capped() {
        assert_eq!(parse_worker_count("4096").expect("valid").get(), 4096);
    }

    #[test]
    fn load_commands_skips_empty_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cmds.txt");
        fs::write(&path, "echo A\n\necho B\r\n  \necho C").expect("write commands");

        let commands = load_commands(&path).expect("load");
        // Whitespace-only lines are not "fully empty" and are kept.
        assert_eq!(commands, vec!["echo A", "echo B", "  ", "echo C"]);
    }

    #[test]
    fn load_commands_reports_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("missing.txt");
        match load_commands(&path) {
            Err(ConfigError::CommandsFile { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected commands file error, got {other:?}"),
        }
    }
}
