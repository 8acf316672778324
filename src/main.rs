//! Run a fixed list of shell commands on a bounded pool of worker threads,
//! collecting their output into one append-only log.

mod config;
mod error;
mod executor;
mod log_sink;
mod logging;
mod pool;
mod progress;
mod stats;
mod task_queue;
mod types;
mod worker;

use std::process::ExitCode;
use std::sync::Arc;

use clap::error::ErrorKind;
use tracing::debug;

use crate::config::Settings;
use crate::error::ConfigError;
use crate::executor::{CommandExecutor, ShellExecutor};
use crate::log_sink::FileLogSink;
use crate::pool::{Pool, PoolConfig};
use crate::progress::ConsoleProgress;

fn run(settings: Settings) -> ExitCode {
    let commands = match config::load_commands(&settings.commands_file) {
        Ok(commands) => commands,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    debug!(count = commands.len(), file = %settings.commands_file.display(), "loaded commands");

    let executor: Arc<dyn CommandExecutor> = match &settings.shell {
        Some(shell) => Arc::new(ShellExecutor::with_shell(shell.clone())),
        None => Arc::new(ShellExecutor::new()),
    };
    let sink = FileLogSink::new(&settings.log_file).with_block_headers(settings.block_headers);
    let pool = Pool::new(
        PoolConfig {
            workers: settings.workers,
        },
        executor,
        Arc::new(sink),
        Arc::new(ConsoleProgress::new(!settings.quiet)),
    );

    match pool.run(commands) {
        Ok(summary) => {
            debug!(total = summary.total, completed = summary.completed, "batch complete");
            if settings.stats {
                println!(
                    "{}",
                    stats::format_stats(summary.elapsed, summary.child_cpu, &summary.per_worker)
                );
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("pool error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn main() -> ExitCode {
    logging::init();
    match Settings::from_args(std::env::args_os()) {
        Ok(settings) => run(settings),
        Err(ConfigError::Usage(err))
            if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) =>
        {
            let _ = err.print();
            ExitCode::SUCCESS
        }
        Err(ConfigError::Usage(err)) => {
            // clap exits with 2 on its own; configuration errors here are always 1.
            let _ = err.print();
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
