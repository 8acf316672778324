//! Append-only log destination shared by all workers.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use crate::error::SinkError;
use crate::types::Task;

/// Receives each task's captured output exactly once.
///
/// Implementations must keep one task's block contiguous even when called
/// from several workers at the same time.
pub trait LogSink: Send + Sync {
    fn append(&self, task: &Task, output: &[u8]) -> Result<(), SinkError>;
}

/// Appends blocks to a file, reopening it for every write.
pub struct FileLogSink {
    path: PathBuf,
    block_headers: bool,
    write_lock: Mutex<()>,
}

impl FileLogSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            block_headers: false,
            write_lock: Mutex::new(()),
        }
    }

    /// Prefix every block with `==> [id] command <==`.
    pub fn with_block_headers(mut self, enabled: bool) -> Self {
        self.block_headers = enabled;
        self
    }

    fn render(&self, task: &Task, output: &[u8]) -> Vec<u8> {
        if !self.block_headers {
            return output.to_vec();
        }
        let header = format!("==> {task} <==\n");
        let mut block = Vec::with_capacity(header.len() + output.len() + 1);
        block.extend_from_slice(header.as_bytes());
        block.extend_from_slice(output);
        if !output.is_empty() && !output.ends_with(b"\n") {
            block.push(b'\n');
        }
        block
    }
}

impl LogSink for FileLogSink {
    fn append(&self, task: &Task, output: &[u8]) -> Result<(), SinkError> {
        let block = self.render(task, output);
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let err = |source: io::Error| SinkError {
            path: self.path.clone(),
            source,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(err)?;
        // Silent commands still open the file; only the write is skipped.
        if !block.is_empty() {
            file.write_all(&block).map_err(err)?;
        }
        file.flush().map_err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn creates_file_and_appends_raw_output() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("jobs.log");
        let sink = FileLogSink::new(&path);

        sink.append(&Task::new(0, "echo A"), b"A\n").expect("append");
        sink.append(&Task::new(1, "echo B"), b"B\n").expect("append");

        assert_eq!(fs::read_to_string(&path).expect("read log"), "A\nB\n");
    }

    #[test]
    fn keeps_existing_content() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("jobs.log");
        fs::write(&path, "previous run\n").expect("seed log");

        FileLogSink::new(&path)
            .append(&Task::new(0, "echo A"), b"A\n")
            .expect("append");

        assert_eq!(
            fs::read_to_string(&path).expect("read log"),
            "previous run\nA\n"
        );
    }

    #[test]
    fn empty_output_still_creates_the_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("jobs.log");
        FileLogSink::new(&path)
            .append(&Task::new(0, "true"), b"")
            .expect("append");
        assert!(path.exists());
        assert_eq!(fs::read_to_string(&path).expect("read log"), "");
    }

    #[test]
    fn empty_output_to_unopenable_path_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("missing-dir").join("jobs.log");
        let err = FileLogSink::new(&path)
            .append(&Task::new(0, "true"), b"")
            .expect_err("open failure must be reported for silent commands too");
        assert_eq!(err.path, path);
    }

    #[test]
    fn block_headers_name_the_command() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("jobs.log");
        let sink = FileLogSink::new(&path).with_block_headers(true);

        sink.append(&Task::new(3, "printf x"), b"x").expect("append");
        sink.append(&Task::new(4, "true"), b"").expect("append");

        assert_eq!(
            fs::read_to_string(&path).expect("read log"),
            "==> [3] printf x <==\nx\n==> [4] true <==\n"
        );
    }

    #[test]
    fn unopenable_destination_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        // A directory cannot be opened for append.
        let sink = FileLogSink::new(dir.path());
        let err = sink
            .append(&Task::new(0, "echo A"), b"A\n")
            .expect_err("append to a directory should fail");
        assert_eq!(err.path, dir.path());
    }

    #[test]
    fn concurrent_blocks_stay_contiguous() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("jobs.log");
        let sink = Arc::new(FileLogSink::new(&path));
        let writers = 8;
        let lines_per_block = 200;
        let barrier = Arc::new(Barrier::new(writers));

        let mut handles = Vec::new();
        for writer in 0..writers {
            let sink = Arc::clone(&sink);
            let barrier = Arc::clone(&barrier);
            handles.push(thread::spawn(move || {
                let block: String = (0..lines_per_block)
                    .map(|line| format!("writer-{writer} line-{line}\n"))
                    .collect();
                barrier.wait();
                sink.append(&Task::new(writer as u64, "marker"), block.as_bytes())
                    .expect("append");
            }));
        }
        for handle in handles {
            handle.join().expect("writer thread panicked");
        }

        let content = fs::read_to_string(&path).expect("read log");
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), writers * lines_per_block);
        for block in lines.chunks(lines_per_block) {
            let owner = block[0].split(' ').next().expect("writer tag");
            for (line, text) in block.iter().enumerate() {
                assert_eq!(*text, format!("{owner} line-{line}"));
            }
        }
    }
}
