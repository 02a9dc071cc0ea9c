//! Output management module
//!
//! Sinks that receive newly-unique tokens. Every sink serializes appends so
//! that concurrent workers never interleave partial lines, and every append
//! reaches its destination before it returns so a failure is reported
//! against the token that caused it.

use chrono::{DateTime, Local};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::DedupError;

/// Timestamp layout used in output file names
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Append-only destination for unique tokens
pub trait TokenSink: Send + Sync {
    /// Append one line holding `token`. Must be atomic with respect to
    /// other appends on the same sink.
    fn append(&self, token: &str) -> io::Result<()>;

    /// Push pending data to the underlying destination
    fn flush(&self) -> io::Result<()> {
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Line writer with counters
///
/// Each line and its terminator go out in a single `write_all`, so a failed
/// line never leaves a dangling fragment for the next one to be glued onto.
pub struct OutputWriter<W: Write> {
    writer: W,
    line: Vec<u8>,
    lines_written: u64,
    bytes_written: u64,
}

impl<W: Write> OutputWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            line: Vec::new(),
            lines_written: 0,
            bytes_written: 0,
        }
    }

    /// Write a line to the output
    pub fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.line.clear();
        self.line.extend_from_slice(line.as_bytes());
        self.line.push(b'\n');

        self.writer.write_all(&self.line)?;
        self.lines_written += 1;
        self.bytes_written += self.line.len() as u64;
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Thread-safe output writer over any `Write`
///
/// Appends are passed straight through to `W`. Wrapping a buffered writer
/// here moves write errors to whichever append or flush drains the buffer.
pub struct SyncOutputWriter<W: Write + Send> {
    inner: Mutex<OutputWriter<W>>,
}

impl<W: Write + Send> SyncOutputWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            inner: Mutex::new(OutputWriter::new(writer)),
        }
    }

    pub fn lines_written(&self) -> u64 {
        lock(&self.inner).lines_written()
    }

    pub fn bytes_written(&self) -> u64 {
        lock(&self.inner).bytes_written()
    }

    pub fn into_inner(self) -> W {
        self.inner
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .into_inner()
    }
}

impl<W: Write + Send> TokenSink for SyncOutputWriter<W> {
    fn append(&self, token: &str) -> io::Result<()> {
        lock(&self.inner).write_line(token)
    }

    fn flush(&self) -> io::Result<()> {
        lock(&self.inner).flush()
    }
}

struct FileState {
    writer: OutputWriter<File>,
    /// File length after the last complete line
    committed: u64,
}

/// Append-mode file sink
///
/// Lines are written unbuffered. If a write fails part way, the file is cut
/// back to the end of the last complete line.
pub struct FileSink {
    state: Mutex<FileState>,
    path: PathBuf,
}

impl FileSink {
    /// Open (or create) `path` for appending
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, DedupError> {
        let path = path.into();
        let unavailable = |source| DedupError::SinkUnavailable {
            path: path.clone(),
            source,
        };

        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&path)
            .map_err(unavailable)?;
        let committed = file.metadata().map_err(unavailable)?.len();

        Ok(Self {
            state: Mutex::new(FileState {
                writer: OutputWriter::new(file),
                committed,
            }),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lines_written(&self) -> u64 {
        lock(&self.state).writer.lines_written()
    }

    pub fn bytes_written(&self) -> u64 {
        lock(&self.state).writer.bytes_written()
    }
}

impl TokenSink for FileSink {
    fn append(&self, token: &str) -> io::Result<()> {
        let mut state = lock(&self.state);
        match state.writer.write_line(token) {
            Ok(()) => {
                state.committed += token.len() as u64 + 1;
                Ok(())
            }
            Err(err) => {
                let committed = state.committed;
                if let Err(trunc) = state.writer.get_ref().set_len(committed) {
                    log::debug!(
                        "Could not trim {:?} back to {} bytes: {}",
                        self.path,
                        committed,
                        trunc
                    );
                }
                Err(err)
            }
        }
    }

    fn flush(&self) -> io::Result<()> {
        lock(&self.state).writer.flush()
    }
}

/// Sink collecting tokens in memory
#[derive(Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the appended lines, in append order
    pub fn lines(&self) -> Vec<String> {
        lock(&self.lines).clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.lines).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TokenSink for MemorySink {
    fn append(&self, token: &str) -> io::Result<()> {
        lock(&self.lines).push(token.to_owned());
        Ok(())
    }
}

/// Build `<stem>_<timestamp><.ext>` for an input file
pub fn generate_output_name(input: &Path, timestamp: &DateTime<Local>) -> String {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");

    let ext = input
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default();

    format!("{}_{}{}", stem, timestamp.format(TIMESTAMP_FORMAT), ext)
}

/// Ensure output directory exists
pub fn ensure_output_dir(path: &Path) -> io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
