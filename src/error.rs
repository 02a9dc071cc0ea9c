//! Error types for the extraction engine

use std::io;
use std::path::PathBuf;

/// Errors raised by the dispatcher and the output sinks
#[derive(Debug, thiserror::Error)]
pub enum DedupError {
    #[error("worker count must be at least 1 (got {0})")]
    InvalidWorkerCount(usize),

    #[error("cannot open output sink {path:?}: {source}")]
    SinkUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write token '{token}': {source}")]
    Write {
        token: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// A token whose append to the sink failed
#[derive(Debug)]
pub struct WriteFailure {
    pub token: String,
    pub error: io::Error,
}

impl WriteFailure {
    pub fn new(token: impl Into<String>, error: io::Error) -> Self {
        Self {
            token: token.into(),
            error,
        }
    }
}

impl From<WriteFailure> for DedupError {
    fn from(failure: WriteFailure) -> Self {
        DedupError::Write {
            token: failure.token,
            source: failure.error,
        }
    }
}
