//! Core dedup engine
//!
//! Fans the lines of one input out over a dedicated rayon pool. Each line is
//! one task: extract, test-and-insert, append on first sight, count. Write
//! failures are collected and reported once every task has finished.

use rayon::prelude::*;
use std::sync::{Mutex, PoisonError};

use crate::dedup::{create_deduplicator, DedupStrategy, Deduplicator};
use crate::error::{DedupError, WriteFailure};
use crate::extract::extract_with_delimiter;
use crate::output::TokenSink;
use crate::progress::ProgressTracker;

/// Outcome of one dispatcher run
#[derive(Debug, Default)]
pub struct DedupReport {
    /// Lines processed, including skipped and duplicate lines
    pub processed_count: u64,
    /// Tokens appended to the sink
    pub unique_count: u64,
    /// Distinct tokens seen, whether or not their append succeeded
    pub distinct_count: u64,
    /// Appends that failed, in completion order
    pub failures: Vec<WriteFailure>,
}

impl DedupReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Surface the first write failure, if any
    pub fn into_result(mut self) -> Result<u64, DedupError> {
        if self.failures.is_empty() {
            Ok(self.processed_count)
        } else {
            Err(self.failures.swap_remove(0).into())
        }
    }
}

/// What a single line task did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineOutcome {
    Skipped,
    Duplicate,
    Written,
}

/// Bounded worker pool driving the per-line pipeline
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher {
    worker_count: usize,
    strategy: DedupStrategy,
}

impl Dispatcher {
    /// Fails when `worker_count` is zero
    pub fn new(worker_count: usize) -> Result<Self, DedupError> {
        if worker_count < 1 {
            return Err(DedupError::InvalidWorkerCount(worker_count));
        }
        Ok(Self {
            worker_count,
            strategy: DedupStrategy::default(),
        })
    }

    pub fn with_strategy(mut self, strategy: DedupStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn strategy(&self) -> DedupStrategy {
        self.strategy
    }

    /// Run over `lines` with a private tracker
    pub fn run<S>(&self, lines: &[S], sink: &dyn TokenSink) -> Result<DedupReport, DedupError>
    where
        S: AsRef<str> + Sync,
    {
        self.run_with_progress(lines, sink, &ProgressTracker::new())
    }

    /// Run over `lines`, updating a caller-owned tracker so that a reporter
    /// can poll it while the pool is busy.
    ///
    /// Blocks until every line has been handled. A failed append never
    /// cancels the other tasks; it shows up in `DedupReport::failures`.
    pub fn run_with_progress<S>(
        &self,
        lines: &[S],
        sink: &dyn TokenSink,
        tracker: &ProgressTracker,
    ) -> Result<DedupReport, DedupError>
    where
        S: AsRef<str> + Sync,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.worker_count)
            .thread_name(|i| format!("dedup-worker-{}", i))
            .build()?;

        let dedup = create_deduplicator(self.strategy, self.worker_count, lines.len());
        let failures: Mutex<Vec<WriteFailure>> = Mutex::new(Vec::new());

        log::debug!(
            "dispatching {} lines over {} workers ({:?} dedup)",
            lines.len(),
            self.worker_count,
            self.strategy
        );

        // One task per line; a split is never larger than a single line
        let unique_count: u64 = pool.install(|| {
            lines
                .par_iter()
                .with_max_len(1)
                .map(|line| {
                    match process_line(line.as_ref(), &*dedup, sink, tracker) {
                        Ok(LineOutcome::Written) => 1,
                        Ok(_) => 0,
                        Err(failure) => {
                            log::warn!("write failed for '{}': {}", failure.token, failure.error);
                            failures
                                .lock()
                                .unwrap_or_else(PoisonError::into_inner)
                                .push(failure);
                            0
                        }
                    }
                })
                .sum()
        });

        let failures = failures.into_inner().unwrap_or_else(PoisonError::into_inner);
        let distinct_count = dedup.seen() as u64;

        log::debug!(
            "dispatch complete: {} lines, {} distinct, {} unique, {} failed writes",
            lines.len(),
            distinct_count,
            unique_count,
            failures.len()
        );

        Ok(DedupReport {
            processed_count: lines.len() as u64,
            unique_count,
            distinct_count,
            failures,
        })
    }
}

/// Task body for one line. An `Err` means the token was new but its append
/// failed; the line is still counted.
fn process_line(
    line: &str,
    dedup: &dyn Deduplicator,
    sink: &dyn TokenSink,
    tracker: &ProgressTracker,
) -> Result<LineOutcome, WriteFailure> {
    let token = match extract_with_delimiter(line) {
        Some((token, delimiter)) => {
            tracker.record_delimiter(delimiter);
            token
        }
        None => {
            tracker.record_skip();
            return Ok(LineOutcome::Skipped);
        }
    };

    if !dedup.test_and_insert(token) {
        tracker.record_duplicate();
        return Ok(LineOutcome::Duplicate);
    }

    match sink.append(token) {
        Ok(()) => {
            tracker.record_unique(token);
            Ok(LineOutcome::Written)
        }
        Err(error) => {
            tracker.record_failed();
            Err(WriteFailure::new(token, error))
        }
    }
}

/// Extract, dedupe and write `lines` to `sink` using `worker_count` workers
pub fn run_dedup<S>(
    lines: &[S],
    sink: &dyn TokenSink,
    worker_count: usize,
) -> Result<DedupReport, DedupError>
where
    S: AsRef<str> + Sync,
{
    Dispatcher::new(worker_count)?.run(lines, sink)
}
