//! # Combo Dedup
//!
//! Multi-threaded identifier extraction for combo lists.
//!
//! ## Features
//!
//! - **Token extraction**: Takes the part of a line before the first `:`,
//!   or before the first `|` when the line has no `:`
//! - **Exact deduplication**: Every distinct token is written exactly once
//!   per input file, whatever the worker count
//! - **Parallel processing**: One task per line on a bounded worker pool
//! - **Fail-soft writes**: A failed append is reported after the run and
//!   never stops the other workers
//! - **Encoding detection**: Input files are transcoded to UTF-8
//!
//! ## Usage
//!
//! ```bash
//! # Process every file in ./task into ./result
//! combo-dedup
//!
//! # Use 16 workers per file
//! combo-dedup -t 16
//! ```
//!
//! ## Example
//!
//! ```rust
//! use combo_dedup::{run_dedup, MemorySink};
//!
//! let lines = ["a@x.com:pw1", "a@x.com:pw2", "b@x.com|pw3", "garbage_no_sep"];
//! let sink = MemorySink::new();
//!
//! let report = run_dedup(&lines, &sink, 4).unwrap();
//! assert_eq!(report.processed_count, 4);
//!
//! let mut tokens = sink.into_lines();
//! tokens.sort();
//! assert_eq!(tokens, vec!["a@x.com", "b@x.com"]);
//! ```

pub mod cli;
pub mod dedup;
pub mod encoding;
pub mod engine;
pub mod error;
pub mod extract;
pub mod output;
pub mod processor;
pub mod progress;

pub use cli::Args;
pub use dedup::{DedupStrategy, Deduplicator};
pub use engine::{run_dedup, DedupReport, Dispatcher};
pub use error::{DedupError, WriteFailure};
pub use extract::{extract, extract_with_delimiter, Delimiter, Extracted};
pub use output::{FileSink, MemorySink, TokenSink};
pub use processor::{Processor, ProcessorConfig};
pub use progress::{ProgressSnapshot, ProgressTracker};
