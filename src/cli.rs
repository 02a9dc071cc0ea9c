//! Command-line interface definition for combo-dedup
//!
//! Provides argument parsing and validation for the extraction tool.

use clap::Parser;
use std::path::PathBuf;

use crate::dedup::DedupStrategy;

/// Multi-threaded token extractor for combo lists
///
/// Pulls the identifier in front of ':' (or '|') out of every line and
/// writes each distinct one exactly once.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "combo-dedup",
    author = "m0h1nd4",
    version,
    about = "Extract and deduplicate identifiers from combo lists",
    long_about = r#"
╔══════════════════════════════════════════════════════════════════════════════╗
║                            COMBO-DEDUP v1.0.0                                ║
║                   Token Extraction & Deduplication                           ║
║                         For Penetration Testing                              ║
╚══════════════════════════════════════════════════════════════════════════════╝

Reads every file in the input directory, takes the part of each line before
the first ':' (or, if the line has no ':', before the first '|'), and writes
each distinct value once to a timestamped file in the output directory.
Lines without a delimiter are counted and skipped. Files are deduplicated
independently of each other.

EXAMPLES:
    # Process ./task into ./result with one worker per CPU
    combo-dedup

    # Use 16 workers
    combo-dedup -t 16

    # Single file, custom output directory
    combo-dedup -i dump.txt -o extracted/

    # Only .txt and .log files, recursing into subdirectories
    combo-dedup -i /combos --extensions txt,log --recursive

OUTPUT NAMING:
    task/combo.txt  ->  result/combo_2024-03-05_14-07-09.txt
"#,
    after_help = "For more information, visit: https://github.com/m0h1nd4/combo-dedup"
)]
pub struct Args {
    /// Input file or directory path
    #[arg(short, long, value_name = "PATH", default_value = "task")]
    pub input: PathBuf,

    /// Output directory (created if missing)
    #[arg(short, long, value_name = "DIR", default_value = "result")]
    pub output: PathBuf,

    /// Number of worker threads per file (default: auto-detect)
    #[arg(short = 't', long, value_name = "NUM")]
    pub threads: Option<usize>,

    /// Deduplication strategy
    #[arg(long, value_enum, default_value_t = DedupStrategy::Sharded)]
    pub dedup_strategy: DedupStrategy,

    /// Process directories recursively
    #[arg(short, long, default_value_t = false)]
    pub recursive: bool,

    /// File extensions to process, comma separated ("*" for all files)
    #[arg(long, value_name = "EXT", default_value = "*")]
    pub extensions: String,

    /// Show detailed statistics
    #[arg(long, default_value_t = false)]
    pub stats: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, default_value_t = false)]
    pub quiet: bool,

    /// Verbose mode - detailed logging
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Dry run - show what would be done without writing files
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

impl Args {
    /// Worker count, falling back to the number of CPUs
    pub fn worker_count(&self) -> usize {
        self.threads.unwrap_or_else(num_cpus::get)
    }

    /// Parse file extensions to process; empty means every file
    pub fn get_extensions(&self) -> Vec<String> {
        self.extensions
            .split(',')
            .map(|s| s.trim().trim_start_matches('.').to_lowercase())
            .filter(|s| !s.is_empty() && s != "*")
            .collect()
    }
}
