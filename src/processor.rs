//! File-level orchestration
//!
//! Scans the input, and for every file: loads its lines, opens a timestamped
//! output file, runs the dispatcher with a live progress bar and folds the
//! result into the run statistics. Each file gets its own dedup set.

use anyhow::Context;
use bytesize::ByteSize;
use chrono::Local;
use colored::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use crate::cli::Args;
use crate::dedup::DedupStrategy;
use crate::encoding::read_input;
use crate::engine::{DedupReport, Dispatcher};
use crate::error::WriteFailure;
use crate::output::{ensure_output_dir, generate_output_name, FileSink, TokenSink};
use crate::progress::{
    print_bullet, print_error, print_header, print_info, print_success, print_warning,
    ProcessingStats, ProgressReporter, ProgressTracker,
};

/// Processor configuration
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub output_dir: PathBuf,
    pub worker_count: usize,
    pub strategy: DedupStrategy,
    pub recursive: bool,
    /// Lowercase extensions to accept; empty accepts every file
    pub extensions: Vec<String>,
    pub dry_run: bool,
    pub quiet: bool,
    pub verbose: bool,
    pub show_stats: bool,
}

impl ProcessorConfig {
    pub fn from_args(args: &Args) -> anyhow::Result<Self> {
        Ok(Self {
            output_dir: args.output.clone(),
            worker_count: args.worker_count(),
            strategy: args.dedup_strategy,
            recursive: args.recursive,
            extensions: args.get_extensions(),
            dry_run: args.dry_run,
            quiet: args.quiet,
            verbose: args.verbose,
            show_stats: args.stats,
        })
    }
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("result"),
            worker_count: num_cpus::get(),
            strategy: DedupStrategy::default(),
            recursive: false,
            extensions: Vec::new(),
            dry_run: false,
            quiet: true,
            verbose: false,
            show_stats: false,
        }
    }
}

/// Result for one input file
#[derive(Debug)]
pub struct FileOutcome {
    pub input: PathBuf,
    pub output: PathBuf,
    pub report: DedupReport,
    /// Set when the output could not be flushed after the run
    pub flush_error: Option<io::Error>,
}

impl FileOutcome {
    pub fn is_success(&self) -> bool {
        self.report.is_success() && self.flush_error.is_none()
    }
}

/// Result for a whole run
#[derive(Debug, Default)]
pub struct RunSummary {
    pub files: Vec<FileOutcome>,
}

impl RunSummary {
    pub fn processed_lines(&self) -> u64 {
        self.files.iter().map(|f| f.report.processed_count).sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&Path, &WriteFailure)> {
        self.files
            .iter()
            .flat_map(|f| f.report.failures.iter().map(move |w| (f.input.as_path(), w)))
    }

    pub fn failure_count(&self) -> usize {
        self.files.iter().map(|f| f.report.failures.len()).sum()
    }

    /// Outputs whose final flush failed
    pub fn flush_errors(&self) -> impl Iterator<Item = (&Path, &io::Error)> {
        self.files
            .iter()
            .filter_map(|f| f.flush_error.as_ref().map(|e| (f.output.as_path(), e)))
    }

    pub fn is_success(&self) -> bool {
        self.files.iter().all(FileOutcome::is_success)
    }
}

/// Main processor
pub struct Processor {
    config: ProcessorConfig,
    stats: Arc<ProcessingStats>,
}

impl Processor {
    pub fn new(config: ProcessorConfig) -> Self {
        Self {
            config,
            stats: Arc::new(ProcessingStats::new()),
        }
    }

    /// Process input (file or directory)
    pub fn process(&self, input: &Path) -> anyhow::Result<RunSummary> {
        // Validate before touching the filesystem
        let dispatcher = Dispatcher::new(self.config.worker_count)?.with_strategy(self.config.strategy);

        if !self.config.quiet {
            print_header("Scanning input...");
        }

        let files = self.collect_files(input)?;

        if files.is_empty() {
            anyhow::bail!("No files found to process in {:?}", input);
        }

        if !self.config.quiet {
            let total_size: u64 = files.iter().map(|(_, size)| *size).sum();
            print_info(&format!("Found {} files ({} total)", files.len(), ByteSize(total_size)));
        }

        if self.config.dry_run {
            self.dry_run_report(&files);
            return Ok(RunSummary::default());
        }

        ensure_output_dir(&self.config.output_dir)
            .with_context(|| format!("Failed to create output directory {:?}", self.config.output_dir))?;

        let mut summary = RunSummary::default();
        for (path, size) in &files {
            let outcome = self.process_file(&dispatcher, path, *size)?;
            summary.files.push(outcome);
        }

        if !self.config.quiet {
            self.report_failures(&summary);
            if self.config.show_stats || self.config.verbose {
                self.stats.print_summary();
            }
        }

        Ok(summary)
    }

    /// Collect all files to process, in a stable order
    fn collect_files(&self, input: &Path) -> anyhow::Result<Vec<(PathBuf, u64)>> {
        let mut files = Vec::new();

        if input.is_file() {
            let size = fs::metadata(input)?.len();
            files.push((input.to_path_buf(), size));
            self.stats.add_file(size);
        } else if input.is_dir() {
            let walker = if self.config.recursive {
                WalkDir::new(input)
            } else {
                WalkDir::new(input).max_depth(1)
            };

            for entry in walker.sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
                let path = entry.path();

                if path.is_file() && self.accepts_extension(path) {
                    let size = fs::metadata(path)?.len();
                    files.push((path.to_path_buf(), size));
                    self.stats.add_file(size);
                }
            }
        } else {
            anyhow::bail!("Input path does not exist: {:?}", input);
        }

        Ok(files)
    }

    fn accepts_extension(&self, path: &Path) -> bool {
        if self.config.extensions.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| self.config.extensions.contains(&ext.to_lowercase()))
            .unwrap_or(false)
    }

    /// Run the engine over one file
    fn process_file(&self, dispatcher: &Dispatcher, path: &Path, size: u64) -> anyhow::Result<FileOutcome> {
        let output_name = generate_output_name(path, &Local::now());
        let output_path = self.config.output_dir.join(output_name);

        if !self.config.quiet {
            print_header(&format!("Processing file: {:?}", path));
        }

        let input = read_input(path)?;
        let sink = FileSink::open(&output_path)?;

        if self.config.verbose {
            print_info(&format!("Encoding: {} ({:.0}% confidence)",
                input.encoding.name, input.encoding.confidence * 100.0));
            print_info(&format!("Output:   {:?}", output_path));
        }

        let tracker = Arc::new(ProgressTracker::new());
        let reporter = ProgressReporter::spawn(Arc::clone(&tracker), input.lines.len() as u64, self.config.quiet);

        let report = dispatcher.run_with_progress(&input.lines, &sink, &tracker);
        let snapshot = reporter.finish();
        let report = report?;

        // Recorded on the outcome so the remaining files still run
        let flush_error = sink.flush().err();
        if let Some(ref err) = flush_error {
            log::warn!("flush failed for {:?}: {}", output_path, err);
        }

        self.stats.complete_file(size, &snapshot);

        if !self.config.quiet {
            print_success(&format!("Processing complete. {} lines processed.", report.processed_count));
            print_info(&format!("Unique tokens: {} -> {:?}", sink.lines_written(), output_path));
            if self.config.verbose {
                print_info(&format!("Distinct tokens seen: {} ({} written)",
                    report.distinct_count, ByteSize(sink.bytes_written())));
            }
        }

        Ok(FileOutcome {
            input: path.to_path_buf(),
            output: output_path,
            report,
            flush_error,
        })
    }

    fn report_failures(&self, summary: &RunSummary) {
        let count = summary.failure_count();
        if count > 0 {
            print_warning(&format!("{} token(s) could not be written:", count));
            for (input, failure) in summary.failures() {
                print_error(&format!("{:?}: '{}' ({})", input, failure.token, failure.error));
            }
        }

        for (output, err) in summary.flush_errors() {
            print_error(&format!("Failed to flush output {:?}: {}", output, err));
        }
    }

    /// Dry run report
    fn dry_run_report(&self, files: &[(PathBuf, u64)]) {
        print_header("DRY RUN - No files will be written");

        println!("\n  {} Files to process:", "▶".green());
        for (path, size) in files {
            print_bullet(&format!("{:?} ({})", path, ByteSize(*size)));
        }

        println!("\n  {} Output configuration:", "▶".green());
        print_bullet(&format!("Output directory: {:?}", self.config.output_dir));
        for (path, _) in files {
            print_bullet(&generate_output_name(path, &Local::now()));
        }
        print_bullet(&format!("Workers per file: {}", self.config.worker_count));
        print_bullet(&format!("Dedup strategy: {:?}", self.config.strategy));
    }

    /// Get processing statistics
    pub fn stats(&self) -> Arc<ProcessingStats> {
        Arc::clone(&self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(output_dir: &Path, workers: usize) -> ProcessorConfig {
        ProcessorConfig {
            output_dir: output_dir.to_path_buf(),
            worker_count: workers,
            ..ProcessorConfig::default()
        }
    }

    fn sorted_lines(path: &Path) -> Vec<String> {
        let mut lines: Vec<String> = fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(String::from)
            .collect();
        lines.sort();
        lines
    }

    #[test]
    fn test_process_directory() {
        let task = TempDir::new().unwrap();
        let result = TempDir::new().unwrap();
        let out_dir = result.path().join("result");

        fs::write(task.path().join("one.txt"), "a@x.com:1\na@x.com:2\nb@x.com|3\nnope\n").unwrap();
        fs::write(task.path().join("two.txt"), "a@x.com:9\nc@x.com:1\n").unwrap();

        let processor = Processor::new(config(&out_dir, 4));
        let summary = processor.process(task.path()).unwrap();

        assert_eq!(summary.files.len(), 2);
        assert_eq!(summary.processed_lines(), 6);
        assert!(summary.is_success());

        let one = &summary.files[0];
        assert!(one.output.file_name().unwrap().to_str().unwrap().starts_with("one_"));
        assert_eq!(sorted_lines(&one.output), vec!["a@x.com", "b@x.com"]);

        // No cross-file dedup: a@x.com shows up again for the second file
        let two = &summary.files[1];
        assert_eq!(sorted_lines(&two.output), vec!["a@x.com", "c@x.com"]);

        assert_eq!(processor.stats().get_unique_tokens(), 4);
    }

    #[test]
    fn test_zero_workers_rejected_before_output() {
        let task = TempDir::new().unwrap();
        let result = TempDir::new().unwrap();
        let out_dir = result.path().join("result");
        fs::write(task.path().join("combo.txt"), "a@x.com:1\n").unwrap();

        let processor = Processor::new(config(&out_dir, 0));
        assert!(processor.process(task.path()).is_err());
        assert!(!out_dir.exists());
    }

    #[test]
    fn test_empty_directory_is_error() {
        let task = TempDir::new().unwrap();
        let result = TempDir::new().unwrap();

        let processor = Processor::new(config(result.path(), 2));
        assert!(processor.process(task.path()).is_err());
    }

    #[test]
    fn test_extension_filter() {
        let task = TempDir::new().unwrap();
        let result = TempDir::new().unwrap();
        fs::write(task.path().join("keep.txt"), "a@x.com:1\n").unwrap();
        fs::write(task.path().join("skip.bin"), "b@x.com:1\n").unwrap();

        let mut cfg = config(result.path(), 2);
        cfg.extensions = vec!["txt".to_string()];
        let summary = Processor::new(cfg).process(task.path()).unwrap();

        assert_eq!(summary.files.len(), 1);
        assert!(summary.files[0].input.ends_with("keep.txt"));
    }

    #[test]
    fn test_flush_error_fails_the_run() {
        let ok = FileOutcome {
            input: PathBuf::from("task/one.txt"),
            output: PathBuf::from("result/one.txt"),
            report: DedupReport::default(),
            flush_error: None,
        };
        let broken = FileOutcome {
            input: PathBuf::from("task/two.txt"),
            output: PathBuf::from("result/two.txt"),
            report: DedupReport::default(),
            flush_error: Some(io::Error::new(io::ErrorKind::Other, "disk full")),
        };

        let summary = RunSummary { files: vec![ok, broken] };

        assert!(summary.files[0].is_success());
        assert!(!summary.files[1].is_success());
        assert!(!summary.is_success());
        assert_eq!(summary.failure_count(), 0);

        let flushes: Vec<_> = summary.flush_errors().map(|(p, _)| p.to_path_buf()).collect();
        assert_eq!(flushes, vec![PathBuf::from("result/two.txt")]);
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let task = TempDir::new().unwrap();
        let result = TempDir::new().unwrap();
        let out_dir = result.path().join("result");
        fs::write(task.path().join("combo.txt"), "a@x.com:1\n").unwrap();

        let mut cfg = config(&out_dir, 2);
        cfg.dry_run = true;
        let summary = Processor::new(cfg).process(task.path()).unwrap();

        assert!(summary.files.is_empty());
        assert!(!out_dir.exists());
    }
}
