//! Progress tracking and display module
//!
//! `ProgressTracker` is the shared state workers update; everything else in
//! here is terminal presentation that only ever reads from it.

use bytesize::ByteSize;
use colored::*;
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::extract::Delimiter;

/// Color theme for the tool
pub mod theme {
    use colored::Color;

    pub const PRIMARY: Color = Color::Green;
    pub const ACCENT: Color = Color::Cyan;
    pub const WARNING: Color = Color::Yellow;
    pub const ERROR: Color = Color::Red;
}

/// Print the application banner
pub fn print_banner() {
    let banner = r#"
╔══════════════════════════════════════════════════════════════════════════════╗
║                                                                              ║
║    ██████╗ ██████╗ ███╗   ███╗██████╗  ██████╗                               ║
║   ██╔════╝██╔═══██╗████╗ ████║██╔══██╗██╔═══██╗                              ║
║   ██║     ██║   ██║██╔████╔██║██████╔╝██║   ██║                              ║
║   ██║     ██║   ██║██║╚██╔╝██║██╔══██╗██║   ██║                              ║
║   ╚██████╗╚██████╔╝██║ ╚═╝ ██║██████╔╝╚██████╔╝                              ║
║    ╚═════╝ ╚═════╝ ╚═╝     ╚═╝╚═════╝  ╚═════╝                               ║
║                                                                              ║
║                   Token Extraction & Deduplication                           ║
║                         For Penetration Testing                              ║
║                                                              v1.0.0          ║
╚══════════════════════════════════════════════════════════════════════════════╝
"#;

    println!("{}", banner.color(theme::PRIMARY));
}

/// Print a section header
pub fn print_header(text: &str) {
    println!("\n{} {}", "▶".color(theme::PRIMARY), text.color(theme::PRIMARY).bold());
}

/// Print an info message
pub fn print_info(text: &str) {
    println!("  {} {}", "ℹ".color(theme::ACCENT), text);
}

/// Print a success message
pub fn print_success(text: &str) {
    println!("  {} {}", "✔".color(theme::PRIMARY), text.color(theme::PRIMARY));
}

/// Print a warning message
pub fn print_warning(text: &str) {
    println!("  {} {}", "⚠".color(theme::WARNING), text.color(theme::WARNING));
}

/// Print an error message
pub fn print_error(text: &str) {
    eprintln!("  {} {}", "✖".color(theme::ERROR), text.color(theme::ERROR));
}

/// Print a bullet point
pub fn print_bullet(text: &str) {
    println!("  {} {}", "•".color(theme::PRIMARY), text);
}

/// Create a styled line-count progress bar
pub fn create_progress_bar(total: u64, msg: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);

    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.green/dim}] {pos}/{len} lines ({per_sec}) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░"),
    );

    pb.set_message(msg.to_string());
    pb
}

/// Point-in-time view of a tracker
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub processed: u64,
    pub unique: u64,
    pub duplicates: u64,
    pub skipped: u64,
    pub failed: u64,
    /// Lines split on ':'
    pub colon_lines: u64,
    /// Lines that had no ':' and were split on '|'
    pub pipe_lines: u64,
    pub last_token: Option<String>,
}

/// Shared per-invocation progress state
#[derive(Debug)]
pub struct ProgressTracker {
    processed: AtomicU64,
    unique: AtomicU64,
    duplicates: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
    colon_lines: AtomicU64,
    pipe_lines: AtomicU64,
    last_token: Mutex<Option<String>>,
    start_time: Instant,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            processed: AtomicU64::new(0),
            unique: AtomicU64::new(0),
            duplicates: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            colon_lines: AtomicU64::new(0),
            pipe_lines: AtomicU64::new(0),
            last_token: Mutex::new(None),
            start_time: Instant::now(),
        }
    }

    /// Count one processed line; when `is_new`, remember `token` as the
    /// last unique token written.
    pub fn record(&self, is_new: bool, token: Option<&str>) {
        if is_new {
            if let Some(token) = token {
                let mut last = self.last_token.lock().unwrap_or_else(PoisonError::into_inner);
                *last = Some(token.to_owned());
            }
        }
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unique(&self, token: &str) {
        self.unique.fetch_add(1, Ordering::Relaxed);
        self.record(true, Some(token));
    }

    pub fn record_duplicate(&self) {
        self.duplicates.fetch_add(1, Ordering::Relaxed);
        self.record(false, None);
    }

    pub fn record_skip(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
        self.record(false, None);
    }

    /// The line still counts as processed
    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.record(false, None);
    }

    /// Note which delimiter a line was split on. Does not count the line
    /// as processed; the outcome `record_*` call does that.
    pub fn record_delimiter(&self, delimiter: Delimiter) {
        let counter = match delimiter {
            Delimiter::Colon => &self.colon_lines,
            Delimiter::Pipe => &self.pipe_lines,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            processed: self.processed.load(Ordering::Relaxed),
            unique: self.unique.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            colon_lines: self.colon_lines.load(Ordering::Relaxed),
            pipe_lines: self.pipe_lines.load(Ordering::Relaxed),
            last_token: self
                .last_token
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn lines_per_second(&self) -> f64 {
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.processed() as f64 / elapsed
        } else {
            0.0
        }
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Background thread rendering a tracker onto a progress bar
pub struct ProgressReporter {
    stop: Sender<()>,
    handle: Option<JoinHandle<()>>,
    bar: ProgressBar,
    tracker: Arc<ProgressTracker>,
}

impl ProgressReporter {
    pub const TICK: Duration = Duration::from_millis(100);

    /// Start polling `tracker`; a hidden bar is used when `quiet`
    pub fn spawn(tracker: Arc<ProgressTracker>, total_lines: u64, quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            create_progress_bar(total_lines, "")
        };

        let (stop, stop_rx) = bounded::<()>(1);
        let handle = {
            let bar = bar.clone();
            let tracker = Arc::clone(&tracker);
            thread::spawn(move || loop {
                render(&bar, &tracker.snapshot());
                match stop_rx.recv_timeout(Self::TICK) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })
        };

        Self {
            stop,
            handle: Some(handle),
            bar,
            tracker,
        }
    }

    /// Stop polling and leave the final state on screen
    pub fn finish(mut self) -> ProgressSnapshot {
        self.shutdown();
        let snapshot = self.tracker.snapshot();
        render(&self.bar, &snapshot);
        self.bar.finish_with_message("Complete".color(theme::PRIMARY).to_string());
        snapshot
    }

    fn shutdown(&mut self) {
        let _ = self.stop.try_send(());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("progress reporter thread panicked");
            }
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn render(bar: &ProgressBar, snapshot: &ProgressSnapshot) {
    bar.set_position(snapshot.processed);
    bar.set_message(progress_message(snapshot));
}

/// "Last token: ..." status text shown next to the bar
pub fn progress_message(snapshot: &ProgressSnapshot) -> String {
    match snapshot.last_token {
        Some(ref token) => format!("Last token: {}", token),
        None => String::from("Last token: -"),
    }
}

/// Run-wide statistics across all input files
#[derive(Debug)]
pub struct ProcessingStats {
    pub total_files: AtomicU64,
    pub processed_files: AtomicU64,
    pub total_bytes: AtomicU64,
    pub processed_bytes: AtomicU64,
    pub total_lines: AtomicU64,
    pub unique_tokens: AtomicU64,
    pub duplicate_lines: AtomicU64,
    pub skipped_lines: AtomicU64,
    pub failed_writes: AtomicU64,
    pub colon_lines: AtomicU64,
    pub pipe_lines: AtomicU64,
    pub start_time: Instant,
}

impl ProcessingStats {
    pub fn new() -> Self {
        Self {
            total_files: AtomicU64::new(0),
            processed_files: AtomicU64::new(0),
            total_bytes: AtomicU64::new(0),
            processed_bytes: AtomicU64::new(0),
            total_lines: AtomicU64::new(0),
            unique_tokens: AtomicU64::new(0),
            duplicate_lines: AtomicU64::new(0),
            skipped_lines: AtomicU64::new(0),
            failed_writes: AtomicU64::new(0),
            colon_lines: AtomicU64::new(0),
            pipe_lines: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn add_file(&self, size: u64) {
        self.total_files.fetch_add(1, Ordering::Relaxed);
        self.total_bytes.fetch_add(size, Ordering::Relaxed);
    }

    /// Fold one finished file into the totals
    pub fn complete_file(&self, size: u64, snapshot: &ProgressSnapshot) {
        self.processed_files.fetch_add(1, Ordering::Relaxed);
        self.processed_bytes.fetch_add(size, Ordering::Relaxed);
        self.total_lines.fetch_add(snapshot.processed, Ordering::Relaxed);
        self.unique_tokens.fetch_add(snapshot.unique, Ordering::Relaxed);
        self.duplicate_lines.fetch_add(snapshot.duplicates, Ordering::Relaxed);
        self.skipped_lines.fetch_add(snapshot.skipped, Ordering::Relaxed);
        self.failed_writes.fetch_add(snapshot.failed, Ordering::Relaxed);
        self.colon_lines.fetch_add(snapshot.colon_lines, Ordering::Relaxed);
        self.pipe_lines.fetch_add(snapshot.pipe_lines, Ordering::Relaxed);
    }

    pub fn get_total_files(&self) -> u64 {
        self.total_files.load(Ordering::Relaxed)
    }

    pub fn get_processed_files(&self) -> u64 {
        self.processed_files.load(Ordering::Relaxed)
    }

    pub fn get_total_lines(&self) -> u64 {
        self.total_lines.load(Ordering::Relaxed)
    }

    pub fn get_unique_tokens(&self) -> u64 {
        self.unique_tokens.load(Ordering::Relaxed)
    }

    pub fn get_failed_writes(&self) -> u64 {
        self.failed_writes.load(Ordering::Relaxed)
    }

    pub fn get_pipe_lines(&self) -> u64 {
        self.pipe_lines.load(Ordering::Relaxed)
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn lines_per_second(&self) -> f64 {
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.get_total_lines() as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Print final statistics
    pub fn print_summary(&self) {
        let duplicates = self.duplicate_lines.load(Ordering::Relaxed);
        let skipped = self.skipped_lines.load(Ordering::Relaxed);
        let failed = self.get_failed_writes();

        println!();
        println!("{}", "═".repeat(60).green());
        println!("{}", "                    PROCESSING COMPLETE".green().bold());
        println!("{}", "═".repeat(60).green());
        println!();

        println!("  {} {}/{}", "Files processed:".green(),
            self.get_processed_files(), self.get_total_files());
        println!("  {} {} / {}", "Data processed: ".green(),
            ByteSize(self.processed_bytes.load(Ordering::Relaxed)),
            ByteSize(self.total_bytes.load(Ordering::Relaxed)));
        println!();

        println!("  {} {}", "Total lines:    ".green(), format_number(self.get_total_lines()));
        println!("  {} {} ':' / {} '|'", "Delimiters:     ".green(),
            format_number(self.colon_lines.load(Ordering::Relaxed)),
            format_number(self.get_pipe_lines()));
        println!("  {} {}", "Skipped lines:  ".yellow(), format_number(skipped));
        println!("  {} {}", "Duplicates:     ".yellow(), format_number(duplicates));
        println!("  {} {}", "Unique tokens:  ".green().bold(),
            format_number(self.get_unique_tokens()).green().bold());

        if failed > 0 {
            println!("  {} {}", "Failed writes:  ".red(), format_number(failed).red());
        }

        println!();
        println!("  {} {}", "Duration:       ".green(), format_duration(self.elapsed()));
        println!("  {} {:.2} lines/sec", "Throughput:     ".green(), self.lines_per_second());
        println!();
        println!("{}", "═".repeat(60).green());
    }
}

impl Default for ProcessingStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a number with thousand separators
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    let chars: Vec<char> = s.chars().collect();

    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }

    result
}

/// Format duration as human-readable string
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();

    if secs < 60 {
        format!("{:.1}s", duration.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}
