//! Combo Dedup - identifier extraction and deduplication for combo lists
//!
//! Main entry point for the command-line application.

use clap::Parser;
use std::process;

use combo_dedup::cli::Args;
use combo_dedup::processor::{Processor, ProcessorConfig};
use combo_dedup::progress::{print_banner, print_error, print_header, print_info};

fn main() {
    // Parse command-line arguments
    let args = Args::parse();

    // Set up logging
    if args.verbose {
        std::env::set_var("RUST_LOG", "debug");
    } else if !args.quiet {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    match run(args) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            print_error(&format!("{}", e));

            // Print chain of errors
            let mut source = e.source();
            while let Some(err) = source {
                print_error(&format!("  Caused by: {}", err));
                source = err.source();
            }

            process::exit(1);
        }
    }
}

/// Returns false when some tokens could not be written
fn run(args: Args) -> anyhow::Result<bool> {
    if !args.quiet {
        print_banner();
    }

    validate_args(&args)?;

    let config = ProcessorConfig::from_args(&args)?;

    if !args.quiet && args.verbose {
        print_config(&args, &config);
    }

    let processor = Processor::new(config);
    let summary = processor.process(&args.input)?;

    Ok(summary.is_success())
}

/// Validate command-line arguments
fn validate_args(args: &Args) -> anyhow::Result<()> {
    if !args.input.exists() {
        anyhow::bail!("Input path does not exist: {:?}", args.input);
    }

    if args.threads == Some(0) {
        anyhow::bail!("Number of threads must be at least 1");
    }

    Ok(())
}

/// Print configuration summary
fn print_config(args: &Args, config: &ProcessorConfig) {
    print_header("Configuration");

    print_info(&format!("Input:        {:?}", args.input));
    print_info(&format!("Output dir:   {:?}", config.output_dir));
    print_info(&format!("Threads:      {}", config.worker_count));
    print_info(&format!("Dedup:        {:?}", config.strategy));
    print_info(&format!("Recursive:    {}", config.recursive));
    if config.extensions.is_empty() {
        print_info("Extensions:   all");
    } else {
        print_info(&format!("Extensions:   {:?}", config.extensions));
    }
}
