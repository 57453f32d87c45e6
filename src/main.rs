//! DirSync CLI - Concurrent One-Way Directory Sync
//!
//! Mirrors a source directory into a destination, copying only files that
//! are missing or different.

use anyhow::{bail, Context, Result};
use clap::Parser;
use dirsync::config::{CliArgs, Commands, HashAlgorithm, OutputFormat, SyncConfig};
use dirsync::core::{CancelToken, SyncSession, SyncSummary};
use dirsync::error::SyncError;
use dirsync::progress::ProgressReporter;
use dirsync::sync::verify_trees;
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let args = CliArgs::parse();

    setup_logging(args.verbose);

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` wins; otherwise `info` when verbose and `warn` when not
fn setup_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: CliArgs) -> Result<ExitCode> {
    if let Some(Commands::Verify {
        source,
        destination,
        algorithm,
    }) = &args.command
    {
        return cmd_verify(source, destination, *algorithm, args.output_format);
    }

    if args.source.is_none() || args.destination.is_none() {
        bail!("Usage: dirsync -s <SOURCE> -d <DESTINATION> [OPTIONS]\n       dirsync --help for more information");
    }

    let config = SyncConfig::from_cli(&args).map_err(SyncError::Config)?;
    for root in [&config.source, &config.destination] {
        if !root.is_dir() {
            return Err(SyncError::NotADirectory(root.clone()).into());
        }
    }

    let progress = if args.progress {
        ProgressReporter::new()
    } else {
        ProgressReporter::disabled()
    };
    let mut session = SyncSession::new(config.clone())
        .context("Failed to initialize sync")?
        .with_progress(progress);

    if args.verbose {
        print_config(&config, &session);
    }

    // Setup signal handler for graceful shutdown
    let cancel = CancelToken::new();
    let interrupt = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received, shutting down...");
        interrupt.cancel();
    })
    .context("Failed to set signal handler")?;

    if config.dry_run && args.output_format == OutputFormat::Text {
        println!("=== Dry Run Mode ===");
        println!("No files will be copied.");
        println!();
    }

    match session.sync_with(&cancel) {
        Ok(summary) => {
            report(&summary, args.output_format)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("Copied {} files before stopping", session.total_copied());
            Err(e).context("Sync failed")
        }
    }
}

fn report(summary: &SyncSummary, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            summary.print_summary();
            if summary.dry_run {
                println!("\nWould copy {} files", summary.files_copied());
            } else {
                println!("\nCopied {} files", summary.files_copied());
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(summary).context("Failed to serialize summary")?;
            println!("{}", json);
        }
    }
    Ok(())
}

fn cmd_verify(source: &Path, destination: &Path, algorithm: HashAlgorithm, format: OutputFormat) -> Result<ExitCode> {
    if format == OutputFormat::Text {
        println!(
            "Verifying {} against {} ({})...",
            destination.display(),
            source.display(),
            algorithm.name()
        );
    }

    let report = verify_trees(source, destination, algorithm).context("Verification failed")?;

    match format {
        OutputFormat::Text => {
            report.print_summary();
            println!(
                "\nTrees {}",
                if report.is_identical() { "match" } else { "differ" }
            );
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report).context("Failed to serialize report")?);
        }
    }

    Ok(if report.is_identical() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_config(config: &SyncConfig, session: &SyncSession) {
    println!("=== Configuration ===");
    println!("Source:       {}", session.source_root().display());
    println!("Destination:  {}", session.destination_root().display());
    println!("Workers:      {}", config.workers);
    println!("Queue size:   {}", config.queue_size);
    println!("Hash:         {}", config.hash.name());
    println!("Empty dirs:   {}", config.create_empty_dirs);
    println!("Dry run:      {}", config.dry_run);
    println!();
}
