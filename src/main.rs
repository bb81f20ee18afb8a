//! treemirror - One-way directory mirroring with content verification.
//!
//! Usage:
//!   treemirror run SRC DST LOG SECS   Mirror every SECS seconds until Ctrl-C
//!   treemirror once SRC DST           Run a single pass and print the report
//!   treemirror check SRC DST          Verify DST mirrors SRC without changing it
//!   treemirror --help                 Show help

mod logging;

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, bail, eyre};
use tokio::signal;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use treemirror_core::{ActionKind, SyncConfig, SyncError, SyncEvent, SyncReport};
use treemirror_ops::{SyncEngine, SyncMessage, purge_destination, start_sync};
use treemirror_verify::{CheckConfig, MirrorCheck, MirrorReport};

#[derive(Parser)]
#[command(
    name = "treemirror",
    version,
    about = "One-way directory mirroring with content verification",
    long_about = "treemirror keeps a destination directory an exact copy of a source.\n\n\
                  New entries are copied, changed files are replaced once a content \
                  hash confirms the change, and entries missing from the source are \
                  deleted even when read-only."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Mirror periodically until interrupted
    Run {
        /// Directory to mirror from
        source: PathBuf,

        /// Directory to mirror into (created if missing)
        destination: PathBuf,

        /// File that receives a copy of every log line
        log_file: PathBuf,

        /// Seconds between passes
        #[arg(value_parser = clap::value_parser!(u64).range(1..))]
        interval_secs: u64,

        /// Ignore entries whose name starts with a dot
        #[arg(long)]
        filter_hidden: bool,

        /// Remove the whole destination before the first pass
        #[arg(long)]
        fresh: bool,
    },

    /// Run a single pass
    Once {
        /// Directory to mirror from
        source: PathBuf,

        /// Directory to mirror into (created if missing)
        destination: PathBuf,

        /// Ignore entries whose name starts with a dot
        #[arg(long)]
        filter_hidden: bool,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Check that the destination mirrors the source
    Check {
        /// Directory mirrored from
        source: PathBuf,

        /// Directory mirrored into
        destination: PathBuf,

        /// Ignore entries whose name starts with a dot
        #[arg(long)]
        filter_hidden: bool,

        /// Compare file contents, not just sizes
        #[arg(long)]
        deep: bool,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            source,
            destination,
            log_file,
            interval_secs,
            filter_hidden,
            fresh,
        } => {
            logging::init(Some(&log_file))?;
            let config = build_config(source, destination, filter_hidden)?;
            if fresh {
                run_fresh(&config.destination)?;
            }

            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_loop(config, Duration::from_secs(interval_secs)))?;
        }
        Command::Once {
            source,
            destination,
            filter_hidden,
            format,
        } => {
            logging::init(None)?;
            let config = build_config(source, destination, filter_hidden)?;
            run_once(config, format)?;
        }
        Command::Check {
            source,
            destination,
            filter_hidden,
            deep,
            format,
        } => {
            logging::init(None)?;
            run_check(&source, &destination, filter_hidden, deep, format)?;
        }
    }

    Ok(())
}

fn build_config(source: PathBuf, destination: PathBuf, filter_hidden: bool) -> Result<SyncConfig> {
    SyncConfig::builder()
        .source(source)
        .destination(destination)
        .filter_hidden(filter_hidden)
        .build()
        .map_err(SyncError::from)
        .wrap_err("Cannot start sync")
}

/// Purge the destination so the first pass copies everything.
fn run_fresh(destination: &Path) -> Result<()> {
    let removed = purge_destination(destination)
        .wrap_err_with(|| format!("Cannot purge destination {}", destination.display()))?;
    if removed {
        warn!("Directory removed: {}", destination.display());
    }
    Ok(())
}

/// Run a pass now and then once per interval until Ctrl-C.
///
/// A pass always runs to completion; the signal is honored between passes.
async fn run_loop(config: SyncConfig, period: Duration) -> Result<()> {
    info!(
        source = %config.source.display(),
        destination = %config.destination.display(),
        interval_secs = period.as_secs(),
        filter_hidden = config.filter_hidden,
        "starting periodic sync"
    );

    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let shutdown = signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut passes = 0u64;
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!(passes, "received shutdown signal, stopping");
                break;
            }
            _ = ticker.tick() => {
                passes += 1;
                debug!(pass = passes, "running sync pass");
                run_pass(config.clone()).await?;
            }
        }
    }

    Ok(())
}

/// Run one pass on the blocking pool, logging events as they arrive.
async fn run_pass(config: SyncConfig) -> Result<SyncReport> {
    let mut rx = start_sync(config);

    while let Some(message) = rx.recv().await {
        match message {
            SyncMessage::Event(event) => log_event(&event),
            SyncMessage::Complete(result) => {
                let report = result.wrap_err("Sync pass failed")?;
                log_summary(&report);
                return Ok(report);
            }
        }
    }

    Err(eyre!("Sync task ended without a result"))
}

fn run_once(config: SyncConfig, format: OutputFormat) -> Result<()> {
    let report = SyncEngine::new(config)
        .sync_with(log_event)
        .wrap_err("Sync pass failed")?;
    log_summary(&report);

    match format {
        OutputFormat::Text => print_report(&report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    if report.has_failures() {
        bail!("{} entries could not be synchronized", report.failures.len());
    }

    Ok(())
}

fn run_check(
    source: &Path,
    destination: &Path,
    filter_hidden: bool,
    deep: bool,
    format: OutputFormat,
) -> Result<()> {
    let config = CheckConfig::builder()
        .filter_hidden(filter_hidden)
        .deep(deep)
        .build()
        .wrap_err("Invalid configuration")?;

    eprintln!("Comparing {} with {}...", source.display(), destination.display());

    let report = MirrorCheck::with_config(config)
        .check(source, destination)
        .wrap_err("Mirror check failed")?;

    match format {
        OutputFormat::Text => print_check(&report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    if !report.is_mirror() {
        bail!(
            "Destination differs from source ({} discrepancies, {} errors)",
            report.discrepancies.len(),
            report.errors.len()
        );
    }

    Ok(())
}

fn log_event(event: &SyncEvent) {
    match event {
        SyncEvent::Action(action) => match action.action {
            ActionKind::Created | ActionKind::Updated => info!("{action}"),
            ActionKind::Deleted => warn!("{action}"),
        },
        SyncEvent::Failure(failure) => error!("{failure}"),
        SyncEvent::Skipped(path) => {
            debug!(path = %path.display(), "skipped entry that is neither file nor directory");
        }
    }
}

fn log_summary(report: &SyncReport) {
    if report.destination_created {
        warn!("Destination {} did not exist and was created", report.destination.display());
    }
    info!(
        copied = %format_size(report.stats.bytes_copied),
        hashed = report.stats.files_hashed,
        elapsed_ms = report.duration.as_millis() as u64,
        "Sync finished: {}",
        report.summary()
    );
}

fn print_report(report: &SyncReport) {
    println!();
    println!("{}", "─".repeat(60));
    println!(
        " {} -> {}",
        report.source.display(),
        report.destination.display()
    );
    println!(" {}", report.summary());
    println!(
        " {} copied, {} files hashed, {} verified unchanged",
        format_size(report.stats.bytes_copied),
        report.stats.files_hashed,
        report.stats.verified_unchanged
    );
    println!(
        " Started {}, took {:.2}s",
        report.started_at.format("%Y-%m-%d %H:%M:%S"),
        report.duration.as_secs_f64()
    );
    println!("{}", "─".repeat(60));

    if !report.actions.is_empty() {
        println!();
        for action in &report.actions {
            println!("   {action}");
        }
    }

    if !report.failures.is_empty() {
        println!();
        println!(" {} failure(s):", report.failures.len());
        for failure in &report.failures {
            println!("   {failure}");
        }
    }

    if !report.skipped.is_empty() {
        println!();
        println!(" {} entry(ies) skipped", report.skipped.len());
    }
}

fn print_check(report: &MirrorReport) {
    println!();
    println!("{}", "─".repeat(60));
    println!(" Mirror Check Report");
    println!("{}", "─".repeat(60));
    println!();

    if report.is_mirror() {
        println!(
            " Destination mirrors source ({} entries compared).",
            report.entries_compared
        );
    } else {
        for discrepancy in &report.discrepancies {
            println!("   {discrepancy}");
        }
        for failure in &report.errors {
            println!("   {failure}");
        }
    }
    println!();
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}
