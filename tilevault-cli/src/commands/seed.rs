//! Seed command - prefetch every tile of a region into the store.
//!
//! Progress is driven by the layer's seed events; Ctrl+C stops the job after
//! the tile in flight and still prints the summary.

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use tilevault::config::{format_size, ConfigFile};
use tilevault::coord::{BoundingBox, TileGrid};
use tilevault::events::{EventBus, TileEvent};
use tilevault::seed::SeedReport;

use super::common::open_session;
use crate::error::CliError;

/// Arguments for the seed command.
#[derive(Debug, Args)]
pub struct SeedArgs {
    /// Region as south,west,north,east in degrees
    #[arg(long, allow_hyphen_values = true)]
    pub bbox: BoundingBox,

    /// Lowest zoom level to seed
    #[arg(long, default_value_t = 0)]
    pub min_zoom: u8,

    /// Highest zoom level to seed
    #[arg(long)]
    pub max_zoom: u8,

    /// Retry missed tiles once before exiting
    #[arg(long)]
    pub retry: bool,

    /// Print the final report as JSON instead of a progress bar
    #[arg(long)]
    pub json: bool,
}

/// Run the seed command.
pub async fn run(config: &ConfigFile, args: SeedArgs) -> Result<(), CliError> {
    let session = open_session(config)?;
    session.layer.attach(TileGrid::default());

    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("Received interrupt, stopping after the current tile...");
        handler_token.cancel();
    })
    .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

    let cache = config.cache.to_cache_config();
    if !args.json {
        println!("TileVault Seed v{}", tilevault::VERSION);
        println!("=====================");
        println!();
        println!("Source:  {}", session.layer.source().name());
        println!("Region:  {}", args.bbox);
        println!("Zooms:   {} to {}", args.min_zoom, args.max_zoom);
        println!(
            "Budget:  {} tiles ({} at {} per tile)",
            cache.max_tiles(),
            format_size(cache.size_limit_bytes),
            format_size(cache.assumed_tile_bytes)
        );
        println!();
    }

    let progress = if args.json {
        ProgressBar::hidden()
    } else {
        new_progress_bar()
    };
    let watcher = watch_progress(&session.bus, progress.clone());

    let first = session
        .layer
        .seed(args.bbox, args.min_zoom, args.max_zoom, &cancel)
        .await;

    let mut report = match first {
        Ok(Some(report)) => Some(report),
        Ok(None) => None,
        Err(e) => {
            watcher.abort();
            progress.finish_and_clear();
            return Err(e.into());
        }
    };

    let mut retried = None;
    if args.retry && !cancel.is_cancelled() {
        if let Some(retry) = session.layer.retry_missed(&cancel).await {
            info!(missed = retry.missed.len(), "Retry pass complete");
            if let Some(first) = report.take() {
                retried = Some(RetryPass::new(&first, &retry));
                report = Some(merge_retry(first, retry));
            }
        }
    }

    watcher.abort();
    progress.finish_and_clear();

    let Some(report) = report else {
        println!(
            "{} Nothing to seed: caching or saving is disabled, or the zoom range is empty",
            style("!").yellow()
        );
        return Ok(());
    };

    if args.json {
        println!("{}", report_json(&report, retried.as_ref()));
    } else {
        print_report(&report, retried.as_ref());
    }

    Ok(())
}

fn new_progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    let template = "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}";
    bar.set_style(
        ProgressStyle::with_template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    bar
}

/// Follow seed events on `bus` and mirror them on `bar`.
fn watch_progress(bus: &EventBus, bar: ProgressBar) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(TileEvent::SeedStart(summary)) => {
                    bar.reset();
                    bar.set_length(summary.queue_length as u64);
                    bar.set_message(format!("z{}-{}", summary.min_zoom, summary.max_zoom));
                }
                Ok(TileEvent::SeedProgress {
                    summary,
                    remaining_length,
                }) => {
                    let done = summary.queue_length.saturating_sub(remaining_length);
                    bar.set_position(done as u64);
                }
                Ok(TileEvent::SeedEnd(summary)) => {
                    bar.set_position(summary.queue_length as u64);
                }
                Ok(_) => {}
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// What a `--retry` pass did with the first pass's missed tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RetryPass {
    attempted: usize,
    recovered: usize,
}

impl RetryPass {
    fn new(first: &SeedReport, retry: &SeedReport) -> Self {
        Self {
            attempted: first.missed.len(),
            recovered: first.missed.len().saturating_sub(retry.missed.len()),
        }
    }
}

/// Fold a retry pass into the first pass's report.
///
/// Counts accumulate over both passes; the missed list is whatever the retry
/// still could not fetch.
fn merge_retry(first: SeedReport, retry: SeedReport) -> SeedReport {
    SeedReport {
        summary: first.summary,
        fetched: first.fetched + retry.fetched,
        saved: first.saved + retry.saved,
        skipped: first.skipped + retry.skipped,
        missed: retry.missed,
        cancelled: first.cancelled || retry.cancelled,
    }
}

fn print_report(report: &SeedReport, retried: Option<&RetryPass>) {
    let status = if report.cancelled {
        style("Seeding cancelled").yellow()
    } else if report.missed.is_empty() {
        style("Seeding complete").green()
    } else {
        style("Seeding finished with missed tiles").yellow()
    };

    println!("{}", status);
    println!("  Queued:  {}", report.summary.queue_length);
    println!("  Fetched: {} ({} saved)", report.fetched, report.saved);
    println!("  Skipped: {} (already cached)", report.skipped);
    println!("  Missed:  {}", report.missed.len());
    if let Some(retry) = retried {
        println!(
            "  Retried: {} ({} recovered)",
            retry.attempted, retry.recovered
        );
    }

    if !report.missed.is_empty() {
        println!();
        println!("Missed tiles:");
        for url in report.missed_urls() {
            println!("  {}", url);
        }
    }
}

fn report_json(report: &SeedReport, retried: Option<&RetryPass>) -> serde_json::Value {
    let mut value = json!({
        "summary": report.summary,
        "fetched": report.fetched,
        "saved": report.saved,
        "skipped": report.skipped,
        "missed": report.missed_urls(),
        "cancelled": report.cancelled,
    });
    if let Some(retry) = retried {
        value["retry"] = json!({
            "attempted": retry.attempted,
            "recovered": retry.recovered,
        });
    }
    value
}
