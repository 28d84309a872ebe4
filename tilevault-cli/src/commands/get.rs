//! Get command - resolve a single tile through the cache.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use console::style;
use tilevault::config::{format_size, ConfigFile};
use tilevault::engine::{SaveOutcome, TileOrigin};
use tracing::info;

use super::common::{open_session, parse_tile};
use crate::error::CliError;

/// Arguments for the get command.
#[derive(Debug, Args)]
pub struct GetArgs {
    /// Zoom level
    #[arg(long, short)]
    pub zoom: u8,

    /// Tile column (x)
    #[arg(long, short = 'x')]
    pub col: u32,

    /// Tile row (y)
    #[arg(long, short = 'y')]
    pub row: u32,

    /// Write the image to this file
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

/// Run the get command.
pub async fn run(config: &ConfigFile, args: GetArgs) -> Result<(), CliError> {
    let tile = parse_tile(args.zoom, args.col, args.row)?;
    let session = open_session(config)?;
    let (key, url) = session.layer.tile_request(&tile);

    info!(tile = %tile, key = %key, "Resolving tile");
    let resolved = session.layer.load_tile(&tile).await?;
    let bytes = resolved.image.bytes();

    println!("Tile:   {}", tile);
    println!("Key:    {}", key);
    println!("URL:    {}", url);
    println!("Origin: {}", describe_origin(resolved.origin));
    println!("Saved:  {}", describe_save(&resolved.save));
    println!("Size:   {}", format_size(bytes.len() as u64));

    if let Some(path) = args.output {
        fs::write(&path, &bytes).map_err(|error| CliError::FileWrite {
            path: path.display().to_string(),
            error,
        })?;
        println!();
        println!("{} Wrote {}", style("✓").green(), path.display());
    }

    Ok(())
}

fn describe_origin(origin: TileOrigin) -> String {
    match origin {
        TileOrigin::Cache => style("cache").green().to_string(),
        TileOrigin::Network => style("network").cyan().to_string(),
        TileOrigin::StaleFallback => style("cache (stale, refresh failed)").yellow().to_string(),
        TileOrigin::Placeholder => style("placeholder (not cached)").yellow().to_string(),
    }
}

fn describe_save(outcome: &SaveOutcome) -> String {
    match outcome {
        SaveOutcome::Saved(revision) => format!("yes (revision {})", revision),
        SaveOutcome::Skipped => "no".to_string(),
        SaveOutcome::EncodeFailed => style("failed to encode").red().to_string(),
        SaveOutcome::Conflict => style("lost to a concurrent writer").yellow().to_string(),
        SaveOutcome::StoreFailed => style("store error").red().to_string(),
    }
}
