//! Inspect command - show what the store holds for a tile.

use clap::Args;
use console::style;
use serde_json::json;
use tilevault::clock::{Clock, SystemClock};
use tilevault::config::{format_duration, format_size, ConfigFile};
use tilevault::store::TileStore;

use super::common::{build_source, open_store, parse_tile};
use crate::error::CliError;

/// Arguments for the inspect command.
#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Zoom level
    #[arg(long, short)]
    pub zoom: u8,

    /// Tile column (x)
    #[arg(long, short = 'x')]
    pub col: u32,

    /// Tile row (y)
    #[arg(long, short = 'y')]
    pub row: u32,

    /// Print machine-readable JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the inspect command. Never touches the network.
pub async fn run(config: &ConfigFile, args: InspectArgs) -> Result<(), CliError> {
    let tile = parse_tile(args.zoom, args.col, args.row)?;
    let source = build_source(&config.source)?;
    let store = open_store(&config.store.directory)?;
    let cache = config.cache.to_cache_config();

    let key = source.tile_key(&tile);
    let stored = store.get(&key, true).await?;
    let now = SystemClock.now_millis();

    if args.json {
        let value = match &stored {
            Some(stored) => json!({
                "key": key.as_str(),
                "cached": true,
                "timestamp": stored.entry.timestamp,
                "ageMillis": stored.entry.age_millis(now),
                "fresh": cache.is_fresh(stored.entry.timestamp, now),
                "bytes": stored.entry.payload.len(),
                "revision": stored.revision.as_str(),
                "history": stored.history.iter().map(|r| r.as_str()).collect::<Vec<_>>(),
            }),
            None => json!({ "key": key.as_str(), "cached": false }),
        };
        println!("{}", value);
        return Ok(());
    }

    println!("Tile: {}", tile);
    println!("Key:  {}", key);

    let Some(stored) = stored else {
        println!("{}", style("Not cached").yellow());
        return Ok(());
    };

    let age = stored.entry.age_millis(now);
    let freshness = if cache.is_fresh(stored.entry.timestamp, now) {
        style("fresh").green()
    } else {
        style("stale").yellow()
    };

    println!("Stored:   {} ago ({})", human_age(age), freshness);
    println!("Max age:  {}", format_duration(cache.max_age));
    println!("Size:     {}", format_size(stored.entry.payload.len() as u64));
    println!("Revision: {}", stored.revision);
    if !stored.history.is_empty() {
        println!("History:");
        for revision in &stored.history {
            println!("  {}", revision);
        }
    }

    Ok(())
}

/// Render an age in milliseconds as e.g. `2d 3h 4m`.
fn human_age(millis: i64) -> String {
    let secs = millis.max(0) / 1000;
    let (days, hours, minutes, seconds) = (
        secs / 86_400,
        (secs % 86_400) / 3_600,
        (secs % 3_600) / 60,
        secs % 60,
    );

    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
