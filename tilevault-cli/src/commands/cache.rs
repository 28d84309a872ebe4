//! Cache management CLI commands.

use clap::Subcommand;
use tilevault::config::{format_size, ConfigFile};

use super::common::open_store;
use crate::error::CliError;

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Remove every cached tile
    Clear,
    /// Show tile store statistics
    Stats,
}

/// Run a cache subcommand.
pub fn run(config: &ConfigFile, action: CacheAction) -> Result<(), CliError> {
    let store = open_store(&config.store.directory)?;

    match action {
        CacheAction::Clear => {
            println!("Clearing tile store at: {}", store.root().display());
            let removed = store.clear()?;
            println!(
                "Deleted {} tiles, freed {}",
                removed.entries,
                format_size(removed.bytes)
            );
        }
        CacheAction::Stats => {
            let stats = store.stats()?;
            let limit = config.cache.size_limit;

            println!("Tile store: {}", store.root().display());
            println!("  Tiles: {}", stats.entries);
            println!("  Size:  {}", format_size(stats.bytes));
            println!("  Seed budget: {} per job", format_size(limit));
        }
    }

    Ok(())
}
