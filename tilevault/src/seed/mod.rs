//! Bulk seeding of a geographic region.
//!
//! Seeding walks a bounding box across a zoom range and fills the cache one
//! tile at a time through the [`TileCacheEngine`](crate::engine::TileCacheEngine).
//!
//! # Phases
//!
//! 1. **Plan** ([`plan_seed`]): enumerate tiles from the highest zoom down,
//!    rows then columns, and abort if the tile count exceeds the size budget
//! 2. **Run** ([`run_seed`]): emit `seedstart`, then for each item emit
//!    `seedprogress`, skip it if any entry exists, otherwise fetch and save;
//!    emit `seedend` and return a [`SeedReport`]
//!
//! Items are processed strictly in order; item N+1 starts after item N's save
//! or skip completes. A failed fetch is recorded in the report's missed list
//! and never stops the traversal.

mod plan;
mod runner;

pub use plan::{plan_seed, SeedItem, SeedPlan};
pub use runner::{run_seed, SeedReport};

use thiserror::Error;

use crate::coord::CoordError;

/// Errors that abort a seed job before any fetch.
#[derive(Debug, Error)]
pub enum SeedError {
    /// The region holds more tiles than the size budget allows.
    #[error(
        "Seeding would queue at least {tile_count} tiles, more than the {max_tiles} allowed by the {size_limit_bytes} byte limit"
    )]
    SizeLimitExceeded {
        tile_count: u64,
        max_tiles: u64,
        size_limit_bytes: u64,
    },

    /// The bounding box or zoom range is not representable.
    #[error("Invalid seed region: {0}")]
    Coord(#[from] CoordError),
}
