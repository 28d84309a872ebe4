//! Seed queue planning.

use tracing::debug;

use crate::config::CacheConfig;
use crate::coord::{BoundingBox, TileCoord, TileGrid};
use crate::source::TileSource;
use crate::store::TileKey;

use super::SeedError;

/// One queued tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedItem {
    pub tile: TileCoord,
    pub key: TileKey,
    pub url: String,
}

/// An ordered seed queue for a region.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedPlan {
    pub bbox: BoundingBox,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub items: Vec<SeedItem>,
}

impl SeedPlan {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Build the seed queue for `bbox` over `min_zoom..=max_zoom`.
///
/// Zoom levels are visited from `max_zoom` down to `min_zoom`; within a level
/// tiles are ordered row by row, columns ascending. The running tile count is
/// checked against [`CacheConfig::max_tiles`] after each level, before any
/// tile of that level is queued. Levels above the source's maximum zoom are
/// skipped and do not count against the budget.
///
/// # Errors
///
/// - [`SeedError::SizeLimitExceeded`] if the budget is exceeded
/// - [`SeedError::Coord`] if a zoom level is out of range
pub fn plan_seed(
    grid: &TileGrid,
    source: &dyn TileSource,
    config: &CacheConfig,
    bbox: &BoundingBox,
    min_zoom: u8,
    max_zoom: u8,
) -> Result<SeedPlan, SeedError> {
    let max_tiles = config.max_tiles();
    let mut tile_count: u64 = 0;
    let mut items = Vec::new();

    for zoom in (min_zoom..=max_zoom).rev() {
        let range = grid.tile_range(bbox, zoom)?;
        if zoom > source.max_zoom() {
            debug!(
                zoom = zoom,
                max_zoom = source.max_zoom(),
                "Skipping level above source maximum"
            );
            continue;
        }
        tile_count += range.len();

        if tile_count > max_tiles {
            return Err(SeedError::SizeLimitExceeded {
                tile_count,
                max_tiles,
                size_limit_bytes: config.size_limit_bytes,
            });
        }

        debug!(zoom = zoom, tiles = range.len(), "Planned seed level");
        items.extend(range.tiles().map(|tile| SeedItem {
            key: source.tile_key(&tile),
            url: source.tile_url(&tile),
            tile,
        }));
    }

    Ok(SeedPlan {
        bbox: *bbox,
        min_zoom,
        max_zoom,
        items,
    })
}
