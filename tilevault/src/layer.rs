//! Cached tile layer.
//!
//! Binds a [`TileSource`] to a [`TileCacheEngine`] and carries the per-layer
//! state seeding needs: the attached [`TileGrid`] and the last seed report.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::coord::{BoundingBox, TileCoord, TileGrid};
use crate::engine::{ResolveError, ResolvedTile, TileCacheEngine};
use crate::events::SeedSummary;
use crate::seed::{plan_seed, run_seed, SeedError, SeedReport};
use crate::source::TileSource;
use crate::store::TileKey;

/// A tile layer whose tiles go through the cache.
pub struct CachedTileLayer {
    engine: Arc<TileCacheEngine>,
    source: Arc<dyn TileSource>,
    grid: RwLock<Option<TileGrid>>,
    last_report: Mutex<Option<SeedReport>>,
}

impl CachedTileLayer {
    /// Creates a detached layer. Seeding is a no-op until a grid is attached.
    pub fn new(engine: Arc<TileCacheEngine>, source: Arc<dyn TileSource>) -> Self {
        Self {
            engine,
            source,
            grid: RwLock::new(None),
            last_report: Mutex::new(None),
        }
    }

    pub fn engine(&self) -> &Arc<TileCacheEngine> {
        &self.engine
    }

    pub fn source(&self) -> &Arc<dyn TileSource> {
        &self.source
    }

    pub fn attach(&self, grid: TileGrid) {
        *self.grid.write() = Some(grid);
    }

    pub fn detach(&self) {
        *self.grid.write() = None;
    }

    pub fn grid(&self) -> Option<TileGrid> {
        *self.grid.read()
    }

    /// Cache key and fetch URL of `tile`.
    pub fn tile_request(&self, tile: &TileCoord) -> (TileKey, String) {
        (self.source.tile_key(tile), self.source.tile_url(tile))
    }

    /// Resolve one tile through the engine.
    pub async fn load_tile(&self, tile: &TileCoord) -> Result<ResolvedTile, ResolveError> {
        tile.validate().map_err(|e| ResolveError::InvalidRequest(e.to_string()))?;
        let max_zoom = self.source.max_zoom();
        if tile.zoom > max_zoom {
            return Err(ResolveError::InvalidRequest(format!(
                "zoom {} exceeds source maximum {}",
                tile.zoom, max_zoom
            )));
        }

        let (key, url) = self.tile_request(tile);
        self.engine.resolve_tile(&key, &url).await
    }

    /// Seed `bbox` from `max_zoom` down to `min_zoom`.
    ///
    /// Returns `Ok(None)` without doing anything when caching or saving is
    /// disabled, when `min_zoom > max_zoom`, or when no grid is attached.
    ///
    /// # Errors
    ///
    /// [`SeedError`] if the region cannot be planned. Per-tile failures are
    /// reported in [`SeedReport::missed`] instead.
    pub async fn seed(
        &self,
        bbox: BoundingBox,
        min_zoom: u8,
        max_zoom: u8,
        cancel: &CancellationToken,
    ) -> Result<Option<SeedReport>, SeedError> {
        let config = self.engine.config();
        if !config.use_cache || !config.save_to_cache {
            debug!("Seeding skipped, caching disabled");
            return Ok(None);
        }
        if min_zoom > max_zoom {
            debug!(min_zoom, max_zoom, "Seeding skipped, empty zoom range");
            return Ok(None);
        }
        let Some(grid) = self.grid() else {
            debug!("Seeding skipped, no tile grid attached");
            return Ok(None);
        };

        let plan = plan_seed(&grid, self.source.as_ref(), config, &bbox, min_zoom, max_zoom)?;
        let summary = SeedSummary {
            bbox,
            min_zoom,
            max_zoom,
            queue_length: plan.len(),
        };

        let report = run_seed(&self.engine, summary, plan.items, cancel).await;
        *self.last_report.lock() = Some(report.clone());
        Ok(Some(report))
    }

    /// Re-run the tiles missed by the last seed job.
    ///
    /// Returns `None` when caching is disabled or there is nothing to retry.
    pub async fn retry_missed(&self, cancel: &CancellationToken) -> Option<SeedReport> {
        let config = self.engine.config();
        if !config.use_cache || !config.save_to_cache {
            return None;
        }

        let (summary, items) = {
            let last = self.last_report.lock();
            let last = last.as_ref().filter(|report| !report.missed.is_empty())?;
            let summary = SeedSummary {
                queue_length: last.missed.len(),
                ..last.summary.clone()
            };
            (summary, last.missed.clone())
        };

        let report = run_seed(&self.engine, summary, items, cancel).await;
        *self.last_report.lock() = Some(report.clone());
        Some(report)
    }

    pub fn last_report(&self) -> Option<SeedReport> {
        self.last_report.lock().clone()
    }

    /// URLs missed by the last seed job.
    pub fn last_missed_tiles(&self) -> Vec<String> {
        self.last_report
            .lock()
            .as_ref()
            .map(|report| report.missed.iter().map(|item| item.url.clone()).collect())
            .unwrap_or_default()
    }
}
