//! Tile sources.
//!
//! A [`TileSource`] turns a tile coordinate into the URL the tile is fetched
//! from and the [`TileKey`] it is cached under. The engine never builds URLs
//! itself, so new server protocols only need a new source.
//!
//! # Implementations
//!
//! - [`TemplateSource`]: `{z}/{x}/{y}` URL templates (OSM style, TMS, retina)
//! - [`WmsSource`]: OGC WMS `GetMap` requests in EPSG:3857
//!
//! # Example
//!
//! ```
//! use tilevault::coord::TileCoord;
//! use tilevault::source::{TemplateSource, TileSource};
//!
//! let source = TemplateSource::new("https://{s}.tile.example/{z}/{x}/{y}.png")
//!     .with_subdomains("abc");
//! let tile = TileCoord::new(3, 4, 2);
//! assert_eq!(source.tile_url(&tile), "https://a.tile.example/3/4/2.png");
//! ```

mod template;
mod wms;

pub use template::TemplateSource;
pub use wms::{WmsSource, WMS_DEFAULT_FORMAT, WMS_DEFAULT_VERSION};

use crate::coord::{TileCoord, MAX_ZOOM};
use crate::store::TileKey;

/// Maps tile coordinates to fetch URLs and cache keys.
///
/// Both mappings must be deterministic: the same coordinate always yields the
/// same URL and the same key.
pub trait TileSource: Send + Sync {
    /// URL the tile is fetched from.
    fn tile_url(&self, tile: &TileCoord) -> String;

    /// Key the tile is cached under. Defaults to the URL.
    fn tile_key(&self, tile: &TileCoord) -> TileKey {
        TileKey::new(self.tile_url(tile))
    }

    /// Highest zoom level the source serves.
    fn max_zoom(&self) -> u8 {
        MAX_ZOOM
    }

    /// Short name for logs.
    fn name(&self) -> &str;
}
