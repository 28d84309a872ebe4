//! TileVault - persistent raster tile cache
//!
//! Caches remotely fetched map tiles in a local store so previously seen tiles
//! are served without a network round trip, stale tiles are refreshed when
//! possible and served anyway when not, and whole regions can be prefetched
//! ahead of time.
//!
//! # High-Level API
//!
//! [`layer::CachedTileLayer`] ties a tile source to the cache engine:
//!
//! ```ignore
//! use std::sync::Arc;
//! use tilevault::coord::{BoundingBox, TileCoord, TileGrid};
//! use tilevault::engine::TileCacheEngine;
//! use tilevault::fetch::HttpFetcher;
//! use tilevault::layer::CachedTileLayer;
//! use tilevault::source::TemplateSource;
//! use tilevault::store::DiskStore;
//!
//! let store = Arc::new(DiskStore::open("/var/cache/tiles")?);
//! let engine = TileCacheEngine::builder(store, Arc::new(HttpFetcher::new()?)).build();
//! let source = TemplateSource::new("https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png")
//!     .with_subdomains("abc");
//! let layer = CachedTileLayer::new(Arc::new(engine), Arc::new(source));
//!
//! let tile = layer.load_tile(&TileCoord::new(5, 3, 2)).await?;
//!
//! layer.attach(TileGrid::default());
//! let report = layer.seed(bbox, 10, 14, &cancel).await?;
//! ```

pub mod clock;
pub mod codec;
pub mod config;
pub mod coord;
pub mod engine;
pub mod events;
pub mod fetch;
pub mod layer;
pub mod logging;
pub mod seed;
pub mod source;
pub mod store;

/// Version of the TileVault library and CLI.
///
/// Synchronized across the workspace; defined in `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
