//! WMS GetMap tile source.

use crate::coord::{tile_mercator_bounds, TileCoord, DEFAULT_TILE_SIZE, MAX_ZOOM};
use crate::store::TileKey;

use super::TileSource;

pub const WMS_DEFAULT_VERSION: &str = "1.1.1";
pub const WMS_DEFAULT_FORMAT: &str = "image/png";

/// Requests each tile as a `GetMap` image covering the tile's Web Mercator
/// bounds.
///
/// Version 1.3.0 uses the `crs` parameter, earlier versions `srs`. The cache
/// key is the full request URL unless a key prefix is set, in which case it is
/// `{prefix}/{z}/{x}/{y}`.
#[derive(Debug, Clone)]
pub struct WmsSource {
    base_url: String,
    layers: String,
    styles: String,
    format: String,
    version: String,
    transparent: bool,
    tile_size: u32,
    key_prefix: Option<String>,
}

impl WmsSource {
    pub fn new(base_url: impl Into<String>, layers: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            layers: layers.into(),
            styles: String::new(),
            format: WMS_DEFAULT_FORMAT.to_string(),
            version: WMS_DEFAULT_VERSION.to_string(),
            transparent: false,
            tile_size: DEFAULT_TILE_SIZE,
            key_prefix: None,
        }
    }

    pub fn with_styles(mut self, styles: impl Into<String>) -> Self {
        self.styles = styles.into();
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_transparent(mut self, transparent: bool) -> Self {
        self.transparent = transparent;
        self
    }

    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size;
        self
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    fn crs_param(&self) -> &'static str {
        if self.version.as_str() >= "1.3" {
            "crs"
        } else {
            "srs"
        }
    }
}

impl TileSource for WmsSource {
    fn tile_url(&self, tile: &TileCoord) -> String {
        let (min_x, min_y, max_x, max_y) = tile_mercator_bounds(tile);
        let separator = if self.base_url.contains('?') { '&' } else { '?' };

        format!(
            "{}{}service=WMS&request=GetMap&version={}&layers={}&styles={}&format={}&transparent={}&width={}&height={}&{}=EPSG:3857&bbox={:.6},{:.6},{:.6},{:.6}",
            self.base_url,
            separator,
            self.version,
            self.layers,
            self.styles,
            self.format,
            self.transparent,
            self.tile_size,
            self.tile_size,
            self.crs_param(),
            min_x,
            min_y,
            max_x,
            max_y,
        )
    }

    fn tile_key(&self, tile: &TileCoord) -> TileKey {
        match &self.key_prefix {
            Some(prefix) => TileKey::new(format!("{}/{}", prefix, tile)),
            None => TileKey::new(self.tile_url(tile)),
        }
    }

    fn max_zoom(&self) -> u8 {
        MAX_ZOOM
    }

    fn name(&self) -> &str {
        "wms"
    }
}
