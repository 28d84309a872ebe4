//! URL-template tile source.

use crate::coord::{TileCoord, MAX_ZOOM};
use crate::store::TileKey;

use super::TileSource;

/// Expands `{z}`, `{x}`, `{y}`, `{-y}`, `{s}` and `{r}` in a URL template.
///
/// - `{s}` is one of the configured subdomains, chosen by `(x + y) % n` so a
///   tile always maps to the same host
/// - `{r}` is `@2x` when retina tiles are requested, empty otherwise
/// - `{-y}` is the TMS row (counted from the south); with `tms` enabled `{y}`
///   is flipped as well
///
/// An optional key template uses the same placeholders. Without one the
/// expanded URL is the cache key.
#[derive(Debug, Clone)]
pub struct TemplateSource {
    url_template: String,
    key_template: Option<String>,
    subdomains: Vec<String>,
    retina: bool,
    tms: bool,
    max_zoom: u8,
}

impl TemplateSource {
    pub fn new(url_template: impl Into<String>) -> Self {
        Self {
            url_template: url_template.into(),
            key_template: None,
            subdomains: Vec::new(),
            retina: false,
            tms: false,
            max_zoom: MAX_ZOOM,
        }
    }

    /// Subdomains as a string of single letters, e.g. `"abc"`.
    pub fn with_subdomains(mut self, subdomains: &str) -> Self {
        self.subdomains = subdomains.chars().map(String::from).collect();
        self
    }

    /// Subdomains as whole host labels.
    pub fn with_subdomain_list<I, S>(mut self, subdomains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subdomains = subdomains.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_key_template(mut self, template: impl Into<String>) -> Self {
        self.key_template = Some(template.into());
        self
    }

    pub fn with_retina(mut self, retina: bool) -> Self {
        self.retina = retina;
        self
    }

    pub fn with_tms(mut self, tms: bool) -> Self {
        self.tms = tms;
        self
    }

    pub fn with_max_zoom(mut self, max_zoom: u8) -> Self {
        self.max_zoom = max_zoom.min(MAX_ZOOM);
        self
    }

    pub fn url_template(&self) -> &str {
        &self.url_template
    }

    fn subdomain(&self, tile: &TileCoord) -> &str {
        if self.subdomains.is_empty() {
            return "";
        }
        let index = (u64::from(tile.col) + u64::from(tile.row)) % self.subdomains.len() as u64;
        &self.subdomains[index as usize]
    }

    /// Row counted from the south. Saturates at 0 for rows outside the grid.
    fn inverted_row(tile: &TileCoord) -> u64 {
        tile.grid_size()
            .saturating_sub(1)
            .saturating_sub(u64::from(tile.row))
    }

    fn expand(&self, template: &str, tile: &TileCoord) -> String {
        let row = if self.tms {
            Self::inverted_row(tile)
        } else {
            u64::from(tile.row)
        };

        let mut url = template
            .replace("{z}", &tile.zoom.to_string())
            .replace("{x}", &tile.col.to_string());
        if url.contains("{-y}") {
            url = url.replace("{-y}", &Self::inverted_row(tile).to_string());
        }
        url.replace("{y}", &row.to_string())
            .replace("{s}", self.subdomain(tile))
            .replace("{r}", if self.retina { "@2x" } else { "" })
    }
}

impl TileSource for TemplateSource {
    fn tile_url(&self, tile: &TileCoord) -> String {
        self.expand(&self.url_template, tile)
    }

    fn tile_key(&self, tile: &TileCoord) -> TileKey {
        match &self.key_template {
            Some(template) => TileKey::new(self.expand(template, tile)),
            None => TileKey::new(self.tile_url(tile)),
        }
    }

    fn max_zoom(&self) -> u8 {
        self.max_zoom
    }

    fn name(&self) -> &str {
        "template"
    }
}
