//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file. Pure data;
//! parsing lives in `parser`, serialization in `writer`.

use std::path::PathBuf;
use std::time::Duration;

use super::cache::{CacheConfig, DEFAULT_ASSUMED_TILE_BYTES, DEFAULT_MAX_AGE, DEFAULT_SIZE_LIMIT_BYTES};
use super::file::config_directory;
use crate::coord::MAX_ZOOM;
use crate::fetch::DEFAULT_TIMEOUT_SECS;

/// Default tile URL template (OpenStreetMap standard layer).
pub const DEFAULT_SOURCE_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";

/// Default subdomain letters for `{s}`.
pub const DEFAULT_SUBDOMAINS: &str = "abc";

/// Default maximum zoom served by the source.
pub const DEFAULT_SOURCE_MAX_ZOOM: u8 = 19;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub source: SourceSettings,
    pub cache: CacheSettings,
    pub store: StoreSettings,
    pub download: DownloadSettings,
    pub logging: LoggingSettings,
}

/// `[source]`: where tiles come from and how they are keyed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSettings {
    /// `xyz` for URL templates, `wms` for a GetMap endpoint.
    pub kind: String,
    /// URL template (xyz) or service base URL (wms).
    pub url: String,
    /// Letters substituted for `{s}`.
    pub subdomains: String,
    /// Optional cache key template. Defaults to the URL template.
    pub key: Option<String>,
    /// Request `@2x` tiles.
    pub retina: bool,
    /// Flip rows for TMS servers.
    pub tms: bool,
    pub max_zoom: u8,
    /// WMS layer list.
    pub layers: String,
    /// WMS image format.
    pub format: String,
}

/// `[cache]`: mirrors [`CacheConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    pub enabled: bool,
    pub save: bool,
    pub offline: bool,
    pub max_age: Duration,
    pub size_limit: u64,
    pub assumed_tile_size: u64,
}

/// `[store]`: where the on-disk store lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    pub directory: PathBuf,
}

/// `[download]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSettings {
    /// Request timeout in seconds.
    pub timeout: u64,
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    pub directory: PathBuf,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            source: SourceSettings::default(),
            cache: CacheSettings::default(),
            store: StoreSettings::default(),
            download: DownloadSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            kind: "xyz".to_string(),
            url: DEFAULT_SOURCE_URL.to_string(),
            subdomains: DEFAULT_SUBDOMAINS.to_string(),
            key: None,
            retina: false,
            tms: false,
            max_zoom: DEFAULT_SOURCE_MAX_ZOOM.min(MAX_ZOOM),
            layers: String::new(),
            format: "image/png".to_string(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            save: true,
            offline: false,
            max_age: DEFAULT_MAX_AGE,
            size_limit: DEFAULT_SIZE_LIMIT_BYTES,
            assumed_tile_size: DEFAULT_ASSUMED_TILE_BYTES,
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            directory: config_directory().join("tiles"),
        }
    }
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: config_directory().join("logs"),
        }
    }
}

impl CacheSettings {
    /// The layer policy these settings describe.
    pub fn to_cache_config(&self) -> CacheConfig {
        CacheConfig::default()
            .with_use_cache(self.enabled)
            .with_save_to_cache(self.save)
            .with_use_only_cache(self.offline)
            .with_max_age(self.max_age)
            .with_size_limit_bytes(self.size_limit)
            .with_assumed_tile_bytes(self.assumed_tile_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cache_settings_match_cache_config() {
        assert_eq!(
            CacheSettings::default().to_cache_config(),
            CacheConfig::default()
        );
    }

    #[test]
    fn test_default_source_is_osm() {
        let source = SourceSettings::default();
        assert_eq!(source.kind, "xyz");
        assert!(source.url.contains("{z}/{x}/{y}"));
        assert_eq!(source.max_zoom, 19);
    }
}
