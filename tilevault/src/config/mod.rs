//! Configuration types for TileVault.
//!
//! [`CacheConfig`] is the read-only policy a layer runs with. [`ConfigFile`]
//! is the user-facing `~/.tilevault/config.ini` that the CLI loads and turns
//! into a `CacheConfig`, a tile source and a store location.
//!
//! # Example
//!
//! ```
//! use tilevault::config::CacheConfig;
//! use std::time::Duration;
//!
//! let config = CacheConfig::default()
//!     .with_max_age(Duration::from_secs(3600))
//!     .with_size_limit_mb(50);
//! assert_eq!(config.max_tiles(), 50 * 1024 * 1024 / (20 * 1024));
//! ```

mod cache;
mod duration;
mod file;
mod parser;
mod settings;
mod size;
mod writer;

pub use cache::{
    CacheConfig, DEFAULT_ASSUMED_TILE_BYTES, DEFAULT_MAX_AGE, DEFAULT_SIZE_LIMIT_BYTES,
};
pub use duration::{format_duration, parse_duration, DurationParseError};
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{
    CacheSettings, ConfigFile, DownloadSettings, LoggingSettings, SourceSettings, StoreSettings,
    DEFAULT_SOURCE_URL,
};
pub use size::{format_size, parse_size, SizeParseError};
