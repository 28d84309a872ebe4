//! Common types and utilities shared across CLI commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tilevault::config::{config_file_path, ConfigFile, SourceSettings};
use tilevault::coord::TileCoord;
use tilevault::engine::TileCacheEngine;
use tilevault::events::{EventBus, FanoutSink, TracingSink};
use tilevault::fetch::HttpFetcher;
use tilevault::layer::CachedTileLayer;
use tilevault::source::{TemplateSource, TileSource, WmsSource};
use tilevault::store::DiskStore;

use crate::error::CliError;

/// Flags accepted by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct GlobalArgs {
    pub config: Option<PathBuf>,
    pub offline: bool,
    pub no_save: bool,
    pub url: Option<String>,
}

impl GlobalArgs {
    /// The config file in effect: `--config` or `~/.tilevault/config.ini`.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(config_file_path)
    }
}

/// Load the config file and apply command-line overrides.
pub fn load_config(args: &GlobalArgs) -> Result<ConfigFile, CliError> {
    let mut config = ConfigFile::load_from(&args.config_path())?;
    apply_overrides(&mut config, args);
    Ok(config)
}

/// CLI flags take precedence over the file.
fn apply_overrides(config: &mut ConfigFile, args: &GlobalArgs) {
    if args.offline {
        config.cache.offline = true;
    }
    if args.no_save {
        config.cache.save = false;
    }
    if let Some(url) = &args.url {
        config.source.url = url.clone();
    }
}

/// Build the tile source described by `[source]`.
pub fn build_source(settings: &SourceSettings) -> Result<Arc<dyn TileSource>, CliError> {
    match settings.kind.as_str() {
        "xyz" => {
            let mut source = TemplateSource::new(settings.url.clone())
                .with_subdomains(&settings.subdomains)
                .with_retina(settings.retina)
                .with_tms(settings.tms)
                .with_max_zoom(settings.max_zoom);
            if let Some(key) = &settings.key {
                source = source.with_key_template(key.clone());
            }
            Ok(Arc::new(source))
        }
        "wms" => {
            if settings.layers.is_empty() {
                return Err(CliError::Config(
                    "WMS source requires layers in the [source] section".to_string(),
                ));
            }
            let mut source = WmsSource::new(settings.url.clone(), settings.layers.clone())
                .with_format(settings.format.clone());
            if let Some(prefix) = &settings.key {
                source = source.with_key_prefix(prefix.clone());
            }
            Ok(Arc::new(source))
        }
        other => Err(CliError::Config(format!(
            "Unknown source type '{}' (expected xyz or wms)",
            other
        ))),
    }
}

/// A cached layer over the on-disk store, plus the bus its events go to.
pub struct Session {
    pub layer: CachedTileLayer,
    pub store: Arc<DiskStore>,
    pub bus: EventBus,
}

/// Open the disk store and wire a layer to it.
///
/// Events are logged through `tracing` and also broadcast on
/// [`Session::bus`] for commands that want to follow progress.
pub fn open_session(config: &ConfigFile) -> Result<Session, CliError> {
    let store = open_store(&config.store.directory)?;
    let fetcher = HttpFetcher::with_timeout(config.download.timeout).map_err(CliError::Http)?;
    let bus = EventBus::default();
    let events = FanoutSink::default()
        .with(Arc::new(TracingSink))
        .with(Arc::new(bus.clone()));

    let engine = TileCacheEngine::builder(store.clone(), Arc::new(fetcher))
        .events(Arc::new(events))
        .config(config.cache.to_cache_config())
        .build();
    let source = build_source(&config.source)?;

    Ok(Session {
        layer: CachedTileLayer::new(Arc::new(engine), source),
        store,
        bus,
    })
}

pub fn open_store(directory: &Path) -> Result<Arc<DiskStore>, CliError> {
    Ok(Arc::new(DiskStore::open(directory)?))
}

/// Builds a tile from `-z/-x/-y`, rejecting positions outside the grid.
pub fn parse_tile(zoom: u8, col: u32, row: u32) -> Result<TileCoord, CliError> {
    let tile = TileCoord::new(zoom, col, row);
    tile.validate().map_err(CliError::InvalidTile)?;
    Ok(tile)
}
