//! INI serialization logic for converting `ConfigFile` → INI string.

use std::path::Path;

use super::duration::format_duration;
use super::settings::ConfigFile;
use super::size::format_size;

fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let key = config.source.key.as_deref().unwrap_or("");

    format!(
        r#"[source]
; Source type:
;   xyz - URL template with {{z}}, {{x}}, {{y}}, {{s}} (subdomain), {{r}} (@2x on retina), {{-y}} (TMS row)
;   wms - WMS GetMap endpoint (url is the service base URL)
type = {}
url = {}
; Letters substituted for {{s}}, chosen per tile
subdomains = {}
; Cache key template. Empty means the URL itself is the key
key = {}
retina = {}
; Flip rows for TMS servers
tms = {}
max_zoom = {}
; WMS only
layers = {}
format = {}

[cache]
; Consult the cache at all
enabled = {}
; Write fetched tiles back
save = {}
; Never touch the network. Missing tiles become transparent placeholders
offline = {}
; Tiles older than this are refetched (supports s, m, h, d)
max_age = {}
; Seeding budget (supports KB, MB, GB)
size_limit = {}
; Average tile size used to turn the budget into a tile count
assumed_tile_size = {}

[store]
directory = {}

[download]
; Request timeout in seconds
timeout = {}

[logging]
directory = {}
"#,
        config.source.kind,
        config.source.url,
        config.source.subdomains,
        key,
        config.source.retina,
        config.source.tms,
        config.source.max_zoom,
        config.source.layers,
        config.source.format,
        config.cache.enabled,
        config.cache.save,
        config.cache.offline,
        format_duration(config.cache.max_age),
        format_size(config.cache.size_limit),
        format_size(config.cache.assumed_tile_size),
        path_to_string(&config.store.directory),
        config.download.timeout,
        path_to_string(&config.logging.directory),
    )
}
