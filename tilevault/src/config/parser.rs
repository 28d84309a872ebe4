//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! The single place where INI key names are mapped to struct fields.

use std::path::PathBuf;

use ini::{Ini, Properties};

use super::duration::parse_duration;
use super::file::ConfigFileError;
use super::settings::ConfigFile;
use super::size::parse_size;
use crate::coord::MAX_ZOOM;

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_bool(section: &str, key: &str, value: &str) -> Result<bool, ConfigFileError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(invalid(section, key, value, "must be 'true' or 'false'")),
    }
}

/// Returns the trimmed value for `key`, treating blank values as absent.
fn non_empty<'a>(props: &'a Properties, key: &str) -> Option<&'a str> {
    props.get(key).map(str::trim).filter(|v| !v.is_empty())
}

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [source] section
    if let Some(section) = ini.section(Some("source")) {
        if let Some(v) = non_empty(section, "type") {
            let v = v.to_ascii_lowercase();
            if v != "xyz" && v != "wms" {
                return Err(invalid("source", "type", &v, "must be 'xyz' or 'wms'"));
            }
            config.source.kind = v;
        }
        if let Some(v) = non_empty(section, "url") {
            config.source.url = v.to_string();
        }
        if let Some(v) = section.get("subdomains") {
            config.source.subdomains = v.trim().to_string();
        }
        if let Some(v) = non_empty(section, "key") {
            config.source.key = Some(v.to_string());
        }
        if let Some(v) = section.get("retina") {
            config.source.retina = parse_bool("source", "retina", v)?;
        }
        if let Some(v) = section.get("tms") {
            config.source.tms = parse_bool("source", "tms", v)?;
        }
        if let Some(v) = section.get("max_zoom") {
            let zoom: u8 = v
                .trim()
                .parse()
                .map_err(|_| invalid("source", "max_zoom", v, "must be an integer"))?;
            if zoom > MAX_ZOOM {
                return Err(invalid(
                    "source",
                    "max_zoom",
                    v,
                    &format!("must be at most {}", MAX_ZOOM),
                ));
            }
            config.source.max_zoom = zoom;
        }
        if let Some(v) = section.get("layers") {
            config.source.layers = v.trim().to_string();
        }
        if let Some(v) = non_empty(section, "format") {
            config.source.format = v.to_string();
        }
    }

    // [cache] section
    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = section.get("enabled") {
            config.cache.enabled = parse_bool("cache", "enabled", v)?;
        }
        if let Some(v) = section.get("save") {
            config.cache.save = parse_bool("cache", "save", v)?;
        }
        if let Some(v) = section.get("offline") {
            config.cache.offline = parse_bool("cache", "offline", v)?;
        }
        if let Some(v) = section.get("max_age") {
            config.cache.max_age = parse_duration(v).map_err(|_| {
                invalid("cache", "max_age", v, "expected format like '24h', '30m', or '7d'")
            })?;
        }
        if let Some(v) = section.get("size_limit") {
            config.cache.size_limit = parse_size(v).map_err(|_| {
                invalid("cache", "size_limit", v, "expected format like '100MB' or '1GB'")
            })?;
        }
        if let Some(v) = section.get("assumed_tile_size") {
            let size = parse_size(v).map_err(|_| {
                invalid("cache", "assumed_tile_size", v, "expected format like '20KB'")
            })?;
            if size == 0 {
                return Err(invalid("cache", "assumed_tile_size", v, "must be greater than 0"));
            }
            config.cache.assumed_tile_size = size;
        }
    }

    // [store] section
    if let Some(section) = ini.section(Some("store")) {
        if let Some(v) = non_empty(section, "directory") {
            config.store.directory = expand_tilde(v);
        }
    }

    // [download] section
    if let Some(section) = ini.section(Some("download")) {
        if let Some(v) = section.get("timeout") {
            let timeout: u64 = v
                .trim()
                .parse()
                .map_err(|_| invalid("download", "timeout", v, "must be a positive integer (seconds)"))?;
            if timeout == 0 {
                return Err(invalid("download", "timeout", v, "must be a positive integer (seconds)"));
            }
            config.download.timeout = timeout;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = non_empty(section, "directory") {
            config.logging.directory = expand_tilde(v);
        }
    }

    Ok(config)
}

/// Expand a leading `~/` to the home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn parse(content: &str) -> Result<ConfigFile, ConfigFileError> {
        parse_ini(&Ini::load_from_str(content).unwrap())
    }

    #[test]
    fn test_empty_ini_is_default() {
        assert_eq!(parse("").unwrap(), ConfigFile::default());
    }

    #[test]
    fn test_parse_all_sections() {
        let config = parse(
            r#"
[source]
url = https://{s}.tiles.example/{z}/{x}/{y}{r}.png
subdomains = 1234
key = example/{z}/{x}/{y}
retina = yes
tms = true
max_zoom = 17

[cache]
enabled = true
save = false
offline = on
max_age = 7d
size_limit = 50MB
assumed_tile_size = 16KB

[store]
directory = /var/cache/tiles

[download]
timeout = 10

[logging]
directory = /tmp/tilevault-logs
"#,
        )
        .unwrap();

        assert_eq!(config.source.subdomains, "1234");
        assert_eq!(config.source.key.as_deref(), Some("example/{z}/{x}/{y}"));
        assert!(config.source.retina);
        assert!(config.source.tms);
        assert_eq!(config.source.max_zoom, 17);
        assert!(!config.cache.save);
        assert!(config.cache.offline);
        assert_eq!(config.cache.max_age, Duration::from_secs(7 * 86_400));
        assert_eq!(config.cache.size_limit, 50 * 1024 * 1024);
        assert_eq!(config.cache.assumed_tile_size, 16 * 1024);
        assert_eq!(config.store.directory, PathBuf::from("/var/cache/tiles"));
        assert_eq!(config.download.timeout, 10);
        assert_eq!(config.logging.directory, PathBuf::from("/tmp/tilevault-logs"));
    }

    #[test]
    fn test_blank_key_keeps_default() {
        let config = parse("[source]\nkey =\n").unwrap();
        assert!(config.source.key.is_none());
    }

    #[test]
    fn test_invalid_values_name_section_and_key() {
        let err = parse("[cache]\nmax_age = soon\n").unwrap_err();
        match err {
            ConfigFileError::InvalidValue { section, key, value, .. } => {
                assert_eq!(section, "cache");
                assert_eq!(key, "max_age");
                assert_eq!(value, "soon");
            }
            other => panic!("unexpected error: {other}"),
        }

        assert!(parse("[source]\ntype = tms\n").is_err());
        assert!(parse("[source]\nmax_zoom = 30\n").is_err());
        assert!(parse("[cache]\nsave = maybe\n").is_err());
        assert!(parse("[cache]\nassumed_tile_size = 0\n").is_err());
        assert!(parse("[download]\ntimeout = 0\n").is_err());
    }

    #[test]
    fn test_expand_tilde() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/tiles"), home.join("tiles"));
        }
        assert_eq!(expand_tilde("/abs/tiles"), PathBuf::from("/abs/tiles"));
    }
}
