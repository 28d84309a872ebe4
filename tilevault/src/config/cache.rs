//! Cache policy for a layer.

use std::time::Duration;

/// Entries older than this are refetched (24 hours).
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(24 * 3600);

/// Seeding budget (100MB).
pub const DEFAULT_SIZE_LIMIT_BYTES: u64 = 100 * 1024 * 1024;

/// Average tile size used to turn the byte budget into a tile count (20KB).
pub const DEFAULT_ASSUMED_TILE_BYTES: u64 = 20 * 1024;

/// Cache behaviour of a layer instance.
///
/// Read-only once the layer is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Consult the store at all. When false the engine is a plain fetcher.
    pub use_cache: bool,
    /// Write fetched tiles back to the store.
    pub save_to_cache: bool,
    /// Never touch the network; misses resolve to a placeholder.
    pub use_only_cache: bool,
    /// Freshness window of a stored entry.
    pub max_age: Duration,
    /// Seeding budget in bytes.
    pub size_limit_bytes: u64,
    pub assumed_tile_bytes: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            use_cache: true,
            save_to_cache: true,
            use_only_cache: false,
            max_age: DEFAULT_MAX_AGE,
            size_limit_bytes: DEFAULT_SIZE_LIMIT_BYTES,
            assumed_tile_bytes: DEFAULT_ASSUMED_TILE_BYTES,
        }
    }
}

impl CacheConfig {
    pub fn with_use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    pub fn with_save_to_cache(mut self, save: bool) -> Self {
        self.save_to_cache = save;
        self
    }

    pub fn with_use_only_cache(mut self, offline: bool) -> Self {
        self.use_only_cache = offline;
        self
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn with_size_limit_bytes(mut self, bytes: u64) -> Self {
        self.size_limit_bytes = bytes;
        self
    }

    /// Set the seeding budget in megabytes.
    pub fn with_size_limit_mb(mut self, mb: u64) -> Self {
        self.size_limit_bytes = mb.saturating_mul(1024 * 1024);
        self
    }

    pub fn with_assumed_tile_bytes(mut self, bytes: u64) -> Self {
        self.assumed_tile_bytes = bytes;
        self
    }

    /// Freshness window in milliseconds.
    pub fn max_age_millis(&self) -> i64 {
        i64::try_from(self.max_age.as_millis()).unwrap_or(i64::MAX)
    }

    /// Maximum number of tiles a single seed job may queue.
    pub fn max_tiles(&self) -> u64 {
        self.size_limit_bytes / self.assumed_tile_bytes.max(1)
    }

    /// Whether `timestamp` is still fresh at `now` (boundary inclusive).
    pub fn is_fresh(&self, timestamp: i64, now: i64) -> bool {
        now <= timestamp.saturating_add(self.max_age_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CacheConfig::default();
        assert!(config.use_cache);
        assert!(config.save_to_cache);
        assert!(!config.use_only_cache);
        assert_eq!(config.max_age_millis(), 86_400_000);
        assert_eq!(config.max_tiles(), 5120);
    }

    #[test]
    fn test_size_limit_mb() {
        let config = CacheConfig::default().with_size_limit_mb(1);
        assert_eq!(config.size_limit_bytes, 1_048_576);
        assert_eq!(config.max_tiles(), 51);
    }

    #[test]
    fn test_zero_assumed_tile_size_does_not_divide_by_zero() {
        let config = CacheConfig::default()
            .with_size_limit_bytes(10)
            .with_assumed_tile_bytes(0);
        assert_eq!(config.max_tiles(), 10);
    }

    #[test]
    fn test_freshness_boundary() {
        let config = CacheConfig::default();
        let t = 1_000_000;
        assert!(config.is_fresh(t, t + 86_400_000));
        assert!(!config.is_fresh(t, t + 86_400_001));
        assert!(!config.is_fresh(t, t + 90_000_000));
    }
}
