//! Store record types: keys, revisions, entries.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Number of prior revisions retained per live entry.
pub const REVISION_HISTORY_LIMIT: usize = 10;

/// Hex digits of the payload digest kept in a revision marker.
const REVISION_DIGEST_LEN: usize = 32;

/// Primary key of a cached tile.
///
/// Derived deterministically from a tile source and tile coordinates, so two
/// requests for the same tile of the same source share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileKey(String);

impl TileKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TileKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for TileKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Opaque optimistic-concurrency token assigned by a store.
///
/// Format: `{generation}-{digest}`. Callers must treat it as opaque and hand it
/// back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(String);

impl Revision {
    /// Wraps a revision string previously issued by a store.
    pub fn new(revision: impl Into<String>) -> Self {
        Self(revision.into())
    }

    /// Issues the revision following `previous` for `entry`.
    pub fn next(previous: Option<&Revision>, entry: &CacheEntry) -> Self {
        let generation = previous.map(Revision::generation).unwrap_or(0) + 1;

        let mut hasher = Sha256::new();
        hasher.update(entry.key.as_str().as_bytes());
        hasher.update(entry.timestamp.to_le_bytes());
        hasher.update(&entry.payload);
        let digest = format!("{:x}", hasher.finalize());

        Self(format!("{}-{}", generation, &digest[..REVISION_DIGEST_LEN]))
    }

    /// Write generation encoded in the revision, 0 if unparseable.
    pub fn generation(&self) -> u64 {
        self.0
            .split_once('-')
            .and_then(|(generation, _)| generation.parse().ok())
            .unwrap_or(0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A tile record as written by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: TileKey,
    /// Encoded image payload.
    pub payload: Bytes,
    /// Storage time in milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl CacheEntry {
    pub fn new(key: TileKey, payload: Bytes, timestamp: i64) -> Self {
        Self {
            key,
            payload,
            timestamp,
        }
    }

    /// Milliseconds elapsed between storage and `now`.
    pub fn age_millis(&self, now: i64) -> i64 {
        now.saturating_sub(self.timestamp)
    }
}

/// The current entry for a key, as returned by a store lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredTile {
    pub entry: CacheEntry,
    /// Revision of the current entry.
    pub revision: Revision,
    /// Prior revisions, most recent first. Only populated when revision
    /// metadata is requested.
    pub history: Vec<Revision>,
}

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The submitted revision does not match the store's current revision.
    #[error("Revision conflict for key {key}")]
    Conflict { key: TileKey },

    /// No entry exists for the key.
    #[error("No entry for key {key}")]
    NotFound { key: TileKey },

    /// I/O error in a persistent backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A persisted record could not be decoded.
    #[error("Corrupt record {path}: {reason}")]
    Corrupt { path: String, reason: String },

    /// Background task failed.
    #[error("Store task failed: {0}")]
    Task(String),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}
