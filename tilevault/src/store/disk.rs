//! On-disk tile store.
//!
//! Each key is stored in its own record file:
//!
//! ```text
//! {root}/{hash[0..2]}/{hash}.tile
//! ```
//!
//! where `hash` is the lowercase SHA-256 of the key. A record is one JSON
//! header line followed by a newline and the raw payload bytes. Header fields
//! may be added in later versions; unknown fields are ignored when reading.
//!
//! Writes go to a temporary sibling file and are renamed into place, so a
//! reader never observes a half-written record. Mutations are serialized by
//! an async mutex, which makes the revision check and the write atomic.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{check_put, push_history, CacheEntry, Revision, StoreError, StoredTile, TileKey, TileStore};

/// Extension of record files.
const RECORD_EXTENSION: &str = "tile";

/// Persisted record header.
#[derive(Debug, Serialize, Deserialize)]
struct RecordHeader {
    key: TileKey,
    timestamp: i64,
    revision: Revision,
    #[serde(default)]
    history: Vec<Revision>,
    payload_len: u64,
}

/// Statistics about an on-disk store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskStoreStats {
    /// Number of record files.
    pub entries: u64,
    /// Total size of record files in bytes.
    pub bytes: u64,
}

/// Tile store persisting one record file per key.
pub struct DiskStore {
    root: PathBuf,
    write_lock: Mutex<()>,
    tmp_counter: AtomicU64,
}

impl DiskStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        debug!(root = %root.display(), "Opened disk tile store");

        Ok(Self {
            root,
            write_lock: Mutex::new(()),
            tmp_counter: AtomicU64::new(0),
        })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the record file for `key`.
    pub fn record_path(&self, key: &TileKey) -> PathBuf {
        let hash = format!("{:x}", Sha256::digest(key.as_str().as_bytes()));
        self.root
            .join(&hash[..2])
            .join(format!("{}.{}", hash, RECORD_EXTENSION))
    }

    /// Count record files and their total size.
    pub fn stats(&self) -> Result<DiskStoreStats, StoreError> {
        let mut stats = DiskStoreStats::default();
        for path in self.record_files()? {
            stats.entries += 1;
            stats.bytes += std::fs::metadata(&path)?.len();
        }
        Ok(stats)
    }

    /// Remove every record, returning what was removed.
    pub fn clear(&self) -> Result<DiskStoreStats, StoreError> {
        let mut removed = DiskStoreStats::default();
        for path in self.record_files()? {
            let len = std::fs::metadata(&path)?.len();
            std::fs::remove_file(&path)?;
            removed.entries += 1;
            removed.bytes += len;
        }
        Ok(removed)
    }

    fn record_files(&self) -> Result<Vec<PathBuf>, StoreError> {
        let mut files = Vec::new();
        for shard in std::fs::read_dir(&self.root)? {
            let shard = shard?.path();
            if !shard.is_dir() {
                continue;
            }
            for record in std::fs::read_dir(&shard)? {
                let path = record?.path();
                if path.extension().is_some_and(|ext| ext == RECORD_EXTENSION) {
                    files.push(path);
                }
            }
        }
        Ok(files)
    }

    async fn read_record(&self, key: &TileKey) -> Result<Option<StoredTile>, StoreError> {
        let path = self.record_path(key);
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let stored = decode_record(&path, data)?;
        if stored.entry.key != *key {
            // SHA-256 collision or a hand-edited file; never serve another key's tile.
            warn!(path = %path.display(), key = %key, "Record key mismatch");
            return Err(StoreError::Corrupt {
                path: path.display().to_string(),
                reason: format!("record holds key {}", stored.entry.key),
            });
        }
        Ok(Some(stored))
    }

    async fn write_record(&self, stored: &StoredTile) -> Result<(), StoreError> {
        let path = self.record_path(&stored.entry.key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let seq = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        let tmp = path.with_extension(format!("tmp{}", seq));

        tokio::fs::write(&tmp, encode_record(stored)?).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }
}

fn encode_record(stored: &StoredTile) -> Result<Vec<u8>, StoreError> {
    let header = RecordHeader {
        key: stored.entry.key.clone(),
        timestamp: stored.entry.timestamp,
        revision: stored.revision.clone(),
        history: stored.history.clone(),
        payload_len: stored.entry.payload.len() as u64,
    };

    let mut data = serde_json::to_vec(&header).map_err(|e| StoreError::Corrupt {
        path: stored.entry.key.to_string(),
        reason: e.to_string(),
    })?;
    data.push(b'\n');
    data.extend_from_slice(&stored.entry.payload);
    Ok(data)
}

fn decode_record(path: &Path, data: Vec<u8>) -> Result<StoredTile, StoreError> {
    let corrupt = |reason: String| StoreError::Corrupt {
        path: path.display().to_string(),
        reason,
    };

    let split = data
        .iter()
        .position(|&b| b == b'\n')
        .ok_or_else(|| corrupt("missing header terminator".to_string()))?;

    let header: RecordHeader =
        serde_json::from_slice(&data[..split]).map_err(|e| corrupt(e.to_string()))?;

    let payload = Bytes::from(data).slice(split + 1..);
    if payload.len() as u64 != header.payload_len {
        return Err(corrupt(format!(
            "payload is {} bytes, header says {}",
            payload.len(),
            header.payload_len
        )));
    }

    Ok(StoredTile {
        entry: CacheEntry::new(header.key, payload, header.timestamp),
        revision: header.revision,
        history: header.history,
    })
}

impl TileStore for DiskStore {
    fn get<'a>(
        &'a self,
        key: &'a TileKey,
        with_revisions: bool,
    ) -> BoxFuture<'a, Result<Option<StoredTile>, StoreError>> {
        Box::pin(async move {
            let mut stored = self.read_record(key).await?;
            if !with_revisions {
                if let Some(ref mut tile) = stored {
                    tile.history.clear();
                }
            }
            Ok(stored)
        })
    }

    fn put(
        &self,
        entry: CacheEntry,
        previous: Option<Revision>,
    ) -> BoxFuture<'_, Result<Revision, StoreError>> {
        Box::pin(async move {
            let _guard = self.write_lock.lock().await;

            // An unreadable record cannot be served, so a new write replaces it.
            let current = match self.read_record(&entry.key).await {
                Ok(current) => current,
                Err(StoreError::Corrupt { path, reason }) => {
                    warn!(path = %path, reason = %reason, "Replacing corrupt record");
                    None
                }
                Err(e) => return Err(e),
            };
            check_put(
                &entry.key,
                current.as_ref().map(|c| &c.revision),
                previous.as_ref(),
            )?;

            let revision = Revision::next(current.as_ref().map(|c| &c.revision), &entry);
            let stored = StoredTile {
                history: push_history(current.as_ref()),
                revision: revision.clone(),
                entry,
            };
            self.write_record(&stored).await?;
            Ok(revision)
        })
    }

    fn delete<'a>(
        &'a self,
        key: &'a TileKey,
        revision: &'a Revision,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            let _guard = self.write_lock.lock().await;

            match self.read_record(key).await? {
                None => Err(StoreError::NotFound { key: key.clone() }),
                Some(current) if current.revision != *revision => {
                    Err(StoreError::Conflict { key: key.clone() })
                }
                Some(_) => {
                    tokio::fs::remove_file(self.record_path(key)).await?;
                    Ok(())
                }
            }
        })
    }
}
