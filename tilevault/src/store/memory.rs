//! In-memory tile store backed by `DashMap`.
//!
//! Per-key atomicity comes from DashMap's shard locks: the revision check and
//! the write happen under the same entry guard. Guards are never held across
//! an await point.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::BoxFuture;

use super::{check_put, push_history, CacheEntry, Revision, StoreError, StoredTile, TileKey, TileStore};

/// Process-local tile store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<TileKey, StoredTile>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total payload bytes held.
    pub fn size_bytes(&self) -> u64 {
        self.entries
            .iter()
            .map(|e| e.value().entry.payload.len() as u64)
            .sum()
    }

    fn put_sync(
        &self,
        entry: CacheEntry,
        previous: Option<Revision>,
    ) -> Result<Revision, StoreError> {
        match self.entries.entry(entry.key.clone()) {
            Entry::Occupied(mut occupied) => {
                check_put(&entry.key, Some(&occupied.get().revision), previous.as_ref())?;
                let revision = Revision::next(Some(&occupied.get().revision), &entry);
                let history = push_history(Some(occupied.get()));
                occupied.insert(StoredTile {
                    entry,
                    revision: revision.clone(),
                    history,
                });
                Ok(revision)
            }
            Entry::Vacant(vacant) => {
                check_put(&entry.key, None, previous.as_ref())?;
                let revision = Revision::next(None, &entry);
                vacant.insert(StoredTile {
                    entry,
                    revision: revision.clone(),
                    history: Vec::new(),
                });
                Ok(revision)
            }
        }
    }

    fn delete_sync(&self, key: &TileKey, revision: &Revision) -> Result<(), StoreError> {
        if self
            .entries
            .remove_if(key, |_, stored| stored.revision == *revision)
            .is_some()
        {
            return Ok(());
        }

        if self.entries.contains_key(key) {
            Err(StoreError::Conflict { key: key.clone() })
        } else {
            Err(StoreError::NotFound { key: key.clone() })
        }
    }
}

impl TileStore for MemoryStore {
    fn get<'a>(
        &'a self,
        key: &'a TileKey,
        with_revisions: bool,
    ) -> BoxFuture<'a, Result<Option<StoredTile>, StoreError>> {
        Box::pin(async move {
            Ok(self.entries.get(key).map(|stored| {
                let mut tile = stored.value().clone();
                if !with_revisions {
                    tile.history.clear();
                }
                tile
            }))
        })
    }

    fn put(
        &self,
        entry: CacheEntry,
        previous: Option<Revision>,
    ) -> BoxFuture<'_, Result<Revision, StoreError>> {
        Box::pin(async move { self.put_sync(entry, previous) })
    }

    fn delete<'a>(
        &'a self,
        key: &'a TileKey,
        revision: &'a Revision,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move { self.delete_sync(key, revision) })
    }
}
