//! Persistent tile store adapter.
//!
//! The `TileStore` trait is the engine's only view of durable state: per-key
//! get, put and delete with optimistic-concurrency revisions. Every update or
//! delete of an existing entry must present the entry's current revision; a
//! stale revision fails with [`StoreError::Conflict`] instead of overwriting.
//!
//! # Backends
//!
//! - [`MemoryStore`]: process-local map, used for tests and ephemeral layers
//! - [`DiskStore`]: one record file per key under a cache directory
//!
//! # Example
//!
//! ```ignore
//! use tilevault::store::{CacheEntry, MemoryStore, TileStore};
//!
//! let store = MemoryStore::new();
//! let rev = store.put(entry, None).await?;          // fresh insert
//! let rev = store.put(newer, Some(rev)).await?;     // update
//! store.delete(&key, &rev).await?;
//! ```

mod disk;
mod memory;
mod types;

pub use disk::{DiskStore, DiskStoreStats};
pub use memory::MemoryStore;
pub use types::{
    CacheEntry, Revision, StoreError, StoredTile, TileKey, REVISION_HISTORY_LIMIT,
};

use futures::future::BoxFuture;

/// Key/value interface over a tile store backend.
///
/// # Concurrency
///
/// Each operation is atomic for a single key. No multi-key transactions are
/// offered. Implementations must be `Send + Sync`.
///
/// # Dyn Compatibility
///
/// Methods return boxed futures so the engine can hold an `Arc<dyn TileStore>`.
pub trait TileStore: Send + Sync {
    /// Look up the current entry for `key`.
    ///
    /// When `with_revisions` is true the returned [`StoredTile::history`]
    /// lists prior revisions; otherwise it is empty. The current revision is
    /// always present.
    fn get<'a>(
        &'a self,
        key: &'a TileKey,
        with_revisions: bool,
    ) -> BoxFuture<'a, Result<Option<StoredTile>, StoreError>>;

    /// Write `entry`.
    ///
    /// `previous` must be `None` for a fresh insert and the current revision
    /// for an update. Any mismatch fails with [`StoreError::Conflict`].
    ///
    /// # Returns
    ///
    /// The revision assigned to the new entry.
    fn put(
        &self,
        entry: CacheEntry,
        previous: Option<Revision>,
    ) -> BoxFuture<'_, Result<Revision, StoreError>>;

    /// Delete the entry for `key` if its current revision is `revision`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if no entry exists
    /// - [`StoreError::Conflict`] if the entry has a different revision
    fn delete<'a>(
        &'a self,
        key: &'a TileKey,
        revision: &'a Revision,
    ) -> BoxFuture<'a, Result<(), StoreError>>;
}

/// Applies the put revision rule to the current state of a key.
pub(crate) fn check_put(
    key: &TileKey,
    current: Option<&Revision>,
    previous: Option<&Revision>,
) -> Result<(), StoreError> {
    match (current, previous) {
        (None, None) => Ok(()),
        (Some(current), Some(previous)) if current == previous => Ok(()),
        _ => Err(StoreError::Conflict { key: key.clone() }),
    }
}

/// Builds the history list for an entry replacing `current`.
pub(crate) fn push_history(current: Option<&StoredTile>) -> Vec<Revision> {
    match current {
        Some(stored) => {
            let mut history = Vec::with_capacity(REVISION_HISTORY_LIMIT);
            history.push(stored.revision.clone());
            history.extend(stored.history.iter().cloned());
            history.truncate(REVISION_HISTORY_LIMIT);
            history
        }
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_put_fresh_insert() {
        let key = TileKey::new("k");
        assert!(check_put(&key, None, None).is_ok());
    }

    #[test]
    fn test_check_put_rejects_blind_overwrite() {
        let key = TileKey::new("k");
        let rev = Revision::new("1-a");
        assert!(check_put(&key, Some(&rev), None).unwrap_err().is_conflict());
    }

    #[test]
    fn test_check_put_rejects_revision_for_missing_entry() {
        let key = TileKey::new("k");
        let rev = Revision::new("1-a");
        assert!(check_put(&key, None, Some(&rev)).unwrap_err().is_conflict());
    }

    #[test]
    fn test_check_put_rejects_stale_revision() {
        let key = TileKey::new("k");
        let current = Revision::new("2-b");
        let stale = Revision::new("1-a");
        assert!(check_put(&key, Some(&current), Some(&stale))
            .unwrap_err()
            .is_conflict());
        assert!(check_put(&key, Some(&current), Some(&current)).is_ok());
    }
}
