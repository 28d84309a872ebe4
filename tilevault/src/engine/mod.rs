//! Tile cache engine.
//!
//! Decides, for a single tile request, whether to serve a stored entry, fetch
//! from the network, fall back to a stale entry, or hand back a placeholder,
//! and writes fetched tiles back to the store.
//!
//! # Request flow
//!
//! ```text
//! Lookup ──► hit, fresh ─────────────────────────────► Done (Cache)
//!   │        hit, stale ──► Fetching ──► ok ──► Saving ─► Done (Network)
//!   │                           └──────► err ──────────► Done (StaleFallback)
//!   └──────► miss ─────────► Fetching ──► ok ──► Saving ─► Done (Network)
//!            miss, offline ──────────────────────────────► Done (Placeholder)
//! ```
//!
//! A miss whose fetch fails is the only outcome surfaced as an error. Problems
//! while saving are reported through [`SaveOutcome`] and a `tilecacheerror`
//! event, never to the caller.
//!
//! # Concurrency
//!
//! Requests for distinct keys are independent. Concurrent fetches of the same
//! URL are coalesced into one network request; each caller then runs its own
//! save through the re-read-before-write revision path, so a lost race fails
//! the put instead of clobbering the winner.

mod coalesce;
mod types;

pub use coalesce::{CoalescerStats, FetchCoalescer};
pub use types::{
    ResolveError, ResolvedTile, SaveOutcome, TileImage, TileOrigin, PLACEHOLDER_GIF,
};

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, trace, warn};

use crate::clock::{Clock, SystemClock};
use crate::codec::{EncodeError, PngEncoder, TileEncoder};
use crate::config::CacheConfig;
use crate::events::{EventSink, NoOpSink, TileEvent};
use crate::fetch::{FetchError, TileFetcher};
use crate::store::{CacheEntry, Revision, TileKey, TileStore};
use types::RequestState;

/// Per-tile cache decision logic over a store and a fetcher.
pub struct TileCacheEngine {
    store: Arc<dyn TileStore>,
    fetcher: Arc<dyn TileFetcher>,
    encoder: Arc<dyn TileEncoder>,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
    coalescer: FetchCoalescer,
}

impl TileCacheEngine {
    /// Start building an engine over `store` and `fetcher`.
    pub fn builder(
        store: Arc<dyn TileStore>,
        fetcher: Arc<dyn TileFetcher>,
    ) -> TileCacheEngineBuilder {
        TileCacheEngineBuilder::new(store, fetcher)
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn TileStore> {
        &self.store
    }

    pub fn events(&self) -> &Arc<dyn EventSink> {
        &self.events
    }

    pub fn coalescer_stats(&self) -> CoalescerStats {
        self.coalescer.stats()
    }

    /// Resolve one tile to an image.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::InvalidRequest`] if `key` or `url` is empty
    /// - [`ResolveError::Fetch`] if the tile is not cached and the fetch fails
    pub async fn resolve_tile(&self, key: &TileKey, url: &str) -> Result<ResolvedTile, ResolveError> {
        if key.is_empty() {
            return Err(ResolveError::InvalidRequest("empty tile key".to_string()));
        }
        if url.is_empty() {
            return Err(ResolveError::InvalidRequest("empty tile URL".to_string()));
        }

        if !self.config.use_cache {
            let fetched = self.fetch(url).await.map_err(|source| ResolveError::Fetch {
                url: url.to_string(),
                source,
            })?;
            return Ok(ResolvedTile::new(TileImage::Data(fetched), TileOrigin::Network));
        }

        let mut state = RequestState::Lookup;
        loop {
            trace!(key = %key, state = ?state, "Tile request step");
            state = match state {
                RequestState::Lookup => self.lookup(key, url).await,
                RequestState::Fetching { stale } => match self.fetch(url).await {
                    Ok(fetched) if self.config.save_to_cache => RequestState::Saving {
                        fetched,
                        prior: stale.map(|stored| stored.revision),
                    },
                    Ok(fetched) => RequestState::Done(ResolvedTile::new(
                        TileImage::Data(fetched),
                        TileOrigin::Network,
                    )),
                    Err(e) => match stale {
                        Some(stored) => {
                            warn!(key = %key, url = url, error = %e, "Refetch failed, serving stale tile");
                            RequestState::Done(ResolvedTile::new(
                                TileImage::Data(stored.entry.payload),
                                TileOrigin::StaleFallback,
                            ))
                        }
                        None => {
                            return Err(ResolveError::Fetch {
                                url: url.to_string(),
                                source: e,
                            })
                        }
                    },
                },
                RequestState::Saving { fetched, prior } => {
                    let outcome = self.save_tile(key, &fetched, prior).await;
                    RequestState::Done(
                        ResolvedTile::new(TileImage::Data(fetched), TileOrigin::Network)
                            .with_save(outcome),
                    )
                }
                RequestState::Done(tile) => return Ok(tile),
            };
        }
    }

    async fn lookup(&self, key: &TileKey, url: &str) -> RequestState {
        let found = match self.store.get(key, true).await {
            Ok(found) => found,
            Err(e) => {
                warn!(key = %key, error = %e, "Store lookup failed, treating as miss");
                None
            }
        };

        match found {
            Some(stored) => {
                self.events.emit(TileEvent::CacheHit {
                    key: key.clone(),
                    url: url.to_string(),
                });

                let now = self.clock.now_millis();
                if self.config.use_only_cache || self.config.is_fresh(stored.entry.timestamp, now) {
                    debug!(key = %key, age_ms = stored.entry.age_millis(now), "Serving cached tile");
                    RequestState::Done(ResolvedTile::new(
                        TileImage::Data(stored.entry.payload),
                        TileOrigin::Cache,
                    ))
                } else {
                    debug!(key = %key, age_ms = stored.entry.age_millis(now), "Cached tile is stale");
                    RequestState::Fetching {
                        stale: Some(stored),
                    }
                }
            }
            None => {
                self.events.emit(TileEvent::CacheMiss {
                    key: key.clone(),
                    url: url.to_string(),
                });

                if self.config.use_only_cache {
                    RequestState::Done(ResolvedTile::new(
                        TileImage::Placeholder,
                        TileOrigin::Placeholder,
                    ))
                } else {
                    RequestState::Fetching { stale: None }
                }
            }
        }
    }

    /// Fetch `url` once, sharing the request with concurrent identical fetches.
    pub async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        self.coalescer.fetch(&self.fetcher, url).await
    }

    /// Whether the store holds any entry for `key`, fresh or stale.
    ///
    /// A failed read counts as absent.
    pub async fn contains(&self, key: &TileKey) -> bool {
        match self.store.get(key, false).await {
            Ok(found) => found.is_some(),
            Err(e) => {
                warn!(key = %key, error = %e, "Store lookup failed, treating as miss");
                false
            }
        }
    }

    /// Encode `fetched` and write it under `key`.
    ///
    /// When `prior` is given that revision is deleted first (best effort). The
    /// key is then re-read and the put carries whatever revision is current,
    /// so the put only succeeds if nobody wrote in between.
    pub async fn save_tile(
        &self,
        key: &TileKey,
        fetched: &Bytes,
        prior: Option<Revision>,
    ) -> SaveOutcome {
        let payload = match self.encode(fetched.clone()).await {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key = %key, encoder = self.encoder.name(), error = %e, "Tile encode failed");
                self.report_save_error(key, e.to_string());
                return SaveOutcome::EncodeFailed;
            }
        };

        if let Some(prior) = prior {
            if let Err(e) = self.store.delete(key, &prior).await {
                debug!(key = %key, revision = %prior, error = %e, "Removing prior revision failed");
            }
        }

        let current = match self.store.get(key, false).await {
            Ok(found) => found.map(|stored| stored.revision),
            Err(e) => {
                debug!(key = %key, error = %e, "Re-read before write failed");
                None
            }
        };

        let entry = CacheEntry::new(key.clone(), payload, self.clock.now_millis());
        match self.store.put(entry, current).await {
            Ok(revision) => {
                debug!(key = %key, revision = %revision, "Tile saved");
                SaveOutcome::Saved(revision)
            }
            Err(e) if e.is_conflict() => {
                warn!(key = %key, "Tile save lost a write race");
                self.report_save_error(key, e.to_string());
                SaveOutcome::Conflict
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Tile save failed");
                self.report_save_error(key, e.to_string());
                SaveOutcome::StoreFailed
            }
        }
    }

    async fn encode(&self, fetched: Bytes) -> Result<Bytes, EncodeError> {
        let encoder = Arc::clone(&self.encoder);
        tokio::task::spawn_blocking(move || encoder.encode(&fetched))
            .await
            .map_err(|e| EncodeError::Task(e.to_string()))?
    }

    fn report_save_error(&self, key: &TileKey, error: String) {
        self.events.emit(TileEvent::CacheError {
            key: key.clone(),
            error,
        });
    }
}

/// Builder for [`TileCacheEngine`].
///
/// Defaults: [`PngEncoder`], [`NoOpSink`], [`SystemClock`] and
/// [`CacheConfig::default`].
pub struct TileCacheEngineBuilder {
    store: Arc<dyn TileStore>,
    fetcher: Arc<dyn TileFetcher>,
    encoder: Arc<dyn TileEncoder>,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
}

impl TileCacheEngineBuilder {
    pub fn new(store: Arc<dyn TileStore>, fetcher: Arc<dyn TileFetcher>) -> Self {
        Self {
            store,
            fetcher,
            encoder: Arc::new(PngEncoder),
            events: Arc::new(NoOpSink),
            clock: Arc::new(SystemClock),
            config: CacheConfig::default(),
        }
    }

    pub fn encoder(mut self, encoder: Arc<dyn TileEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> TileCacheEngine {
        TileCacheEngine {
            store: self.store,
            fetcher: self.fetcher,
            encoder: self.encoder,
            events: self.events,
            clock: self.clock,
            config: self.config,
            coalescer: FetchCoalescer::new(),
        }
    }
}
