//! Lifecycle notifications.
//!
//! The engine and the seeding traversal report what they do through an
//! [`EventSink`]. Sinks must never fail the caller: an event with nobody
//! listening is simply dropped.
//!
//! # Sinks
//!
//! - [`NoOpSink`]: discards everything
//! - [`TracingSink`]: turns events into `tracing` log lines
//! - [`EventBus`]: broadcasts events to any number of subscribers
//! - [`FanoutSink`]: forwards each event to several sinks

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::coord::BoundingBox;
use crate::store::TileKey;

/// Default capacity of the [`EventBus`] channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Shared payload of seed notifications.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedSummary {
    pub bbox: BoundingBox,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub queue_length: usize,
}

/// A cache or seeding notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TileEvent {
    /// A lookup found an entry (fresh or stale).
    #[serde(rename = "tilecachehit")]
    CacheHit { key: TileKey, url: String },

    /// A lookup found nothing.
    #[serde(rename = "tilecachemiss")]
    CacheMiss { key: TileKey, url: String },

    /// Saving a fetched tile failed. The tile was still served.
    #[serde(rename = "tilecacheerror")]
    CacheError { key: TileKey, error: String },

    #[serde(rename = "seedstart")]
    SeedStart(SeedSummary),

    /// Emitted before each queue item; `remaining_length` includes that item.
    #[serde(rename = "seedprogress", rename_all = "camelCase")]
    SeedProgress {
        #[serde(flatten)]
        summary: SeedSummary,
        remaining_length: usize,
    },

    #[serde(rename = "seedend")]
    SeedEnd(SeedSummary),
}

impl TileEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            TileEvent::CacheHit { .. } => "tilecachehit",
            TileEvent::CacheMiss { .. } => "tilecachemiss",
            TileEvent::CacheError { .. } => "tilecacheerror",
            TileEvent::SeedStart(_) => "seedstart",
            TileEvent::SeedProgress { .. } => "seedprogress",
            TileEvent::SeedEnd(_) => "seedend",
        }
    }
}

/// Receiver of lifecycle notifications.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: TileEvent);
}

/// A sink that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpSink;

impl EventSink for NoOpSink {
    #[inline]
    fn emit(&self, _event: TileEvent) {}
}

/// Sink that delegates to the `tracing` crate.
///
/// Per-tile hits and misses log at debug, seed lifecycle at info, errors at
/// warn.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: TileEvent) {
        match event {
            TileEvent::CacheHit { key, url } => debug!(key = %key, url = %url, "Tile cache hit"),
            TileEvent::CacheMiss { key, url } => debug!(key = %key, url = %url, "Tile cache miss"),
            TileEvent::CacheError { key, error } => {
                warn!(key = %key, error = %error, "Tile cache error")
            }
            TileEvent::SeedStart(s) => info!(
                bbox = %s.bbox,
                min_zoom = s.min_zoom,
                max_zoom = s.max_zoom,
                queue_length = s.queue_length,
                "Seed started"
            ),
            TileEvent::SeedProgress {
                summary,
                remaining_length,
            } => debug!(
                queue_length = summary.queue_length,
                remaining = remaining_length,
                "Seed progress"
            ),
            TileEvent::SeedEnd(s) => info!(
                bbox = %s.bbox,
                queue_length = s.queue_length,
                "Seed finished"
            ),
        }
    }
}

/// Broadcasts events to subscribers.
///
/// Slow subscribers may lag and miss events (see
/// [`broadcast::error::RecvError::Lagged`]); publishers are never blocked.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<TileEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to all events emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<TileEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl EventSink for EventBus {
    fn emit(&self, event: TileEvent) {
        // An error only means nobody is subscribed.
        let _ = self.tx.send(event);
    }
}

/// Forwards every event to each inner sink, in order.
#[derive(Clone, Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self { sinks }
    }

    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl EventSink for FanoutSink {
    fn emit(&self, event: TileEvent) {
        if let Some((last, rest)) = self.sinks.split_last() {
            for sink in rest {
                sink.emit(event.clone());
            }
            last.emit(event);
        }
    }
}
