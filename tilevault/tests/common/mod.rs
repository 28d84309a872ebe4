//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use tilevault::clock::ManualClock;
use tilevault::codec::RawEncoder;
use tilevault::config::CacheConfig;
use tilevault::engine::TileCacheEngine;
use tilevault::events::{EventBus, TileEvent};
use tilevault::fetch::{FetchError, TileFetcher};
use tilevault::store::TileStore;

/// 2023-11-14T22:13:20Z
pub const T0: i64 = 1_700_000_000_000;

/// A fetcher whose answers are set up by the test.
///
/// Unknown URLs answer `tile:{url}` unless the fetcher is offline.
#[derive(Default)]
pub struct ScriptedFetcher {
    responses: Mutex<HashMap<String, Bytes>>,
    failing: Mutex<HashSet<String>>,
    offline: AtomicBool,
    delay: Mutex<Option<Duration>>,
    calls: Mutex<Vec<String>>,
    cancel_after: Mutex<Option<(usize, CancellationToken)>>,
}

impl ScriptedFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn serve(&self, url: &str, body: &'static [u8]) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), Bytes::from_static(body));
    }

    pub fn fail(&self, url: &str) {
        self.failing.lock().unwrap().insert(url.to_string());
    }

    pub fn recover(&self, url: &str) {
        self.failing.lock().unwrap().remove(url);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Cancel `token` when the `n`th fetch starts.
    pub fn cancel_after(&self, n: usize, token: CancellationToken) {
        *self.cancel_after.lock().unwrap() = Some((n, token));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn answer(&self, url: &str) -> Result<Bytes, FetchError> {
        if self.offline.load(Ordering::SeqCst) || self.failing.lock().unwrap().contains(url) {
            return Err(FetchError::Status {
                status: 503,
                url: url.to_string(),
            });
        }
        Ok(self
            .responses
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| Bytes::from(format!("tile:{url}"))))
    }
}

impl TileFetcher for ScriptedFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Bytes, FetchError>> {
        let count = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(url.to_string());
            calls.len()
        };
        if let Some((n, token)) = self.cancel_after.lock().unwrap().as_ref() {
            if count >= *n {
                token.cancel();
            }
        }
        let delay = *self.delay.lock().unwrap();

        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            self.answer(url)
        })
    }
}

/// Engine wired to test doubles.
pub struct Fixture {
    pub engine: Arc<TileCacheEngine>,
    pub fetcher: Arc<ScriptedFetcher>,
    pub clock: Arc<ManualClock>,
    pub bus: EventBus,
}

pub fn fixture(store: Arc<dyn TileStore>, config: CacheConfig) -> Fixture {
    let fetcher = ScriptedFetcher::new();
    let clock = Arc::new(ManualClock::new(T0));
    let bus = EventBus::new(256);

    let engine = TileCacheEngine::builder(store, fetcher.clone())
        .encoder(Arc::new(RawEncoder))
        .events(Arc::new(bus.clone()))
        .clock(clock.clone())
        .config(config)
        .build();

    Fixture {
        engine: Arc::new(engine),
        fetcher,
        clock,
        bus,
    }
}

/// Everything currently queued on `rx`.
pub fn drain(rx: &mut broadcast::Receiver<TileEvent>) -> Vec<TileEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn names(events: &[TileEvent]) -> Vec<&'static str> {
    events.iter().map(TileEvent::name).collect()
}
