//! Single-flight tile fetching.
//!
//! When several requests need the same URL at once, only one network fetch
//! runs; every waiter receives a clone of its result.
//!
//! ```text
//! resolve A ─┐
//!            │
//! resolve B ─┼──► FetchCoalescer ──► TileFetcher (one request)
//!            │         │
//! seed item ─┘         ▼
//!               [all receive the same bytes or error]
//! ```
//!
//! The in-flight future is shared rather than owned by the first caller, so a
//! waiter that is dropped mid-fetch never strands the others. When the last
//! waiter is dropped the entry goes with it and the request is abandoned.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::fetch::{FetchError, TileFetcher};

type SharedFetch = Shared<BoxFuture<'static, Result<Bytes, FetchError>>>;

struct InFlight {
    shared: SharedFetch,
    waiters: usize,
}

/// Releases one waiter's hold on an in-flight entry, on completion or drop.
struct WaiterGuard<'a> {
    coalescer: &'a FetchCoalescer,
    url: &'a str,
    shared: SharedFetch,
    completed: bool,
}

impl Drop for WaiterGuard<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.coalescer.in_flight.lock();
        // Another caller may already have removed it and started a new fetch.
        let Some(entry) = in_flight
            .get_mut(self.url)
            .filter(|entry| entry.shared.ptr_eq(&self.shared))
        else {
            return;
        };

        entry.waiters = entry.waiters.saturating_sub(1);
        if self.completed {
            in_flight.remove(self.url);
        } else if entry.waiters == 0 {
            debug!(url = self.url, "Fetch abandoned by every waiter");
            in_flight.remove(self.url);
        }
    }
}

/// Statistics for monitoring coalescing effectiveness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoalescerStats {
    /// Total fetches requested
    pub total_requests: u64,
    /// Fetches that joined one already in flight
    pub coalesced_requests: u64,
    /// Fetches that went to the network
    pub new_requests: u64,
}

impl CoalescerStats {
    /// Returns the coalescing ratio (0.0 to 1.0)
    pub fn coalescing_ratio(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.coalesced_requests as f64 / self.total_requests as f64
        }
    }
}

/// Tracks in-flight fetches by URL.
#[derive(Default)]
pub struct FetchCoalescer {
    in_flight: Mutex<HashMap<String, InFlight>>,
    stats: Mutex<CoalescerStats>,
}

impl FetchCoalescer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch `url`, joining an identical fetch if one is in flight.
    pub async fn fetch(
        &self,
        fetcher: &Arc<dyn TileFetcher>,
        url: &str,
    ) -> Result<Bytes, FetchError> {
        let mut guard = WaiterGuard {
            coalescer: self,
            url,
            shared: self.register(fetcher, url),
            completed: false,
        };
        let result = guard.shared.clone().await;
        guard.completed = true;
        result
    }

    fn register(&self, fetcher: &Arc<dyn TileFetcher>, url: &str) -> SharedFetch {
        let mut in_flight = self.in_flight.lock();
        let mut stats = self.stats.lock();
        stats.total_requests += 1;

        if let Some(existing) = in_flight.get_mut(url) {
            existing.waiters += 1;
            stats.coalesced_requests += 1;
            debug!(
                url = url,
                coalesced = stats.coalesced_requests,
                "Coalescing fetch - waiting for in-flight request"
            );
            return existing.shared.clone();
        }

        let fetcher = Arc::clone(fetcher);
        let owned = url.to_string();
        let shared = async move { fetcher.fetch(&owned).await }
            .boxed()
            .shared();

        in_flight.insert(
            url.to_string(),
            InFlight {
                shared: shared.clone(),
                waiters: 1,
            },
        );
        stats.new_requests += 1;
        debug!(
            url = url,
            in_flight_count = in_flight.len(),
            "New fetch - starting request"
        );
        shared
    }

    /// Returns a snapshot of the current statistics.
    pub fn stats(&self) -> CoalescerStats {
        *self.stats.lock()
    }

    /// Returns the number of fetches currently in flight.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Logs current statistics.
    pub fn log_stats(&self) {
        let stats = self.stats();
        info!(
            total_requests = stats.total_requests,
            coalesced = stats.coalesced_requests,
            new_requests = stats.new_requests,
            in_flight = self.in_flight_count(),
            coalescing_ratio = format!("{:.1}%", stats.coalescing_ratio() * 100.0),
            "Fetch coalescing statistics"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct SlowFetcher {
        calls: AtomicUsize,
        fail: bool,
    }

    impl TileFetcher for SlowFetcher {
        fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Bytes, FetchError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                if self.fail {
                    Err(FetchError::Status {
                        status: 503,
                        url: url.to_string(),
                    })
                } else {
                    Ok(Bytes::from(url.to_string()))
                }
            })
        }
    }

    fn fetcher(fail: bool) -> (Arc<SlowFetcher>, Arc<dyn TileFetcher>) {
        let concrete = Arc::new(SlowFetcher {
            calls: AtomicUsize::new(0),
            fail,
        });
        let dynamic: Arc<dyn TileFetcher> = concrete.clone();
        (concrete, dynamic)
    }

    #[tokio::test]
    async fn test_concurrent_fetches_share_one_request() {
        let coalescer = FetchCoalescer::new();
        let (concrete, fetcher) = fetcher(false);

        let (a, b, c) = tokio::join!(
            coalescer.fetch(&fetcher, "u1"),
            coalescer.fetch(&fetcher, "u1"),
            coalescer.fetch(&fetcher, "u1"),
        );

        assert_eq!(a.unwrap(), Bytes::from_static(b"u1"));
        assert_eq!(b.unwrap(), Bytes::from_static(b"u1"));
        assert_eq!(c.unwrap(), Bytes::from_static(b"u1"));
        assert_eq!(concrete.calls.load(Ordering::SeqCst), 1);

        let stats = coalescer.stats();
        assert_eq!(stats.total_requests, 3);
        assert_eq!(stats.coalesced_requests, 2);
        assert_eq!(coalescer.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_distinct_urls_fetch_independently() {
        let coalescer = FetchCoalescer::new();
        let (concrete, fetcher) = fetcher(false);

        let (a, b) = tokio::join!(coalescer.fetch(&fetcher, "u1"), coalescer.fetch(&fetcher, "u2"));
        assert_eq!(a.unwrap(), Bytes::from_static(b"u1"));
        assert_eq!(b.unwrap(), Bytes::from_static(b"u2"));
        assert_eq!(concrete.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_errors_are_shared_and_not_cached() {
        let coalescer = FetchCoalescer::new();
        let (concrete, fetcher) = fetcher(true);

        let (a, b) = tokio::join!(coalescer.fetch(&fetcher, "u"), coalescer.fetch(&fetcher, "u"));
        assert!(a.is_err());
        assert_eq!(a, b);

        // A later fetch goes back to the network.
        assert!(coalescer.fetch(&fetcher, "u").await.is_err());
        assert_eq!(concrete.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_abandoned_fetch_leaves_no_entry() {
        let coalescer = FetchCoalescer::new();
        let (concrete, fetcher) = fetcher(false);

        let abandoned =
            tokio::time::timeout(Duration::from_millis(5), coalescer.fetch(&fetcher, "u")).await;
        assert!(abandoned.is_err());
        assert_eq!(coalescer.in_flight_count(), 0);

        // The next request starts over instead of joining the dropped one.
        assert_eq!(coalescer.fetch(&fetcher, "u").await.unwrap(), Bytes::from_static(b"u"));
        assert_eq!(concrete.calls.load(Ordering::SeqCst), 2);
        assert_eq!(coalescer.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_dropped_waiter_does_not_strand_the_others() {
        let coalescer = FetchCoalescer::new();
        let (concrete, fetcher) = fetcher(false);

        let (dropped, kept) = tokio::join!(
            tokio::time::timeout(Duration::from_millis(5), coalescer.fetch(&fetcher, "u")),
            coalescer.fetch(&fetcher, "u"),
        );

        assert!(dropped.is_err());
        assert_eq!(kept.unwrap(), Bytes::from_static(b"u"));
        assert_eq!(concrete.calls.load(Ordering::SeqCst), 1);
        assert_eq!(coalescer.in_flight_count(), 0);
    }

    #[test]
    fn test_coalescing_ratio() {
        let stats = CoalescerStats {
            total_requests: 4,
            coalesced_requests: 1,
            new_requests: 3,
        };
        assert!((stats.coalescing_ratio() - 0.25).abs() < f64::EPSILON);
        assert_eq!(CoalescerStats::default().coalescing_ratio(), 0.0);
    }
}
