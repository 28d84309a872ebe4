//! Network fetch primitive.
//!
//! The engine never talks to the network directly; it asks a [`TileFetcher`]
//! for the bytes behind a tile URL. One attempt per call: retry and backoff
//! policy belongs to the fetcher implementation, not the cache.

mod http;

pub use http::{HttpFetcher, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};

use bytes::Bytes;
use futures::future::BoxFuture;
use thiserror::Error;

/// Errors that can occur while fetching a tile.
///
/// `Clone` so a single in-flight fetch can hand its result to every waiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// The request timed out.
    #[error("Request to {url} timed out")]
    Timeout { url: String },

    /// Connection or protocol failure.
    #[error("Request failed: {0}")]
    Request(String),

    /// The response body was empty.
    #[error("Empty response from {url}")]
    EmptyBody { url: String },

    /// Client could not be constructed.
    #[error("Failed to create HTTP client: {0}")]
    Client(String),
}

/// Asynchronously retrieves the raw bytes of a tile image.
///
/// Implementations must be `Send + Sync`; the engine shares one fetcher
/// between all requests and seed jobs.
pub trait TileFetcher: Send + Sync {
    /// Fetch `url` once.
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Bytes, FetchError>>;
}
