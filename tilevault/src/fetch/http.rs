//! HTTP fetcher using reqwest.

use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;
use tracing::{debug, trace, warn};

use super::{FetchError, TileFetcher};

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default User-Agent string for tile requests.
/// Many public tile servers reject requests without an identifying agent.
pub const DEFAULT_USER_AGENT: &str = concat!("tilevault/", env!("CARGO_PKG_VERSION"));

/// Non-blocking HTTP fetcher.
///
/// Uses an async reqwest client with connection pooling, so concurrent tile
/// requests share warm connections to the tile server.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Creates a fetcher with the default timeout.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeout(DEFAULT_TIMEOUT_SECS)
    }

    /// Creates a fetcher with a custom timeout.
    pub fn with_timeout(timeout_secs: u64) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(DEFAULT_USER_AGENT)
            .pool_max_idle_per_host(16)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self { client })
    }

    async fn get(&self, url: &str) -> Result<Bytes, FetchError> {
        trace!(url = url, "HTTP GET request starting");

        let response = match self.client.get(url).send().await {
            Ok(resp) => {
                debug!(
                    url = url,
                    status = resp.status().as_u16(),
                    "HTTP response received"
                );
                resp
            }
            Err(e) => {
                warn!(
                    url = url,
                    error = %e,
                    is_connect = e.is_connect(),
                    is_timeout = e.is_timeout(),
                    "HTTP request failed"
                );
                if e.is_timeout() {
                    return Err(FetchError::Timeout {
                        url: url.to_string(),
                    });
                }
                return Err(FetchError::Request(e.to_string()));
            }
        };

        if !response.status().is_success() {
            return Err(FetchError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                }
            } else {
                FetchError::Request(format!("Failed to read response: {}", e))
            }
        })?;

        if body.is_empty() {
            return Err(FetchError::EmptyBody {
                url: url.to_string(),
            });
        }

        Ok(body)
    }
}

impl TileFetcher for HttpFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Bytes, FetchError>> {
        Box::pin(self.get(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_fetcher_builds() {
        assert!(HttpFetcher::new().is_ok());
        assert!(HttpFetcher::with_timeout(5).is_ok());
    }

    #[test]
    fn test_user_agent_names_crate() {
        assert!(DEFAULT_USER_AGENT.starts_with("tilevault/"));
    }

    #[test]
    fn test_fetch_error_display() {
        let err = FetchError::Status {
            status: 404,
            url: "https://tiles.example/1/2/3.png".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 404 from https://tiles.example/1/2/3.png");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_request_error() {
        let fetcher = HttpFetcher::with_timeout(2).unwrap();
        let result = fetcher.fetch("http://127.0.0.1:1/0/0/0.png").await;
        assert!(matches!(
            result,
            Err(FetchError::Request(_)) | Err(FetchError::Timeout { .. })
        ));
    }
}
