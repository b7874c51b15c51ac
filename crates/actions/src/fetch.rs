//! Remote content retrieval for `download` steps.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Maximum body size accepted from a download (64 MiB).
const MAX_BODY_SIZE: u64 = 64 * 1024 * 1024;

/// Something that can fetch the bytes behind a URL.
pub trait Fetcher: Send + Sync {
    /// Fetch `url` completely into memory.
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Blocking HTTP(S) fetcher.
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    /// Fetcher with no overall deadline.
    #[must_use]
    pub fn new() -> Self {
        Self {
            agent: ureq::Agent::new_with_defaults(),
        }
    }

    /// Fetcher that gives up on a transfer after `timeout`.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: config.into(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        log::debug!("GET {url}");
        let download_err = |e: ureq::Error| Error::Download {
            url: url.to_string(),
            message: e.to_string(),
        };

        let mut response = self
            .agent
            .get(url)
            .header("User-Agent", concat!("outfit/", env!("CARGO_PKG_VERSION")))
            .call()
            .map_err(download_err)?;

        let bytes = response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_SIZE)
            .read_to_vec()
            .map_err(download_err)?;

        log::debug!("fetched {} bytes from {url}", bytes.len());
        Ok(bytes)
    }
}

/// In-memory fetcher for tests and offline runs.
///
/// Unknown URLs fail with a 404-style [`Error::Download`].
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    bodies: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StaticFetcher {
    /// Create an empty fetcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `url`.
    #[must_use]
    pub fn with(self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.bodies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.into(), body.into());
        self
    }

    /// URLs requested so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Fetcher for StaticFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_string());

        self.bodies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .cloned()
            .ok_or_else(|| Error::Download {
                url: url.to_string(),
                message: "HTTP 404 Not Found".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_fetcher_serves_known_url() {
        let fetcher = StaticFetcher::new().with("https://example.com/key.asc", "KEY");
        assert_eq!(fetcher.fetch("https://example.com/key.asc").unwrap(), b"KEY");
        assert_eq!(fetcher.requests(), vec!["https://example.com/key.asc"]);
    }

    #[test]
    fn test_static_fetcher_unknown_url() {
        let fetcher = StaticFetcher::new();
        let err = fetcher.fetch("https://example.com/missing").unwrap_err();
        assert!(matches!(err, Error::Download { .. }));
        assert!(err.to_string().contains("404"));
    }

    #[test]
    fn test_http_fetcher_rejects_bad_url() {
        let fetcher = HttpFetcher::with_timeout(Duration::from_secs(1));
        assert!(fetcher.fetch("not a url").is_err());
    }
}
