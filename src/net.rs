//! HTTP downloads behind an injectable [`Fetcher`] trait.
use std::io::Write as _;
use std::path::Path;
use std::time::Duration;

use thiserror::Error;

const USER_AGENT: &str = concat!("provision/", env!("CARGO_PKG_VERSION"));

/// Failure while fetching a remote resource.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The request failed (DNS, TLS, timeout or non-2xx status).
    #[error("request to {url} failed: {reason}")]
    Request {
        /// Requested URL.
        url: String,
        /// Transport or status message.
        reason: String,
    },

    /// The server answered with an empty body.
    #[error("empty response body from {url}")]
    Empty {
        /// Requested URL.
        url: String,
    },

    /// The body could not be written to disk.
    #[error("failed to write {path}: {source}")]
    Write {
        /// Destination path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Abstraction over HTTP GET so adapters and recipes can be tested offline.
#[cfg_attr(test, mockall::automock)]
pub trait Fetcher: Send + Sync + std::fmt::Debug {
    /// Download `url` fully into memory.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on transport failure or an empty body.
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Download `url` into `dest`, replacing any existing file.
///
/// # Errors
///
/// Returns [`FetchError`] on transport failure, an empty body, or when
/// `dest` cannot be written. `dest` is untouched when the fetch fails.
pub fn download_to(fetcher: &dyn Fetcher, url: &str, dest: &Path) -> Result<(), FetchError> {
    let bytes = fetcher.fetch(url)?;
    let write_err = |source| FetchError::Write {
        path: dest.display().to_string(),
        source,
    };
    let mut file = std::fs::File::create(dest).map_err(write_err)?;
    file.write_all(&bytes).map_err(write_err)?;
    file.flush().map_err(write_err)
}

/// [`Fetcher`] backed by a blocking `ureq` agent.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    agent: ureq::Agent,
    max_bytes: u64,
}

impl HttpFetcher {
    /// Build a fetcher with a global request timeout and body size cap.
    #[must_use]
    pub fn new(timeout: Duration, max_bytes: u64) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self { agent, max_bytes }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        tracing::debug!("GET {url}");
        let request_err = |reason: String| FetchError::Request {
            url: url.to_string(),
            reason,
        };
        let mut response = self
            .agent
            .get(url)
            .header("User-Agent", USER_AGENT)
            .call()
            .map_err(|e| request_err(e.to_string()))?;

        let bytes = response
            .body_mut()
            .with_config()
            .limit(self.max_bytes)
            .read_to_vec()
            .map_err(|e| request_err(e.to_string()))?;

        if bytes.is_empty() {
            return Err(FetchError::Empty {
                url: url.to_string(),
            });
        }
        Ok(bytes)
    }
}
