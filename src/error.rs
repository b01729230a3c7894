//! Error types for fetching and caching CDN ranges
//!
//! `FetchError` describes why a single network attempt failed and is retried
//! locally. `RangeError` is what a caller of the pipeline finally sees.

use std::path::PathBuf;
use thiserror::Error;

/// Failure of one fetch attempt; each variant consumes one retry
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network unreachable, timeout, TLS failure. Carries the transport's
    /// own error so its cause chain stays intact.
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Feed answered with something other than 200
    #[error("unexpected response code: {0}")]
    BadStatus(u16),

    /// Body was not a recognizable prefix feed
    #[error("failed to decode feed: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Transport(Box::new(err))
    }
}

/// Terminal errors surfaced by the fetch-cache-fallback pipeline
#[derive(Debug, Error)]
pub enum RangeError {
    /// Cache file exists but does not hold a valid range set
    #[error("corrupt cache file {}: {source}", path.display())]
    CorruptCache {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Cache file exists but could not be read
    #[error("failed to read cache file {}: {source}", path.display())]
    CacheRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing the cache file failed
    #[error("failed to write cache file {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Every fetch attempt failed and there is no cached data to serve
    #[error("no data available after {attempts} attempt(s): {last}")]
    NoDataAvailable {
        attempts: u32,
        #[source]
        last: FetchError,
    },

    /// Every fetch attempt failed and the fail-hard policy is in effect
    #[error("fetch failed after {attempts} attempt(s): {last}")]
    FetchFailed {
        attempts: u32,
        #[source]
        last: FetchError,
    },

    /// The HTTP client could not be constructed
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}
