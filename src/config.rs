//! Configuration for the range fetcher

use directories::ProjectDirs;
use std::path::PathBuf;
use std::time::Duration;

/// Published AWS ranges feed
pub const DEFAULT_SOURCE_URL: &str = "https://ip-ranges.amazonaws.com/ip-ranges.json";

/// Service tag of the CloudFront CDN inside the AWS feed
pub const DEFAULT_SERVICE_TAG: &str = "CLOUDFRONT";

/// File name of the cache inside its directory
pub const CACHE_FILE_NAME: &str = ".cdn_ip_ranges.json";

/// What to do when every fetch attempt fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackPolicy {
    /// Serve the cached range set, however old
    #[default]
    ServeStale,
    /// Report `FetchFailed` even if a cached range set exists
    FailHard,
}

/// What to do when the cache file exists but cannot be parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CorruptCachePolicy {
    /// Surface `CorruptCache` without touching the network
    #[default]
    Fail,
    /// Treat the cache as absent and refresh, overwriting it on success
    Refresh,
}

/// Options recognized by [`crate::RangeFetcher`]
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Feed endpoint
    pub source_url: String,
    /// Service name entries must carry to be kept
    pub service_tag: String,
    /// Freshness window
    pub max_age: Duration,
    /// Number of fetch attempts per refresh
    pub retry_count: u32,
    /// Location of the cache file
    pub cache_path: PathBuf,
    /// Timeout applied to each request
    pub request_timeout: Duration,
    /// Delay before the second attempt; doubled after each further failure.
    /// Zero retries immediately.
    pub retry_delay: Duration,
    /// Upper bound for the backoff delay
    pub max_retry_delay: Duration,
    pub fallback: FallbackPolicy,
    pub on_corrupt_cache: CorruptCachePolicy,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            source_url: DEFAULT_SOURCE_URL.to_string(),
            service_tag: DEFAULT_SERVICE_TAG.to_string(),
            max_age: Duration::from_secs(24 * 60 * 60),
            retry_count: 3,
            cache_path: default_cache_path(),
            request_timeout: Duration::from_secs(30),
            retry_delay: Duration::ZERO,
            max_retry_delay: Duration::from_secs(30),
            fallback: FallbackPolicy::default(),
            on_corrupt_cache: CorruptCachePolicy::default(),
        }
    }
}

impl FetchConfig {
    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = url.into();
        self
    }

    pub fn with_service_tag(mut self, tag: impl Into<String>) -> Self {
        self.service_tag = tag.into();
        self
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    pub fn with_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = path.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Enables capped exponential backoff between attempts
    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.retry_delay = initial;
        self.max_retry_delay = max;
        self
    }

    pub fn with_fallback(mut self, fallback: FallbackPolicy) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_corrupt_cache_policy(mut self, policy: CorruptCachePolicy) -> Self {
        self.on_corrupt_cache = policy;
        self
    }

    /// Number of attempts a refresh makes; never less than one
    pub fn attempts(&self) -> u32 {
        self.retry_count.max(1)
    }

    /// Delay to wait after the given (1-based) failed attempt
    pub fn delay_after(&self, attempt: u32) -> Duration {
        if self.retry_delay.is_zero() {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.retry_delay
            .saturating_mul(factor)
            .min(self.max_retry_delay)
    }
}

/// Cache location in the system temp directory
pub fn default_cache_path() -> PathBuf {
    std::env::temp_dir().join(CACHE_FILE_NAME)
}

/// Per-user cache location (`~/.cache/cdn-ranges/` on Linux)
///
/// Returns `None` if no home directory can be determined.
pub fn user_cache_path() -> Option<PathBuf> {
    let project_dirs = ProjectDirs::from("", "", "cdn-ranges")?;
    Some(project_dirs.cache_dir().join(CACHE_FILE_NAME))
}
