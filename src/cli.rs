//! Command-line interface for cdn-ranges
//!
//! Maps flags onto a [`FetchConfig`] and sets up logging to stderr so that
//! stdout carries only the resulting JSON.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::config::{
    user_cache_path, CorruptCachePolicy, FallbackPolicy, FetchConfig, DEFAULT_SERVICE_TAG,
    DEFAULT_SOURCE_URL,
};

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// `--user-cache` was given but no home directory is known
    #[error("Cannot determine a per-user cache directory; use --cache-path instead")]
    NoUserCacheDir,

    /// The logging subscriber could not be installed
    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}

/// Print the IP ranges a CDN provider currently uses, cached for a day
#[derive(Parser, Debug)]
#[command(name = "cdn-ranges")]
#[command(about = "Fetch and cache the IP ranges published for a CDN service")]
#[command(version)]
pub struct Cli {
    /// Feed URL
    #[arg(long, value_name = "URL", default_value = DEFAULT_SOURCE_URL)]
    pub url: String,

    /// Service tag to keep, e.g. CLOUDFRONT
    #[arg(long, value_name = "TAG", default_value = DEFAULT_SERVICE_TAG)]
    pub service: String,

    /// Hours a cached result stays fresh
    #[arg(long, value_name = "HOURS", default_value_t = 24)]
    pub max_age_hours: u64,

    /// Fetch attempts before giving up
    #[arg(long, value_name = "N", default_value_t = 3)]
    pub retries: u32,

    /// Cache file location (defaults to the system temp directory)
    #[arg(long, value_name = "PATH", conflicts_with = "user_cache")]
    pub cache_path: Option<PathBuf>,

    /// Keep the cache in the per-user cache directory
    #[arg(long)]
    pub user_cache: bool,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Initial delay between attempts in milliseconds, doubled after each failure
    #[arg(long, value_name = "MS", default_value_t = 0)]
    pub retry_delay_ms: u64,

    /// Fail instead of serving stale cached ranges when the refresh fails
    #[arg(long)]
    pub fail_hard: bool,

    /// Refresh over a corrupt cache file instead of failing
    #[arg(long)]
    pub refresh_corrupt: bool,

    /// Log debug output
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Log errors only
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Builds the fetch configuration described by the flags
    pub fn to_config(&self) -> Result<FetchConfig, CliError> {
        let mut config = FetchConfig::default()
            .with_source_url(self.url.clone())
            .with_service_tag(self.service.clone())
            .with_max_age(Duration::from_secs(self.max_age_hours.saturating_mul(3600)))
            .with_retry_count(self.retries)
            .with_request_timeout(Duration::from_secs(self.timeout_secs));

        if let Some(ref path) = self.cache_path {
            config = config.with_cache_path(path.clone());
        } else if self.user_cache {
            config = config.with_cache_path(user_cache_path().ok_or(CliError::NoUserCacheDir)?);
        }

        if self.retry_delay_ms > 0 {
            let max = config.max_retry_delay;
            config = config.with_backoff(Duration::from_millis(self.retry_delay_ms), max);
        }
        if self.fail_hard {
            config = config.with_fallback(FallbackPolicy::FailHard);
        }
        if self.refresh_corrupt {
            config = config.with_corrupt_cache_policy(CorruptCachePolicy::Refresh);
        }
        Ok(config)
    }

    /// Default log level implied by `--verbose` / `--quiet`
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        }
    }
}

/// Installs a stderr `tracing` subscriber; `RUST_LOG` overrides `default_level`
pub fn init_tracing(default_level: &str) -> Result<(), CliError> {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .compact()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| CliError::Logging(e.to_string()))
}
