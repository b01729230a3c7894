//! Fetch-cache-fallback pipeline
//!
//! `RangeFetcher` serves the cached range set while it is fresh, otherwise
//! downloads the feed with a bounded number of sequential attempts, writes a
//! successful result through to the cache and falls back to the stale cache
//! when every attempt fails.

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::cache::{CacheRecord, CacheStore};
use crate::config::{CorruptCachePolicy, FallbackPolicy, FetchConfig};
use crate::data::feed::transform;
use crate::data::{FeedClient, HttpFeedClient, RangeOrigin, RangeSet, Ranges};
use crate::error::{FetchError, RangeError};

/// Outcome of a refresh in which every attempt failed
#[derive(Debug)]
struct Exhausted {
    attempts: u32,
    last: FetchError,
}

/// Resolves the current range set for one configuration
#[derive(Debug)]
pub struct RangeFetcher<C = HttpFeedClient> {
    config: FetchConfig,
    client: C,
    store: CacheStore,
}

impl RangeFetcher<HttpFeedClient> {
    /// Creates a fetcher that downloads over HTTP(S)
    pub fn new(config: FetchConfig) -> Result<Self, RangeError> {
        let client = HttpFeedClient::new(config.request_timeout)
            .map_err(|e| RangeError::Client(e.to_string()))?;
        Ok(Self::with_client(config, client))
    }
}

impl<C: FeedClient> RangeFetcher<C> {
    /// Creates a fetcher with a custom transport
    pub fn with_client(config: FetchConfig, client: C) -> Self {
        let store = CacheStore::new(config.cache_path.clone());
        Self {
            config,
            client,
            store,
        }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Returns the current range set, fresh or stale
    pub async fn get_ranges(&self) -> Result<RangeSet, RangeError> {
        Ok(self.get_ranges_with_origin().await?.set)
    }

    /// Returns the current range set along with where it came from
    ///
    /// # Behavior
    /// - A corrupt cache file fails immediately unless the config opts into refreshing
    /// - A cache within `max_age` is returned without any network call
    /// - Otherwise the feed is fetched; on success the result is written to the
    ///   cache (a write failure is logged, not returned)
    /// - If every attempt fails, the stale cache is served when present, else
    ///   `NoDataAvailable` is returned
    pub async fn get_ranges_with_origin(&self) -> Result<Ranges, RangeError> {
        let cached = self.check_cache()?;

        if let Some(ref record) = cached {
            if record.is_fresh_at(Utc::now(), self.config.max_age) {
                debug!(path = %self.store.path().display(), "Range cache is fresh");
                return Ok(Ranges {
                    set: record.ranges.clone(),
                    origin: RangeOrigin::FreshCache,
                });
            }
            debug!(path = %self.store.path().display(), "Range cache is stale, refreshing");
        }

        match self.refresh().await {
            Ok(set) => {
                if let Err(e) = self.store.store(&set) {
                    warn!(error = %e, "Failed to persist fetched ranges");
                }
                Ok(Ranges {
                    set,
                    origin: RangeOrigin::Network,
                })
            }
            Err(Exhausted { attempts, last }) => match (cached, self.config.fallback) {
                (Some(record), FallbackPolicy::ServeStale) => {
                    warn!(
                        attempts,
                        error = %last,
                        age_secs = record.age_at(Utc::now()).as_secs(),
                        "Refresh failed, serving stale ranges"
                    );
                    Ok(Ranges {
                        set: record.ranges,
                        origin: RangeOrigin::StaleCache,
                    })
                }
                (Some(_), FallbackPolicy::FailHard) => {
                    Err(RangeError::FetchFailed { attempts, last })
                }
                (None, _) => Err(RangeError::NoDataAvailable { attempts, last }),
            },
        }
    }

    fn check_cache(&self) -> Result<Option<CacheRecord>, RangeError> {
        match self.store.load() {
            Ok(record) => Ok(record),
            Err(e @ RangeError::CorruptCache { .. }) => match self.config.on_corrupt_cache {
                CorruptCachePolicy::Fail => Err(e),
                CorruptCachePolicy::Refresh => {
                    warn!(error = %e, "Ignoring corrupt range cache");
                    Ok(None)
                }
            },
            Err(e) => {
                warn!(error = %e, "Range cache unreadable, treating as absent");
                Ok(None)
            }
        }
    }

    async fn refresh(&self) -> Result<RangeSet, Exhausted> {
        let attempts = self.config.attempts();
        let mut attempt = 1;
        loop {
            match self.fetch_once().await {
                Ok(set) => {
                    if set.is_empty() {
                        warn!(
                            service = %self.config.service_tag,
                            "Feed lists no prefixes for service"
                        );
                    }
                    info!(
                        attempt,
                        ipv4 = set.ipv4.len(),
                        ipv6 = set.ipv6.len(),
                        "Fetched ranges"
                    );
                    return Ok(set);
                }
                Err(e) => {
                    warn!(attempt, attempts, error = %e, "Range fetch attempt failed");
                    if attempt >= attempts {
                        return Err(Exhausted { attempts, last: e });
                    }
                }
            }

            let delay = self.config.delay_after(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            attempt += 1;
        }
    }

    async fn fetch_once(&self) -> Result<RangeSet, FetchError> {
        let response = self.client.get(&self.config.source_url).await?;
        transform(response, &self.config.service_tag)
    }
}

/// Resolves the range set for `config` over HTTP(S)
pub async fn get_ranges(config: &FetchConfig) -> Result<RangeSet, RangeError> {
    RangeFetcher::new(config.clone())?.get_ranges().await
}
