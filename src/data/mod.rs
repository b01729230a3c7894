//! Core data models for CDN range lookups
//!
//! `RangeSet` is the value handed to callers and persisted in the cache.
//! The provider's raw feed and its HTTP client live in [`feed`].

pub mod feed;

pub use feed::{FeedClient, FeedResponse, HttpFeedClient, RawFeed};

use serde::{Deserialize, Serialize};

/// CIDR prefixes used by one service, split by address family
///
/// Prefixes keep the order in which they appear in the source feed. No
/// deduplication or sorting is performed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeSet {
    /// IPv4 prefixes, e.g. `"13.32.0.0/15"`
    pub ipv4: Vec<String>,
    /// IPv6 prefixes, e.g. `"2600:9000::/28"`
    pub ipv6: Vec<String>,
}

impl RangeSet {
    pub fn new(ipv4: Vec<String>, ipv6: Vec<String>) -> Self {
        Self { ipv4, ipv6 }
    }

    /// Total number of prefixes across both families
    pub fn len(&self) -> usize {
        self.ipv4.len() + self.ipv6.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ipv4.is_empty() && self.ipv6.is_empty()
    }
}

/// Where a returned range set came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOrigin {
    /// Cache was within the freshness window; no network call was made
    FreshCache,
    /// Downloaded during this call
    Network,
    /// Refresh failed and an expired cache entry was served
    StaleCache,
}

/// A range set together with its origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ranges {
    pub set: RangeSet,
    pub origin: RangeOrigin,
}
