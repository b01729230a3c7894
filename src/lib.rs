//! CDN IP range lookup with a day-long on-disk cache
//!
//! Downloads a provider's published prefix feed, keeps the prefixes tagged
//! with one service, and caches the result. A failed refresh falls back to
//! the cached copy, however stale.
//!
//! ```rust,ignore
//! use cdn_ranges::{get_ranges, FetchConfig};
//!
//! let ranges = get_ranges(&FetchConfig::default()).await?;
//! for prefix in &ranges.ipv4 {
//!     println!("allow {prefix}");
//! }
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod fetcher;

pub use cache::{CacheRecord, CacheStore};
pub use config::{CorruptCachePolicy, FallbackPolicy, FetchConfig};
pub use data::{FeedClient, FeedResponse, HttpFeedClient, RangeOrigin, RangeSet, Ranges};
pub use error::{FetchError, RangeError};
pub use fetcher::{get_ranges, RangeFetcher};
