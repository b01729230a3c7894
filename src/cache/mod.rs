//! Persistent cache for fetched range sets
//!
//! A single JSON file holds the last range set fetched successfully. Its
//! modification time decides freshness, and stale entries stay readable so
//! they can be served when a refresh fails.

mod store;

pub use store::{CacheRecord, CacheStore};
