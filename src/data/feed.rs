//! Provider feed decoding and HTTP transport
//!
//! The feed is the AWS `ip-ranges.json` document: two prefix lists, one per
//! address family, where each entry is tagged with the service using it.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::RangeSet;
use crate::error::FetchError;

/// Raw response from one GET
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedResponse {
    pub status: u16,
    pub body: String,
}

/// Transport used to download the feed
///
/// Implementations report connection-level problems as
/// [`FetchError::Transport`] and leave status handling to the caller.
#[async_trait]
pub trait FeedClient: Send + Sync {
    async fn get(&self, url: &str) -> Result<FeedResponse, FetchError>;
}

/// `FeedClient` backed by reqwest
#[derive(Debug, Clone)]
pub struct HttpFeedClient {
    client: Client,
}

impl HttpFeedClient {
    /// Creates a client that aborts each request after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("cdn-ranges/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FeedClient for HttpFeedClient {
    async fn get(&self, url: &str) -> Result<FeedResponse, FetchError> {
        debug!(url, "Downloading range feed");
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(FeedResponse { status, body })
    }
}

/// The provider's native schema
#[derive(Debug, Deserialize)]
pub struct RawFeed {
    pub prefixes: Vec<Ipv4Entry>,
    pub ipv6_prefixes: Vec<Ipv6Entry>,
}

/// IPv4 entry of the feed's `prefixes` list
#[derive(Debug, Deserialize)]
pub struct Ipv4Entry {
    pub service: String,
    pub ip_prefix: String,
}

/// IPv6 entry of the feed's `ipv6_prefixes` list
#[derive(Debug, Deserialize)]
pub struct Ipv6Entry {
    pub service: String,
    pub ipv6_prefix: String,
}

impl RawFeed {
    /// Decodes a feed body; any other top-level shape is an error
    pub fn parse(body: &str) -> Result<Self, FetchError> {
        Ok(serde_json::from_str(body)?)
    }

    /// Keeps the prefixes tagged with `service_tag`, in feed order
    pub fn filter(self, service_tag: &str) -> RangeSet {
        let ipv4 = self
            .prefixes
            .into_iter()
            .filter(|entry| entry.service == service_tag)
            .map(|entry| entry.ip_prefix)
            .collect();
        let ipv6 = self
            .ipv6_prefixes
            .into_iter()
            .filter(|entry| entry.service == service_tag)
            .map(|entry| entry.ipv6_prefix)
            .collect();
        RangeSet { ipv4, ipv6 }
    }
}

/// Turns one GET result into a range set, classifying failures
pub fn transform(response: FeedResponse, service_tag: &str) -> Result<RangeSet, FetchError> {
    if response.status != 200 {
        return Err(FetchError::BadStatus(response.status));
    }
    Ok(RawFeed::parse(&response.body)?.filter(service_tag))
}
