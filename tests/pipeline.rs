//! End-to-end tests of the fetch-cache-fallback pipeline over real HTTP
//!
//! A local listener answers each connection with a canned response so the
//! reqwest transport, status handling and decoding are all exercised.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cdn_ranges::{
    CacheStore, FeedClient, FetchConfig, FetchError, HttpFeedClient, RangeError, RangeFetcher,
    RangeOrigin, RangeSet,
};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const FEED: &str = r#"{"prefixes":[{"service":"CLOUDFRONT","ip_prefix":"1.2.3.0/24"},{"service":"OTHER","ip_prefix":"9.9.9.0/24"}],"ipv6_prefixes":[{"service":"CLOUDFRONT","ipv6_prefix":"2001:db8::/32"}]}"#;

/// Serves `(status, body)` responses in order, repeating the last one
async fn serve(responses: Vec<(u16, &'static str)>) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let (status, body) = responses[n.min(responses.len() - 1)];

            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    (format!("http://{}/ip-ranges.json", addr), hits)
}

fn config(url: &str, dir: &TempDir) -> FetchConfig {
    FetchConfig::default()
        .with_source_url(url)
        .with_cache_path(dir.path().join("ranges.json"))
        .with_request_timeout(Duration::from_secs(5))
}

fn expected() -> RangeSet {
    RangeSet::new(
        vec!["1.2.3.0/24".to_string()],
        vec!["2001:db8::/32".to_string()],
    )
}

#[tokio::test]
async fn test_scenario_feed_over_http() {
    let (url, hits) = serve(vec![(200, FEED)]).await;
    let dir = TempDir::new().unwrap();

    let set = cdn_ranges::get_ranges(&config(&url, &dir)).await.unwrap();

    assert_eq!(set, expected());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    let cached = CacheStore::new(dir.path().join("ranges.json"))
        .load()
        .unwrap()
        .expect("Result written to cache");
    assert_eq!(cached.ranges, expected());
}

#[tokio::test]
async fn test_second_call_is_served_from_cache() {
    let (url, hits) = serve(vec![(200, FEED)]).await;
    let dir = TempDir::new().unwrap();
    let fetcher = RangeFetcher::new(config(&url, &dir)).unwrap();

    let first = fetcher.get_ranges_with_origin().await.unwrap();
    let second = fetcher.get_ranges_with_origin().await.unwrap();

    assert_eq!(first.origin, RangeOrigin::Network);
    assert_eq!(second.origin, RangeOrigin::FreshCache);
    assert_eq!(first.set, second.set);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let (url, hits) = serve(vec![(500, "oops"), (503, ""), (200, FEED)]).await;
    let dir = TempDir::new().unwrap();

    let set = cdn_ranges::get_ranges(&config(&url, &dir)).await.unwrap();

    assert_eq!(set, expected());
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_persistent_server_errors_without_cache() {
    let (url, hits) = serve(vec![(502, "bad gateway")]).await;
    let dir = TempDir::new().unwrap();

    let err = cdn_ranges::get_ranges(&config(&url, &dir)).await.unwrap_err();

    match err {
        RangeError::NoDataAvailable { attempts, last } => {
            assert_eq!(attempts, 3);
            assert!(matches!(last, FetchError::BadStatus(502)));
        }
        other => panic!("Expected NoDataAvailable, got {other:?}"),
    }
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_http_client_reports_status_and_body() {
    let (url, _hits) = serve(vec![(404, "missing")]).await;
    let client = HttpFeedClient::new(Duration::from_secs(5)).unwrap();

    let response = client.get(&url).await.unwrap();

    assert_eq!(response.status, 404);
    assert_eq!(response.body, "missing");
}

#[tokio::test]
async fn test_unreachable_host_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let client = HttpFeedClient::new(Duration::from_secs(5)).unwrap();

    let err = client
        .get(&format!("http://{}/ip-ranges.json", addr))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Transport(_)));
}

#[tokio::test]
async fn test_unreachable_host_root_cause_is_chained() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let dir = TempDir::new().unwrap();
    let config = config(&format!("http://{}/ip-ranges.json", addr), &dir).with_retry_count(1);

    let err = cdn_ranges::get_ranges(&config).await.unwrap_err();

    assert!(matches!(err, RangeError::NoDataAvailable { .. }));
    let mut chain = Vec::new();
    let mut current: Option<&dyn std::error::Error> = Some(&err);
    while let Some(e) = current {
        chain.push(e.to_string().to_lowercase());
        current = e.source();
    }
    assert!(
        chain.iter().any(|link| link.contains("refused")),
        "Connection refusal missing from error chain: {:?}",
        chain
    );
}
