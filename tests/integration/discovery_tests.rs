//! Discovery and fetcher behavior against a mock catalog

use crate::catalog::{index_page, mount_catalog, request_count, sample_books, test_config};
use catalog_sentinel::crawler::{discover_all_urls, FetchError, Fetcher};
use catalog_sentinel::SentinelError;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_discovers_urls_across_pages() {
    let server = MockServer::start().await;
    let books = sample_books();
    mount_catalog(&server, &books).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server, dir.path());
    let fetcher = Fetcher::new(&config).unwrap();
    let base = Url::parse(&config.site.base_url).unwrap();

    let urls = discover_all_urls(&fetcher, &base).await.unwrap();

    let expected: Vec<String> = books.iter().map(|b| b.url(&server)).collect();
    assert_eq!(urls, expected);
}

#[tokio::test]
async fn test_failed_listing_page_contributes_nothing() {
    let server = MockServer::start().await;
    let hrefs = vec!["catalogue/only-book_1/index.html".to_string()];

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(index_page(&hrefs, 1, 3)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/catalogue/page-2.html"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/catalogue/page-3.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(index_page(&[], 3, 3)))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server, dir.path());
    let fetcher = Fetcher::new(&config).unwrap();
    let base = Url::parse(&config.site.base_url).unwrap();

    let urls = discover_all_urls(&fetcher, &base).await.unwrap();

    assert_eq!(
        urls,
        vec![format!("{}/catalogue/only-book_1/index.html", server.uri())]
    );
    assert_eq!(request_count(&server, "/catalogue/page-2.html").await, 3);
}

#[tokio::test]
async fn test_unreachable_root_fails_discovery() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server, dir.path());
    let fetcher = Fetcher::new(&config).unwrap();
    let base = Url::parse(&config.site.base_url).unwrap();

    let result = discover_all_urls(&fetcher, &base).await;

    assert!(matches!(result, Err(SentinelError::Discovery { .. })));
}

#[tokio::test]
async fn test_server_error_is_retried_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let fetcher = Fetcher::new(&test_config(&server, dir.path())).unwrap();

    let body = fetcher.fetch(&format!("{}/flaky", server.uri())).await;

    assert_eq!(body, Ok("ok".to_string()));
    assert_eq!(request_count(&server, "/flaky").await, 3);
}

#[tokio::test]
async fn test_retries_are_bounded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let fetcher = Fetcher::new(&test_config(&server, dir.path())).unwrap();

    let result = fetcher.fetch(&format!("{}/down", server.uri())).await;

    assert_eq!(result, Err(FetchError::ServerStatus(500)));
    assert_eq!(request_count(&server, "/down").await, 3);
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let fetcher = Fetcher::new(&test_config(&server, dir.path())).unwrap();

    let result = fetcher.fetch(&format!("{}/missing", server.uri())).await;

    assert_eq!(result, Err(FetchError::ClientStatus(404)));
    assert_eq!(request_count(&server, "/missing").await, 1);
}

#[tokio::test]
async fn test_batch_resolves_every_url() {
    let server = MockServer::start().await;
    let books = sample_books();
    mount_catalog(&server, &books).await;

    let dir = TempDir::new().unwrap();
    let fetcher = Fetcher::new(&test_config(&server, dir.path())).unwrap();

    let mut urls: Vec<String> = books.iter().map(|b| b.url(&server)).collect();
    urls.push(format!("{}/catalogue/gone/index.html", server.uri()));

    let results = fetcher.fetch_batch(&urls).await;

    assert_eq!(results.len(), urls.len());
    for url in &urls {
        assert_eq!(results.iter().filter(|(u, _)| u == url).count(), 1);
    }
    assert_eq!(results.iter().filter(|(_, r)| r.is_ok()).count(), 3);
}

#[tokio::test]
async fn test_batch_never_exceeds_concurrency_cap() {
    let server = MockServer::start().await;
    let delay = Duration::from_millis(200);
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok").set_delay(delay))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = test_config(&server, dir.path());
    config.fetcher.max_concurrent_requests = 3;
    let fetcher = Fetcher::new(&config).unwrap();

    let urls: Vec<String> = (0..12)
        .map(|i| format!("{}/slow/{}", server.uri(), i))
        .collect();

    let started = Instant::now();
    let results = fetcher.fetch_batch(&urls).await;
    let elapsed = started.elapsed();

    assert_eq!(results.iter().filter(|(_, r)| r.is_ok()).count(), 12);
    // 12 requests through 3 slots take at least 4 sequential delays
    assert!(elapsed >= delay * 4, "finished in {:?}", elapsed);
}
