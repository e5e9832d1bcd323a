//! Integration tests for the Fetcher using wiremock
//!
//! These tests validate status classification, the retry budget and CAPTCHA
//! handling against a mock server.

mod common;

use masothue::error::Error;
use masothue::parser::parse_detail;
use masothue::utils::error::{FetchError, ParseError};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{fast_fetcher, CAPTCHA_HTML, DETAIL_HTML};

/// Test successful fetch from mock server
#[tokio::test]
async fn test_fetch_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/3604062974-cong-ty-tnhh-abc"))
        .respond_with(ResponseTemplate::new(200).set_body_string(DETAIL_HTML))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = fast_fetcher(&mock_server.uri(), 2);
    let doc = fetcher.fetch("/3604062974-cong-ty-tnhh-abc").await;

    assert!(doc.is_ok(), "Fetch should succeed: {:?}", doc.err());
    let doc = doc.unwrap();
    assert_eq!(doc.status, 200);
    assert!(doc.body.contains("CÔNG TY TNHH ABC"));

    let metrics = fetcher.metrics();
    assert_eq!(metrics.attempts, 1);
    assert_eq!(metrics.successes, 1);
}

/// Test that the search endpoint receives the query and type parameters
#[tokio::test]
async fn test_search_url_parameters() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Search/"))
        .and(query_param("q", "công ty abc"))
        .and(query_param("type", "auto"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body></body></html>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = fast_fetcher(&mock_server.uri(), 0);
    let url = fetcher.search_url("công ty abc").unwrap();
    assert!(fetcher.fetch(url.as_str()).await.is_ok());
}

/// Test 404 does not retry
#[tokio::test]
async fn test_404_no_retry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/notfound"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1) // Should only be called once (no retry)
        .mount(&mock_server)
        .await;

    let fetcher = fast_fetcher(&mock_server.uri(), 3);
    let result = fetcher.fetch("/notfound").await;

    assert!(matches!(result, Err(FetchError::NotFound { .. })));
    assert_eq!(fetcher.metrics().attempts, 1);
}

/// Test that other client errors are terminal too
#[tokio::test]
async fn test_other_4xx_no_retry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(410))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = fast_fetcher(&mock_server.uri(), 3);
    let result = fetcher.fetch("/gone").await;

    match result {
        Err(FetchError::Network { status, .. }) => assert_eq!(status, Some(410)),
        other => panic!("expected network error, got {other:?}"),
    }
}

/// Test that server errors trigger retries
#[tokio::test]
async fn test_server_error_retry() {
    let mock_server = MockServer::start().await;

    // Return 500 twice, then succeed
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>OK</html>"))
        .mount(&mock_server)
        .await;

    let fetcher = fast_fetcher(&mock_server.uri(), 2);
    let result = fetcher.fetch("/flaky").await;

    assert!(result.is_ok(), "Should succeed after retries");
    assert_eq!(fetcher.metrics().attempts, 3);
}

/// Test the retry budget: exactly retries + 1 attempts, all rate limited
#[tokio::test]
async fn test_max_retries_exceeded() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&mock_server)
        .await;

    let fetcher = fast_fetcher(&mock_server.uri(), 2);
    let result = fetcher.fetch("/down").await;

    match result {
        Err(FetchError::Network { status, .. }) => assert_eq!(status, Some(503)),
        other => panic!("expected network error, got {other:?}"),
    }
    assert_eq!(fetcher.metrics().attempts, 3);
    assert_eq!(fetcher.rate_limiter().get_metrics().total_requests, 3);
}

/// Test unreachable host: transport errors use the same budget
#[tokio::test]
async fn test_connection_refused_bounded() {
    // Bind and drop to get a port nothing listens on
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let fetcher = fast_fetcher(&format!("http://127.0.0.1:{port}"), 2);
    let result = fetcher.fetch("/anything").await;

    match result {
        Err(FetchError::Network { status, .. }) => assert_eq!(status, None),
        other => panic!("expected network error, got {other:?}"),
    }
    assert_eq!(fetcher.metrics().attempts, 3);
    assert_eq!(fetcher.rate_limiter().get_metrics().total_requests, 3);
}

/// Test 429 with Retry-After is retried and then succeeds
#[tokio::test]
async fn test_rate_limited_then_ok() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>OK</html>"))
        .mount(&mock_server)
        .await;

    let fetcher = fast_fetcher(&mock_server.uri(), 2);
    let result = fetcher.fetch("/busy").await;

    assert!(result.is_ok());
    let metrics = fetcher.metrics();
    assert_eq!(metrics.blocked, 1);
    assert_eq!(metrics.attempts, 2);
}

/// Test a persistent 403 ends as Blocked after the budget
#[tokio::test]
async fn test_persistent_block() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/forbidden"))
        .respond_with(ResponseTemplate::new(403))
        .expect(2)
        .mount(&mock_server)
        .await;

    let fetcher = fast_fetcher(&mock_server.uri(), 1);
    let result = fetcher.fetch("/forbidden").await;

    match result {
        Err(FetchError::Blocked { status, .. }) => assert_eq!(status, 403),
        other => panic!("expected blocked error, got {other:?}"),
    }
}

/// Test a CAPTCHA page is terminal and never retried
#[tokio::test]
async fn test_captcha_no_retry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/challenge"))
        .respond_with(ResponseTemplate::new(200).set_body_string(CAPTCHA_HTML))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = fast_fetcher(&mock_server.uri(), 3);
    let result = fetcher.fetch_parsed("/challenge", parse_detail).await;

    match result {
        Err(Error::Fetch(FetchError::CaptchaRequired { marker, .. })) => {
            assert!(marker.contains("recaptcha"), "marker: {marker}");
        }
        other => panic!("expected CAPTCHA error, got {other:?}"),
    }
    assert_eq!(fetcher.metrics().captchas, 1);
}

/// Test an empty body is reported as a parse failure
#[tokio::test]
async fn test_empty_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/blank"))
        .respond_with(ResponseTemplate::new(200).set_body_string("   "))
        .mount(&mock_server)
        .await;

    let fetcher = fast_fetcher(&mock_server.uri(), 0);
    let result = fetcher.fetch_parsed("/blank", parse_detail).await;

    assert!(matches!(
        result,
        Err(Error::Parse(ParseError::EmptyDocument { .. }))
    ));
}
