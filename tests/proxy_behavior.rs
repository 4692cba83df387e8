//! Behavior-driven tests for the pass-through proxy
//!
//! These tests drive the real reqwest transport against a mock upstream and
//! verify how the system retries, caches and classifies what it forwards.

use robridge_core::{
    CacheStatus, Mode, PayloadKind, ProxyConfig, ProxyError, ProxyService, ReqwestHttpClient,
    RetryConfig, UpstreamCause, UpstreamHosts,
};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn service_for(server: &MockServer) -> ProxyService {
    let config = ProxyConfig::default()
        .with_hosts(UpstreamHosts::all(server.uri()))
        .with_api_key("secret")
        .with_retry(RetryConfig::fixed(Duration::ZERO, 3));
    ProxyService::new(&config, Arc::new(ReqwestHttpClient::new()))
}

// =============================================================================
// Pass-through: Payload Handling
// =============================================================================

#[tokio::test]
async fn when_upstream_returns_json_system_serves_it_once_then_from_cache() {
    // Given: An upstream that answers a JSON document exactly once
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/games/v1/games"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": [1]})))
        .expect(1)
        .mount(&server)
        .await;
    let service = service_for(&server);

    // When: The same path is requested twice
    let first = service
        .passthrough("games/v1/games", Mode::Roproxy)
        .await
        .expect("first read should succeed");
    let second = service
        .passthrough("https://www.api.roblox.com/games/v1/games", Mode::Roproxy)
        .await
        .expect("second read should succeed");

    // Then: The second read is served from the cache with the same body
    assert_eq!(first.cache, CacheStatus::Miss);
    assert_eq!(second.cache, CacheStatus::Hit);
    assert_eq!(first.payload.kind, PayloadKind::Text);
    assert_eq!(
        serde_json::from_slice::<serde_json::Value>(&second.payload.body).expect("json body"),
        serde_json::json!({"data": [1]})
    );
}

#[tokio::test]
async fn when_upstream_returns_an_image_system_keeps_raw_bytes() {
    // Given: An upstream serving PNG bytes
    let server = MockServer::start().await;
    let png = vec![0x89_u8, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
    Mock::given(method("GET"))
        .and(path("/v1/asset/icon.png"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(png.clone(), "image/png"))
        .mount(&server)
        .await;
    let service = service_for(&server);

    // When: The thumbnail path is requested
    let served = service
        .passthrough("thumbnails/v1/asset/icon.png", Mode::Roproxy)
        .await
        .expect("image should be served");

    // Then: The body is binary and byte-identical
    assert_eq!(served.payload.kind, PayloadKind::Binary);
    assert_eq!(served.payload.content_type, "image/png");
    assert_eq!(served.payload.body.as_ref(), png.as_slice());
}

// =============================================================================
// Pass-through: Retry Behavior
// =============================================================================

#[tokio::test]
async fn when_upstream_fails_twice_then_recovers_system_returns_success() {
    // Given: Two 503 responses followed by a 200
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;
    let service = service_for(&server);

    // When: The path is requested once
    let served = service.passthrough("v1/flaky", Mode::Roproxy).await;

    // Then: The retries absorb the failures
    assert!(served.is_ok(), "expected recovery, got {served:?}");
}

#[tokio::test]
async fn when_upstream_keeps_failing_system_gives_up_after_max_attempts() {
    // Given: An upstream that always answers 503
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/down"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;
    let service = service_for(&server);

    // When: The path is requested
    let error = service
        .passthrough("v1/down", Mode::Roproxy)
        .await
        .expect_err("upstream never recovers");

    // Then: Exactly three attempts were made and the last status is reported
    match error {
        ProxyError::Upstream {
            attempts, cause, ..
        } => {
            assert_eq!(attempts, 3);
            assert_eq!(cause, UpstreamCause::Status(503));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn when_upstream_rejects_request_system_does_not_retry() {
    // Given: An upstream answering 404
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not here"))
        .expect(1)
        .mount(&server)
        .await;
    let service = service_for(&server);

    // When: The path is requested
    let error = service
        .passthrough("v1/missing", Mode::Roproxy)
        .await
        .expect_err("404 is terminal");

    // Then: The rejection carries the upstream status and body
    assert_eq!(
        error,
        ProxyError::UpstreamRejection {
            url: format!("{}/v1/missing", server.uri()),
            status: 404,
            body: String::from("not here"),
        }
    );
}

// =============================================================================
// Pass-through: Credentials & Validation
// =============================================================================

#[tokio::test]
async fn when_direct_mode_is_requested_system_attaches_the_api_key() {
    // Given: An upstream that only answers when the key is present
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cloud/v2/universes/1"))
        .and(header("x-api-key", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;
    let service = service_for(&server);

    // When: The path is requested in direct mode
    let served = service.passthrough("cloud/v2/universes/1", Mode::Direct).await;

    // Then: The authenticated request is accepted
    assert!(served.is_ok(), "got {served:?}");
}

#[tokio::test]
async fn when_default_mode_is_requested_system_withholds_the_api_key() {
    // Given: Any upstream
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;
    let service = service_for(&server);

    // When: A path is requested through the pass-through mirror
    service
        .passthrough("users/v1/users/1", Mode::Roproxy)
        .await
        .expect("request should succeed");

    // Then: No credential left the process
    let received = server.received_requests().await.expect("recording enabled");
    assert_eq!(received.len(), 1);
    assert!(received[0].headers.get("x-api-key").is_none());
}

#[tokio::test]
async fn when_url_is_blank_system_never_calls_upstream() {
    // Given: An upstream that must not be called
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let service = service_for(&server);

    // When: Blank and prefix-only paths are requested
    let blank = service.passthrough("", Mode::Roproxy).await;
    let prefix_only = service.passthrough("https://www.", Mode::Roproxy).await;

    // Then: Both are rejected as invalid requests
    assert!(matches!(blank, Err(ProxyError::InvalidRequest(_))));
    assert!(matches!(prefix_only, Err(ProxyError::InvalidRequest(_))));
}
