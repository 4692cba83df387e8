//! Behavior-driven tests for item aggregation
//!
//! These tests verify HOW the aggregate endpoint walks games, game passes,
//! collectibles and worn assets on a mock upstream and merges them into one
//! canonical item map.

use robridge_core::{
    AggregateResult, CacheStatus, ItemType, ProxyConfig, ProxyService, ReqwestHttpClient,
    RetryConfig, UpstreamHosts,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> ProxyConfig {
    ProxyConfig::default()
        .with_hosts(UpstreamHosts::all(server.uri()))
        .with_api_key("secret")
        .with_retry(RetryConfig::fixed(Duration::ZERO, 2))
}

async fn mount_json(server: &MockServer, route: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn decode(body: &[u8]) -> AggregateResult {
    serde_json::from_slice(body).expect("aggregate body should be valid json")
}

// =============================================================================
// Aggregation: Happy Path
// =============================================================================

#[tokio::test]
async fn when_user_has_two_games_and_a_worn_item_system_returns_three_items() {
    // Given: Two games split over two pages, one pass per universe, one worn asset
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/users/1/games"))
        .and(query_param_is_missing("cursor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": 10, "name": "Obby"}],
            "nextPageCursor": "p2"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/users/1/games"))
        .and(query_param("cursor", "p2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": 20, "name": "Tycoon"}],
            "nextPageCursor": null
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/game-passes/v1/universes/10/game-passes/creator"))
        .and(header("x-api-key", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "gamePasses": [{"gamePassId": 100, "displayName": "VIP", "price": 50}],
            "nextPageToken": null
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/game-passes/v1/universes/20/game-passes/creator"))
        .and(header("x-api-key", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "gamePasses": [{"gamePassId": 200, "displayName": "Speed", "priceInRobux": 75}]
        })))
        .mount(&server)
        .await;
    mount_json(&server, "/v1/users/1/assets/collectibles", json!({"data": []})).await;
    mount_json(&server, "/v1/users/1/currently-wearing", json!({"assetIds": [300]})).await;
    let service = ProxyService::new(&config_for(&server), Arc::new(ReqwestHttpClient::new()));

    // When: The aggregate is requested
    let served = service.items("1").await.expect("aggregate should build");

    // Then: Exactly two passes and one worn placeholder come back
    let result = decode(&served.payload.body);
    assert_eq!(served.cache, CacheStatus::Miss);
    assert_eq!(served.partial_sources, 0);
    assert_eq!(result.items.len(), 3);

    let vip = &result.items["100"];
    assert_eq!(vip.item_type, ItemType::Gamepass);
    assert_eq!(vip.item_price, 50);
    assert_eq!(vip.item_name, "VIP");

    let speed = &result.items["200"];
    assert_eq!(speed.item_type, ItemType::Gamepass);
    assert_eq!(speed.item_price, 75);

    let worn = &result.items["300"];
    assert_eq!(worn.item_type, ItemType::Asset);
    assert_eq!(worn.item_price, 0);
}

#[tokio::test]
async fn when_aggregate_is_requested_twice_system_serves_the_cached_copy() {
    // Given: A user with nothing but a worn asset, and an upstream that counts calls
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/users/2/games"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(1)
        .mount(&server)
        .await;
    mount_json(&server, "/v1/users/2/assets/collectibles", json!({"data": []})).await;
    mount_json(&server, "/v1/users/2/currently-wearing", json!({"assetIds": [9]})).await;
    let service = ProxyService::new(&config_for(&server), Arc::new(ReqwestHttpClient::new()));

    // When: The aggregate is requested twice
    let first = service.items("2").await.expect("first aggregate");
    let second = service.items("2").await.expect("second aggregate");

    // Then: The second response is a cache hit with the same body
    assert_eq!(first.cache, CacheStatus::Miss);
    assert_eq!(second.cache, CacheStatus::Hit);
    assert_eq!(first.payload.body, second.payload.body);
}

// =============================================================================
// Aggregation: Merge Priority
// =============================================================================

#[tokio::test]
async fn when_worn_item_is_also_a_collectible_system_keeps_the_detailed_record() {
    // Given: A worn asset that is also an owned collectible
    let server = MockServer::start().await;
    mount_json(&server, "/v2/users/3/games", json!({"data": []})).await;
    mount_json(
        &server,
        "/v1/users/3/assets/collectibles",
        json!({"data": [{"assetId": 555, "name": "Sparkle Time Fedora", "recentAveragePrice": 4000}]}),
    )
    .await;
    mount_json(&server, "/v1/users/3/currently-wearing", json!({"assetIds": [555]})).await;
    let service = ProxyService::new(&config_for(&server), Arc::new(ReqwestHttpClient::new()));

    // When: The aggregate is requested
    let served = service.items("3").await.expect("aggregate should build");

    // Then: The detailed collectible wins over the placeholder
    let result = decode(&served.payload.body);
    assert_eq!(result.items.len(), 1);
    assert_eq!(result.items["555"].item_name, "Sparkle Time Fedora");
    assert_eq!(result.items["555"].item_price, 4000);
}

// =============================================================================
// Aggregation: Partial Failures
// =============================================================================

#[tokio::test]
async fn when_one_universe_fails_system_returns_the_rest_with_a_warning() {
    // Given: Two universes, one of which keeps failing
    let server = MockServer::start().await;
    mount_json(&server, "/v2/users/4/games", json!({"data": [{"id": 10}, {"id": 20}]})).await;
    Mock::given(method("GET"))
        .and(path("/game-passes/v1/universes/10/game-passes/creator"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;
    mount_json(
        &server,
        "/game-passes/v1/universes/20/game-passes/creator",
        json!({"data": [{"id": 201, "name": "Pet", "price": 10}]}),
    )
    .await;
    mount_json(&server, "/v1/users/4/assets/collectibles", json!({"data": []})).await;
    mount_json(&server, "/v1/users/4/currently-wearing", json!({"assetIds": []})).await;
    let service = ProxyService::new(&config_for(&server), Arc::new(ReqwestHttpClient::new()));

    // When: The aggregate is requested
    let served = service.items("4").await.expect("partial aggregate is not an error");

    // Then: The healthy universe contributes and the failure is reported
    let result = decode(&served.payload.body);
    assert_eq!(served.partial_sources, 1);
    assert_eq!(result.items.len(), 1);
    assert!(result.items.contains_key("201"));
    assert!(result.warnings[0].starts_with("gamepasses:10"));
}

#[tokio::test]
async fn when_games_listing_is_unreachable_system_returns_an_empty_aggregate() {
    // Given: An upstream whose games listing is down
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/users/5/games"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let service = ProxyService::new(&config_for(&server), Arc::new(ReqwestHttpClient::new()));

    // When: The aggregate is requested
    let served = service.items("5").await.expect("unreachable parent is not an error");

    // Then: The aggregate is empty and flagged partial
    let result = decode(&served.payload.body);
    assert!(result.items.is_empty());
    assert_eq!(served.partial_sources, 1);
}

#[tokio::test]
async fn when_pagination_never_ends_system_stops_at_the_page_guard() {
    // Given: A games listing that always hands out a fresh cursor
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/users/6/games"))
        .and(query_param_is_missing("cursor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": 1}],
            "nextPageCursor": "a"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/users/6/games"))
        .and(query_param("cursor", "a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": 2}],
            "nextPageCursor": "b"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/users/6/games"))
        .and(query_param("cursor", "b"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": 3}],
            "nextPageCursor": "c"
        })))
        .expect(0)
        .mount(&server)
        .await;
    mount_json(&server, "/game-passes/v1/universes/1/game-passes/creator", json!({"data": []})).await;
    mount_json(&server, "/game-passes/v1/universes/2/game-passes/creator", json!({"data": []})).await;
    mount_json(&server, "/v1/users/6/assets/collectibles", json!({"data": []})).await;
    mount_json(&server, "/v1/users/6/currently-wearing", json!({"assetIds": []})).await;
    let config = config_for(&server).with_max_pages(2);
    let service = ProxyService::new(&config, Arc::new(ReqwestHttpClient::new()));

    // When: The aggregate is requested
    let served = service.items("6").await.expect("guarded walk is not an error");

    // Then: Only two pages were walked and the guard is reported
    let result = decode(&served.payload.body);
    assert_eq!(served.partial_sources, 1);
    assert_eq!(result.warnings, vec![String::from("games:6: page limit of 2 reached")]);
}
