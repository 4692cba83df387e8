//! Route table and shared response helpers.

mod fetch;
mod forward;
mod health;
mod items;

use std::any::Any;

use axum::{
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use robridge_core::{CacheStatus, CachedPayload, Served};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{self, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::error::ApiError;
use crate::state::AppState;

pub use health::HealthResponse;

pub(crate) const X_CACHE: HeaderName = HeaderName::from_static("x-cache");
pub(crate) const X_AGGREGATE_PARTIAL: HeaderName = HeaderName::from_static("x-aggregate-partial");

const TEXT_CACHE_CONTROL: &str = "public, max-age=30";
const BINARY_CACHE_CONTROL: &str = "public, max-age=60";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/fetch", get(fetch::fetch))
        .route("/api/items/:user_id", get(items::items))
        .route("/api/avatar", get(forward::direct_endpoint))
        .route("/api/gamepasses", get(forward::creator_game_passes))
        .route("/games/:user_id", get(forward::games))
        .route("/gamepasses/:universe_id", get(forward::universe_game_passes))
        .route("/avatar/:user_id", get(forward::outfits))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(
            CorsLayer::new()
                .allow_origin(cors::Any)
                .allow_methods([Method::GET, Method::OPTIONS]),
        )
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    ApiError::from_panic(panic).into_response()
}

/// Write a cached payload with its content type and cache headers.
pub(crate) fn payload_response(payload: CachedPayload, cache: CacheStatus) -> Response {
    let cache_control = if payload.kind.is_binary() {
        BINARY_CACHE_CONTROL
    } else {
        TEXT_CACHE_CONTROL
    };
    let content_type = HeaderValue::from_str(&payload.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

    let status = StatusCode::from_u16(payload.status).unwrap_or(StatusCode::OK);
    let mut response = (status, payload.body).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, content_type);
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(cache_control));
    headers.insert(X_CACHE, HeaderValue::from_static(cache.as_str()));
    response
}

pub(crate) fn served_response(served: Served) -> Response {
    payload_response(served.payload, served.cache)
}
