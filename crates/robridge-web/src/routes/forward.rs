//! Thin single-resource forwards.

use axum::{extract::State, response::Response};
use serde::Deserialize;

use super::served_response;
use crate::error::ApiError;
use crate::extract::{ApiPath, ApiQuery};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct EndpointParams {
    pub endpoint: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UniverseParams {
    #[serde(rename = "universeId")]
    pub universe_id: Option<String>,
}

/// GET /games/:user_id
pub async fn games(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<String>,
) -> Result<Response, ApiError> {
    Ok(served_response(state.service.games(&user_id).await?))
}

/// GET /gamepasses/:universe_id
pub async fn universe_game_passes(
    State(state): State<AppState>,
    ApiPath(universe_id): ApiPath<String>,
) -> Result<Response, ApiError> {
    Ok(served_response(
        state.service.universe_game_passes(&universe_id).await?,
    ))
}

/// GET /avatar/:user_id
pub async fn outfits(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<String>,
) -> Result<Response, ApiError> {
    Ok(served_response(state.service.outfits(&user_id).await?))
}

/// GET /api/avatar?endpoint=<path>
pub async fn direct_endpoint(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<EndpointParams>,
) -> Result<Response, ApiError> {
    let endpoint = required(params.endpoint, "endpoint")?;
    Ok(served_response(state.service.direct(&endpoint).await?))
}

/// GET /api/gamepasses?universeId=<id>
pub async fn creator_game_passes(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<UniverseParams>,
) -> Result<Response, ApiError> {
    let universe_id = required(params.universe_id, "universeId")?;
    Ok(served_response(
        state.service.creator_game_passes(&universe_id).await?,
    ))
}

fn required(value: Option<String>, name: &str) -> Result<String, ApiError> {
    value
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ApiError::missing_parameter(name))
}
