use axum::{extract::State, response::Response};
use robridge_core::Mode;
use serde::Deserialize;

use super::served_response;
use crate::error::ApiError;
use crate::extract::ApiQuery;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct FetchParams {
    pub url: Option<String>,
    pub mode: Option<String>,
}

/// GET /api/fetch?url=<path>&mode=direct
pub async fn fetch(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<FetchParams>,
) -> Result<Response, ApiError> {
    let url = params
        .url
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| ApiError::missing_parameter("url"))?;
    let mode = Mode::parse(params.mode.as_deref());

    let served = state.service.passthrough(&url, mode).await?;
    Ok(served_response(served))
}
