use axum::{extract::State, http::HeaderValue, response::Response};

use super::{payload_response, X_AGGREGATE_PARTIAL};
use crate::error::ApiError;
use crate::extract::ApiPath;
use crate::state::AppState;

/// GET /api/items/:user_id
pub async fn items(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<String>,
) -> Result<Response, ApiError> {
    let served = state.service.items(&user_id).await?;

    let mut response = payload_response(served.payload, served.cache);
    if served.partial_sources > 0 {
        response
            .headers_mut()
            .insert(X_AGGREGATE_PARTIAL, HeaderValue::from(served.partial_sources));
    }
    Ok(response)
}
