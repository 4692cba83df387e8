//! JSON error responses.
//!
//! Every failure leaves the server as
//! `{"ok": false, "error": <code>, "message": <text>, "details"?: <text>}`.

use std::any::Any;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use robridge_core::ProxyError;
use serde::Serialize;

/// Longest upstream body echoed back in `details`.
const MAX_DETAILS_LEN: usize = 2048;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    status: StatusCode,
    ok: bool,
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            ok: false,
            error: code,
            message: message.into(),
            details: None,
        }
    }

    pub fn missing_parameter(name: &str) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "proxy.invalid_request",
            format!("missing {name} parameter"),
        )
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// A handler panicked; the payload text goes to `details`.
    pub fn from_panic(panic: Box<dyn Any + Send + 'static>) -> Self {
        let details = if let Some(text) = panic.downcast_ref::<String>() {
            text.clone()
        } else if let Some(text) = panic.downcast_ref::<&str>() {
            (*text).to_owned()
        } else {
            String::from("unknown panic payload")
        };
        tracing::error!(%details, "request handler panicked");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "proxy.internal",
            "request handler panicked",
        )
        .with_details(details)
    }

    pub const fn status_code(&self) -> StatusCode {
        self.status
    }

    pub const fn code(&self) -> &'static str {
        self.error
    }
}

impl From<ProxyError> for ApiError {
    fn from(error: ProxyError) -> Self {
        let code = error.code();
        let message = error.to_string();
        match error {
            ProxyError::InvalidRequest(_) => Self::new(StatusCode::BAD_REQUEST, code, message),
            ProxyError::UpstreamRejection { status, body, .. } => {
                let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
                let api = Self::new(status, code, message);
                if body.is_empty() {
                    api
                } else {
                    api.with_details(truncate(body))
                }
            }
            ProxyError::Upstream { cause, .. } => {
                Self::new(StatusCode::BAD_GATEWAY, code, message).with_details(cause.to_string())
            }
            ProxyError::Internal(_) => {
                tracing::error!(%message, "internal error");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, code, message)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self)).into_response()
    }
}

fn truncate(mut body: String) -> String {
    if body.len() > MAX_DETAILS_LEN {
        let mut cut = MAX_DETAILS_LEN;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    body
}
