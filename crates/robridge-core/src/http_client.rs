//! Outbound HTTP transport.
//!
//! Everything that talks to an upstream host goes through the [`HttpClient`]
//! trait so the retrying fetcher, the collector and the aggregator can be
//! driven by scripted transports in tests.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::de::DeserializeOwned;

/// Header carrying the opaque upstream credential.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Default per-request transport timeout.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Whether a payload is forwarded as raw bytes or as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    Binary,
    Text,
}

impl PayloadKind {
    /// Classify a response from its `content-type`.
    ///
    /// JSON always wins; images and octet streams are binary. With no
    /// content type at all the caller's expectation is kept.
    pub fn sniff(content_type: Option<&str>, expected: PayloadKind) -> PayloadKind {
        let Some(content_type) = content_type.filter(|value| !value.is_empty()) else {
            return expected;
        };
        let lowered = content_type.to_ascii_lowercase();
        if lowered.contains("application/json") {
            return PayloadKind::Text;
        }
        if lowered.contains("image") || lowered.contains("octet-stream") {
            PayloadKind::Binary
        } else {
            PayloadKind::Text
        }
    }

    pub const fn is_binary(self) -> bool {
        matches!(self, Self::Binary)
    }
}

/// Authentication applied to outgoing requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpAuth {
    None,
    Header { name: String, value: String },
}

impl HttpAuth {
    /// Credential sent as `x-api-key`.
    pub fn api_key(value: impl Into<String>) -> Self {
        Self::Header {
            name: String::from(API_KEY_HEADER),
            value: value.into(),
        }
    }

    pub fn apply(&self, headers: &mut BTreeMap<String, String>) {
        match self {
            Self::None => {}
            Self::Header { name, value } => {
                headers.insert(name.to_ascii_lowercase(), value.clone());
            }
        }
    }
}

/// One resolved GET against an upstream host.
///
/// Built once with the `with_*` methods and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamRequest {
    url: String,
    headers: BTreeMap<String, String>,
    expected_kind: PayloadKind,
    timeout_ms: u64,
}

impl UpstreamRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: BTreeMap::new(),
            expected_kind: PayloadKind::Text,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_auth(mut self, auth: &HttpAuth) -> Self {
        auth.apply(&mut self.headers);
        self
    }

    pub fn with_expected_kind(mut self, kind: PayloadKind) -> Self {
        self.expected_kind = kind;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub const fn expected_kind(&self) -> PayloadKind {
        self.expected_kind
    }

    pub const fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }
}

/// Raw upstream response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, content_type: Option<String>, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            content_type,
            body: body.into(),
        }
    }

    pub fn ok_json(body: impl Into<String>) -> Self {
        Self::new(
            200,
            Some(String::from("application/json; charset=utf-8")),
            body.into(),
        )
    }

    pub fn status(status: u16) -> Self {
        Self::new(status, None, Bytes::new())
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    pub const fn is_server_error(&self) -> bool {
        self.status >= 500
    }

    pub const fn is_client_error(&self) -> bool {
        self.status >= 400 && self.status < 500
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    pub fn payload_kind(&self, expected: PayloadKind) -> PayloadKind {
        PayloadKind::sniff(self.content_type.as_deref(), expected)
    }
}

/// Transport-level HTTP error: the request never produced a status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    message: String,
    retryable: bool,
}

impl HttpError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    pub fn non_retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }
}

impl Display for HttpError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HttpError {}

/// Transport contract used by every upstream call.
pub trait HttpClient: Send + Sync {
    fn execute<'a>(
        &'a self,
        request: UpstreamRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>>;
}

/// Production transport backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: Arc<reqwest::Client>,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self {
            client: Arc::new(
                reqwest::Client::builder()
                    .user_agent(concat!("robridge/", env!("CARGO_PKG_VERSION")))
                    .pool_idle_timeout(Duration::from_secs(90))
                    .build()
                    .unwrap_or_else(|_| reqwest::Client::new()),
            ),
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient for ReqwestHttpClient {
    fn execute<'a>(
        &'a self,
        request: UpstreamRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        Box::pin(async move {
            let mut builder = self.client.get(request.url());

            for (name, value) in request.headers() {
                builder = builder.header(name, value);
            }

            builder = builder.timeout(Duration::from_millis(request.timeout_ms()));

            let response = builder.send().await.map_err(|e| {
                if e.is_timeout() {
                    HttpError::new(format!("request timeout: {e}"))
                } else if e.is_connect() {
                    HttpError::new(format!("connection failed: {e}"))
                } else if e.is_builder() {
                    HttpError::non_retryable(format!("invalid request: {e}"))
                } else {
                    HttpError::new(format!("request failed: {e}"))
                }
            })?;

            let status = response.status().as_u16();
            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned);
            let body = response
                .bytes()
                .await
                .map_err(|e| HttpError::new(format!("failed to read response body: {e}")))?;

            Ok(HttpResponse {
                status,
                content_type,
                body,
            })
        })
    }
}
