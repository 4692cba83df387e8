use std::fmt::{Display, Formatter};

use thiserror::Error;

/// Domain validation failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("subject id cannot be empty")]
    EmptySubjectId,
    #[error("subject id length {len} exceeds max {max}")]
    SubjectIdTooLong { len: usize, max: usize },
    #[error("subject id must be numeric, found '{ch}' at index {index}")]
    SubjectIdInvalidChar { ch: char, index: usize },

    #[error("item id cannot be empty")]
    EmptyItemId,
}

impl From<ValidationError> for ProxyError {
    fn from(error: ValidationError) -> Self {
        Self::InvalidRequest(error.to_string())
    }
}

/// Last thing observed before the fetcher gave up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamCause {
    Status(u16),
    Transport(String),
}

impl Display for UpstreamCause {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Status(status) => write!(f, "upstream returned status {status}"),
            Self::Transport(message) => f.write_str(message),
        }
    }
}

/// Errors surfaced by proxy operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProxyError {
    /// Missing or malformed caller input.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Transient upstream failure that survived every retry.
    #[error("upstream failure for {url} after {attempts} attempt(s): {cause}")]
    Upstream {
        url: String,
        attempts: u32,
        cause: UpstreamCause,
    },

    /// Upstream answered 4xx; never retried.
    #[error("upstream rejected {url} with status {status}")]
    UpstreamRejection {
        url: String,
        status: u16,
        body: String,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl ProxyError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "proxy.invalid_request",
            Self::Upstream { .. } => "proxy.upstream_unavailable",
            Self::UpstreamRejection { .. } => "proxy.upstream_rejected",
            Self::Internal(_) => "proxy.internal",
        }
    }

    pub const fn retryable(&self) -> bool {
        matches!(self, Self::Upstream { .. })
    }
}

/// A sub-source of an aggregation that did not complete.
///
/// Never returned as an error: it is attached to the result as a warning and
/// logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartialAggregationFailure {
    /// A page fetch failed after retries; records before it were kept.
    Fetch {
        source: String,
        pages_fetched: usize,
        error: ProxyError,
    },
    /// A page body could not be decoded.
    Decode {
        source: String,
        pages_fetched: usize,
        message: String,
    },
    /// The page guard stopped the walk.
    PageLimit { source: String, max_pages: usize },
    /// The upstream handed back a cursor it had already issued.
    CursorLoop { source: String, pages_fetched: usize },
}

impl PartialAggregationFailure {
    pub fn source(&self) -> &str {
        match self {
            Self::Fetch { source, .. }
            | Self::Decode { source, .. }
            | Self::PageLimit { source, .. }
            | Self::CursorLoop { source, .. } => source,
        }
    }
}

impl Display for PartialAggregationFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch {
                source,
                pages_fetched,
                error,
            } => write!(
                f,
                "{source}: stopped after {pages_fetched} page(s): {error}"
            ),
            Self::Decode {
                source,
                pages_fetched,
                message,
            } => write!(
                f,
                "{source}: undecodable page after {pages_fetched} page(s): {message}"
            ),
            Self::PageLimit { source, max_pages } => {
                write!(f, "{source}: page limit of {max_pages} reached")
            }
            Self::CursorLoop {
                source,
                pages_fetched,
            } => write!(
                f,
                "{source}: repeated cursor after {pages_fetched} page(s)"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(
            ProxyError::invalid_request("x").code(),
            "proxy.invalid_request"
        );
        assert_eq!(ProxyError::internal("x").code(), "proxy.internal");
        let upstream = ProxyError::Upstream {
            url: String::from("https://a"),
            attempts: 3,
            cause: UpstreamCause::Status(503),
        };
        assert_eq!(upstream.code(), "proxy.upstream_unavailable");
        assert!(upstream.retryable());
        assert_eq!(
            upstream.to_string(),
            "upstream failure for https://a after 3 attempt(s): upstream returned status 503"
        );
    }

    #[test]
    fn partial_failure_display_names_the_source() {
        let failure = PartialAggregationFailure::PageLimit {
            source: String::from("games"),
            max_pages: 10,
        };
        assert_eq!(failure.source(), "games");
        assert_eq!(failure.to_string(), "games: page limit of 10 reached");
    }
}
