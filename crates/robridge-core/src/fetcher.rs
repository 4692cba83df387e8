//! Single-request fetch with bounded retries.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{ProxyError, UpstreamCause};
use crate::http_client::{HttpClient, HttpResponse, UpstreamRequest};
use crate::retry::RetryConfig;

/// Issues one logical GET, retrying transient failures.
///
/// A 5xx status or a retryable transport error consumes an attempt and waits
/// the configured backoff. A 4xx status is returned at once as
/// [`ProxyError::UpstreamRejection`]. Holds no state besides its transport
/// and policy, so clones are cheap and independent.
#[derive(Clone)]
pub struct RetryingFetcher {
    client: Arc<dyn HttpClient>,
    retry: RetryConfig,
}

impl RetryingFetcher {
    pub fn new(client: Arc<dyn HttpClient>, retry: RetryConfig) -> Self {
        Self { client, retry }
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Fetch with the configured attempt ceiling.
    pub async fn fetch(&self, request: &UpstreamRequest) -> Result<HttpResponse, ProxyError> {
        self.fetch_with_attempts(request, self.retry.max_attempts)
            .await
    }

    /// Fetch with an explicit attempt ceiling (at least one attempt is made).
    pub async fn fetch_with_attempts(
        &self,
        request: &UpstreamRequest,
        max_attempts: u32,
    ) -> Result<HttpResponse, ProxyError> {
        let max_attempts = max_attempts.max(1);
        let mut last_cause = UpstreamCause::Transport(String::from("no attempt was made"));

        for attempt in 0..max_attempts {
            match self.client.execute(request.clone()).await {
                Ok(response) if self.retry.should_retry_status(response.status) => {
                    debug!(
                        url = request.url(),
                        status = response.status,
                        attempt = attempt + 1,
                        "retryable upstream status"
                    );
                    last_cause = UpstreamCause::Status(response.status);
                }
                Ok(response) if response.is_client_error() => {
                    return Err(ProxyError::UpstreamRejection {
                        url: request.url().to_owned(),
                        status: response.status,
                        body: response.text().into_owned(),
                    });
                }
                Ok(response) => return Ok(response),
                Err(error) if !error.retryable() => {
                    return Err(ProxyError::Upstream {
                        url: request.url().to_owned(),
                        attempts: attempt + 1,
                        cause: UpstreamCause::Transport(error.message().to_owned()),
                    });
                }
                Err(error) => {
                    debug!(
                        url = request.url(),
                        error = error.message(),
                        attempt = attempt + 1,
                        "upstream transport error"
                    );
                    last_cause = UpstreamCause::Transport(error.message().to_owned());
                }
            }

            if attempt + 1 < max_attempts {
                tokio::time::sleep(self.retry.delay_for_attempt(attempt)).await;
            }
        }

        warn!(
            url = request.url(),
            attempts = max_attempts,
            cause = %last_cause,
            "upstream retries exhausted"
        );
        Err(ProxyError::Upstream {
            url: request.url().to_owned(),
            attempts: max_attempts,
            cause: last_cause,
        })
    }
}
