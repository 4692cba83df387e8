//! Cache-aside entry points shared by every inbound route.
//!
//! A [`ProxyService`] owns the resolver, fetcher, cache, coalescer and
//! aggregator. It is built once per process and shared behind an `Arc`.

use std::sync::Arc;

use tracing::{debug, info};

use crate::aggregate::Aggregator;
use crate::cache::{CacheStats, CacheStore, CachedPayload};
use crate::coalesce::Coalescer;
use crate::config::{ProxyConfig, UpstreamHosts};
use crate::domain::{AggregateResult, SubjectId};
use crate::error::ProxyError;
use crate::fetcher::RetryingFetcher;
use crate::http_client::{HttpAuth, HttpClient, HttpResponse, PayloadKind, UpstreamRequest};
use crate::pagination::PaginatedCollector;
use crate::resolver::{Mode, RequestResolver};

const DEFAULT_TEXT_TYPE: &str = "application/json; charset=utf-8";
const DEFAULT_BINARY_TYPE: &str = "application/octet-stream";

/// Whether a response came from the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "HIT",
            Self::Miss => "MISS",
        }
    }
}

/// A payload ready to be written back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served {
    pub payload: CachedPayload,
    pub cache: CacheStatus,
}

/// A serialized aggregate plus how many of its sources failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServedAggregate {
    pub payload: CachedPayload,
    pub cache: CacheStatus,
    pub partial_sources: usize,
}

type Outcome = Result<CachedPayload, ProxyError>;

pub struct ProxyService {
    resolver: RequestResolver,
    fetcher: RetryingFetcher,
    cache: CacheStore,
    coalescer: Coalescer<Outcome>,
    aggregator: Aggregator,
    hosts: UpstreamHosts,
    auth: HttpAuth,
    timeout_ms: u64,
}

impl ProxyService {
    pub fn new(config: &ProxyConfig, client: Arc<dyn HttpClient>) -> Self {
        let fetcher = RetryingFetcher::new(client, config.retry.clone());
        let collector = PaginatedCollector::new(fetcher.clone(), config.max_pages);
        let aggregator = Aggregator::new(collector, config.hosts.clone(), config.api_key.clone())
            .with_fanout_concurrency(config.fanout_concurrency)
            .with_timeout_ms(config.timeout_ms);

        Self {
            resolver: RequestResolver::new(config.hosts.clone(), config.api_key.clone())
                .with_timeout_ms(config.timeout_ms),
            fetcher,
            cache: CacheStore::new(config.cache_capacity, config.json_ttl, config.binary_ttl),
            coalescer: Coalescer::new(),
            aggregator,
            hosts: config.hosts.clone(),
            auth: config
                .api_key
                .clone()
                .map_or(HttpAuth::None, HttpAuth::api_key),
            timeout_ms: config.timeout_ms,
        }
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    /// Resolve `raw_path` and serve it through the cache.
    pub async fn passthrough(&self, raw_path: &str, mode: Mode) -> Result<Served, ProxyError> {
        if raw_path.trim().is_empty() {
            return Err(ProxyError::invalid_request("missing url parameter"));
        }
        let request = self.resolver.resolve(raw_path, mode)?;
        self.serve(request).await
    }

    /// Direct-host forward of an arbitrary endpoint with the credential.
    pub async fn direct(&self, endpoint: &str) -> Result<Served, ProxyError> {
        if endpoint.trim().is_empty() {
            return Err(ProxyError::invalid_request("missing endpoint parameter"));
        }
        self.passthrough(endpoint, Mode::Direct).await
    }

    pub async fn games(&self, user_id: &str) -> Result<Served, ProxyError> {
        let user = SubjectId::parse(user_id)?;
        let url = UpstreamHosts::join(
            &self.hosts.games,
            &format!("v2/users/{user}/games?accessFilter=Public&sortOrder=Asc&limit=50"),
        );
        self.serve(self.request(url, false)).await
    }

    /// Open Cloud listing of a universe's passes.
    pub async fn universe_game_passes(&self, universe_id: &str) -> Result<Served, ProxyError> {
        let universe = SubjectId::parse(universe_id)?;
        let url = UpstreamHosts::join(
            &self.hosts.direct,
            &format!("cloud/v2/universes/{universe}/game-passes?limit=100"),
        );
        self.serve(self.request(url, true)).await
    }

    /// Creator listing of a universe's passes.
    pub async fn creator_game_passes(&self, universe_id: &str) -> Result<Served, ProxyError> {
        let universe = SubjectId::parse(universe_id)?;
        let url = UpstreamHosts::join(
            &self.hosts.direct,
            &format!("game-passes/v1/universes/{universe}/game-passes/creator"),
        );
        self.serve(self.request(url, true)).await
    }

    pub async fn outfits(&self, user_id: &str) -> Result<Served, ProxyError> {
        let user = SubjectId::parse(user_id)?;
        let url = UpstreamHosts::join(&self.hosts.avatar, &format!("v1/users/{user}/outfits"));
        self.serve(self.request(url, false)).await
    }

    /// Serve the aggregate for `subject_id`, building it on a miss.
    ///
    /// Partial aggregates are cached like complete ones.
    pub async fn items(&self, subject_id: &str) -> Result<ServedAggregate, ProxyError> {
        let subject = SubjectId::parse(subject_id)?;
        let key = format!("items:{subject}");

        if let Some(entry) = self.cache.get(&key).await {
            return Ok(ServedAggregate {
                partial_sources: partial_sources(&entry.payload),
                payload: entry.payload,
                cache: CacheStatus::Hit,
            });
        }

        let payload = self
            .coalescer
            .run(&key, || async {
                let result = self.aggregator.aggregate(&subject).await;
                let body = serde_json::to_string(&result)
                    .map_err(|error| ProxyError::internal(error.to_string()))?;
                let payload = CachedPayload::json(body);
                self.cache.set(key.clone(), payload.clone()).await;
                Ok(payload)
            })
            .await?;

        Ok(ServedAggregate {
            partial_sources: partial_sources(&payload),
            payload,
            cache: CacheStatus::Miss,
        })
    }

    fn request(&self, url: String, authenticated: bool) -> UpstreamRequest {
        let request = UpstreamRequest::get(url).with_timeout_ms(self.timeout_ms);
        if authenticated {
            request.with_auth(&self.auth)
        } else {
            request
        }
    }

    async fn serve(&self, request: UpstreamRequest) -> Result<Served, ProxyError> {
        let key = request.url().to_owned();

        if let Some(entry) = self.cache.get(&key).await {
            debug!(%key, age_ms = entry.age().as_millis() as u64, "cache hit");
            return Ok(Served {
                payload: entry.payload,
                cache: CacheStatus::Hit,
            });
        }

        let payload = self
            .coalescer
            .run(&key, || async {
                let response = self.fetcher.fetch(&request).await?;
                let payload = into_payload(response, request.expected_kind());
                self.cache.set(key.clone(), payload.clone()).await;
                info!(
                    url = %request.url(),
                    binary = payload.kind.is_binary(),
                    bytes = payload.body.len(),
                    "cached upstream response"
                );
                Ok(payload)
            })
            .await?;

        Ok(Served {
            payload,
            cache: CacheStatus::Miss,
        })
    }
}

fn into_payload(response: HttpResponse, expected: PayloadKind) -> CachedPayload {
    let status = response.status;
    let payload = match response.payload_kind(expected) {
        PayloadKind::Binary => CachedPayload::binary(
            response
                .content_type
                .unwrap_or_else(|| DEFAULT_BINARY_TYPE.to_owned()),
            response.body,
        ),
        PayloadKind::Text => {
            let body = response.text().into_owned();
            CachedPayload::text(
                response
                    .content_type
                    .unwrap_or_else(|| DEFAULT_TEXT_TYPE.to_owned()),
                body,
            )
        }
    };
    payload.with_status(status)
}

fn partial_sources(payload: &CachedPayload) -> usize {
    serde_json::from_slice::<AggregateResult>(&payload.body)
        .map(|result| result.warnings.len())
        .unwrap_or(0)
}
