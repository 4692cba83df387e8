//! Multi-source aggregation of a subject's items.
//!
//! The aggregate is built in four steps:
//!
//! 1. walk the subject's public games and collect distinct universe ids;
//! 2. walk every universe's game passes concurrently, each universe into its
//!    own buffer, and merge the buffers in universe order;
//! 3. fetch the owned collectibles and the currently-worn asset ids;
//! 4. merge into one map where detailed entries beat placeholders.
//!
//! Sub-source failures never fail the aggregate; they are reported as
//! warnings on the result.

use futures_util::stream::{self, StreamExt};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{UpstreamHosts, DEFAULT_FANOUT_CONCURRENCY};
use crate::domain::{AggregateResult, CanonicalItem, ItemMerger, Provenance, SubjectId};
use crate::error::PartialAggregationFailure;
use crate::http_client::{HttpAuth, UpstreamRequest, DEFAULT_TIMEOUT_MS};
use crate::normalize::{self, COLLECTIBLE_RULES, GAME_PASS_RULES};
use crate::pagination::{Collected, PaginatedCollector, ResourceDescriptor};

const GAME_PASS_RECORDS: &[&str] = &["gamePasses", "data"];
const GAME_PASS_TOKENS: &[&str] = &["nextPageToken", "nextPageCursor"];

/// Passes gathered for one universe.
struct UniversePasses {
    items: Vec<CanonicalItem>,
    halt: Option<PartialAggregationFailure>,
}

pub struct Aggregator {
    collector: PaginatedCollector,
    hosts: UpstreamHosts,
    auth: HttpAuth,
    fanout_concurrency: usize,
    timeout_ms: u64,
}

impl Aggregator {
    pub fn new(collector: PaginatedCollector, hosts: UpstreamHosts, credential: Option<String>) -> Self {
        Self {
            collector,
            hosts,
            auth: credential.map_or(HttpAuth::None, HttpAuth::api_key),
            fanout_concurrency: DEFAULT_FANOUT_CONCURRENCY,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_fanout_concurrency(mut self, concurrency: usize) -> Self {
        self.fanout_concurrency = concurrency.max(1);
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn games_descriptor(&self, subject: &SubjectId) -> ResourceDescriptor {
        let url = UpstreamHosts::join(
            &self.hosts.games,
            &format!("v2/users/{subject}/games?accessFilter=Public&sortOrder=Asc&limit=50"),
        );
        ResourceDescriptor::new(format!("games:{subject}"), url).with_timeout_ms(self.timeout_ms)
    }

    pub fn game_passes_descriptor(&self, universe_id: &str) -> ResourceDescriptor {
        let url = UpstreamHosts::join(
            &self.hosts.direct,
            &format!("game-passes/v1/universes/{universe_id}/game-passes/creator?pageSize=100"),
        );
        ResourceDescriptor::new(format!("gamepasses:{universe_id}"), url)
            .with_cursor_param("pageToken")
            .with_records_fields(GAME_PASS_RECORDS)
            .with_token_fields(GAME_PASS_TOKENS)
            .with_auth(self.auth.clone())
            .with_timeout_ms(self.timeout_ms)
    }

    pub fn worn_request(&self, subject: &SubjectId) -> UpstreamRequest {
        UpstreamRequest::get(UpstreamHosts::join(
            &self.hosts.avatar,
            &format!("v1/users/{subject}/currently-wearing"),
        ))
        .with_timeout_ms(self.timeout_ms)
    }

    pub fn collectibles_request(&self, subject: &SubjectId) -> UpstreamRequest {
        UpstreamRequest::get(UpstreamHosts::join(
            &self.hosts.inventory,
            &format!("v1/users/{subject}/assets/collectibles?limit=100&sortOrder=Asc"),
        ))
        .with_timeout_ms(self.timeout_ms)
    }

    pub async fn aggregate(&self, subject: &SubjectId) -> AggregateResult {
        let mut warnings = Vec::new();

        let games = self.collector.collect_all(self.games_descriptor(subject)).await;
        if parent_unreachable(&games) {
            warn!(%subject, "games listing unreachable, returning empty aggregate");
            warnings.extend(games.halt.map(|halt| halt.to_string()));
            return AggregateResult {
                warnings,
                ..AggregateResult::default()
            };
        }
        warnings.extend(games.halt.as_ref().map(ToString::to_string));

        let universes = normalize::universe_ids(&games.records);
        debug!(%subject, games = games.records.len(), universes = universes.len(), "collected games");

        let mut merger = ItemMerger::new();

        let per_universe: Vec<UniversePasses> = stream::iter(universes)
            .map(|universe_id| self.universe_passes(universe_id, subject))
            .buffered(self.fanout_concurrency)
            .collect()
            .await;
        for passes in per_universe {
            warnings.extend(passes.halt.map(|halt| halt.to_string()));
            for item in passes.items {
                merger.insert(item, Provenance::Detailed);
            }
        }

        match self.fetch_json(self.collectibles_request(subject), "collectibles", subject).await {
            Ok(body) => {
                for record in records(body) {
                    if let Some(item) = normalize::normalize(&record, &COLLECTIBLE_RULES, "") {
                        merger.insert(item, Provenance::Detailed);
                    }
                }
            }
            Err(failure) => warnings.push(failure.to_string()),
        }

        match self.fetch_json(self.worn_request(subject), "worn", subject).await {
            Ok(body) => {
                for asset_id in normalize::worn_asset_ids(&body) {
                    if merger.contains(&asset_id) {
                        continue;
                    }
                    if let Some(item) = normalize::placeholder(&asset_id) {
                        merger.insert(item, Provenance::Placeholder);
                    }
                }
            }
            Err(failure) => warnings.push(failure.to_string()),
        }

        let result = merger.finish(warnings);
        info!(
            %subject,
            items = result.len(),
            partial = result.is_partial(),
            "aggregate built"
        );
        result
    }

    async fn universe_passes(&self, universe_id: String, subject: &SubjectId) -> UniversePasses {
        let collected = self
            .collector
            .collect_all(self.game_passes_descriptor(&universe_id))
            .await;
        let items = collected
            .records
            .iter()
            .filter_map(|record| normalize::normalize(record, &GAME_PASS_RULES, subject.as_str()))
            .collect();
        UniversePasses {
            items,
            halt: collected.halt,
        }
    }

    async fn fetch_json(
        &self,
        request: UpstreamRequest,
        label: &str,
        subject: &SubjectId,
    ) -> Result<Value, PartialAggregationFailure> {
        let source = format!("{label}:{subject}");
        let response = self
            .collector
            .fetcher()
            .fetch(&request)
            .await
            .map_err(|error| {
                let failure = PartialAggregationFailure::Fetch {
                    source: source.clone(),
                    pages_fetched: 0,
                    error,
                };
                warn!(reason = %failure, "dropping unreachable source");
                failure
            })?;
        response.json().map_err(|error| {
            let failure = PartialAggregationFailure::Decode {
                source,
                pages_fetched: 0,
                message: error.to_string(),
            };
            warn!(reason = %failure, "dropping undecodable source");
            failure
        })
    }
}

/// The first games page never arrived.
fn parent_unreachable(games: &Collected) -> bool {
    games.pages == 0 && matches!(games.halt, Some(PartialAggregationFailure::Fetch { .. }))
}

fn records(body: Value) -> Vec<Value> {
    match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}
