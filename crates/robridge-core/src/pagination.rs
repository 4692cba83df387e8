//! Cursor-following collection over a paginated upstream resource.
//!
//! A walk fetches one page at a time through the [`RetryingFetcher`],
//! threading the continuation token strictly forward. It ends when the
//! upstream stops returning a token. A failed or undecodable page, the page
//! guard, or a repeated token halt the walk early; the records gathered so
//! far are kept and the halt is reported as a
//! [`PartialAggregationFailure`] rather than an error.

use std::collections::HashSet;

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::DEFAULT_MAX_PAGES;
use crate::error::PartialAggregationFailure;
use crate::fetcher::RetryingFetcher;
use crate::http_client::{HttpAuth, UpstreamRequest, DEFAULT_TIMEOUT_MS};

/// Opaque continuation token handed out by an upstream collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageCursor(String);

impl PageCursor {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Where a paginated resource lives and how its pages are shaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    /// Label used in warnings and logs, e.g. `games:42`.
    pub source: String,
    /// First-page URL, query string included.
    pub url: String,
    /// Query parameter that carries the cursor on later pages.
    pub cursor_param: &'static str,
    /// Candidate fields holding the record array, in priority order.
    pub records_fields: &'static [&'static str],
    /// Candidate fields holding the next cursor, in priority order.
    pub token_fields: &'static [&'static str],
    pub auth: HttpAuth,
    pub timeout_ms: u64,
}

impl ResourceDescriptor {
    pub fn new(source: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            url: url.into(),
            cursor_param: "cursor",
            records_fields: &["data"],
            token_fields: &["nextPageCursor"],
            auth: HttpAuth::None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_cursor_param(mut self, param: &'static str) -> Self {
        self.cursor_param = param;
        self
    }

    pub fn with_records_fields(mut self, fields: &'static [&'static str]) -> Self {
        self.records_fields = fields;
        self
    }

    pub fn with_token_fields(mut self, fields: &'static [&'static str]) -> Self {
        self.token_fields = fields;
        self
    }

    pub fn with_auth(mut self, auth: HttpAuth) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn page_url(&self, cursor: Option<&PageCursor>) -> String {
        match cursor {
            None => self.url.clone(),
            Some(cursor) => {
                let separator = if self.url.contains('?') { '&' } else { '?' };
                format!(
                    "{}{separator}{}={}",
                    self.url,
                    self.cursor_param,
                    urlencoding::encode(cursor.as_str())
                )
            }
        }
    }

    fn request(&self, cursor: Option<&PageCursor>) -> UpstreamRequest {
        UpstreamRequest::get(self.page_url(cursor))
            .with_auth(&self.auth)
            .with_timeout_ms(self.timeout_ms)
    }

    fn records(&self, body: Value) -> Vec<Value> {
        match body {
            Value::Array(items) => items,
            Value::Object(mut map) => self
                .records_fields
                .iter()
                .find_map(|field| match map.remove(*field) {
                    Some(Value::Array(items)) => Some(items),
                    _ => None,
                })
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    fn next_cursor(&self, body: &Value) -> Option<PageCursor> {
        self.token_fields.iter().find_map(|field| {
            body.get(*field)
                .and_then(Value::as_str)
                .filter(|token| !token.is_empty())
                .map(|token| PageCursor(token.to_owned()))
        })
    }
}

/// Everything a finished walk produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Collected {
    pub records: Vec<Value>,
    pub pages: usize,
    /// Why the walk stopped early, if it did.
    pub halt: Option<PartialAggregationFailure>,
}

impl Collected {
    pub fn is_complete(&self) -> bool {
        self.halt.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WalkState {
    Active,
    Finished,
}

/// A lazy, finite, non-restartable walk over one resource.
///
/// Each call to [`next_page`](PageWalk::next_page) performs at most one
/// fetch. Once the walk has finished it keeps returning `None`.
pub struct PageWalk<'a> {
    fetcher: &'a RetryingFetcher,
    descriptor: ResourceDescriptor,
    cursor: Option<PageCursor>,
    seen: HashSet<PageCursor>,
    pages: usize,
    max_pages: usize,
    state: WalkState,
    halt: Option<PartialAggregationFailure>,
}

impl<'a> PageWalk<'a> {
    fn new(fetcher: &'a RetryingFetcher, descriptor: ResourceDescriptor, max_pages: usize) -> Self {
        Self {
            fetcher,
            descriptor,
            cursor: None,
            seen: HashSet::new(),
            pages: 0,
            max_pages: max_pages.max(1),
            state: WalkState::Active,
            halt: None,
        }
    }

    /// Records of the next page, or `None` when the walk is over.
    pub async fn next_page(&mut self) -> Option<Vec<Value>> {
        if self.state == WalkState::Finished {
            return None;
        }

        if self.pages >= self.max_pages {
            self.stop(Some(PartialAggregationFailure::PageLimit {
                source: self.descriptor.source.clone(),
                max_pages: self.max_pages,
            }));
            return None;
        }

        let request = self.descriptor.request(self.cursor.as_ref());
        let response = match self.fetcher.fetch(&request).await {
            Ok(response) => response,
            Err(error) => {
                self.stop(Some(PartialAggregationFailure::Fetch {
                    source: self.descriptor.source.clone(),
                    pages_fetched: self.pages,
                    error,
                }));
                return None;
            }
        };

        let body: Value = match response.json() {
            Ok(body) => body,
            Err(error) => {
                self.stop(Some(PartialAggregationFailure::Decode {
                    source: self.descriptor.source.clone(),
                    pages_fetched: self.pages,
                    message: error.to_string(),
                }));
                return None;
            }
        };

        self.pages += 1;
        let next = self.descriptor.next_cursor(&body);
        let records = self.descriptor.records(body);
        debug!(
            source = %self.descriptor.source,
            page = self.pages,
            records = records.len(),
            has_next = next.is_some(),
            "collected page"
        );

        match next {
            None => self.stop(None),
            Some(cursor) if !self.seen.insert(cursor.clone()) => {
                self.stop(Some(PartialAggregationFailure::CursorLoop {
                    source: self.descriptor.source.clone(),
                    pages_fetched: self.pages,
                }));
            }
            Some(cursor) => self.cursor = Some(cursor),
        }

        Some(records)
    }

    /// Drain the remaining pages.
    pub async fn collect_all(mut self) -> Collected {
        let mut records = Vec::new();
        while let Some(page) = self.next_page().await {
            records.extend(page);
        }
        Collected {
            records,
            pages: self.pages,
            halt: self.halt,
        }
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages
    }

    pub fn halt(&self) -> Option<&PartialAggregationFailure> {
        self.halt.as_ref()
    }

    fn stop(&mut self, halt: Option<PartialAggregationFailure>) {
        if let Some(failure) = &halt {
            warn!(source = %self.descriptor.source, reason = %failure, "page walk halted");
        }
        self.state = WalkState::Finished;
        self.cursor = None;
        self.halt = halt;
    }
}

/// Drives page walks with a shared fetcher and page guard.
#[derive(Clone)]
pub struct PaginatedCollector {
    fetcher: RetryingFetcher,
    max_pages: usize,
}

impl PaginatedCollector {
    pub fn new(fetcher: RetryingFetcher, max_pages: usize) -> Self {
        Self {
            fetcher,
            max_pages: max_pages.max(1),
        }
    }

    pub fn with_default_guard(fetcher: RetryingFetcher) -> Self {
        Self::new(fetcher, DEFAULT_MAX_PAGES)
    }

    pub fn fetcher(&self) -> &RetryingFetcher {
        &self.fetcher
    }

    pub fn walk(&self, descriptor: ResourceDescriptor) -> PageWalk<'_> {
        PageWalk::new(&self.fetcher, descriptor, self.max_pages)
    }

    pub async fn collect_all(&self, descriptor: ResourceDescriptor) -> Collected {
        self.walk(descriptor).collect_all().await
    }
}
