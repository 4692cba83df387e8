//! # Robridge Core
//!
//! Caching proxy and item aggregation over the Roblox web APIs.
//!
//! ## Overview
//!
//! - **Retrying fetcher** that forwards one logical GET with bounded retries
//! - **Cache-aside store** with LRU eviction and per-kind TTLs
//! - **Request resolver** that maps caller paths to upstream hosts
//! - **Paginated collector** that walks cursor-paginated listings
//! - **Aggregator** that merges game passes, collectibles and worn assets
//!   into one canonical item map
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`aggregate`] | Multi-source item aggregation |
//! | [`cache`] | Bounded TTL cache |
//! | [`coalesce`] | Sharing of in-flight cache misses |
//! | [`config`] | Runtime configuration and upstream hosts |
//! | [`domain`] | Canonical items and subject ids |
//! | [`error`] | Error taxonomy |
//! | [`fetcher`] | Retrying fetcher |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`normalize`] | Declarative field extraction rules |
//! | [`pagination`] | Cursor-following collector |
//! | [`resolver`] | Path normalization and host selection |
//! | [`retry`] | Backoff policies |
//! | [`service`] | Cache-aside entry points for inbound routes |
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  Inbound route  │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │  ProxyService   │────▶│ CacheStore       │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Aggregator /    │────▶│ RetryingFetcher  │
//! │ RequestResolver │     │ (reqwest/none)   │
//! └─────────────────┘     └──────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use robridge_core::{ProxyConfig, ProxyService, ReqwestHttpClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ProxyConfig::from_env()?;
//!     let service = ProxyService::new(&config, Arc::new(ReqwestHttpClient::new()));
//!
//!     let served = service.items("156").await?;
//!     println!("{} bytes, cache {}", served.payload.body.len(), served.cache.as_str());
//!     Ok(())
//! }
//! ```
//!
//! ## Security
//!
//! - The API key is read from the environment and is only attached to
//!   requests for the authenticated first-party host
//! - Subject ids are validated as numeric before they reach a URL

pub mod aggregate;
pub mod cache;
pub mod coalesce;
pub mod config;
pub mod domain;
pub mod error;
pub mod fetcher;
pub mod http_client;
pub mod normalize;
pub mod pagination;
pub mod resolver;
pub mod retry;
pub mod service;

pub use aggregate::Aggregator;
pub use cache::{CacheEntry, CacheStats, CacheStore, CachedPayload};
pub use coalesce::Coalescer;
pub use config::{ConfigError, ProxyConfig, UpstreamHosts};
pub use domain::{AggregateResult, CanonicalItem, ItemMerger, ItemType, Provenance, SubjectId};
pub use error::{PartialAggregationFailure, ProxyError, UpstreamCause, ValidationError};
pub use fetcher::RetryingFetcher;
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpResponse, PayloadKind,
    ReqwestHttpClient, UpstreamRequest,
};
pub use normalize::{FieldRule, RuleSet};
pub use pagination::{Collected, PageCursor, PageWalk, PaginatedCollector, ResourceDescriptor};
pub use resolver::{HostFamily, Mode, RequestResolver};
pub use retry::{Backoff, RetryConfig};
pub use service::{CacheStatus, ProxyService, Served, ServedAggregate};
