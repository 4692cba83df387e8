//! Runtime configuration.
//!
//! # Environment Variables
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `ROBLOX_API_KEY` / `ROBRIDGE_API_KEY` | unset | credential for the direct host |
//! | `ROBRIDGE_CACHE_CAPACITY` | `1000` | maximum cached entries, `0` disables |
//! | `ROBRIDGE_JSON_TTL_SECS` | `30` | freshness of text/JSON entries |
//! | `ROBRIDGE_BINARY_TTL_SECS` | `60` | freshness of binary entries |
//! | `ROBRIDGE_MAX_ATTEMPTS` | `3` | attempts per upstream request |
//! | `ROBRIDGE_BACKOFF` | `linear` | `linear` (200 ms steps) or `exponential` (jittered) |
//! | `ROBRIDGE_MAX_PAGES` | `1000` | page guard per paginated walk |
//! | `ROBRIDGE_TIMEOUT_MS` | `10000` | transport timeout per attempt |
//!
//! TTLs above 60 seconds are clamped by the cache.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::cache::{DEFAULT_BINARY_TTL, DEFAULT_CAPACITY, DEFAULT_JSON_TTL};
use crate::http_client::DEFAULT_TIMEOUT_MS;
use crate::retry::{Backoff, RetryConfig};

pub const DEFAULT_MAX_PAGES: usize = 1000;
pub const DEFAULT_FANOUT_CONCURRENCY: usize = 4;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable {name} has invalid value '{value}'")]
    InvalidValue { name: &'static str, value: String },
}

/// Base URLs of every upstream host family. Each ends with `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamHosts {
    /// Third-party pass-through mirror; never receives the credential.
    pub passthrough: String,
    /// Authenticated first-party host.
    pub direct: String,
    pub catalog: String,
    pub thumbnails: String,
    pub games: String,
    pub avatar: String,
    pub inventory: String,
}

impl Default for UpstreamHosts {
    fn default() -> Self {
        Self {
            passthrough: String::from("https://apis.roproxy.com/"),
            direct: String::from("https://apis.roblox.com/"),
            catalog: String::from("https://catalog.roblox.com/"),
            thumbnails: String::from("https://thumbnails.roblox.com/"),
            games: String::from("https://games.roblox.com/"),
            avatar: String::from("https://avatar.roblox.com/"),
            inventory: String::from("https://inventory.roblox.com/"),
        }
    }
}

impl UpstreamHosts {
    /// Point every host family at one base URL (used against mock servers).
    pub fn all(base: impl Into<String>) -> Self {
        let base = with_trailing_slash(base.into());
        Self {
            passthrough: base.clone(),
            direct: base.clone(),
            catalog: base.clone(),
            thumbnails: base.clone(),
            games: base.clone(),
            avatar: base.clone(),
            inventory: base,
        }
    }

    /// Join a base URL and a relative path without doubling slashes.
    pub fn join(base: &str, path: &str) -> String {
        let path = path.trim_start_matches('/');
        if base.ends_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }
}

fn with_trailing_slash(mut base: String) -> String {
    if !base.ends_with('/') {
        base.push('/');
    }
    base
}

/// Everything the core needs to talk to upstreams and cache their answers.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyConfig {
    pub hosts: UpstreamHosts,
    pub api_key: Option<String>,
    pub cache_capacity: usize,
    pub json_ttl: Duration,
    pub binary_ttl: Duration,
    pub retry: RetryConfig,
    pub max_pages: usize,
    pub fanout_concurrency: usize,
    pub timeout_ms: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            hosts: UpstreamHosts::default(),
            api_key: None,
            cache_capacity: DEFAULT_CAPACITY,
            json_ttl: DEFAULT_JSON_TTL,
            binary_ttl: DEFAULT_BINARY_TTL,
            retry: RetryConfig::default(),
            max_pages: DEFAULT_MAX_PAGES,
            fanout_concurrency: DEFAULT_FANOUT_CONCURRENCY,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl ProxyConfig {
    /// Defaults overlaid with whatever the environment sets.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        config.api_key = env::var("ROBLOX_API_KEY")
            .or_else(|_| env::var("ROBRIDGE_API_KEY"))
            .ok()
            .filter(|key| !key.trim().is_empty());

        if let Some(capacity) = parse_env::<usize>("ROBRIDGE_CACHE_CAPACITY")? {
            config.cache_capacity = capacity;
        }
        if let Some(secs) = parse_env::<u64>("ROBRIDGE_JSON_TTL_SECS")? {
            config.json_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_env::<u64>("ROBRIDGE_BINARY_TTL_SECS")? {
            config.binary_ttl = Duration::from_secs(secs);
        }
        if let Some(attempts) = parse_env::<u32>("ROBRIDGE_MAX_ATTEMPTS")? {
            config.retry = config.retry.with_max_attempts(attempts);
        }
        if let Some(backoff) = parse_env::<Backoff>("ROBRIDGE_BACKOFF")? {
            config.retry = config.retry.with_backoff(backoff);
        }
        if let Some(pages) = parse_env::<usize>("ROBRIDGE_MAX_PAGES")? {
            config.max_pages = pages.max(1);
        }
        if let Some(timeout_ms) = parse_env::<u64>("ROBRIDGE_TIMEOUT_MS")? {
            config.timeout_ms = timeout_ms;
        }

        Ok(config)
    }

    pub fn with_hosts(mut self, hosts: UpstreamHosts) -> Self {
        self.hosts = hosts;
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    pub fn with_fanout_concurrency(mut self, concurrency: usize) -> Self {
        self.fanout_concurrency = concurrency.max(1);
        self
    }
}

fn parse_env<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        Err(_) => Ok(None),
    }
}
