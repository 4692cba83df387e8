//! Maps caller-supplied paths to fully-qualified upstream requests.

use std::fmt::{Display, Formatter};

use crate::config::UpstreamHosts;
use crate::error::ProxyError;
use crate::http_client::{HttpAuth, PayloadKind, UpstreamRequest, DEFAULT_TIMEOUT_MS};

const LEGACY_HOST: &str = "api.roblox.com";
const IMAGE_EXTENSIONS: [&str; 6] = [".png", ".jpg", ".jpeg", ".gif", ".webp", ".ico"];

/// Routing mode requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Third-party mirror, no credential.
    #[default]
    Roproxy,
    /// First-party host with the configured credential.
    Direct,
}

impl Mode {
    /// Parse the `mode` query parameter. Only `direct` (any case) selects
    /// [`Mode::Direct`]; anything else, absent included, is [`Mode::Roproxy`].
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(value) if value.eq_ignore_ascii_case("direct") => Self::Direct,
            _ => Self::Roproxy,
        }
    }
}

/// Upstream host family a request is sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostFamily {
    Passthrough,
    Direct,
    Catalog,
    Thumbnails,
}

impl HostFamily {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Passthrough => "passthrough",
            Self::Direct => "direct",
            Self::Catalog => "catalog",
            Self::Thumbnails => "thumbnails",
        }
    }
}

impl Display for HostFamily {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized routing decision, before a request is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub family: HostFamily,
    pub path: String,
}

/// Resolves raw caller paths against the configured hosts.
#[derive(Debug, Clone)]
pub struct RequestResolver {
    hosts: UpstreamHosts,
    credential: Option<String>,
    timeout_ms: u64,
}

impl RequestResolver {
    pub fn new(hosts: UpstreamHosts, credential: Option<String>) -> Self {
        Self {
            hosts,
            credential,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn hosts(&self) -> &UpstreamHosts {
        &self.hosts
    }

    /// Resolve `raw_path` into an upstream GET.
    ///
    /// Feeding the resulting URL back in yields the same request.
    pub fn resolve(&self, raw_path: &str, mode: Mode) -> Result<UpstreamRequest, ProxyError> {
        let route = self.route(raw_path, mode)?;
        let base = self.base_for(route.family);
        let mut request = UpstreamRequest::get(UpstreamHosts::join(base, &route.path))
            .with_expected_kind(expected_kind(&route.path))
            .with_timeout_ms(self.timeout_ms);

        if route.family == HostFamily::Direct {
            if let Some(key) = &self.credential {
                request = request.with_auth(&HttpAuth::api_key(key.clone()));
            }
        }

        Ok(request)
    }

    /// Pick the host family and the path relative to it.
    pub fn route(&self, raw_path: &str, mode: Mode) -> Result<Route, ProxyError> {
        let normalized = normalize_path(raw_path);

        let (family, rest) = if let Some(rest) = self.strip_family(&normalized, HostFamily::Catalog) {
            (HostFamily::Catalog, rest)
        } else if let Some(rest) = self.strip_family(&normalized, HostFamily::Thumbnails) {
            (HostFamily::Thumbnails, rest)
        } else {
            let rest = [&self.hosts.passthrough, &self.hosts.direct]
                .into_iter()
                .find_map(|base| strip_host(&normalized, host_of(base)))
                .unwrap_or(normalized.as_str());
            let family = match mode {
                Mode::Roproxy => HostFamily::Passthrough,
                Mode::Direct => HostFamily::Direct,
            };
            (family, rest)
        };

        let path = rest.trim_start_matches('/');
        if path.is_empty() {
            return Err(ProxyError::invalid_request("url path is empty"));
        }

        Ok(Route {
            family,
            path: path.to_owned(),
        })
    }

    fn base_for(&self, family: HostFamily) -> &str {
        match family {
            HostFamily::Passthrough => &self.hosts.passthrough,
            HostFamily::Direct => &self.hosts.direct,
            HostFamily::Catalog => &self.hosts.catalog,
            HostFamily::Thumbnails => &self.hosts.thumbnails,
        }
    }

    /// Strip a catalog/thumbnail marker: the configured host, any
    /// `<marker>.<domain>/` host, or a leading `<marker>/` segment.
    fn strip_family<'a>(&self, path: &'a str, family: HostFamily) -> Option<&'a str> {
        let marker = family.as_str();
        if let Some(rest) = strip_host(path, host_of(self.base_for(family))) {
            return Some(rest);
        }
        if let Some(after_dot) = strip_prefix_ci(path, &format!("{marker}.")) {
            return Some(after_dot.split_once('/').map_or("", |(_, rest)| rest));
        }
        strip_prefix_ci(path, &format!("{marker}/"))
    }
}

/// Strip scheme, legacy host, `www.` and leading slashes until nothing changes.
pub fn normalize_path(raw: &str) -> String {
    let mut current = raw.trim();
    loop {
        let before = current;
        current = strip_prefix_ci(current, "https://")
            .or_else(|| strip_prefix_ci(current, "http://"))
            .unwrap_or(current);
        current = strip_host(current, LEGACY_HOST).unwrap_or(current);
        current = strip_prefix_ci(current, "www.").unwrap_or(current);
        current = current.trim_start_matches('/');
        if current == before {
            return current.to_owned();
        }
    }
}

/// Payload kind to expect from a path, before the response says otherwise.
pub fn expected_kind(path: &str) -> PayloadKind {
    let without_query = path.split(['?', '#']).next().unwrap_or(path);
    let lowered = without_query.to_ascii_lowercase();
    if IMAGE_EXTENSIONS.iter().any(|ext| lowered.ends_with(ext)) {
        PayloadKind::Binary
    } else {
        PayloadKind::Text
    }
}

fn host_of(base: &str) -> &str {
    let without_scheme = strip_prefix_ci(base, "https://")
        .or_else(|| strip_prefix_ci(base, "http://"))
        .unwrap_or(base);
    without_scheme.trim_end_matches('/')
}

/// `host` followed by `/` or the end of the string.
fn strip_host<'a>(path: &'a str, host: &str) -> Option<&'a str> {
    if host.is_empty() {
        return None;
    }
    let rest = strip_prefix_ci(path, host)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

fn strip_prefix_ci<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    let head = value.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&value[prefix.len()..])
    } else {
        None
    }
}
