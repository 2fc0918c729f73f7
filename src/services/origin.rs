use axum::http::{header, HeaderMap, HeaderValue};
use regex::Regex;
use tracing::warn;
use url::Url;

use crate::config::CheckoutConfig;
use crate::errors::ServiceError;

const ALLOW_METHODS: &str = "POST,OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type, Idempotency-Key";

/// Storefront origins allowed to open checkout sessions.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    patterns: Vec<Regex>,
    public_origin: Option<String>,
}

impl OriginPolicy {
    /// Production patterns, plus the local-development ones outside production.
    pub fn new(config: &CheckoutConfig, production: bool) -> Result<Self, regex::Error> {
        let mut sources: Vec<&String> = config.allowed_origin_patterns.iter().collect();
        if !production {
            sources.extend(config.dev_origin_patterns.iter());
        }
        let patterns = sources
            .into_iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            patterns,
            public_origin: config
                .public_origin
                .as_deref()
                .map(|o| o.trim().trim_end_matches('/').to_string())
                .filter(|o| !o.is_empty()),
        })
    }

    pub fn is_allowed(&self, origin: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(origin))
    }

    /// Requests without an `Origin` header are not browser calls and pass.
    pub fn check(&self, origin: Option<&str>) -> Result<(), ServiceError> {
        match origin {
            Some(origin) if !self.is_allowed(origin) => {
                warn!(origin, "Rejected checkout request from disallowed origin");
                Err(ServiceError::ForbiddenOrigin(origin.to_string()))
            }
            _ => Ok(()),
        }
    }

    /// Base for the success and cancel redirects.
    ///
    /// A body-supplied origin is honored only when it passes this policy; otherwise the
    /// request's own origin, then the configured public origin.
    pub fn redirect_base(
        &self,
        body_origin: Option<&str>,
        header_origin: Option<&str>,
    ) -> Result<String, ServiceError> {
        if let Some(candidate) = body_origin.and_then(normalize_origin) {
            if self.is_allowed(&candidate) {
                return Ok(candidate);
            }
            warn!(origin = %candidate, "Ignoring redirect origin outside the allow-list");
        }
        if let Some(origin) = header_origin.and_then(normalize_origin) {
            return Ok(origin);
        }
        self.public_origin.clone().ok_or_else(|| {
            ServiceError::ValidationError("no redirect origin available for this request".into())
        })
    }
}

/// `scheme://host[:port]` of an http(s) URL.
fn normalize_origin(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return None;
    }
    Some(url.origin().ascii_serialization())
}

/// CORS headers attached to every checkout response that carried an origin.
pub fn cors_headers(origin: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Some(value) = origin.and_then(|o| HeaderValue::from_str(o).ok()) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
        headers.insert(header::VARY, HeaderValue::from_static("Origin"));
    }
    headers
}

/// Preflight answer for an origin that already passed [`OriginPolicy::check`]; `*` without one.
pub fn preflight_headers(origin: Option<&str>) -> HeaderMap {
    let mut headers = cors_headers(origin);
    if !headers.contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN) {
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        );
    }
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    headers
}
