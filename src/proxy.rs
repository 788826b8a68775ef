// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Static Routing
//!
//! Requests that pass the auth pipeline are forwarded to an upstream service
//! chosen by path prefix. The matched prefix is replaced by the upstream base
//! path:
//!
//! ```text
//! auth-service=/auth-service=>http://localhost:8081/auth
//!
//! GET /auth-service/users/42?x=1  ->  GET http://localhost:8081/auth/users/42?x=1
//! ```
//!
//! Bodies are streamed in both directions. Hop-by-hop headers are dropped.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{debug, warn};
use url::Url;

use crate::auth::pattern::decode_path;
use crate::state::AppState;

/// Route table used when `GATEWAY_ROUTES` is not set.
pub const DEFAULT_ROUTES: &str = "auth-service=/auth-service=>http://localhost:8081/auth";

/// Headers scoped to a single connection (RFC 9110 section 7.6.1).
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    #[error("route table is empty")]
    Empty,
    #[error("expected id=prefix=>upstream, got {0:?}")]
    Malformed(String),
    #[error("route prefix {0:?} must start with '/' and name at least one segment")]
    InvalidPrefix(String),
    #[error("invalid upstream {0:?}: {1}")]
    InvalidUpstream(String, String),
    #[error("duplicate route id {0:?}")]
    DuplicateId(String),
}

/// Why a request could not be forwarded. Rendered as `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProxyError {
    #[error("No route for {0}")]
    NoRoute(String),
    #[error("Upstream {0} unavailable")]
    Upstream(String),
}

impl ProxyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::NoRoute(_) => StatusCode::NOT_FOUND,
            ProxyError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// One upstream mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    id: String,
    prefix: String,
    upstream: Url,
}

impl Route {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn upstream(&self) -> &Url {
        &self.upstream
    }

    /// Remainder of `path` after the prefix, if the prefix matches on a
    /// segment boundary.
    fn strip<'a>(&self, path: &'a str) -> Option<&'a str> {
        let rest = path.strip_prefix(self.prefix.as_str())?;
        (rest.is_empty() || rest.starts_with('/')).then_some(rest)
    }
}

/// Ordered route list; the first matching prefix wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Parse `id=prefix=>upstream[,...]`.
    pub fn parse(spec: &str) -> Result<Self, RouteError> {
        let mut routes: Vec<Route> = Vec::new();
        for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let route = parse_route(entry)?;
            if routes.iter().any(|r| r.id == route.id) {
                return Err(RouteError::DuplicateId(route.id));
            }
            routes.push(route);
        }
        if routes.is_empty() {
            return Err(RouteError::Empty);
        }
        Ok(Self { routes })
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Find the route for `path` and build the upstream URL.
    ///
    /// Paths with `.`/`..` segments never resolve: the URL parser would
    /// collapse them into a path other than the one that was authorized.
    pub fn resolve(&self, path: &str, query: Option<&str>) -> Option<(&Route, Url)> {
        if decode_path(path).is_none() {
            return None;
        }
        self.routes.iter().find_map(|route| {
            let rest = route.strip(path)?;
            let mut target = route.upstream.clone();
            let base = target.path().trim_end_matches('/').to_string();
            let joined = match (base.is_empty(), rest.is_empty()) {
                (true, true) => "/".to_string(),
                _ => format!("{base}{rest}"),
            };
            target.set_path(&joined);
            target.set_query(query);
            Some((route, target))
        })
    }
}

fn parse_route(entry: &str) -> Result<Route, RouteError> {
    let malformed = || RouteError::Malformed(entry.to_string());
    let (id, rest) = entry.split_once('=').ok_or_else(malformed)?;
    let (prefix, upstream) = rest.split_once("=>").ok_or_else(malformed)?;
    let (id, prefix, upstream) = (id.trim(), prefix.trim(), upstream.trim());
    if id.is_empty() {
        return Err(malformed());
    }

    let prefix = prefix.trim_end_matches('/');
    if !prefix.starts_with('/') || prefix.len() < 2 {
        return Err(RouteError::InvalidPrefix(prefix.to_string()));
    }

    let upstream = Url::parse(upstream)
        .map_err(|e| RouteError::InvalidUpstream(upstream.to_string(), e.to_string()))?;
    if !matches!(upstream.scheme(), "http" | "https") {
        return Err(RouteError::InvalidUpstream(
            upstream.to_string(),
            "scheme must be http or https".to_string(),
        ));
    }

    Ok(Route {
        id: id.to_string(),
        prefix: prefix.to_string(),
        upstream,
    })
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    // Headers named in Connection are hop-by-hop too.
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();
    for name in named.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}

/// Fallback handler forwarding every routed request upstream.
pub async fn forward(
    State(state): State<AppState>,
    request: Request,
) -> Result<Response, ProxyError> {
    let (parts, body) = request.into_parts();
    let path = parts.uri.path();

    let Some((route, target)) = state.routes.resolve(path, parts.uri.query()) else {
        debug!(path = %path, "No route");
        return Err(ProxyError::NoRoute(path.to_string()));
    };

    let mut headers = parts.headers.clone();
    strip_hop_by_hop(&mut headers);
    headers.remove(header::HOST);

    debug!(route = %route.id(), method = %parts.method, target = %target, "Forwarding upstream");

    let upstream = state
        .http
        .request(parts.method.clone(), target)
        .headers(headers)
        .body(reqwest::Body::wrap_stream(body.into_data_stream()))
        .send()
        .await
        .map_err(|e| {
            warn!(route = %route.id(), error = %e, "Upstream request failed");
            ProxyError::Upstream(route.id().to_string())
        })?;

    let status = upstream.status();
    let mut response_headers = upstream.headers().clone();
    strip_hop_by_hop(&mut response_headers);

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = response_headers;
    Ok(response)
}
