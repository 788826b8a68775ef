// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Gateway filter pipeline.
//!
//! Every proxied request runs through [`PIPELINE_STAGES`] in order. A stage
//! either lets the request continue or terminates it with a [`DenyReason`],
//! which the failure responder turns into a 401/403 body. Requests that
//! survive every stage are handed to the routing layer with their identity
//! headers rewritten.
//!
//! ```text
//! ClassifyPublicPath -> Authenticate -> Authorize -> InjectIdentity -> Forward
//! ```
//!
//! The security snapshot is loaded once when evaluation starts and used by
//! every stage, so a concurrent reload never splits a request across two
//! policies.

use std::fmt;
use std::ops::ControlFlow;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, info, warn};

use super::error::{DenyReason, Rejection};
use super::inject;
use super::pattern::decode_path;
use super::policy::Decision;
use super::resolver::{AuthenticationResolver, AuthenticationResult};
use super::snapshot::{SecuritySnapshot, SnapshotHandle};

/// Named pipeline step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ClassifyPublicPath,
    Authenticate,
    Authorize,
    InjectIdentity,
    Forward,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::ClassifyPublicPath => "classify_public_path",
            Stage::Authenticate => "authenticate",
            Stage::Authorize => "authorize",
            Stage::InjectIdentity => "inject_identity",
            Stage::Forward => "forward",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Execution order of the pipeline.
pub const PIPELINE_STAGES: [Stage; 5] = [
    Stage::ClassifyPublicPath,
    Stage::Authenticate,
    Stage::Authorize,
    Stage::InjectIdentity,
    Stage::Forward,
];

/// Per-request state owned by one pipeline execution.
#[derive(Debug)]
pub struct RequestContext {
    method: Method,
    /// Percent-decoded path; `None` when it is not UTF-8 once decoded or
    /// carries `.`/`..` segments.
    path: Option<String>,
    headers: HeaderMap,
    public: bool,
    authentication: Option<AuthenticationResult>,
}

impl RequestContext {
    pub fn new(method: Method, raw_path: &str, headers: HeaderMap) -> Self {
        Self {
            method,
            path: decode_path(raw_path),
            headers,
            public: false,
            authentication: None,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn is_public(&self) -> bool {
        self.public
    }

    pub fn authentication(&self) -> Option<&AuthenticationResult> {
        self.authentication.as_ref()
    }
}

/// Final verdict for one request.
#[derive(Debug)]
pub enum Outcome {
    /// Forward with these (rewritten) headers.
    Forward(HeaderMap),
    Reject(DenyReason),
}

/// Composes classification, authentication, authorization and injection.
#[derive(Clone)]
pub struct GatewayPipeline {
    snapshots: SnapshotHandle,
    resolver: AuthenticationResolver,
}

impl GatewayPipeline {
    pub fn new(snapshots: SnapshotHandle, resolver: AuthenticationResolver) -> Self {
        Self {
            snapshots,
            resolver,
        }
    }

    pub fn snapshots(&self) -> &SnapshotHandle {
        &self.snapshots
    }

    pub fn resolver(&self) -> &AuthenticationResolver {
        &self.resolver
    }

    /// Run every stage against one request.
    pub async fn evaluate(&self, method: Method, raw_path: &str, headers: HeaderMap) -> Outcome {
        let snapshot = self.snapshots.load();
        let mut ctx = RequestContext::new(method, raw_path, headers);

        for stage in PIPELINE_STAGES {
            if let ControlFlow::Break(reason) = self.run_stage(stage, &mut ctx, &snapshot).await {
                info!(
                    method = %ctx.method,
                    path = %raw_path,
                    stage = %stage,
                    status = reason.status_code().as_u16(),
                    "Request denied"
                );
                return Outcome::Reject(reason);
            }
        }

        Outcome::Forward(ctx.headers)
    }

    async fn run_stage(
        &self,
        stage: Stage,
        ctx: &mut RequestContext,
        snapshot: &SecuritySnapshot,
    ) -> ControlFlow<DenyReason> {
        match stage {
            Stage::ClassifyPublicPath => {
                match ctx.path.as_deref() {
                    Some(path) => ctx.public = snapshot.public_paths().is_public(path),
                    None => warn!("Request path is not canonical"),
                }
                ControlFlow::Continue(())
            }
            Stage::Authenticate => {
                if !ctx.public {
                    let result = self.resolver.resolve(&ctx.headers, snapshot.key()).await;
                    ctx.authentication = Some(result);
                }
                ControlFlow::Continue(())
            }
            Stage::Authorize => authorize(ctx, snapshot),
            Stage::InjectIdentity => {
                match ctx.authentication.as_ref().and_then(|a| a.principal()) {
                    Some(principal) => {
                        if let Err(e) = inject::inject(&mut ctx.headers, principal) {
                            warn!(error = %e, "Forwarding without identity header");
                        }
                    }
                    None => inject::strip_identity(&mut ctx.headers),
                }
                ControlFlow::Continue(())
            }
            Stage::Forward => {
                debug!(method = %ctx.method, public = ctx.public, "Forwarding request");
                ControlFlow::Continue(())
            }
        }
    }
}

fn authorize(ctx: &RequestContext, snapshot: &SecuritySnapshot) -> ControlFlow<DenyReason> {
    if ctx.public {
        return ControlFlow::Continue(());
    }
    let Some(authentication) = ctx.authentication.as_ref() else {
        return ControlFlow::Break(DenyReason::Unauthenticated);
    };
    // A non-canonical path matches no rule, including public ones.
    let Some(path) = ctx.path.as_deref() else {
        return ControlFlow::Break(if authentication.is_authenticated() {
            DenyReason::Forbidden
        } else {
            DenyReason::Unauthenticated
        });
    };

    match snapshot.policy().authorize(&ctx.method, path, authentication) {
        Decision::Allow => ControlFlow::Continue(()),
        Decision::Deny(reason) => ControlFlow::Break(reason),
    }
}

/// Axum middleware running the pipeline in front of the routing layer.
///
/// ```rust,ignore
/// let app = Router::new()
///     .fallback(proxy::forward)
///     .layer(axum::middleware::from_fn_with_state(pipeline, gateway_middleware));
/// ```
pub async fn gateway_middleware(
    State(pipeline): State<GatewayPipeline>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();
    let headers = std::mem::take(&mut parts.headers);

    match pipeline
        .evaluate(parts.method.clone(), parts.uri.path(), headers)
        .await
    {
        Outcome::Forward(headers) => {
            parts.headers = headers;
            next.run(Request::from_parts(parts, body)).await
        }
        Outcome::Reject(reason) => Rejection::new(reason, parts.uri.path()).into_response(),
    }
}
