// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP surface of the gateway.
//!
//! `/gateway/health*` is answered locally. Every other request goes through
//! the auth pipeline and, if allowed, to the static route table.

use axum::{
    extract::Request,
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::{auth::pipeline::gateway_middleware, proxy, state::AppState};

pub mod health;

pub fn router(state: AppState) -> Router {
    let proxied = Router::new()
        .fallback(proxy::forward)
        .layer(from_fn_with_state(
            state.pipeline.clone(),
            gateway_middleware,
        ))
        .with_state(state.clone());

    Router::new()
        .route("/gateway/health", get(health::health))
        .route("/gateway/health/live", get(health::liveness))
        .with_state(state)
        .fallback_service(proxied)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
