// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};
use serde::Serialize;

use crate::state::AppState;

/// Gateway health with a summary of the active security snapshot.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    /// `local` or `remote` credential verification.
    pub auth_mode: String,
    /// Number of authorization rules in the active snapshot.
    pub rules: usize,
    /// Number of public path patterns in the active snapshot.
    pub public_paths: usize,
    /// When the active snapshot was built (RFC 3339).
    pub policy_loaded_at: String,
}

/// Simple health check response for liveness probes.
#[derive(Debug, Serialize)]
pub struct LivenessResponse {
    pub status: String,
}

/// Health check endpoint handler. Served outside the auth pipeline.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let snapshot = state.snapshots().load();
    Json(HealthResponse {
        status: "ok".to_string(),
        auth_mode: state.auth_mode().to_string(),
        rules: snapshot.policy().rules().len(),
        public_paths: snapshot.public_paths().len(),
        policy_loaded_at: snapshot.loaded_at().to_rfc3339(),
    })
}

/// Liveness probe handler.
///
/// Always returns 200 if the process is running.
pub async fn liveness() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "ok".to_string(),
    })
}
