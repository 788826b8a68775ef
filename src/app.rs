// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Startup wiring: configuration in, ready-to-serve state out.

use std::sync::Arc;

use tracing::info;

use crate::auth::introspect::{HttpIntrospectionClient, IntrospectionError};
use crate::auth::pipeline::GatewayPipeline;
use crate::auth::resolver::{
    AuthenticationResolver, CredentialVerifier, LocalVerifier, RemoteVerifier,
};
use crate::auth::snapshot::{
    read_source, PolicyDocument, SecuritySnapshot, SnapshotError, SnapshotHandle,
};
use crate::config::{AuthMode, GatewayConfig, INTROSPECT_URL_ENV};
use crate::policy_reloader::PolicyReloader;
use crate::state::AppState;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Policy(#[from] SnapshotError),
    #[error(transparent)]
    Introspection(#[from] IntrospectionError),
    #[error("{0} is required in remote auth mode")]
    MissingIntrospectUrl(&'static str),
    #[error("failed to build upstream HTTP client: {0}")]
    HttpClient(String),
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything `main` needs to start serving.
pub struct Gateway {
    pub state: AppState,
    /// Present when a policy file and a reload interval are configured.
    pub reloader: Option<PolicyReloader>,
}

pub fn build(config: GatewayConfig) -> Result<Gateway, StartupError> {
    let (document, policy_source) = match &config.policy_file {
        Some(path) => {
            let contents = read_source(path)?;
            (PolicyDocument::from_json(&contents)?, Some(contents))
        }
        None => (PolicyDocument::default(), None),
    };

    let snapshot = SecuritySnapshot::build(
        Arc::new(config.signing_key),
        &document,
        config.public_path_match,
    )?;
    info!(
        rules = snapshot.policy().rules().len(),
        public_paths = snapshot.public_paths().len(),
        match_mode = %config.public_path_match,
        policy_file = ?config.policy_file,
        "Security snapshot loaded"
    );
    let snapshots = SnapshotHandle::new(snapshot);

    let verifier: Arc<dyn CredentialVerifier> = match config.auth_mode {
        AuthMode::Local => Arc::new(LocalVerifier),
        AuthMode::Remote => {
            let url = config
                .introspect_url
                .clone()
                .ok_or(StartupError::MissingIntrospectUrl(INTROSPECT_URL_ENV))?;
            info!(
                endpoint = %url,
                timeout_ms = config.introspect_timeout.as_millis() as u64,
                "Remote introspection enabled"
            );
            Arc::new(RemoteVerifier::new(Arc::new(HttpIntrospectionClient::new(
                url,
                config.introspect_timeout,
            )?)))
        }
    };

    let pipeline = GatewayPipeline::new(snapshots.clone(), AuthenticationResolver::new(verifier));

    // Redirects are relayed to the client, never followed.
    let http = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(|e| StartupError::HttpClient(e.to_string()))?;

    let reloader = match (config.policy_file, config.policy_reload_interval) {
        (Some(path), Some(interval)) => Some(PolicyReloader::new(
            path,
            snapshots,
            interval,
            policy_source,
        )),
        _ => None,
    };

    Ok(Gateway {
        state: AppState::new(pipeline, config.routes, http),
        reloader,
    })
}
