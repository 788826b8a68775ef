// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Immutable security configuration snapshots.
//!
//! A [`SecuritySnapshot`] bundles the key material, the public path list, and
//! the rule table. Requests load the current snapshot once and use it for
//! every stage, so authentication and authorization always agree. Reloads
//! build a complete new snapshot and swap it in atomically.

use std::path::Path;
use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::claims::SigningKey;
use super::policy::{default_rules, PolicyEngine, PolicyError, RuleSpec};
use super::public_paths::{
    default_public_paths, PublicPathClassifier, PublicPathError, PublicPathMatch,
};

/// Errors loading a policy document or building a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("failed to read policy file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid policy document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid rule: {0}")]
    Policy(#[from] PolicyError),
    #[error("invalid public path: {0}")]
    PublicPath(#[from] PublicPathError),
}

/// Policy as written on disk.
///
/// ```json
/// {
///   "public_paths": ["/swagger-ui.html", "/v3/api-docs/**"],
///   "rules": [
///     {"method": "GET", "path": "/auth-service/users", "require": "role:ADMIN"},
///     {"path": "/**", "require": "authenticated"}
///   ]
/// }
/// ```
///
/// `public_paths` falls back to the built-in list when omitted.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyDocument {
    #[serde(default = "default_public_paths")]
    pub public_paths: Vec<String>,
    pub rules: Vec<RuleSpec>,
}

impl Default for PolicyDocument {
    fn default() -> Self {
        Self {
            public_paths: default_public_paths(),
            rules: default_rules(),
        }
    }
}

impl PolicyDocument {
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        Self::from_json(&read_source(path)?)
    }
}

/// Raw policy file contents, kept by callers that diff later reloads.
pub fn read_source(path: &Path) -> Result<String, SnapshotError> {
    std::fs::read_to_string(path).map_err(|source| SnapshotError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Everything a request needs to authenticate and authorize.
#[derive(Debug)]
pub struct SecuritySnapshot {
    key: Arc<SigningKey>,
    public_paths: PublicPathClassifier,
    policy: PolicyEngine,
    loaded_at: DateTime<Utc>,
}

impl SecuritySnapshot {
    pub fn build(
        key: Arc<SigningKey>,
        document: &PolicyDocument,
        mode: PublicPathMatch,
    ) -> Result<Self, SnapshotError> {
        Ok(Self {
            key,
            public_paths: PublicPathClassifier::new(&document.public_paths, mode)?,
            policy: PolicyEngine::from_specs(&document.rules)?,
            loaded_at: Utc::now(),
        })
    }

    /// Build a successor snapshot from `document`, keeping key and match mode.
    pub fn rebuild(&self, document: &PolicyDocument) -> Result<Self, SnapshotError> {
        Self::build(self.key.clone(), document, self.public_paths.mode())
    }

    pub fn key(&self) -> &SigningKey {
        &self.key
    }

    pub fn public_paths(&self) -> &PublicPathClassifier {
        &self.public_paths
    }

    pub fn policy(&self) -> &PolicyEngine {
        &self.policy
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}

/// Shared, atomically swappable pointer to the current snapshot.
#[derive(Clone)]
pub struct SnapshotHandle {
    current: Arc<ArcSwap<SecuritySnapshot>>,
}

impl SnapshotHandle {
    pub fn new(snapshot: SecuritySnapshot) -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(snapshot)),
        }
    }

    /// Current snapshot. Hold the returned `Arc` for the whole request.
    pub fn load(&self) -> Arc<SecuritySnapshot> {
        self.current.load_full()
    }

    /// Publish a new snapshot. In-flight requests keep the one they loaded.
    pub fn install(&self, snapshot: SecuritySnapshot) {
        self.current.store(Arc::new(snapshot));
    }
}
