// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Policy Reloader
//!
//! Background task that periodically re-reads the policy document and
//! publishes a fresh security snapshot when it changed.
//!
//! ## Strategy
//!
//! Every `interval` the reloader:
//! 1. Reads the policy file and compares it with the last applied contents.
//! 2. If it differs, parses it and builds a complete new snapshot (same key,
//!    same public path match mode).
//! 3. Installs the snapshot atomically. Requests already in flight finish on
//!    the snapshot they loaded.
//!
//! A file that cannot be read, parsed, or compiled is logged and skipped; the
//! previous snapshot keeps serving.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown.

use std::path::PathBuf;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::auth::snapshot::{PolicyDocument, SnapshotError, SnapshotHandle};

/// Background policy file watcher.
pub struct PolicyReloader {
    path: PathBuf,
    snapshots: SnapshotHandle,
    interval: Duration,
    last_applied: Option<String>,
}

impl PolicyReloader {
    /// `initial` is the file content the current snapshot was built from.
    pub fn new(
        path: PathBuf,
        snapshots: SnapshotHandle,
        interval: Duration,
        initial: Option<String>,
    ) -> Self {
        Self {
            path,
            snapshots,
            interval,
            last_applied: initial,
        }
    }

    /// Run the reload loop until the cancellation token is triggered.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(reloader.run(shutdown.clone()));
    /// ```
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(
            path = %self.path.display(),
            interval_secs = self.interval.as_secs(),
            "Policy reloader starting"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Policy reloader shutting down");
                    return;
                }
            }

            if let Err(e) = self.reload_once().await {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Policy reload failed, keeping current snapshot"
                );
            }
        }
    }

    /// Check the file once. Returns `true` if a new snapshot was installed.
    pub async fn reload_once(&mut self) -> Result<bool, SnapshotError> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| SnapshotError::Io {
                path: self.path.display().to_string(),
                source,
            })?;

        if self.last_applied.as_deref() == Some(contents.as_str()) {
            return Ok(false);
        }

        let document = PolicyDocument::from_json(&contents)?;
        let snapshot = self.snapshots.load().rebuild(&document)?;
        let rules = snapshot.policy().rules().len();
        let public_paths = snapshot.public_paths().len();
        self.snapshots.install(snapshot);
        self.last_applied = Some(contents);

        info!(rules, public_paths, "Policy snapshot reloaded");
        Ok(true)
    }
}
