// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::pipeline::GatewayPipeline;
use crate::auth::resolver::AuthMode;
use crate::auth::snapshot::SnapshotHandle;
use crate::proxy::RouteTable;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: GatewayPipeline,
    pub routes: Arc<RouteTable>,
    /// Client used to reach upstream services.
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(pipeline: GatewayPipeline, routes: RouteTable, http: reqwest::Client) -> Self {
        Self {
            pipeline,
            routes: Arc::new(routes),
            http,
        }
    }

    pub fn snapshots(&self) -> &SnapshotHandle {
        self.pipeline.snapshots()
    }

    pub fn auth_mode(&self) -> AuthMode {
        self.pipeline.resolver().mode()
    }
}
