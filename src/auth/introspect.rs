// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Remote token introspection against the identity service.
//!
//! ## Wire format
//!
//! ```text
//! POST <endpoint>
//! {"token": "<raw bearer token>"}
//!
//! 200 OK
//! {"code": 1000, "result": {"valid": true}}
//! ```
//!
//! Any transport error, timeout, non-2xx status, or undecodable body is an
//! error. Callers treat every error as "invalid".

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

/// Default request timeout for introspection calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Why an introspection call produced no verdict.
#[derive(Debug, thiserror::Error)]
pub enum IntrospectionError {
    #[error("failed to build HTTP client: {0}")]
    Client(String),
    #[error("introspection request failed: {0}")]
    Transport(String),
    #[error("HTTP {0} from introspection endpoint")]
    Status(u16),
    #[error("undecodable introspection response: {0}")]
    Decode(String),
}

/// Remote authority that can vouch for a raw credential.
#[async_trait]
pub trait IntrospectionClient: Send + Sync {
    /// Ask whether `token` is currently valid.
    async fn introspect(&self, token: &str) -> Result<bool, IntrospectionError>;
}

#[derive(Serialize)]
struct IntrospectRequest<'a> {
    token: &'a str,
}

#[derive(Debug, Deserialize)]
struct IntrospectResponse {
    /// Identity service status code (1000 on success); informational only
    #[serde(default)]
    #[allow(dead_code)]
    code: Option<i64>,
    #[serde(default)]
    result: Option<IntrospectResult>,
}

#[derive(Debug, Deserialize)]
struct IntrospectResult {
    #[serde(default)]
    valid: bool,
}

/// HTTP introspection client for the identity service.
#[derive(Clone)]
pub struct HttpIntrospectionClient {
    endpoint: Url,
    client: reqwest::Client,
}

impl HttpIntrospectionClient {
    /// Create a client for `endpoint` with a per-request `timeout`.
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, IntrospectionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IntrospectionError::Client(e.to_string()))?;
        Ok(Self { endpoint, client })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl IntrospectionClient for HttpIntrospectionClient {
    async fn introspect(&self, token: &str) -> Result<bool, IntrospectionError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&IntrospectRequest { token })
            .send()
            .await
            .map_err(|e| IntrospectionError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(IntrospectionError::Status(response.status().as_u16()));
        }

        let body: IntrospectResponse = response
            .json()
            .await
            .map_err(|e| IntrospectionError::Decode(e.to_string()))?;

        Ok(body.result.is_some_and(|r| r.valid))
    }
}
