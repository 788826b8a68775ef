// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication resolution: credential extraction plus verification.
//!
//! ## Verification modes
//!
//! - **Local** ([`LocalVerifier`]): the claim codec checks signature and
//!   expiry with the shared secret. No I/O.
//! - **Remote** ([`RemoteVerifier`]): the identity service is asked first, so
//!   revocations are visible immediately; a positive verdict is followed by
//!   the local claim codec to obtain subject and authorities.
//!
//! Both are fail-closed. Every failure becomes
//! [`AuthenticationResult::Unauthenticated`] and its reason is only logged.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::HeaderMap;
use tracing::debug;

use super::claims::{self, ClaimSet, Credential, SigningKey};
use super::error::AuthFailure;
use super::extractor;
use super::introspect::IntrospectionClient;

/// Where credential validity is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    /// Shared-secret verification inside the gateway.
    #[default]
    Local,
    /// Identity service introspection, then local claim decoding.
    Remote,
}

impl FromStr for AuthMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(AuthMode::Local),
            "remote" => Ok(AuthMode::Remote),
            other => Err(format!("unknown auth mode {other:?}")),
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMode::Local => write!(f, "local"),
            AuthMode::Remote => write!(f, "remote"),
        }
    }
}

/// Identity resolved from a verified credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    subject: String,
    authorities: BTreeSet<String>,
}

impl Principal {
    pub fn new<I, S>(subject: impl Into<String>, authorities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            subject: subject.into(),
            authorities: authorities.into_iter().map(Into::into).collect(),
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn authorities(&self) -> &BTreeSet<String> {
        &self.authorities
    }
}

impl From<ClaimSet> for Principal {
    fn from(claims: ClaimSet) -> Self {
        let (subject, authorities) = claims.into_parts();
        Self {
            subject,
            authorities,
        }
    }
}

/// Outcome of authenticating one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticationResult {
    Unauthenticated(AuthFailure),
    Authenticated(Principal),
}

impl AuthenticationResult {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthenticationResult::Authenticated(_))
    }

    pub fn principal(&self) -> Option<&Principal> {
        match self {
            AuthenticationResult::Authenticated(principal) => Some(principal),
            AuthenticationResult::Unauthenticated(_) => None,
        }
    }
}

/// Capability that turns a raw credential into verified claims.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, credential: &Credential, key: &SigningKey)
        -> Result<ClaimSet, AuthFailure>;

    fn mode(&self) -> AuthMode;
}

/// Verifies credentials with the shared secret only.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalVerifier;

#[async_trait]
impl CredentialVerifier for LocalVerifier {
    async fn verify(
        &self,
        credential: &Credential,
        key: &SigningKey,
    ) -> Result<ClaimSet, AuthFailure> {
        claims::verify(credential, key).map_err(AuthFailure::from)
    }

    fn mode(&self) -> AuthMode {
        AuthMode::Local
    }
}

/// Defers the validity decision to the identity service.
#[derive(Clone)]
pub struct RemoteVerifier {
    client: Arc<dyn IntrospectionClient>,
}

impl RemoteVerifier {
    pub fn new(client: Arc<dyn IntrospectionClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CredentialVerifier for RemoteVerifier {
    async fn verify(
        &self,
        credential: &Credential,
        key: &SigningKey,
    ) -> Result<ClaimSet, AuthFailure> {
        match self.client.introspect(credential.as_str()).await {
            Ok(true) => claims::verify(credential, key).map_err(AuthFailure::from),
            Ok(false) => Err(AuthFailure::IntrospectionFailure(
                "identity service reported the token invalid".to_string(),
            )),
            Err(e) => Err(AuthFailure::IntrospectionFailure(e.to_string())),
        }
    }

    fn mode(&self) -> AuthMode {
        AuthMode::Remote
    }
}

/// Extracts and verifies the bearer credential of a request.
#[derive(Clone)]
pub struct AuthenticationResolver {
    verifier: Arc<dyn CredentialVerifier>,
}

impl AuthenticationResolver {
    pub fn new(verifier: Arc<dyn CredentialVerifier>) -> Self {
        Self { verifier }
    }

    pub fn mode(&self) -> AuthMode {
        self.verifier.mode()
    }

    /// Resolve the request's identity. Never fails; failures are folded
    /// into [`AuthenticationResult::Unauthenticated`].
    pub async fn resolve(&self, headers: &HeaderMap, key: &SigningKey) -> AuthenticationResult {
        let Some(credential) = extractor::extract(headers) else {
            debug!(reason = AuthFailure::MissingCredential.code(), "No bearer credential");
            return AuthenticationResult::Unauthenticated(AuthFailure::MissingCredential);
        };

        match self.verifier.verify(&credential, key).await {
            Ok(claims) => {
                debug!(
                    subject = %claims.subject(),
                    authorities = ?claims.authorities(),
                    "Credential verified"
                );
                AuthenticationResult::Authenticated(claims.into())
            }
            Err(failure) => {
                debug!(reason = failure.code(), detail = %failure, "Credential rejected");
                AuthenticationResult::Unauthenticated(failure)
            }
        }
    }
}
