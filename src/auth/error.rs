// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication failures and the uniform rejection response.
//!
//! Every internal failure reason folds into one of two externally visible
//! outcomes: `401 Unauthorized` or `403 Forbidden`. The specific reason is
//! only ever logged.

use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

/// Why a credential failed local verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VerificationError {
    /// Not a decodable three-part signed token, or a required claim is unusable
    #[error("token is malformed")]
    Malformed,
    /// Signature does not match the configured secret (or wrong algorithm)
    #[error("token signature is invalid")]
    BadSignature,
    /// Expiry is not strictly in the future
    #[error("token has expired")]
    Expired,
    /// Neither `sub` nor `user_id` carries a subject
    #[error("token carries no subject")]
    MissingSubject,
}

/// Why a request could not be authenticated.
///
/// Retained inside `AuthenticationResult::Unauthenticated` for logging only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthFailure {
    /// No `Authorization: Bearer <token>` header
    #[error("no bearer credential presented")]
    MissingCredential,
    /// Local claim verification failed
    #[error(transparent)]
    Verification(#[from] VerificationError),
    /// Identity service was unreachable, answered garbage, or reported the
    /// token invalid
    #[error("introspection failed: {0}")]
    IntrospectionFailure(String),
}

impl AuthFailure {
    /// Stable machine-readable code, used as a log field.
    pub fn code(&self) -> &'static str {
        match self {
            AuthFailure::MissingCredential => "missing_credential",
            AuthFailure::Verification(VerificationError::Malformed) => "malformed",
            AuthFailure::Verification(VerificationError::BadSignature) => "bad_signature",
            AuthFailure::Verification(VerificationError::Expired) => "expired",
            AuthFailure::Verification(VerificationError::MissingSubject) => "missing_subject",
            AuthFailure::IntrospectionFailure(_) => "introspection_failed",
        }
    }
}

/// Externally visible reason for refusing a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// No valid identity (HTTP 401)
    Unauthenticated,
    /// Valid identity without the required authority (HTTP 403)
    Forbidden,
}

impl DenyReason {
    /// Get the HTTP status code for this reason.
    pub fn status_code(&self) -> StatusCode {
        match self {
            DenyReason::Unauthenticated => StatusCode::UNAUTHORIZED,
            DenyReason::Forbidden => StatusCode::FORBIDDEN,
        }
    }

    fn error(&self) -> &'static str {
        match self {
            DenyReason::Unauthenticated => "Unauthorized",
            DenyReason::Forbidden => "Forbidden",
        }
    }

    fn message(&self) -> &'static str {
        match self {
            DenyReason::Unauthenticated => "Invalid or missing bearer token",
            DenyReason::Forbidden => "Insufficient permissions for this resource",
        }
    }
}

#[derive(Serialize)]
struct RejectionBody<'a> {
    timestamp: String,
    status: u16,
    error: &'static str,
    message: &'static str,
    path: &'a str,
}

/// A terminal rejection of one request.
///
/// Never carries a `WWW-Authenticate` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub reason: DenyReason,
    pub path: String,
}

impl Rejection {
    pub fn new(reason: DenyReason, path: impl Into<String>) -> Self {
        Self {
            reason,
            path: path.into(),
        }
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let status = self.reason.status_code();
        let body = RejectionBody {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            status: status.as_u16(),
            error: self.reason.error(),
            message: self.reason.message(),
            path: &self.path,
        };

        match serde_json::to_vec(&body) {
            Ok(bytes) => (
                status,
                [(CONTENT_TYPE, HeaderValue::from_static("application/json"))],
                bytes,
            )
                .into_response(),
            Err(e) => {
                tracing::error!(error = %e, path = %self.path, "Failed to serialize rejection body");
                status.into_response()
            }
        }
    }
}

/// Build the 401 response for `path`.
pub fn respond_unauthenticated(path: &str) -> Response {
    Rejection::new(DenyReason::Unauthenticated, path).into_response()
}

/// Build the 403 response for `path`.
pub fn respond_forbidden(path: &str) -> Response {
    Rejection::new(DenyReason::Forbidden, path).into_response()
}
