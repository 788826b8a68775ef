// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity injection into forwarded requests.
//!
//! Downstream services trust `X-User-Id` without re-validating the token, so
//! the gateway is the only party allowed to set it. Any inbound value is
//! removed before forwarding, whether or not an identity is injected.

use axum::http::{HeaderMap, HeaderName, HeaderValue};

use super::resolver::Principal;

/// Header carrying the verified user ID to downstream services.
pub const USER_ID_HEADER: HeaderName = HeaderName::from_static("x-user-id");

/// Injection failed after a successful authentication decision.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InjectionError {
    #[error("subject cannot be encoded as a header value")]
    InvalidSubject,
}

/// Remove every client-supplied identity header.
pub fn strip_identity(headers: &mut HeaderMap) {
    headers.remove(USER_ID_HEADER);
}

/// Replace any inbound `X-User-Id` with the principal's subject.
///
/// On error the header stays removed; the caller forwards the request
/// without identity.
pub fn inject(headers: &mut HeaderMap, principal: &Principal) -> Result<(), InjectionError> {
    strip_identity(headers);
    let value =
        HeaderValue::from_str(principal.subject()).map_err(|_| InjectionError::InvalidSubject)?;
    headers.insert(USER_ID_HEADER, value);
    Ok(())
}
