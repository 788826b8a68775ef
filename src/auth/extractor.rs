// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer credential extraction.

use axum::http::{header::AUTHORIZATION, HeaderMap};

use super::claims::Credential;

const BEARER_PREFIX: &str = "Bearer ";

/// Pull the bearer credential out of the `Authorization` header.
///
/// Returns `None` when the header is absent, not visible ASCII, lacks the
/// literal `Bearer ` prefix, or carries an empty token. No other header is
/// inspected.
pub fn extract(headers: &HeaderMap) -> Option<Credential> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
        .filter(|token| !token.is_empty())
        .map(Credential::new)
}
