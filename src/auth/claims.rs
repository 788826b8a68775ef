// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer credentials, shared-secret key material, and the claim codec.
//!
//! ## Verification order
//!
//! 1. Structural decode of the three-part JWS (`Malformed`)
//! 2. HMAC signature under the configured algorithm (`BadSignature`)
//! 3. Expiry strictly in the future (`Expired`)
//! 4. Subject from `sub`, falling back to `user_id` (`MissingSubject`)
//! 5. Authorities from the whitespace-delimited `scope` claim
//!
//! Verification is pure: no I/O, no shared mutable state.

use std::collections::BTreeSet;
use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{decode, decode_header, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use super::error::VerificationError;

/// Minimum shared-secret length for HMAC signing (256 bits).
pub const MIN_SECRET_LEN: usize = 32;

/// Raw bearer token, exactly as presented after the `Bearer ` prefix.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Errors building key material.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("shared secret must be at least 32 bytes, got {0}")]
    WeakSecret(usize),
    #[error("algorithm {0:?} is not an HMAC algorithm")]
    UnsupportedAlgorithm(Algorithm),
}

/// Shared secret used to verify token signatures.
///
/// Loaded once at startup and never mutated afterwards.
#[derive(Clone)]
pub struct SigningKey {
    algorithm: Algorithm,
    decoding: DecodingKey,
}

impl SigningKey {
    /// Build key material from a raw secret and a fixed HMAC algorithm.
    pub fn from_secret(secret: &[u8], algorithm: Algorithm) -> Result<Self, KeyError> {
        if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(KeyError::UnsupportedAlgorithm(algorithm));
        }
        if secret.len() < MIN_SECRET_LEN {
            return Err(KeyError::WeakSecret(secret.len()));
        }
        Ok(Self {
            algorithm,
            decoding: DecodingKey::from_secret(secret),
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// Claims we read from the token payload.
#[derive(Debug, Deserialize)]
struct JwtClaims {
    /// Subject (canonical user ID)
    #[serde(default)]
    sub: Option<String>,
    /// Legacy subject claim used by older issuers
    #[serde(default)]
    user_id: Option<String>,
    /// Space-delimited authorities, e.g. `"ROLE_USER ROLE_ADMIN"`
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    iat: Option<i64>,
    exp: i64,
}

/// Verified contents of a credential.
///
/// Only [`verify`] and [`verify_at`] construct this type, and only after the
/// signature and expiry checks have passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimSet {
    subject: String,
    authorities: BTreeSet<String>,
    issued_at: Option<i64>,
    expires_at: i64,
}

impl ClaimSet {
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn authorities(&self) -> &BTreeSet<String> {
        &self.authorities
    }

    pub fn issued_at(&self) -> Option<i64> {
        self.issued_at
    }

    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    pub(crate) fn into_parts(self) -> (String, BTreeSet<String>) {
        (self.subject, self.authorities)
    }
}

/// Verify `credential` against `key` at the current wall-clock time.
pub fn verify(credential: &Credential, key: &SigningKey) -> Result<ClaimSet, VerificationError> {
    verify_at(credential, key, chrono::Utc::now().timestamp())
}

/// Verify `credential` against `key` as of `now` (Unix seconds).
pub fn verify_at(
    credential: &Credential,
    key: &SigningKey,
    now: i64,
) -> Result<ClaimSet, VerificationError> {
    let token = credential.as_str();

    decode_header(token).map_err(|_| VerificationError::Malformed)?;
    decode_payload(token)?;

    // Expiry is checked below against `now`, strictly, with no leeway.
    let mut validation = Validation::new(key.algorithm);
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.leeway = 0;

    let claims = decode::<JwtClaims>(token, &key.decoding, &validation)
        .map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                VerificationError::BadSignature
            }
            _ => VerificationError::Malformed,
        })?
        .claims;

    if claims.exp <= now {
        return Err(VerificationError::Expired);
    }

    let subject = non_empty(claims.sub)
        .or_else(|| non_empty(claims.user_id))
        .ok_or(VerificationError::MissingSubject)?;

    let authorities = claims
        .scope
        .as_deref()
        .map(|scope| scope.split_whitespace().map(str::to_owned).collect())
        .unwrap_or_default();

    Ok(ClaimSet {
        subject,
        authorities,
        issued_at: claims.iat,
        expires_at: claims.exp,
    })
}

/// Structural check of the payload segment, ahead of the signature check.
fn decode_payload(token: &str) -> Result<JwtClaims, VerificationError> {
    let mut parts = token.split('.');
    let (Some(_), Some(payload), Some(_), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(VerificationError::Malformed);
    };
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| VerificationError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| VerificationError::Malformed)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
pub(crate) mod test_support {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::Value;

    use super::*;

    pub const SECRET: &[u8] = b"test-secret-that-is-at-least-32-bytes-long!";
    pub const OTHER_SECRET: &[u8] = b"another-secret-that-is-also-32-bytes-long!!";

    pub fn key() -> SigningKey {
        SigningKey::from_secret(SECRET, Algorithm::HS256).unwrap()
    }

    pub fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }

    pub fn sign_with(secret: &[u8], algorithm: Algorithm, claims: &Value) -> Credential {
        let token = encode(
            &Header::new(algorithm),
            claims,
            &EncodingKey::from_secret(secret),
        )
        .unwrap();
        Credential::new(token)
    }

    pub fn sign(claims: &Value) -> Credential {
        sign_with(SECRET, Algorithm::HS256, claims)
    }

    /// Token for `sub` with `scope`, expiring one hour from now.
    pub fn token_for(sub: &str, scope: &str) -> Credential {
        let now = now();
        sign(&serde_json::json!({
            "sub": sub,
            "scope": scope,
            "iat": now,
            "exp": now + 3600,
        }))
    }
}
