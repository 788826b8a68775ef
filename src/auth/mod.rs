// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication and Authorization
//!
//! Edge enforcement for every request entering the platform.
//!
//! ## Flow
//!
//! 1. Public paths are forwarded without looking at credentials
//! 2. `Authorization: Bearer <token>` is extracted and verified, either
//!    locally with the shared HMAC secret or through the identity service
//! 3. The ordered rule table decides: first match wins, unmatched requests
//!    require authentication
//! 4. The verified subject replaces any inbound `X-User-Id`
//! 5. Failures terminate with a JSON 401/403 body
//!
//! ## Security
//!
//! - Every error path is fail-closed
//! - Expiry is strict (`exp > now`, no leeway)
//! - Paths with `.`/`..` segments are never classified, authorized or forwarded
//! - Key material and rules live in an immutable [`SecuritySnapshot`]
//! - Credentials are never logged

pub mod claims;
pub mod error;
pub mod extractor;
pub mod inject;
pub mod introspect;
pub mod pattern;
pub mod pipeline;
pub mod policy;
pub mod public_paths;
pub mod resolver;
pub mod roles;
pub mod snapshot;

pub use claims::{ClaimSet, Credential, SigningKey};
pub use error::{AuthFailure, DenyReason, Rejection, VerificationError};
pub use introspect::{HttpIntrospectionClient, IntrospectionClient};
pub use pipeline::{gateway_middleware, GatewayPipeline, PIPELINE_STAGES};
pub use policy::{PolicyEngine, Requirement};
pub use public_paths::{PublicPathClassifier, PublicPathMatch};
pub use resolver::{
    AuthMode, AuthenticationResolver, AuthenticationResult, CredentialVerifier, LocalVerifier,
    Principal, RemoteVerifier,
};
pub use roles::Role;
pub use snapshot::{PolicyDocument, SecuritySnapshot, SnapshotHandle};
