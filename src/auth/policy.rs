// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Path/method/role authorization policy.
//!
//! Rules are evaluated top-to-bottom and the first rule whose method and path
//! pattern match decides. A request no rule matches must be authenticated.

use std::fmt;
use std::str::FromStr;

use axum::http::Method;
use serde::Deserialize;

use super::error::DenyReason;
use super::pattern::{PathPattern, PatternError};
use super::resolver::AuthenticationResult;
use super::roles::Role;

const ROLE_REQUIREMENT_PREFIX: &str = "role:";

/// Errors building a rule table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    #[error("invalid HTTP method {0:?}")]
    InvalidMethod(String),
    #[error(transparent)]
    InvalidPattern(#[from] PatternError),
    #[error("invalid requirement {0:?} (expected public, authenticated or role:<name>)")]
    InvalidRequirement(String),
}

/// What a matching rule demands of the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    Public,
    Authenticated,
    Role(Role),
}

impl FromStr for Requirement {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "public" => Ok(Requirement::Public),
            "authenticated" => Ok(Requirement::Authenticated),
            other => other
                .strip_prefix(ROLE_REQUIREMENT_PREFIX)
                .and_then(Role::new)
                .map(Requirement::Role)
                .ok_or_else(|| PolicyError::InvalidRequirement(s.to_string())),
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::Public => write!(f, "public"),
            Requirement::Authenticated => write!(f, "authenticated"),
            Requirement::Role(role) => write!(f, "{ROLE_REQUIREMENT_PREFIX}{role}"),
        }
    }
}

/// HTTP method a rule applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodMatcher {
    Any,
    Exact(Method),
}

impl MethodMatcher {
    fn matches(&self, method: &Method) -> bool {
        match self {
            MethodMatcher::Any => true,
            MethodMatcher::Exact(expected) => expected == method,
        }
    }
}

impl FromStr for MethodMatcher {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "*" || s.is_empty() {
            return Ok(MethodMatcher::Any);
        }
        Method::from_bytes(s.to_ascii_uppercase().as_bytes())
            .map(MethodMatcher::Exact)
            .map_err(|_| PolicyError::InvalidMethod(s.to_string()))
    }
}

impl fmt::Display for MethodMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodMatcher::Any => write!(f, "*"),
            MethodMatcher::Exact(method) => write!(f, "{method}"),
        }
    }
}

/// One entry of the rule table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRule {
    method: MethodMatcher,
    pattern: PathPattern,
    requirement: Requirement,
}

impl AuthorizationRule {
    /// Build a rule from its textual parts, e.g. `("GET", "/users/**", "role:ADMIN")`.
    pub fn new(method: &str, path: &str, requirement: &str) -> Result<Self, PolicyError> {
        Ok(Self {
            method: method.parse()?,
            pattern: PathPattern::parse(path)?,
            requirement: requirement.parse()?,
        })
    }

    pub fn requirement(&self) -> &Requirement {
        &self.requirement
    }

    fn matches(&self, method: &Method, path: &str) -> bool {
        self.method.matches(method) && self.pattern.matches(path)
    }
}

impl fmt::Display for AuthorizationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} -> {}", self.method, self.pattern, self.requirement)
    }
}

/// Rule as written in a policy document.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleSpec {
    #[serde(default = "any_method")]
    pub method: String,
    pub path: String,
    pub require: String,
}

fn any_method() -> String {
    "*".to_string()
}

impl TryFrom<&RuleSpec> for AuthorizationRule {
    type Error = PolicyError;

    fn try_from(spec: &RuleSpec) -> Result<Self, Self::Error> {
        AuthorizationRule::new(&spec.method, &spec.path, &spec.require)
    }
}

/// Result of evaluating the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

/// Ordered, immutable rule table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyEngine {
    rules: Vec<AuthorizationRule>,
}

impl PolicyEngine {
    pub fn new(rules: Vec<AuthorizationRule>) -> Self {
        Self { rules }
    }

    pub fn from_specs(specs: &[RuleSpec]) -> Result<Self, PolicyError> {
        let rules = specs
            .iter()
            .map(AuthorizationRule::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(rules))
    }

    pub fn rules(&self) -> &[AuthorizationRule] {
        &self.rules
    }

    /// Decide whether the request may proceed.
    pub fn authorize(
        &self,
        method: &Method,
        path: &str,
        authentication: &AuthenticationResult,
    ) -> Decision {
        let requirement = self
            .rules
            .iter()
            .find(|rule| rule.matches(method, path))
            .map(|rule| &rule.requirement)
            .unwrap_or(&Requirement::Authenticated);

        apply(requirement, authentication)
    }
}

fn apply(requirement: &Requirement, authentication: &AuthenticationResult) -> Decision {
    match (requirement, authentication.principal()) {
        (Requirement::Public, _) => Decision::Allow,
        (_, None) => Decision::Deny(DenyReason::Unauthenticated),
        (Requirement::Authenticated, Some(_)) => Decision::Allow,
        (Requirement::Role(role), Some(principal)) => {
            if role.is_granted_by(principal.authorities()) {
                Decision::Allow
            } else {
                Decision::Deny(DenyReason::Forbidden)
            }
        }
    }
}

/// Built-in rule table used when no policy document is configured.
pub fn default_rules() -> Vec<RuleSpec> {
    const RULES: &[(&str, &str, &str)] = &[
        // CORS preflight
        ("OPTIONS", "/**", "public"),
        // Auth service
        ("*", "/auth-service/hello", "public"),
        ("*", "/auth-service/auth/token", "public"),
        ("*", "/auth-service/auth/introspect", "public"),
        ("*", "/auth-service/auth/refresh", "public"),
        ("*", "/auth-service/auth/email-verification", "public"),
        ("*", "/auth-service/auth/resend-verification", "public"),
        ("*", "/auth-service/auth/google/**", "public"),
        ("*", "/auth-service/login/**", "public"),
        ("*", "/auth-service/oauth2/**", "public"),
        ("POST", "/auth-service/users", "public"),
        // Payment provider callbacks
        ("*", "/payment-service/payment/webhook", "public"),
        ("*", "/payment-service/payment/return", "public"),
        ("*", "/payment-service/payment/cancel", "public"),
        // API docs and health
        ("*", "/*/v3/api-docs/**", "public"),
        ("*", "/*/swagger-ui/**", "public"),
        ("*", "/*/swagger-ui.html", "public"),
        ("*", "/*/actuator/health", "public"),
        ("*", "/favicon.ico", "public"),
        // Admin only
        ("*", "/auth-service/api/admin/**", "role:ADMIN"),
        ("*", "/auth-service/roles/**", "role:ADMIN"),
        ("*", "/auth-service/permissions/**", "role:ADMIN"),
        ("GET", "/auth-service/users", "role:ADMIN"),
        ("DELETE", "/auth-service/users/**", "role:ADMIN"),
        ("*", "/wallet-service/api/admin/**", "role:ADMIN"),
        ("*", "/content-service/admin/**", "role:ADMIN"),
        // Payment service
        ("POST", "/payment-service/payment", "authenticated"),
        ("GET", "/payment-service/payment/**", "authenticated"),
        // Wallet service
        ("*", "/wallet-service/api/wallets/my/**", "authenticated"),
        ("*", "/wallet-service/internal/**", "public"),
        // Content service: public browsing, authenticated writes
        ("GET", "/content-service/subjects/**", "public"),
        ("GET", "/content-service/chapters/**", "public"),
        ("GET", "/content-service/curriculum-lessons/**", "public"),
        ("POST", "/content-service/**", "authenticated"),
        ("PUT", "/content-service/**", "authenticated"),
        ("DELETE", "/content-service/**", "authenticated"),
        // Auth service reads
        ("GET", "/auth-service/users/**", "authenticated"),
        // Catch-all
        ("*", "/**", "authenticated"),
    ];

    RULES
        .iter()
        .map(|(method, path, require)| RuleSpec {
            method: method.to_string(),
            path: path.to_string(),
            require: require.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::error::AuthFailure;
    use crate::auth::resolver::Principal;

    fn anonymous() -> AuthenticationResult {
        AuthenticationResult::Unauthenticated(AuthFailure::MissingCredential)
    }

    fn user(authorities: &[&str]) -> AuthenticationResult {
        AuthenticationResult::Authenticated(Principal::new("user123", authorities.iter().copied()))
    }

    fn engine(rules: &[(&str, &str, &str)]) -> PolicyEngine {
        PolicyEngine::new(
            rules
                .iter()
                .map(|(m, p, r)| AuthorizationRule::new(m, p, r).unwrap())
                .collect(),
        )
    }

    fn default_engine() -> PolicyEngine {
        PolicyEngine::from_specs(&default_rules()).unwrap()
    }

    #[test]
    fn requirement_parsing() {
        assert_eq!("public".parse::<Requirement>().unwrap(), Requirement::Public);
        assert_eq!(
            "authenticated".parse::<Requirement>().unwrap(),
            Requirement::Authenticated
        );
        assert_eq!(
            "role:ADMIN".parse::<Requirement>().unwrap(),
            Requirement::Role(Role::new("ADMIN").unwrap())
        );
        assert_eq!(
            "role:ROLE_ADMIN".parse::<Requirement>().unwrap(),
            Requirement::Role(Role::new("ADMIN").unwrap())
        );
        assert!("role:".parse::<Requirement>().is_err());
        assert!("admin".parse::<Requirement>().is_err());
    }

    #[test]
    fn method_parsing() {
        assert_eq!("*".parse::<MethodMatcher>().unwrap(), MethodMatcher::Any);
        assert_eq!(
            "get".parse::<MethodMatcher>().unwrap(),
            MethodMatcher::Exact(Method::GET)
        );
        assert!("G E T".parse::<MethodMatcher>().is_err());
    }

    #[test]
    fn public_allows_anyone() {
        let engine = engine(&[("*", "/open/**", "public")]);
        assert_eq!(
            engine.authorize(&Method::GET, "/open/x", &anonymous()),
            Decision::Allow
        );
        assert_eq!(
            engine.authorize(&Method::GET, "/open/x", &user(&[])),
            Decision::Allow
        );
    }

    #[test]
    fn authenticated_requires_identity() {
        let engine = engine(&[("*", "/private/**", "authenticated")]);
        assert_eq!(
            engine.authorize(&Method::GET, "/private", &anonymous()),
            Decision::Deny(DenyReason::Unauthenticated)
        );
        assert_eq!(
            engine.authorize(&Method::GET, "/private", &user(&[])),
            Decision::Allow
        );
    }

    #[test]
    fn role_rule_distinguishes_forbidden_from_unauthenticated() {
        let engine = engine(&[("*", "/admin/**", "role:ADMIN")]);
        assert_eq!(
            engine.authorize(&Method::GET, "/admin/x", &anonymous()),
            Decision::Deny(DenyReason::Unauthenticated)
        );
        assert_eq!(
            engine.authorize(&Method::GET, "/admin/x", &user(&["ROLE_USER"])),
            Decision::Deny(DenyReason::Forbidden)
        );
        assert_eq!(
            engine.authorize(&Method::GET, "/admin/x", &user(&["ROLE_ADMIN"])),
            Decision::Allow
        );
    }

    #[test]
    fn first_match_wins() {
        let forward = engine(&[
            ("GET", "/things/**", "public"),
            ("*", "/things/**", "role:ADMIN"),
        ]);
        assert_eq!(
            forward.authorize(&Method::GET, "/things/1", &anonymous()),
            Decision::Allow
        );
        assert_eq!(
            forward.authorize(&Method::POST, "/things/1", &user(&["ROLE_USER"])),
            Decision::Deny(DenyReason::Forbidden)
        );

        let reversed = engine(&[
            ("*", "/things/**", "role:ADMIN"),
            ("GET", "/things/**", "public"),
        ]);
        assert_eq!(
            reversed.authorize(&Method::GET, "/things/1", &anonymous()),
            Decision::Deny(DenyReason::Unauthenticated)
        );
    }

    #[test]
    fn unmatched_request_defaults_to_authenticated() {
        let engine = PolicyEngine::new(Vec::new());
        assert_eq!(
            engine.authorize(&Method::GET, "/anything", &anonymous()),
            Decision::Deny(DenyReason::Unauthenticated)
        );
        assert_eq!(
            engine.authorize(&Method::GET, "/anything", &user(&[])),
            Decision::Allow
        );
    }

    #[test]
    fn default_table_user_reads() {
        let engine = default_engine();
        assert_eq!(
            engine.authorize(&Method::GET, "/auth-service/users/42", &user(&["ROLE_USER"])),
            Decision::Allow
        );
    }

    #[test]
    fn default_table_admin_routes() {
        let engine = default_engine();
        assert_eq!(
            engine.authorize(&Method::GET, "/auth-service/users", &anonymous()),
            Decision::Deny(DenyReason::Unauthenticated)
        );
        assert_eq!(
            engine.authorize(&Method::GET, "/auth-service/users", &user(&["ROLE_USER"])),
            Decision::Deny(DenyReason::Forbidden)
        );
        assert_eq!(
            engine.authorize(&Method::DELETE, "/auth-service/users/42", &user(&["ROLE_USER"])),
            Decision::Deny(DenyReason::Forbidden)
        );
        assert_eq!(
            engine.authorize(&Method::DELETE, "/auth-service/users/42", &user(&["ROLE_ADMIN"])),
            Decision::Allow
        );
    }

    #[test]
    fn default_table_registration_is_public() {
        let engine = default_engine();
        assert_eq!(
            engine.authorize(&Method::POST, "/auth-service/users", &anonymous()),
            Decision::Allow
        );
    }

    #[test]
    fn default_table_content_browsing() {
        let engine = default_engine();
        assert_eq!(
            engine.authorize(&Method::GET, "/content-service/subjects/7", &anonymous()),
            Decision::Allow
        );
        assert_eq!(
            engine.authorize(&Method::POST, "/content-service/subjects", &anonymous()),
            Decision::Deny(DenyReason::Unauthenticated)
        );
    }

    #[test]
    fn default_table_preflight_is_public() {
        let engine = default_engine();
        assert_eq!(
            engine.authorize(&Method::OPTIONS, "/auth-service/users/42", &anonymous()),
            Decision::Allow
        );
    }

    #[test]
    fn evaluation_is_deterministic() {
        let engine = default_engine();
        let auth = user(&["ROLE_USER"]);
        let first = engine.authorize(&Method::DELETE, "/auth-service/users/1", &auth);
        for _ in 0..10 {
            assert_eq!(
                engine.authorize(&Method::DELETE, "/auth-service/users/1", &auth),
                first
            );
        }
    }

    #[test]
    fn rule_display() {
        let rule = AuthorizationRule::new("GET", "/users/**", "role:ROLE_ADMIN").unwrap();
        assert_eq!(rule.to_string(), "GET /users/** -> role:ADMIN");
    }
}
