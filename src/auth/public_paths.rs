// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Public path classification.
//!
//! Runs before any header is looked at, so public endpoints cost nothing to
//! authenticate and stay reachable with a broken or missing credential.
//!
//! ## Matching modes
//!
//! - `compat` (default): a path is public if it ends with, or contains, any
//!   configured pattern. A trailing `**` is stripped from the pattern first,
//!   keeping the slash, so `/swagger-ui/**` opens `/swagger-ui/index.html`
//!   but not `/swagger-uix`. Plain fragments stay broad: `/auth-service/hello`
//!   also opens `/x/auth-service/hello/y`.
//! - `strict`: every pattern is an ant-style [`PathPattern`] that must match
//!   the whole path.

use std::fmt;
use std::str::FromStr;

use super::pattern::{PathPattern, PatternError};

/// How public path patterns are compared with request paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PublicPathMatch {
    #[default]
    Compat,
    Strict,
}

impl FromStr for PublicPathMatch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "compat" => Ok(PublicPathMatch::Compat),
            "strict" => Ok(PublicPathMatch::Strict),
            other => Err(format!("unknown public path match mode {other:?}")),
        }
    }
}

impl fmt::Display for PublicPathMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublicPathMatch::Compat => write!(f, "compat"),
            PublicPathMatch::Strict => write!(f, "strict"),
        }
    }
}

/// Errors building the classifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublicPathError {
    #[error("public path pattern {0:?} would match every path")]
    MatchesEverything(String),
    #[error(transparent)]
    InvalidPattern(#[from] PatternError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Matcher {
    Fragment(String),
    Pattern(PathPattern),
}

impl Matcher {
    fn matches(&self, path: &str) -> bool {
        match self {
            Matcher::Fragment(fragment) => {
                path.ends_with(fragment.as_str()) || path.contains(fragment.as_str())
            }
            Matcher::Pattern(pattern) => pattern.matches(path),
        }
    }
}

/// Ordered allow-list of public paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicPathClassifier {
    mode: PublicPathMatch,
    matchers: Vec<Matcher>,
}

impl PublicPathClassifier {
    pub fn new<I, S>(patterns: I, mode: PublicPathMatch) -> Result<Self, PublicPathError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let matchers = patterns
            .into_iter()
            .map(|p| build_matcher(p.as_ref(), mode))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { mode, matchers })
    }

    pub fn mode(&self) -> PublicPathMatch {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    /// Whether `path` is publicly accessible.
    pub fn is_public(&self, path: &str) -> bool {
        self.matchers.iter().any(|m| m.matches(path))
    }
}

fn build_matcher(pattern: &str, mode: PublicPathMatch) -> Result<Matcher, PublicPathError> {
    match mode {
        PublicPathMatch::Compat => {
            let fragment = pattern.strip_suffix("**").unwrap_or(pattern);
            if fragment.is_empty() || fragment == "/" {
                return Err(PublicPathError::MatchesEverything(pattern.to_string()));
            }
            Ok(Matcher::Fragment(fragment.to_string()))
        }
        PublicPathMatch::Strict => {
            let compiled = PathPattern::parse(pattern)?;
            if compiled.matches("/") && compiled.matches("/any/path/at/all") {
                return Err(PublicPathError::MatchesEverything(pattern.to_string()));
            }
            Ok(Matcher::Pattern(compiled))
        }
    }
}

/// Built-in public path list used when no policy document is configured.
pub fn default_public_paths() -> Vec<String> {
    [
        "/auth-service/hello",
        "/auth-service/auth/token",
        "/auth-service/auth/introspect",
        "/auth-service/auth/refresh",
        "/auth-service/v3/api-docs",
        "/content-service/v3/api-docs",
        "/payment-service/v3/api-docs",
        "/payment-service/webhook",
        "/swagger-ui.html",
        "/swagger-ui/**",
        "/v3/api-docs/**",
        "/swagger-config",
        "/webjars/**",
        "/swagger-resources/**",
        "/favicon.ico",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}
