// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ant-style path patterns.
//!
//! | Segment      | Matches                                  |
//! |--------------|------------------------------------------|
//! | `users`      | exactly `users`                          |
//! | `*`          | any single segment                       |
//! | `*.html`     | any single segment matching the glob     |
//! | `{id}`       | any single segment                       |
//! | `**`         | zero or more segments                    |
//!
//! Empty segments are ignored, so trailing and doubled slashes are not
//! significant.

use std::fmt;

use globset::{GlobBuilder, GlobMatcher};

/// Errors parsing a path pattern.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("pattern {0:?} must start with '/'")]
    NotAbsolute(String),
    #[error("pattern {0:?} mixes '**' with other characters in one segment")]
    InvalidMultiWildcard(String),
    #[error("pattern {0:?} has an unterminated '{{' variable")]
    UnterminatedVariable(String),
    #[error("pattern {0:?} has an invalid glob segment: {1}")]
    InvalidGlob(String, String),
}

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Glob(GlobMatcher),
    Any,
    MultiWildcard,
}

impl Segment {
    fn matches(&self, segment: &str) -> bool {
        match self {
            Segment::Literal(literal) => literal == segment,
            Segment::Glob(glob) => glob.is_match(segment),
            Segment::Any => true,
            Segment::MultiWildcard => true,
        }
    }
}

impl PartialEq for Segment {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Segment::Literal(a), Segment::Literal(b)) => a == b,
            (Segment::Glob(a), Segment::Glob(b)) => a.glob() == b.glob(),
            (Segment::Any, Segment::Any) => true,
            (Segment::MultiWildcard, Segment::MultiWildcard) => true,
            _ => false,
        }
    }
}

impl Eq for Segment {}

/// Compiled ant-style path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        if !raw.starts_with('/') {
            return Err(PatternError::NotAbsolute(raw.to_string()));
        }

        let segments = raw
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| parse_segment(raw, s))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether the whole of `path` matches this pattern.
    pub fn matches(&self, path: &str) -> bool {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match_segments(&self.segments, &parts)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn parse_segment(raw: &str, segment: &str) -> Result<Segment, PatternError> {
    if segment == "**" {
        return Ok(Segment::MultiWildcard);
    }
    if segment.contains("**") {
        return Err(PatternError::InvalidMultiWildcard(raw.to_string()));
    }
    if segment == "*" {
        return Ok(Segment::Any);
    }
    if segment.starts_with('{') {
        return if segment.ends_with('}') {
            Ok(Segment::Any)
        } else {
            Err(PatternError::UnterminatedVariable(raw.to_string()))
        };
    }
    if segment.contains('*') {
        let glob = GlobBuilder::new(segment)
            .literal_separator(true)
            .build()
            .map_err(|e| PatternError::InvalidGlob(raw.to_string(), e.to_string()))?;
        return Ok(Segment::Glob(glob.compile_matcher()));
    }
    Ok(Segment::Literal(segment.to_string()))
}

fn match_segments(pattern: &[Segment], path: &[&str]) -> bool {
    match pattern.split_first() {
        None => path.is_empty(),
        Some((Segment::MultiWildcard, rest)) => {
            (0..=path.len()).any(|skip| match_segments(rest, &path[skip..]))
        }
        Some((segment, rest)) => match path.split_first() {
            Some((head, tail)) => segment.matches(head) && match_segments(rest, tail),
            None => false,
        },
    }
}

/// Percent-decode a request path into the form every matcher sees.
///
/// Invalid escapes are kept verbatim. Returns `None` when the decoded bytes
/// are not UTF-8 or when any segment is `.` or `..` (raw or encoded, with
/// `/` or `\` as separator). Callers treat `None` as a path no pattern
/// should match and the routing layer refuses to forward.
pub fn decode_path(path: &str) -> Option<String> {
    let decoded = urlencoding::decode(path).ok()?;
    if decoded
        .split(['/', '\\'])
        .any(|segment| segment == "." || segment == "..")
    {
        return None;
    }
    Some(decoded.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(pattern: &str, path: &str) -> bool {
        PathPattern::parse(pattern).unwrap().matches(path)
    }

    #[test]
    fn literal_pattern_matches_exact_path() {
        assert!(matches("/auth-service/users", "/auth-service/users"));
        assert!(matches("/auth-service/users", "/auth-service/users/"));
        assert!(!matches("/auth-service/users", "/auth-service/users/42"));
        assert!(!matches("/auth-service/users", "/auth-service"));
    }

    #[test]
    fn double_star_matches_zero_or_more_segments() {
        assert!(matches("/auth-service/users/**", "/auth-service/users"));
        assert!(matches("/auth-service/users/**", "/auth-service/users/42"));
        assert!(matches("/auth-service/users/**", "/auth-service/users/42/roles"));
        assert!(!matches("/auth-service/users/**", "/auth-service/usersx"));
        assert!(matches("/**", "/"));
        assert!(matches("/**", "/anything/at/all"));
    }

    #[test]
    fn double_star_in_the_middle() {
        assert!(matches("/*/v3/api-docs/**", "/auth-service/v3/api-docs"));
        assert!(matches("/a/**/z", "/a/z"));
        assert!(matches("/a/**/z", "/a/b/c/z"));
        assert!(!matches("/a/**/z", "/a/b/c"));
    }

    #[test]
    fn single_star_matches_one_segment() {
        assert!(matches("/*/actuator/health", "/payment-service/actuator/health"));
        assert!(!matches("/*/actuator/health", "/actuator/health"));
        assert!(!matches("/*/actuator/health", "/a/b/actuator/health"));
    }

    #[test]
    fn glob_segments() {
        assert!(matches("/docs/*.html", "/docs/index.html"));
        assert!(!matches("/docs/*.html", "/docs/index.json"));
        assert!(matches("/files/a*b*c", "/files/aXXbYYc"));
        assert!(!matches("/files/a*b*c", "/files/aXXbYY"));
    }

    #[test]
    fn variables_match_one_segment() {
        assert!(matches("/users/{id}", "/users/42"));
        assert!(!matches("/users/{id}", "/users/42/roles"));
    }

    #[test]
    fn invalid_patterns_are_rejected() {
        assert!(matches!(
            PathPattern::parse("users/**"),
            Err(PatternError::NotAbsolute(_))
        ));
        assert!(matches!(
            PathPattern::parse("/users/a**"),
            Err(PatternError::InvalidMultiWildcard(_))
        ));
        assert!(matches!(
            PathPattern::parse("/users/{id"),
            Err(PatternError::UnterminatedVariable(_))
        ));
        assert!(matches!(
            PathPattern::parse("/files/*[a"),
            Err(PatternError::InvalidGlob(..))
        ));
    }

    #[test]
    fn decode_path_handles_escapes() {
        assert_eq!(decode_path("/auth-service/%75sers").as_deref(), Some("/auth-service/users"));
        assert_eq!(decode_path("/plain").as_deref(), Some("/plain"));
        assert_eq!(decode_path("/bad%zzescape").as_deref(), Some("/bad%zzescape"));
        assert_eq!(decode_path("/trailing%2").as_deref(), Some("/trailing%2"));
        assert_eq!(decode_path("/invalid%ff"), None);
    }

    #[test]
    fn decode_path_refuses_dot_segments() {
        for raw in [
            "/auth-service/login/../users/42",
            "/auth-service/login/%2e%2e/users/42",
            "/auth-service/login/%2E%2E/users",
            "/auth-service/login%2F..%2Fusers",
            "/auth-service/login/..%5Cusers",
            "/auth-service/./users",
            "/auth-service/..",
        ] {
            assert_eq!(decode_path(raw), None, "{raw}");
        }
        assert_eq!(decode_path("/files/a..b/.hidden").as_deref(), Some("/files/a..b/.hidden"));
    }
}
