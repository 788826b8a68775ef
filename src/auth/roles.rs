// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Roles referenced by authorization rules.
//!
//! The identity service encodes roles as `ROLE_`-prefixed authorities in the
//! `scope` claim (e.g. `"ROLE_USER ROLE_ADMIN"`). A rule written as
//! `role:ADMIN` is granted by the authority `ROLE_ADMIN`.

use std::collections::BTreeSet;
use std::fmt;

/// Authority prefix that marks a role.
pub const ROLE_PREFIX: &str = "ROLE_";

/// A named role, stored without its `ROLE_` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Role(String);

impl Role {
    /// Parse a role name, accepting both `ADMIN` and `ROLE_ADMIN`.
    ///
    /// Returns `None` for an empty name.
    pub fn new(name: &str) -> Option<Role> {
        let bare = name.trim();
        let bare = bare.strip_prefix(ROLE_PREFIX).unwrap_or(bare);
        if bare.is_empty() {
            None
        } else {
            Some(Role(bare.to_string()))
        }
    }

    /// Bare role name, e.g. `ADMIN`.
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Authority string that grants this role, e.g. `ROLE_ADMIN`.
    pub fn authority(&self) -> String {
        format!("{ROLE_PREFIX}{}", self.0)
    }

    /// Check whether an authority set grants this role (case-sensitive).
    pub fn is_granted_by(&self, authorities: &BTreeSet<String>) -> bool {
        authorities.contains(&self.authority())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authorities(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn new_strips_prefix() {
        assert_eq!(Role::new("ADMIN"), Role::new("ROLE_ADMIN"));
        assert_eq!(Role::new("ROLE_ADMIN").unwrap().name(), "ADMIN");
    }

    #[test]
    fn new_rejects_empty() {
        assert_eq!(Role::new(""), None);
        assert_eq!(Role::new("ROLE_"), None);
        assert_eq!(Role::new("   "), None);
    }

    #[test]
    fn granted_by_prefixed_authority() {
        let admin = Role::new("ADMIN").unwrap();
        assert!(admin.is_granted_by(&authorities(&["ROLE_USER", "ROLE_ADMIN"])));
        assert!(!admin.is_granted_by(&authorities(&["ROLE_USER"])));
    }

    #[test]
    fn bare_authority_does_not_grant_role() {
        let admin = Role::new("ADMIN").unwrap();
        assert!(!admin.is_granted_by(&authorities(&["ADMIN"])));
    }

    #[test]
    fn comparison_is_case_sensitive() {
        let admin = Role::new("ADMIN").unwrap();
        assert!(!admin.is_granted_by(&authorities(&["ROLE_admin"])));
    }

    #[test]
    fn display_is_bare_name() {
        assert_eq!(Role::new("ROLE_ADMIN").unwrap().to_string(), "ADMIN");
    }
}
