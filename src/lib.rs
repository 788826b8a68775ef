// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational Edge Gateway
//!
//! Single entry point in front of the platform's services. Every request is
//! authenticated and authorized at the edge before it is forwarded, and the
//! verified identity travels downstream in `X-User-Id`.
//!
//! ## Modules
//!
//! - `auth` - Credential verification, authorization rules, filter pipeline
//! - `proxy` - Static prefix routing to upstream services
//! - `api` - HTTP router (health, proxied fallback)
//! - `policy_reloader` - Background policy file reload
//! - `config` - Environment configuration

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod observability;
pub mod policy_reloader;
pub mod proxy;
pub mod state;
