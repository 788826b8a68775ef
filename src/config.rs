// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read once from the environment at startup. Anything that
//! can change at runtime (rules, public paths) lives in the policy document
//! instead, see [`crate::auth::snapshot`].
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `GATEWAY_JWT_SECRET` | Shared HMAC secret, at least 32 bytes | Required |
//! | `GATEWAY_JWT_ALGORITHM` | `HS256`, `HS384` or `HS512` | `HS256` |
//! | `GATEWAY_AUTH_MODE` | `local` or `remote` verification | `local` |
//! | `GATEWAY_INTROSPECT_URL` | Identity service introspection endpoint | Required for `remote` |
//! | `GATEWAY_INTROSPECT_TIMEOUT_MS` | Introspection request timeout | `3000` |
//! | `GATEWAY_POLICY_FILE` | JSON policy document | Built-in rules |
//! | `GATEWAY_POLICY_RELOAD_SECS` | Policy file re-read interval, `0` disables | `0` |
//! | `GATEWAY_PUBLIC_PATH_MATCH` | `compat` or `strict` | `compat` |
//! | `GATEWAY_ROUTES` | `id=prefix=>upstream[,...]` | `auth-service=/auth-service=>http://localhost:8081/auth` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use jsonwebtoken::Algorithm;
use url::Url;

use crate::auth::claims::{KeyError, SigningKey};
use crate::auth::public_paths::PublicPathMatch;
pub use crate::auth::resolver::AuthMode;
use crate::proxy::{RouteError, RouteTable, DEFAULT_ROUTES};

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const JWT_SECRET_ENV: &str = "GATEWAY_JWT_SECRET";
pub const JWT_ALGORITHM_ENV: &str = "GATEWAY_JWT_ALGORITHM";
pub const AUTH_MODE_ENV: &str = "GATEWAY_AUTH_MODE";
pub const INTROSPECT_URL_ENV: &str = "GATEWAY_INTROSPECT_URL";
pub const INTROSPECT_TIMEOUT_ENV: &str = "GATEWAY_INTROSPECT_TIMEOUT_MS";
pub const POLICY_FILE_ENV: &str = "GATEWAY_POLICY_FILE";
pub const POLICY_RELOAD_ENV: &str = "GATEWAY_POLICY_RELOAD_SECS";
pub const PUBLIC_PATH_MATCH_ENV: &str = "GATEWAY_PUBLIC_PATH_MATCH";
pub const ROUTES_ENV: &str = "GATEWAY_ROUTES";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_INTROSPECT_TIMEOUT_MS: u64 = 3000;

/// Configuration errors. Any of these aborts startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("invalid {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
    #[error("invalid GATEWAY_JWT_SECRET: {0}")]
    Key(#[from] KeyError),
    #[error("invalid GATEWAY_ROUTES: {0}")]
    Routes(#[from] RouteError),
}

impl ConfigError {
    fn invalid(var: &'static str, reason: impl fmt::Display) -> Self {
        ConfigError::Invalid {
            var,
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            other => Err(format!("unknown log format {other:?}")),
        }
    }
}

/// Fully validated gateway configuration.
#[derive(Debug)]
pub struct GatewayConfig {
    pub bind: SocketAddr,
    pub signing_key: SigningKey,
    pub auth_mode: AuthMode,
    /// Set whenever `auth_mode` is `Remote`.
    pub introspect_url: Option<Url>,
    pub introspect_timeout: Duration,
    pub policy_file: Option<PathBuf>,
    /// `None` disables reloading.
    pub policy_reload_interval: Option<Duration>,
    pub public_path_match: PublicPathMatch,
    pub routes: RouteTable,
    pub log_format: LogFormat,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let host = var(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match var(PORT_ENV) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| ConfigError::invalid(PORT_ENV, e))?,
            None => DEFAULT_PORT,
        };
        let bind: SocketAddr = format!("{host}:{port}")
            .parse()
            .map_err(|e| ConfigError::invalid(HOST_ENV, e))?;

        let secret = var(JWT_SECRET_ENV).ok_or(ConfigError::Missing(JWT_SECRET_ENV))?;
        let algorithm = match var(JWT_ALGORITHM_ENV) {
            Some(raw) => Algorithm::from_str(raw.trim().to_uppercase().as_str())
                .map_err(|e| ConfigError::invalid(JWT_ALGORITHM_ENV, e))?,
            None => Algorithm::HS256,
        };
        let signing_key = SigningKey::from_secret(secret.as_bytes(), algorithm)?;

        let auth_mode = match var(AUTH_MODE_ENV) {
            Some(raw) => raw
                .parse::<AuthMode>()
                .map_err(|e| ConfigError::invalid(AUTH_MODE_ENV, e))?,
            None => AuthMode::default(),
        };

        let introspect_url = var(INTROSPECT_URL_ENV)
            .map(|raw| Url::parse(raw.trim()).map_err(|e| ConfigError::invalid(INTROSPECT_URL_ENV, e)))
            .transpose()?;
        if auth_mode == AuthMode::Remote && introspect_url.is_none() {
            return Err(ConfigError::Missing(INTROSPECT_URL_ENV));
        }

        let introspect_timeout = Duration::from_millis(parse_u64(
            &var,
            INTROSPECT_TIMEOUT_ENV,
            DEFAULT_INTROSPECT_TIMEOUT_MS,
        )?);
        if introspect_timeout.is_zero() {
            return Err(ConfigError::invalid(INTROSPECT_TIMEOUT_ENV, "must be positive"));
        }

        let policy_file = var(POLICY_FILE_ENV).map(PathBuf::from);
        let reload_secs = parse_u64(&var, POLICY_RELOAD_ENV, 0)?;
        let policy_reload_interval = (reload_secs > 0).then(|| Duration::from_secs(reload_secs));

        let public_path_match = match var(PUBLIC_PATH_MATCH_ENV) {
            Some(raw) => raw
                .parse::<PublicPathMatch>()
                .map_err(|e| ConfigError::invalid(PUBLIC_PATH_MATCH_ENV, e))?,
            None => PublicPathMatch::default(),
        };

        let routes = RouteTable::parse(var(ROUTES_ENV).as_deref().unwrap_or(DEFAULT_ROUTES))?;

        let log_format = match var(LOG_FORMAT_ENV) {
            Some(raw) => raw
                .parse::<LogFormat>()
                .map_err(|e| ConfigError::invalid(LOG_FORMAT_ENV, e))?,
            None => LogFormat::default(),
        };

        Ok(Self {
            bind,
            signing_key,
            auth_mode,
            introspect_url,
            introspect_timeout,
            policy_file,
            policy_reload_interval,
            public_path_match,
            routes,
            log_format,
        })
    }
}

fn parse_u64<F>(var: &F, name: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match var(name) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::invalid(name, e)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn config(vars: &[(&str, &str)]) -> Result<GatewayConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        GatewayConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_with_only_secret() {
        let config = config(&[(JWT_SECRET_ENV, SECRET)]).unwrap();
        assert_eq!(config.bind, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.signing_key.algorithm(), Algorithm::HS256);
        assert_eq!(config.auth_mode, AuthMode::Local);
        assert_eq!(config.introspect_timeout, Duration::from_millis(3000));
        assert!(config.policy_file.is_none());
        assert!(config.policy_reload_interval.is_none());
        assert_eq!(config.public_path_match, PublicPathMatch::Compat);
        assert_eq!(config.routes.len(), 1);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn secret_is_required() {
        assert!(matches!(
            config(&[]),
            Err(ConfigError::Missing(JWT_SECRET_ENV))
        ));
        assert!(matches!(
            config(&[(JWT_SECRET_ENV, "  ")]),
            Err(ConfigError::Missing(JWT_SECRET_ENV))
        ));
    }

    #[test]
    fn short_secret_is_rejected() {
        assert!(matches!(
            config(&[(JWT_SECRET_ENV, "short")]),
            Err(ConfigError::Key(KeyError::WeakSecret(5)))
        ));
    }

    #[test]
    fn asymmetric_algorithm_is_rejected() {
        assert!(matches!(
            config(&[(JWT_SECRET_ENV, SECRET), (JWT_ALGORITHM_ENV, "RS256")]),
            Err(ConfigError::Key(KeyError::UnsupportedAlgorithm(_)))
        ));
        let config = config(&[(JWT_SECRET_ENV, SECRET), (JWT_ALGORITHM_ENV, "hs512")]).unwrap();
        assert_eq!(config.signing_key.algorithm(), Algorithm::HS512);
    }

    #[test]
    fn remote_mode_requires_introspection_url() {
        assert!(matches!(
            config(&[(JWT_SECRET_ENV, SECRET), (AUTH_MODE_ENV, "remote")]),
            Err(ConfigError::Missing(INTROSPECT_URL_ENV))
        ));

        let config = config(&[
            (JWT_SECRET_ENV, SECRET),
            (AUTH_MODE_ENV, "remote"),
            (INTROSPECT_URL_ENV, "http://auth:8081/auth/introspect"),
            (INTROSPECT_TIMEOUT_ENV, "500"),
        ])
        .unwrap();
        assert_eq!(config.auth_mode, AuthMode::Remote);
        assert_eq!(
            config.introspect_url.unwrap().as_str(),
            "http://auth:8081/auth/introspect"
        );
        assert_eq!(config.introspect_timeout, Duration::from_millis(500));
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let err = config(&[(JWT_SECRET_ENV, SECRET), (PORT_ENV, "http")]).unwrap_err();
        assert!(err.to_string().contains(PORT_ENV));

        let err = config(&[(JWT_SECRET_ENV, SECRET), (AUTH_MODE_ENV, "ldap")]).unwrap_err();
        assert!(err.to_string().contains(AUTH_MODE_ENV));

        let err = config(&[(JWT_SECRET_ENV, SECRET), (INTROSPECT_TIMEOUT_ENV, "0")]).unwrap_err();
        assert!(err.to_string().contains(INTROSPECT_TIMEOUT_ENV));
    }

    #[test]
    fn policy_reload_and_match_mode() {
        let config = config(&[
            (JWT_SECRET_ENV, SECRET),
            (POLICY_FILE_ENV, "/etc/gateway/policy.json"),
            (POLICY_RELOAD_ENV, "15"),
            (PUBLIC_PATH_MATCH_ENV, "strict"),
            (LOG_FORMAT_ENV, "json"),
        ])
        .unwrap();
        assert_eq!(
            config.policy_file.as_deref(),
            Some(std::path::Path::new("/etc/gateway/policy.json"))
        );
        assert_eq!(config.policy_reload_interval, Some(Duration::from_secs(15)));
        assert_eq!(config.public_path_match, PublicPathMatch::Strict);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn auth_mode_round_trips_through_display() {
        for mode in [AuthMode::Local, AuthMode::Remote] {
            assert_eq!(mode.to_string().parse::<AuthMode>().unwrap(), mode);
        }
    }
}
