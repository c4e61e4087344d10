// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Settings are loaded from the environment at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `IDP_JWKS_URL` | Identity provider key set endpoint | Required |
//! | `IDP_FETCH_TIMEOUT_SECS` | Key set fetch timeout | `10` |
//! | `IDP_JWKS_FRESHNESS_SECS` | Snapshot freshness window (`0` disables) | `300` |
//! | `IDP_JWKS_MISS_COOLDOWN_SECS` | Minimum snapshot age before an unknown `kid` refetches (`0` disables) | unset |
//! | `IDP_ALLOWED_ALGORITHMS` | Comma separated RSA algorithm allow-list | `RS256` |
//! | `IDP_ISSUER` | Expected JWT issuer claim | Optional |
//! | `IDP_AUDIENCE` | Expected JWT audience claim | Optional |
//! | `IDP_USERNAME_CLAIM` | Claim carrying the username | `preferred_username` |
//! | `IDP_CLOCK_SKEW_SECS` | Leeway for `exp`/`nbf` | `0` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use jsonwebtoken::Algorithm;
use url::{Host, Url};

use crate::auth::jwks::{DEFAULT_FETCH_TIMEOUT, DEFAULT_FRESHNESS};
use crate::auth::key_material::is_supported_algorithm;
use crate::auth::verifier::DEFAULT_USERNAME_CLAIM;
use crate::auth::{KeyDirectorySettings, VerifierSettings};

pub const JWKS_URL_ENV: &str = "IDP_JWKS_URL";
pub const FETCH_TIMEOUT_ENV: &str = "IDP_FETCH_TIMEOUT_SECS";
pub const FRESHNESS_ENV: &str = "IDP_JWKS_FRESHNESS_SECS";
pub const MISS_COOLDOWN_ENV: &str = "IDP_JWKS_MISS_COOLDOWN_SECS";
pub const ALLOWED_ALGORITHMS_ENV: &str = "IDP_ALLOWED_ALGORITHMS";
pub const ISSUER_ENV: &str = "IDP_ISSUER";
pub const AUDIENCE_ENV: &str = "IDP_AUDIENCE";
pub const USERNAME_CLAIM_ENV: &str = "IDP_USERNAME_CLAIM";
pub const CLOCK_SKEW_ENV: &str = "IDP_CLOCK_SKEW_SECS";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

fn invalid(name: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        name,
        reason: reason.into(),
    }
}

/// Everything the key directory and token verifier need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSettings {
    pub jwks_url: Url,
    pub directory: KeyDirectorySettings,
    pub verifier: VerifierSettings,
}

impl AuthSettings {
    /// Load from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using `lookup` to read each variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let jwks_url = var(JWKS_URL_ENV).ok_or(ConfigError::Missing(JWKS_URL_ENV))?;
        let jwks_url = parse_jwks_url(&jwks_url)?;

        let fetch_timeout = match var(FETCH_TIMEOUT_ENV) {
            Some(value) => match parse_secs(FETCH_TIMEOUT_ENV, &value)? {
                Some(timeout) => timeout,
                None => return Err(invalid(FETCH_TIMEOUT_ENV, "must be greater than zero")),
            },
            None => DEFAULT_FETCH_TIMEOUT,
        };
        let freshness = match var(FRESHNESS_ENV) {
            Some(value) => parse_secs(FRESHNESS_ENV, &value)?,
            None => Some(DEFAULT_FRESHNESS),
        };
        let miss_cooldown = match var(MISS_COOLDOWN_ENV) {
            Some(value) => parse_secs(MISS_COOLDOWN_ENV, &value)?,
            None => None,
        };

        let allowed_algorithms = match var(ALLOWED_ALGORITHMS_ENV) {
            Some(value) => parse_algorithms(&value)?,
            None => vec![Algorithm::RS256],
        };
        let leeway = match var(CLOCK_SKEW_ENV) {
            Some(value) => value
                .parse::<u64>()
                .map_err(|e| invalid(CLOCK_SKEW_ENV, e.to_string()))?,
            None => 0,
        };

        Ok(Self {
            jwks_url,
            directory: KeyDirectorySettings {
                fetch_timeout,
                freshness,
                miss_cooldown,
            },
            verifier: VerifierSettings {
                allowed_algorithms,
                issuer: var(ISSUER_ENV),
                audience: var(AUDIENCE_ENV),
                username_claim: var(USERNAME_CLAIM_ENV)
                    .unwrap_or_else(|| DEFAULT_USERNAME_CLAIM.to_string()),
                leeway,
            },
        })
    }
}

/// Key set URLs must be HTTPS; plain HTTP is allowed for loopback only.
fn parse_jwks_url(value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value).map_err(|e| invalid(JWKS_URL_ENV, e.to_string()))?;
    let loopback = match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    };
    match url.scheme() {
        "https" => Ok(url),
        "http" if loopback => Ok(url),
        scheme => Err(invalid(JWKS_URL_ENV, format!("scheme '{scheme}' is not allowed"))),
    }
}

/// Whole seconds; `0` means "disabled".
fn parse_secs(name: &'static str, value: &str) -> Result<Option<Duration>, ConfigError> {
    let secs = value.parse::<u64>().map_err(|e| invalid(name, e.to_string()))?;
    Ok((secs > 0).then(|| Duration::from_secs(secs)))
}

fn parse_algorithms(value: &str) -> Result<Vec<Algorithm>, ConfigError> {
    let mut algorithms = Vec::new();
    for name in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let alg = Algorithm::from_str(name)
            .ok()
            .filter(|alg| is_supported_algorithm(*alg))
            .ok_or_else(|| invalid(ALLOWED_ALGORITHMS_ENV, format!("'{name}' is not an RSA PKCS#1 algorithm")))?;
        if !algorithms.contains(&alg) {
            algorithms.push(alg);
        }
    }
    if algorithms.is_empty() {
        return Err(invalid(ALLOWED_ALGORITHMS_ENV, "no algorithms listed"));
    }
    Ok(algorithms)
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// HTTP listener and logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub log_format: LogFormat,
}

impl ServerSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup(HOST_ENV).unwrap_or_else(|| "0.0.0.0".to_string());
        let host: IpAddr = host.parse().map_err(|_| invalid(HOST_ENV, format!("'{host}' is not an IP address")))?;
        let port: u16 = match lookup(PORT_ENV) {
            Some(port) => port.parse().map_err(|_| invalid(PORT_ENV, format!("'{port}' is not a port")))?,
            None => 8080,
        };
        let log_format = match lookup(LOG_FORMAT_ENV).as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => return Err(invalid(LOG_FORMAT_ENV, format!("unknown format '{other}'"))),
        };

        Ok(Self {
            addr: SocketAddr::new(host, port),
            log_format,
        })
    }
}
