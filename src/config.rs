// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! once at startup into [`AppConfig`].
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Directory holding the embedded database | `./data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `SECRET_KEY` | Bearer token signing secret | Random per process |
//! | `TOKEN_TTL_SECS` | Bearer token lifetime in seconds | `3600` |
//! | `FTS_BASE_URL` | Federal Tax Service API endpoint | `https://proverkacheka.nalog.ru:9999` |
//! | `FTS_TIMEOUT_SECS` | Timeout of a single upstream call | `15` |
//! | `TLS_CERT_PATH` | PEM certificate chain (enables HTTPS) | Optional |
//! | `TLS_KEY_PATH` | PEM private key (enables HTTPS) | Optional |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::path::PathBuf;
use std::time::Duration;

pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const SECRET_KEY_ENV: &str = "SECRET_KEY";
pub const TOKEN_TTL_ENV: &str = "TOKEN_TTL_SECS";
pub const FTS_BASE_URL_ENV: &str = "FTS_BASE_URL";
pub const FTS_TIMEOUT_ENV: &str = "FTS_TIMEOUT_SECS";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 3600;
pub const DEFAULT_FTS_BASE_URL: &str = "https://proverkacheka.nalog.ru:9999";
pub const DEFAULT_FTS_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// File name of the embedded database inside `DATA_DIR`.
pub const DATABASE_FILE: &str = "receipt-analyzer.redb";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },

    #[error("{0} and {1} must be set together")]
    Incomplete(&'static str, &'static str),
}

/// TLS certificate and key locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Fully resolved process configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub secret_key: String,
    /// `secret_key` was generated because none was configured.
    pub ephemeral_secret: bool,
    pub token_ttl: Duration,
    pub fts_base_url: String,
    pub fts_timeout: Duration,
    pub tls: Option<TlsPaths>,
    pub json_logs: bool,
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    ///
    /// Empty or whitespace-only values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let port = match get(PORT_ENV) {
            Some(raw) => parse_number(PORT_ENV, &raw)?,
            None => DEFAULT_PORT,
        };
        let token_ttl_secs: u64 = match get(TOKEN_TTL_ENV) {
            Some(raw) => parse_number(TOKEN_TTL_ENV, &raw)?,
            None => DEFAULT_TOKEN_TTL_SECS,
        };
        if token_ttl_secs == 0 {
            return Err(ConfigError::Invalid {
                name: TOKEN_TTL_ENV,
                value: "0".to_string(),
            });
        }
        let fts_timeout_secs: u64 = match get(FTS_TIMEOUT_ENV) {
            Some(raw) => parse_number(FTS_TIMEOUT_ENV, &raw)?,
            None => DEFAULT_FTS_TIMEOUT_SECS,
        };

        let fts_base_url = get(FTS_BASE_URL_ENV).unwrap_or_else(|| DEFAULT_FTS_BASE_URL.to_string());
        if url::Url::parse(&fts_base_url).is_err() {
            return Err(ConfigError::Invalid {
                name: FTS_BASE_URL_ENV,
                value: fts_base_url,
            });
        }

        let tls = match (get(TLS_CERT_PATH_ENV), get(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: PathBuf::from(cert),
                key: PathBuf::from(key),
            }),
            (None, None) => None,
            _ => return Err(ConfigError::Incomplete(TLS_CERT_PATH_ENV, TLS_KEY_PATH_ENV)),
        };

        let (secret_key, ephemeral_secret) = match get(SECRET_KEY_ENV) {
            Some(secret) => (secret, false),
            None => (random_secret(), true),
        };

        Ok(Self {
            host: get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            data_dir: PathBuf::from(get(DATA_DIR_ENV).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())),
            secret_key,
            ephemeral_secret,
            token_ttl: Duration::from_secs(token_ttl_secs),
            fts_base_url,
            fts_timeout: Duration::from_secs(fts_timeout_secs),
            tls,
            json_logs: get(LOG_FORMAT_ENV).is_some_and(|f| f.eq_ignore_ascii_case("json")),
        })
    }

    /// Path of the redb database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }
}

fn parse_number<T: std::str::FromStr>(name: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.parse().map_err(|_| ConfigError::Invalid {
        name,
        value: raw.to_string(),
    })
}

fn random_secret() -> String {
    format!(
        "{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    )
}
