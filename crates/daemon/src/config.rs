// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Manager configuration.
//!
//! Layers, lowest precedence first: built-in defaults, the optional TOML
//! file (`$FLEET_CONFIG` or `<state_dir>/fleetd.toml`), then environment
//! variables. Secrets are only read from the environment.

use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fleet_core::VaultKey;
use fleet_engine::{BackoffPolicy, SupervisorConfig};
use serde::Deserialize;
use thiserror::Error;

use crate::env;

const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:3001";
const DEFAULT_BASE_PATH: &str = "/api";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required secret {0}")]
    MissingSecret(&'static str),

    #[error("invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("failed to parse {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Values accepted from `fleetd.toml`. Every key is optional.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub listen_addr: Option<String>,
    pub base_path: Option<String>,
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub client_id: Option<String>,
    pub cors_origins: Option<Vec<String>>,
    pub worker_bin: Option<PathBuf>,
    pub error_ceiling: Option<u32>,
    pub ready_timeout_ms: Option<u64>,
    pub shutdown_grace_ms: Option<u64>,
    pub health_timeout_ms: Option<u64>,
    pub health_interval_ms: Option<u64>,
    pub rate_limit: Option<u32>,
    pub rate_window_ms: Option<u64>,
    pub rate_limit_total: Option<u32>,
}

impl FileConfig {
    /// Parse a config file; a missing file yields the empty layer.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        toml::from_str(&text).map_err(|source| ConfigError::File {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Shared secrets. Debug output is redacted.
#[derive(Clone)]
pub struct Secrets {
    pub api_key: String,
    pub hmac_secret: String,
    pub encryption_key: VaultKey,
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("api_key", &"<redacted>")
            .field("hmac_secret", &"<redacted>")
            .field("encryption_key", &"<redacted>")
            .finish()
    }
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/fleet)
    pub state_dir: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Path to the tenant snapshot
    pub snapshot_path: PathBuf,
    pub listen_addr: SocketAddr,
    /// Control API prefix, e.g. `/api`
    pub base_path: String,
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub default_client_id: Option<String>,
    pub cors_origins: Vec<String>,
    pub worker_bin: PathBuf,
    pub error_ceiling: u32,
    pub ready_timeout: Duration,
    pub shutdown_grace: Duration,
    pub health_timeout: Duration,
    pub health_interval: Duration,
    /// Mutations allowed per operator per window
    pub rate_limit: u32,
    pub rate_window: Duration,
    /// Mutations allowed across all operators per window
    pub rate_limit_total: u32,
    pub secrets: Secrets,
}

impl Config {
    /// Load configuration from the process environment and config file.
    pub fn load() -> Result<Self, crate::lifecycle::LifecycleError> {
        let state_dir = env::state_dir()?;
        let file_path = env::config_file().unwrap_or_else(|| state_dir.join("fleetd.toml"));
        let file = FileConfig::load(&file_path)?;
        Ok(Self::resolve(state_dir, file, env::var)?)
    }

    /// Merge defaults, the file layer and an environment lookup.
    pub fn resolve(
        state_dir: PathBuf,
        file: FileConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let secrets = Secrets {
            api_key: lookup(env::API_KEY).ok_or(ConfigError::MissingSecret(env::API_KEY))?,
            hmac_secret: lookup(env::HMAC_SECRET)
                .ok_or(ConfigError::MissingSecret(env::HMAC_SECRET))?,
            encryption_key: {
                let hex = lookup(env::ENCRYPTION_KEY)
                    .ok_or(ConfigError::MissingSecret(env::ENCRYPTION_KEY))?;
                VaultKey::from_hex(hex.trim()).map_err(|e| ConfigError::Invalid {
                    name: env::ENCRYPTION_KEY,
                    reason: e.to_string(),
                })?
            },
        };

        let listen_addr = lookup(env::LISTEN_ADDR)
            .or(file.listen_addr)
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr = listen_addr
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                name: env::LISTEN_ADDR,
                reason: format!("{listen_addr}: {e}"),
            })?;

        let base_path = normalize_base_path(
            &lookup(env::BASE_PATH)
                .or(file.base_path)
                .unwrap_or_else(|| DEFAULT_BASE_PATH.to_string()),
        );

        let cors_origins = match lookup(env::CORS_ORIGINS) {
            Some(list) => split_list(&list),
            None => file.cors_origins.unwrap_or_default(),
        };

        let ms = |name: &'static str, from_file: Option<u64>, default: u64| {
            number(&lookup, name, from_file, default).map(Duration::from_millis)
        };

        Ok(Self {
            lock_path: state_dir.join("fleetd.pid"),
            log_path: state_dir.join("fleetd.log"),
            snapshot_path: state_dir.join("tenants.json"),
            state_dir,
            listen_addr,
            base_path,
            database_url: lookup(env::DATABASE_URL).or(file.database_url),
            redis_url: lookup(env::REDIS_URL).or(file.redis_url),
            default_client_id: lookup(env::CLIENT_ID).or(file.client_id),
            cors_origins,
            worker_bin: lookup(env::WORKER_BIN)
                .map(PathBuf::from)
                .or(file.worker_bin)
                .unwrap_or_else(|| PathBuf::from("fleet-worker")),
            error_ceiling: number(&lookup, env::ERROR_CEILING, file.error_ceiling, 5)?,
            ready_timeout: ms(env::READY_TIMEOUT_MS, file.ready_timeout_ms, 30_000)?,
            shutdown_grace: ms(env::SHUTDOWN_GRACE_MS, file.shutdown_grace_ms, 10_000)?,
            health_timeout: ms(env::HEALTH_TIMEOUT_MS, file.health_timeout_ms, 5_000)?,
            health_interval: ms(env::HEALTH_INTERVAL_MS, file.health_interval_ms, 30_000)?,
            rate_limit: number(&lookup, env::RATE_LIMIT, file.rate_limit, 10)?,
            rate_window: ms(env::RATE_WINDOW_MS, file.rate_window_ms, 60_000)?,
            rate_limit_total: number(&lookup, env::RATE_LIMIT_TOTAL, file.rate_limit_total, 30)?,
            secrets,
        })
    }

    pub fn supervisor_config(&self) -> SupervisorConfig {
        SupervisorConfig {
            worker_program: self.worker_bin.clone(),
            worker_args: Vec::new(),
            error_ceiling: self.error_ceiling,
            ready_timeout: self.ready_timeout,
            shutdown_grace: self.shutdown_grace,
            health_timeout: self.health_timeout,
            backoff: BackoffPolicy::default(),
            default_client_id: self.default_client_id.clone(),
            redis_url: self.redis_url.clone(),
        }
    }
}

fn number<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    from_file: Option<T>,
    default: T,
) -> Result<T, ConfigError>
where
    T::Err: fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: format!("{raw}: {e}"),
        }),
        None => Ok(from_file.unwrap_or(default)),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// `api/` and `/api/` both become `/api`; an empty path stays empty.
fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
