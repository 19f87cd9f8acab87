// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;

use crate::lifecycle::LifecycleError;

pub const STATE_DIR: &str = "FLEET_STATE_DIR";
pub const CONFIG_FILE: &str = "FLEET_CONFIG";
pub const LISTEN_ADDR: &str = "FLEET_LISTEN_ADDR";
pub const BASE_PATH: &str = "FLEET_BASE_PATH";
pub const DATABASE_URL: &str = "DATABASE_URL";
pub const REDIS_URL: &str = "REDIS_URL";
pub const API_KEY: &str = "MANAGER_API_KEY";
pub const HMAC_SECRET: &str = "MANAGER_HMAC_SECRET";
pub const ENCRYPTION_KEY: &str = "ENCRYPTION_KEY";
pub const CLIENT_ID: &str = "DISCORD_CLIENT_ID";
pub const CORS_ORIGINS: &str = "CORS_ORIGINS";
pub const ERROR_CEILING: &str = "FLEET_ERROR_CEILING";
pub const WORKER_BIN: &str = "FLEET_WORKER_BIN";
pub const READY_TIMEOUT_MS: &str = "FLEET_READY_TIMEOUT_MS";
pub const SHUTDOWN_GRACE_MS: &str = "FLEET_SHUTDOWN_GRACE_MS";
pub const HEALTH_TIMEOUT_MS: &str = "FLEET_HEALTH_TIMEOUT_MS";
pub const HEALTH_INTERVAL_MS: &str = "FLEET_HEALTH_INTERVAL_MS";
pub const RATE_LIMIT: &str = "FLEET_RATE_LIMIT";
pub const RATE_WINDOW_MS: &str = "FLEET_RATE_WINDOW_MS";
pub const RATE_LIMIT_TOTAL: &str = "FLEET_RATE_LIMIT_TOTAL";

/// Read a variable, treating an empty value as unset
pub fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Resolve state directory: FLEET_STATE_DIR > XDG_STATE_HOME/fleet > ~/.local/state/fleet
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Some(dir) = var(STATE_DIR) {
        return Ok(PathBuf::from(dir));
    }
    if let Some(xdg) = var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("fleet"));
    }
    let home = var("HOME").ok_or(LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/fleet"))
}

/// Explicit config file override
pub fn config_file() -> Option<PathBuf> {
    var(CONFIG_FILE).map(PathBuf::from)
}
