// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the CLI crate.

use std::time::Duration;

/// Control API base URL, base path included
pub const API_URL: &str = "FLEET_API_URL";
pub const API_KEY: &str = "MANAGER_API_KEY";
pub const HMAC_SECRET: &str = "MANAGER_HMAC_SECRET";
/// Recorded as the audit actor
pub const OPERATOR: &str = "FLEET_OPERATOR";
pub const REDIS_URL: &str = "REDIS_URL";

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:3001/api";

fn non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

pub fn api_url() -> String {
    non_empty(API_URL).unwrap_or_else(|| DEFAULT_API_URL.to_string())
}

pub fn api_key() -> Option<String> {
    non_empty(API_KEY)
}

pub fn hmac_secret() -> Option<String> {
    non_empty(HMAC_SECRET)
}

pub fn operator() -> Option<String> {
    non_empty(OPERATOR).or_else(|| non_empty("USER"))
}

pub fn redis_url() -> Option<String> {
    non_empty(REDIS_URL)
}

// --- Color ---

pub fn no_color() -> bool {
    std::env::var("NO_COLOR").is_ok_and(|v| v == "1")
}

pub fn force_color() -> bool {
    std::env::var("COLOR").is_ok_and(|v| v == "1")
}

// --- Timeouts ---

pub fn timeout_http() -> Duration {
    std::env::var("FLEET_TIMEOUT_HTTP_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(60))
}
