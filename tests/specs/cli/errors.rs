//! `fleet` failure paths that never reach a manager

use crate::prelude::*;

#[test]
fn bots_list_without_api_key_fails() {
    fleet()
        .args(&["bots", "list"])
        .fails()
        .stderr_has("MANAGER_API_KEY is not set");
}

#[test]
fn bots_list_without_hmac_secret_fails() {
    fleet()
        .env("MANAGER_API_KEY", API_KEY)
        .args(&["bots", "list"])
        .fails()
        .stderr_has("MANAGER_HMAC_SECRET is not set");
}

#[test]
fn unreachable_manager_reports_request_failure() {
    let port = free_port();
    fleet()
        .env("FLEET_API_URL", format!("http://127.0.0.1:{port}/api"))
        .env("MANAGER_API_KEY", API_KEY)
        .env("MANAGER_HMAC_SECRET", HMAC_SECRET)
        .args(&["bots", "status", "t1"])
        .fails()
        .stderr_has("request failed");
}

#[test]
fn config_publish_without_broker_fails() {
    fleet()
        .args(&["config", "publish", "welcome", "123", "update"])
        .fails()
        .stderr_has("no broker configured");
}

#[test]
fn config_publish_rejects_unknown_module() {
    fleet()
        .env("REDIS_URL", "redis://127.0.0.1:1")
        .args(&["config", "publish", "nonsense", "123", "update"])
        .fails()
        .stderr_has("nonsense");
}

#[test]
fn unknown_subcommand_fails() {
    fleet().args(&["frobnicate"]).fails();
}
