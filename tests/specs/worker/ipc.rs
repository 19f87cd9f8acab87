//! `fleet-worker` speaking the line protocol over stdio

use crate::prelude::*;

fn tenant_worker() -> CliBuilder {
    worker()
        .env("FLEET_TENANT_ID", "t1")
        .env("DISCORD_TOKEN", "tok")
}

#[test]
fn reports_ready_then_answers_health_and_shuts_down() {
    let run = tenant_worker()
        .stdin("{\"type\":\"health_request\"}\n{\"type\":\"shutdown\"}\n")
        .passes();
    let frames = run.json_lines();
    assert_eq!(frames.len(), 2, "stdout: {}", run.stdout());
    assert_eq!(frames[0]["type"], "ready");
    assert_eq!(frames[0]["data"]["guilds"], 0);
    assert_eq!(frames[1]["type"], "health");
    assert!(frames[1]["data"]["uptime"].as_u64().is_some());
    assert!(frames[1]["data"]["memory"].as_u64().is_some());
}

#[test]
fn exits_cleanly_when_stdin_closes() {
    let run = tenant_worker().stdin("").passes();
    let frames = run.json_lines();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["type"], "ready");
}

#[test]
fn ignores_unknown_frames() {
    let run = tenant_worker()
        .stdin("not json\n{\"type\":\"dance\"}\n{\"type\":\"shutdown\"}\n")
        .passes();
    assert_eq!(run.json_lines().len(), 1);
}

#[test]
fn missing_tenant_id_fails() {
    worker()
        .env("DISCORD_TOKEN", "tok")
        .fails()
        .stderr_has("FLEET_TENANT_ID is not set");
}

#[test]
fn missing_token_fails() {
    worker()
        .env("FLEET_TENANT_ID", "t1")
        .fails()
        .stderr_has("DISCORD_TOKEN is not set");
}
