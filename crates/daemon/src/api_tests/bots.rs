// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use fleet_adapters::FakeWorkerScript;
use serde_json::json;

#[tokio::test]
async fn register_returns_view_without_credential() {
    let api = setup();

    let reply = api.register("t1").await;

    assert_eq!(reply.status, StatusCode::OK);
    let data = &reply.body["data"];
    assert_eq!(data["tenantId"], "t1");
    assert_eq!(data["status"], "PENDING");
    assert_eq!(data["isRunning"], false);
    let raw = reply.body.to_string();
    assert!(!raw.contains("encryptedCredential"));
    assert!(!raw.contains("token-t1"));
}

#[tokio::test]
async fn register_keeps_client_id() {
    let api = setup();
    let reply = api
        .call(
            "POST",
            "/api/bots",
            Some(json!({ "tenantId": "t1", "token": "tok", "clientId": "app-42" })),
        )
        .await;
    assert_eq!(reply.body["data"]["clientId"], "app-42");
}

#[tokio::test]
async fn register_rejects_bad_input() {
    let api = setup();
    for body in [
        json!({ "tenantId": "t1" }),
        json!({ "tenantId": "t1", "token": "  " }),
        json!({ "tenantId": "", "token": "tok" }),
        json!({ "tenantId": "--", "token": "tok" }),
    ] {
        let reply = api.call("POST", "/api/bots", Some(body.clone())).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(reply.body["success"], false);
    }
    assert!(api.supervisor.store().list().is_empty());
}

#[tokio::test]
async fn register_rejects_malformed_json() {
    let api = setup();
    let mut request = api.signed("POST", "/api/bots", None);
    *request.body_mut() = Body::from("{not json");
    let reply = api.send(request).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_shows_registered_tenants_stopped() {
    let api = setup();
    api.register("t1").await;
    api.register("t2").await;

    let reply = api.call("GET", "/api/bots", None).await;

    let bots = reply.body["data"].as_array().unwrap();
    assert_eq!(bots.len(), 2);
    assert!(bots.iter().all(|b| b["phase"] == "STOPPED"));
}

#[tokio::test]
async fn start_then_start_again_is_noop() {
    let api = setup();
    api.register("t1").await;

    let first = api.call("POST", "/api/bots/t1/start", None).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body["data"]["alreadyRunning"], false);
    let pid = first.body["data"]["pid"].as_u64().unwrap();

    let second = api.call("POST", "/api/bots/t1/start", None).await;
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(second.body["data"]["alreadyRunning"], true);
    assert_eq!(second.body["data"]["pid"].as_u64(), Some(pid));
    assert_eq!(api.adapter.spawn_count("t1"), 1);
}

#[tokio::test]
async fn status_reports_running_worker() {
    let api = setup();
    api.register("t1").await;
    api.call("POST", "/api/bots/t1/start", None).await;

    let reply = api.call("GET", "/api/bots/t1/status", None).await;

    let data = &reply.body["data"];
    assert_eq!(data["status"], "ACTIVE");
    assert_eq!(data["phase"], "RUNNING");
    assert_eq!(data["isRunning"], true);
    assert_eq!(data["guilds"], 3);
}

#[tokio::test]
async fn status_of_unknown_tenant_is_not_found() {
    let api = setup();
    let reply = api.call("GET", "/api/bots/ghost/status", None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body["success"], false);
}

#[tokio::test]
async fn start_of_unknown_tenant_is_not_found() {
    let api = setup();
    let reply = api.call("POST", "/api/bots/ghost/start", None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stop_of_stopped_tenant_is_bad_request() {
    let api = setup();
    api.register("t1").await;
    let reply = api.call("POST", "/api/bots/t1/stop", None).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.body["error"].as_str().unwrap().contains("not running"));
}

#[tokio::test]
async fn stop_reports_graceful_exit() {
    let api = setup();
    api.register("t1").await;
    api.call("POST", "/api/bots/t1/start", None).await;

    let reply = api.call("POST", "/api/bots/t1/stop", None).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["data"]["forced"], false);
    let status = api.call("GET", "/api/bots/t1/status", None).await;
    assert_eq!(status.body["data"]["phase"], "STOPPED");
    assert_eq!(status.body["data"]["isRunning"], false);
    assert!(status.body["data"]["processId"].is_null());
}

#[tokio::test]
async fn error_ceiling_blocks_start_until_reset() {
    let config = SupervisorConfig {
        error_ceiling: 1,
        ..fast_config()
    };
    let api = setup_with(100, config);
    api.register("t1").await;
    api.adapter.push_script("t1", FakeWorkerScript::silent());

    let failed = api.call("POST", "/api/bots/t1/start", None).await;
    assert_eq!(failed.status, StatusCode::INTERNAL_SERVER_ERROR);

    let blocked = api.call("POST", "/api/bots/t1/start", None).await;
    assert_eq!(blocked.status, StatusCode::BAD_REQUEST);
    assert_eq!(api.adapter.spawn_count("t1"), 1);

    let reset = api.call("POST", "/api/bots/t1/reset-errors", None).await;
    assert_eq!(reset.status, StatusCode::OK);
    assert_eq!(reset.body["data"]["errorCount"], 0);

    let started = api.call("POST", "/api/bots/t1/start", None).await;
    assert_eq!(started.status, StatusCode::OK);
    assert_eq!(started.body["data"]["alreadyRunning"], false);
}

#[tokio::test]
async fn audit_records_operator_header() {
    let api = setup();
    api.register("t1").await;
    api.call("POST", "/api/bots/t1/restart", None).await;

    let reply = api.call("GET", "/api/bots/t1/audit", None).await;

    let entries = reply.body["data"].as_array().unwrap();
    let actions: Vec<&str> = entries
        .iter()
        .map(|e| e["action"].as_str().unwrap())
        .collect();
    assert_eq!(actions, ["TENANT_REGISTERED", "TENANT_STARTED"]);
    assert!(entries.iter().all(|e| e["userId"] == "alice"));
    assert!(entries.iter().all(|e| e["tenantId"] == "t1"));
}

#[tokio::test]
async fn restart_of_running_tenant_audits_stop_then_start() {
    let api = setup();
    api.register("t1").await;
    api.call("POST", "/api/bots/t1/start", None).await;

    let reply = api.call("POST", "/api/bots/t1/restart", None).await;
    assert_eq!(reply.status, StatusCode::OK);

    let audit = api.call("GET", "/api/bots/t1/audit", None).await;
    let actions: Vec<&str> = audit.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["action"].as_str().unwrap())
        .collect();
    assert_eq!(
        actions,
        [
            "TENANT_REGISTERED",
            "TENANT_STARTED",
            "TENANT_STOPPED",
            "TENANT_STARTED"
        ]
    );
    assert_eq!(api.adapter.spawn_count("t1"), 2);
}

#[tokio::test]
async fn operator_defaults_when_header_absent() {
    let api = setup();
    let mut request = api.signed(
        "POST",
        "/api/bots",
        Some(json!({ "tenantId": "t1", "token": "tok" })),
    );
    request.headers_mut().remove(OPERATOR_HEADER);
    api.send(request).await;

    let audit = api.call("GET", "/api/bots/t1/audit", None).await;
    assert_eq!(audit.body["data"][0]["userId"], "api");
}

#[tokio::test]
async fn mutations_are_rate_limited_per_operator() {
    let api = setup_with(2, fast_config());
    api.register("t1").await;

    assert_eq!(
        api.call("POST", "/api/bots/t1/start", None).await.status,
        StatusCode::OK
    );
    assert_eq!(
        api.call("POST", "/api/bots/t1/stop", None).await.status,
        StatusCode::OK
    );
    let limited = api.call("POST", "/api/bots/t1/restart", None).await;

    assert_eq!(limited.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(limited.headers[axum::http::header::RETRY_AFTER], "60");
    assert_eq!(api.adapter.spawn_count("t1"), 1);

    // Reads are not limited
    let status = api.call("GET", "/api/bots/t1/status", None).await;
    assert_eq!(status.status, StatusCode::OK);
}

#[tokio::test]
async fn changing_operator_header_does_not_escape_total_limit() {
    let api = setup_with_limiter(
        RateLimiter::new(1, Duration::from_secs(60)).with_total(2),
        fast_config(),
    );
    api.register("t1").await;

    let mut statuses = Vec::new();
    for (operator, action) in [("alice", "start"), ("bob", "stop"), ("carol", "start")] {
        let mut request = api.signed("POST", &format!("/api/bots/t1/{action}"), None);
        request
            .headers_mut()
            .insert(OPERATOR_HEADER, operator.parse().unwrap());
        statuses.push(api.send(request).await.status);
    }

    assert_eq!(
        statuses,
        vec![StatusCode::OK, StatusCode::OK, StatusCode::TOO_MANY_REQUESTS]
    );
    assert_eq!(api.adapter.spawn_count("t1"), 1);
}

#[tokio::test]
async fn rate_limit_window_resets() {
    let api = setup_with(1, fast_config());
    api.register("t1").await;
    api.call("POST", "/api/bots/t1/start", None).await;
    assert_eq!(
        api.call("POST", "/api/bots/t1/stop", None).await.status,
        StatusCode::TOO_MANY_REQUESTS
    );

    api.clock.advance(Duration::from_secs(61));

    assert_eq!(
        api.call("POST", "/api/bots/t1/stop", None).await.status,
        StatusCode::OK
    );
}
