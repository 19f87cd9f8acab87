// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

async fn get(api: &TestApi, path: &str) -> Reply {
    let request = Request::builder().uri(path).body(Body::empty()).unwrap();
    api.send(request).await
}

#[tokio::test]
async fn live_reports_uptime_from_clock() {
    let api = setup();
    api.clock.advance(Duration::from_millis(1500));

    let reply = get(&api, "/api/health").await;

    assert_eq!(reply.body["data"]["status"], "ok");
    assert_eq!(reply.body["data"]["uptimeMs"], 1500);
}

#[tokio::test]
async fn summary_counts_phases_and_guilds() {
    let api = setup();
    api.register("t1").await;
    api.register("t2").await;
    api.call("POST", "/api/bots/t1/start", None).await;

    let reply = get(&api, "/api/health/summary").await;

    let data = &reply.body["data"];
    assert_eq!(data["tenants"], 2);
    assert_eq!(data["phases"]["RUNNING"], 1);
    assert_eq!(data["phases"]["STOPPED"], 1);
    assert_eq!(data["totalGuilds"], 3);
}

#[tokio::test]
async fn routes_outside_base_path_are_not_found() {
    let api = setup();
    let reply = get(&api, "/health").await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn empty_base_path_mounts_at_root() {
    let api = setup();
    let state = ApiState {
        supervisor: api.supervisor.clone(),
        auth: Arc::new(ApiAuth {
            api_key: API_KEY.to_string(),
            hmac_secret: SECRET.to_string(),
        }),
        limiter: Arc::new(RateLimiter::new(0, Duration::from_secs(60))),
        clock: api.clock.clone(),
        started_at: api.clock.now(),
    };
    let app = router(state, "", &[]);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
