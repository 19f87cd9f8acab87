// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn assert_unauthorized(reply: &Reply, message: &str) {
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["success"], false);
    assert!(
        reply.body["error"].as_str().unwrap().contains(message),
        "unexpected error {:?}",
        reply.body["error"]
    );
}

#[tokio::test]
async fn correctly_signed_request_is_accepted() {
    let api = setup();
    let reply = api.call("GET", "/api/bots", None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["success"], true);
}

#[tokio::test]
async fn missing_headers_are_rejected() {
    let api = setup();
    let request = Request::builder()
        .uri("/api/bots")
        .body(Body::empty())
        .unwrap();
    let reply = api.send(request).await;
    assert_unauthorized(&reply, "missing authentication headers");
}

#[tokio::test]
async fn wrong_api_key_is_rejected() {
    let api = setup();
    let mut request = api.signed("GET", "/api/bots", None);
    request
        .headers_mut()
        .insert(signing::API_KEY_HEADER, "other-key".parse().unwrap());
    assert_unauthorized(&api.send(request).await, "invalid api key");
}

#[tokio::test]
async fn stale_timestamp_is_rejected_despite_valid_signature() {
    let api = setup();
    let stale = api.clock.epoch_ms() - signing::MAX_CLOCK_SKEW_MS - 1;
    let reply = api.send(api.signed_at("GET", "/api/bots", stale, None)).await;
    assert_unauthorized(&reply, "request expired");
}

#[tokio::test]
async fn timestamp_at_edge_of_window_is_accepted() {
    let api = setup();
    let edge = api.clock.epoch_ms() - signing::MAX_CLOCK_SKEW_MS;
    let reply = api.send(api.signed_at("GET", "/api/bots", edge, None)).await;
    assert_eq!(reply.status, StatusCode::OK);
}

#[tokio::test]
async fn non_numeric_timestamp_is_rejected() {
    let api = setup();
    let mut request = api.signed("GET", "/api/bots", None);
    request
        .headers_mut()
        .insert(signing::TIMESTAMP_HEADER, "yesterday".parse().unwrap());
    assert_unauthorized(&api.send(request).await, "invalid timestamp");
}

#[tokio::test]
async fn tampered_signature_is_rejected() {
    let api = setup();
    let mut request = api.signed("GET", "/api/bots", None);
    let signature = request.headers()[signing::SIGNATURE_HEADER]
        .to_str()
        .unwrap()
        .to_string();
    let flipped: String = signature
        .char_indices()
        .map(|(i, c)| match (i, c) {
            (0, '0') => '1',
            (0, _) => '0',
            (_, c) => c,
        })
        .collect();
    request
        .headers_mut()
        .insert(signing::SIGNATURE_HEADER, flipped.parse().unwrap());
    assert_unauthorized(&api.send(request).await, "invalid signature");
}

#[tokio::test]
async fn signature_is_bound_to_method_and_path() {
    let api = setup();
    api.register("t1").await;

    // Signed for the status route, sent to start
    let signed = api.signed("GET", "/api/bots/t1/status", None);
    let (parts, body) = signed.into_parts();
    let mut request = Request::builder()
        .method("POST")
        .uri("/api/bots/t1/start")
        .body(body)
        .unwrap();
    *request.headers_mut() = parts.headers;

    assert_unauthorized(&api.send(request).await, "invalid signature");
    assert_eq!(api.adapter.spawn_count("t1"), 0);
}

#[tokio::test]
async fn health_routes_need_no_credentials() {
    let api = setup();
    for path in ["/api/health", "/api/health/summary"] {
        let request = Request::builder().uri(path).body(Body::empty()).unwrap();
        let reply = api.send(request).await;
        assert_eq!(reply.status, StatusCode::OK, "{path}");
        assert_eq!(reply.body["success"], true);
    }
}

#[tokio::test]
async fn cors_preflight_allows_configured_origin() {
    let api = setup();
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/bots")
        .header("origin", "https://dash.example")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "x-signature")
        .body(Body::empty())
        .unwrap();

    let reply = api.send(request).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(
        reply.headers["access-control-allow-origin"],
        "https://dash.example"
    );
}

#[tokio::test]
async fn cors_ignores_unknown_origin() {
    let api = setup();
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/bots")
        .header("origin", "https://evil.example")
        .header("access-control-request-method", "POST")
        .body(Body::empty())
        .unwrap();

    let reply = api.send(request).await;

    assert!(reply.headers.get("access-control-allow-origin").is_none());
}
