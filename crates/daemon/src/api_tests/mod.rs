// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

mod auth;
mod bots;
mod health;

use super::*;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use fleet_adapters::FakeWorkerAdapter;
use fleet_core::signing;
use fleet_core::test_support::test_vault_key;
use fleet_core::FakeClock;
use fleet_engine::{BackoffPolicy, SupervisorConfig, SupervisorDeps};
use fleet_storage::TenantStore;
use serde_json::Value;
use std::time::Duration;
use tower::ServiceExt;

const API_KEY: &str = "key-1";
const SECRET: &str = "hmac-secret";
const BASE: &str = "/api";

struct TestApi {
    app: Router,
    supervisor: Supervisor<FakeWorkerAdapter, FakeClock>,
    adapter: FakeWorkerAdapter,
    clock: FakeClock,
}

fn setup_with(rate_limit: u32, config: SupervisorConfig) -> TestApi {
    setup_with_limiter(RateLimiter::new(rate_limit, Duration::from_secs(60)), config)
}

fn setup_with_limiter(limiter: RateLimiter, config: SupervisorConfig) -> TestApi {
    let adapter = FakeWorkerAdapter::new();
    let clock = FakeClock::new();
    let supervisor = Supervisor::new(
        SupervisorDeps {
            adapter: adapter.clone(),
            store: TenantStore::in_memory(),
            router: None,
            vault_key: test_vault_key(),
            clock: clock.clone(),
        },
        config,
    );
    let state = ApiState {
        supervisor: supervisor.clone(),
        auth: Arc::new(ApiAuth {
            api_key: API_KEY.to_string(),
            hmac_secret: SECRET.to_string(),
        }),
        limiter: Arc::new(limiter),
        clock: clock.clone(),
        started_at: clock.now(),
    };
    let app = router(state, BASE, &["https://dash.example".to_string()]);
    TestApi {
        app,
        supervisor,
        adapter,
        clock,
    }
}

fn fast_config() -> SupervisorConfig {
    SupervisorConfig {
        ready_timeout: Duration::from_millis(100),
        shutdown_grace: Duration::from_millis(100),
        health_timeout: Duration::from_millis(100),
        backoff: BackoffPolicy {
            max_restarts: 0,
            ..BackoffPolicy::default()
        },
        ..SupervisorConfig::default()
    }
}

fn setup() -> TestApi {
    setup_with(100, fast_config())
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

impl TestApi {
    fn signed_at(&self, method: &str, path: &str, timestamp_ms: i64, body: Option<Value>) -> Request<Body> {
        let timestamp = timestamp_ms.to_string();
        let signature = signing::sign(SECRET.as_bytes(), method, path, &timestamp).unwrap();
        Request::builder()
            .method(method)
            .uri(path)
            .header(signing::API_KEY_HEADER, API_KEY)
            .header(signing::TIMESTAMP_HEADER, timestamp)
            .header(signing::SIGNATURE_HEADER, signature)
            .header(OPERATOR_HEADER, "alice")
            .header("content-type", "application/json")
            .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
            .unwrap()
    }

    fn signed(&self, method: &str, path: &str, body: Option<Value>) -> Request<Body> {
        self.signed_at(method, path, self.clock.epoch_ms(), body)
    }

    async fn send(&self, request: Request<Body>) -> Reply {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        Reply {
            status,
            headers,
            body,
        }
    }

    async fn call(&self, method: &str, path: &str, body: Option<Value>) -> Reply {
        self.send(self.signed(method, path, body)).await
    }

    async fn register(&self, tenant_id: &str) -> Reply {
        self.call(
            "POST",
            "/api/bots",
            Some(serde_json::json!({ "tenantId": tenant_id, "token": format!("token-{tenant_id}") })),
        )
        .await
    }
}
