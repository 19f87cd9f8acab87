// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control API.
//!
//! Every `/bots` route sits behind HMAC request signing. `/health` and
//! `/health/summary` are exempt so load-balancer probes need no
//! credentials. Responses use the `{success, data?, error?}` envelope.

mod auth;
mod bots;
mod error;
mod health;
mod rate_limit;

pub use auth::{Operator, OPERATOR_HEADER};
pub use error::ApiError;
pub use rate_limit::RateLimiter;

use std::sync::Arc;
use std::time::Instant;

use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use fleet_adapters::WorkerAdapter;
use fleet_core::signing::{API_KEY_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use fleet_core::Clock;
use fleet_engine::Supervisor;
use serde::Serialize;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Credentials the signing middleware checks against
#[derive(Clone)]
pub struct ApiAuth {
    pub api_key: String,
    pub hmac_secret: String,
}

pub struct ApiState<W, C> {
    pub supervisor: Supervisor<W, C>,
    pub auth: Arc<ApiAuth>,
    pub limiter: Arc<RateLimiter>,
    pub clock: C,
    pub started_at: Instant,
}

impl<W, C: Clone> Clone for ApiState<W, C> {
    fn clone(&self) -> Self {
        Self {
            supervisor: self.supervisor.clone(),
            auth: Arc::clone(&self.auth),
            limiter: Arc::clone(&self.limiter),
            clock: self.clock.clone(),
            started_at: self.started_at,
        }
    }
}

/// Response envelope shared by every route
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// Build the Control API under `base_path` (e.g. `/api`).
pub fn router<W: WorkerAdapter, C: Clock>(
    state: ApiState<W, C>,
    base_path: &str,
    cors_origins: &[String],
) -> Router {
    let signed = Router::new()
        .route("/bots", get(bots::list::<W, C>).post(bots::register::<W, C>))
        .route("/bots/:tenant_id/status", get(bots::status::<W, C>))
        .route("/bots/:tenant_id/audit", get(bots::audit::<W, C>))
        .route("/bots/:tenant_id/start", post(bots::start::<W, C>))
        .route("/bots/:tenant_id/stop", post(bots::stop::<W, C>))
        .route("/bots/:tenant_id/restart", post(bots::restart::<W, C>))
        .route("/bots/:tenant_id/reset-errors", post(bots::reset_errors::<W, C>))
        .route_layer(from_fn_with_state(
            state.clone(),
            auth::require_signature::<W, C>,
        ));

    let api = Router::new()
        .route("/health", get(health::live::<W, C>))
        .route("/health/summary", get(health::summary::<W, C>))
        .merge(signed)
        .with_state(state);

    let app = if base_path.is_empty() {
        api
    } else {
        Router::new().nest(base_path, api)
    };
    app.layer(cors_layer(cors_origins))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring malformed CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(API_KEY_HEADER),
            HeaderName::from_static(TIMESTAMP_HEADER),
            HeaderName::from_static(SIGNATURE_HEADER),
            HeaderName::from_static(OPERATOR_HEADER),
        ])
}

#[cfg(test)]
#[path = "../api_tests/mod.rs"]
mod tests;
