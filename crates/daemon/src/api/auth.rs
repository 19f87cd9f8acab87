// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HMAC request signing middleware

use axum::extract::{OriginalUri, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use fleet_adapters::WorkerAdapter;
use fleet_core::signing::{self, API_KEY_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use fleet_core::Clock;

use super::{ApiError, ApiState};

/// Optional header naming the human operator behind a request
pub const OPERATOR_HEADER: &str = "x-operator-id";

/// Actor recorded in audit entries when no operator is named
const DEFAULT_OPERATOR: &str = "api";

/// Authenticated caller, inserted as a request extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operator(pub String);

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

pub(crate) async fn require_signature<W: WorkerAdapter, C: Clock>(
    State(state): State<ApiState<W, C>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let headers = req.headers();
    let (Some(api_key), Some(timestamp), Some(signature)) = (
        header(headers, API_KEY_HEADER),
        header(headers, TIMESTAMP_HEADER),
        header(headers, SIGNATURE_HEADER),
    ) else {
        return Err(ApiError::Unauthorized("missing authentication headers"));
    };

    if !signing::api_key_matches(api_key, &state.auth.api_key) {
        return Err(ApiError::Unauthorized("invalid api key"));
    }

    let timestamp_ms: i64 = timestamp
        .parse()
        .map_err(|_| ApiError::Unauthorized("invalid timestamp"))?;
    if !signing::is_fresh(timestamp_ms, state.clock.epoch_ms()) {
        return Err(ApiError::Unauthorized("request expired"));
    }

    // Nested routers see a stripped URI; the client signed the full path
    let path = req
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.path().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    if !signing::verify(
        state.auth.hmac_secret.as_bytes(),
        req.method().as_str(),
        &path,
        timestamp,
        signature,
    ) {
        tracing::warn!(method = %req.method(), path = %path, "rejected request signature");
        return Err(ApiError::Unauthorized("invalid signature"));
    }

    let operator = header(headers, OPERATOR_HEADER)
        .unwrap_or(DEFAULT_OPERATOR)
        .to_string();
    req.extensions_mut().insert(Operator(operator));
    Ok(next.run(req).await)
}
