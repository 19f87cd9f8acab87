// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use fleet_engine::SupervisorError;
use thiserror::Error;

use super::Envelope;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("unauthorized: {0}")]
    Unauthorized(&'static str),

    #[error("rate limit exceeded")]
    RateLimited { retry_after: Duration },

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

/// Whole seconds, rounded up, never zero
fn retry_after_secs(delay: Duration) -> u64 {
    let secs = delay.as_secs() + u64::from(delay.subsec_nanos() > 0);
    secs.max(1)
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::BadRequest(_) | ApiError::Conflict(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<SupervisorError> for ApiError {
    fn from(e: SupervisorError) -> Self {
        match e {
            SupervisorError::TenantNotFound(_) => ApiError::NotFound(e.to_string()),
            SupervisorError::NotRunning(_) | SupervisorError::ErrorCeiling { .. } => {
                ApiError::Conflict(e.to_string())
            }
            SupervisorError::InvalidTenantId(_) | SupervisorError::SchemaCollision { .. } => {
                ApiError::BadRequest(e.to_string())
            }
            SupervisorError::Integrity(_) | SupervisorError::Upstream(_) => {
                ApiError::Internal(e.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let retry_after = match &self {
            ApiError::RateLimited { retry_after } => Some(retry_after_secs(*retry_after)),
            _ => None,
        };
        let mut response =
            (status, Json(Envelope::<()>::failure(self.to_string()))).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
