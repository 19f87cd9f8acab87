// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control API client.
//!
//! Every request is signed with `HMAC-SHA256(secret, "METHOD:PATH:timestamp")`
//! where PATH is the full request path as the manager sees it, base path
//! included.

use chrono::{DateTime, Utc};
use fleet_core::signing::{self, API_KEY_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use fleet_core::{AuditLogEntry, Clock, HealthSnapshot, SystemClock, TenantId, TenantStatus, WorkerPhase};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Header carrying the operator name recorded in the audit log
const OPERATOR_HEADER: &str = "x-operator-id";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{0} is not set")]
    MissingCredential(&'static str),

    #[error("invalid API URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to sign request: {0}")]
    Signing(#[from] signing::SigningError),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{message} (HTTP {status})")]
    Api { status: u16, message: String },
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub api_key: String,
    pub hmac_secret: String,
    pub operator: Option<String>,
}

impl Credentials {
    pub fn from_env() -> Result<Self, ClientError> {
        Ok(Self {
            api_key: crate::env::api_key().ok_or(ClientError::MissingCredential(crate::env::API_KEY))?,
            hmac_secret: crate::env::hmac_secret()
                .ok_or(ClientError::MissingCredential(crate::env::HMAC_SECRET))?,
            operator: crate::env::operator(),
        })
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bot {
    pub tenant_id: TenantId,
    pub status: TenantStatus,
    pub phase: WorkerPhase,
    pub is_running: bool,
    pub process_id: Option<u32>,
    pub client_id: Option<String>,
    pub error_count: u32,
    pub last_error: Option<String>,
    pub restart_count: u32,
    pub guilds: Option<u32>,
    pub last_started_at: Option<DateTime<Utc>>,
    pub last_stopped_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotStatus {
    #[serde(flatten)]
    pub bot: Bot,
    pub last_health: Option<HealthSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResult {
    pub tenant_id: TenantId,
    pub pid: Option<u32>,
    pub already_running: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopResult {
    pub tenant_id: TenantId,
    pub pid: u32,
    pub forced: bool,
}

pub struct ApiClient<C = SystemClock> {
    http: reqwest::Client,
    base: Url,
    credentials: Credentials,
    clock: C,
}

impl ApiClient {
    pub fn from_env(api_url: &str) -> Result<Self, ClientError> {
        Self::new(api_url, Credentials::from_env()?, SystemClock)
    }
}

impl<C: Clock> ApiClient<C> {
    pub fn new(api_url: &str, credentials: Credentials, clock: C) -> Result<Self, ClientError> {
        let base = Url::parse(api_url).map_err(|source| ClientError::InvalidUrl {
            url: api_url.to_string(),
            source,
        })?;
        let http = reqwest::Client::builder()
            .timeout(crate::env::timeout_http())
            .build()?;
        Ok(Self {
            http,
            base,
            credentials,
            clock,
        })
    }

    /// `/bots/t1/start` under the configured base path
    pub fn url(&self, path: &str) -> Url {
        let mut url = self.base.clone();
        let full = format!("{}{}", self.base.path().trim_end_matches('/'), path);
        url.set_path(&full);
        url
    }

    /// Headers authenticating `method url` at `timestamp_ms`
    pub fn auth_headers(
        &self,
        method: &Method,
        url: &Url,
        timestamp_ms: i64,
    ) -> Result<Vec<(&'static str, String)>, ClientError> {
        let timestamp = timestamp_ms.to_string();
        let signature = signing::sign(
            self.credentials.hmac_secret.as_bytes(),
            method.as_str(),
            url.path(),
            &timestamp,
        )?;
        let mut headers = vec![
            (API_KEY_HEADER, self.credentials.api_key.clone()),
            (TIMESTAMP_HEADER, timestamp),
            (SIGNATURE_HEADER, signature),
        ];
        if let Some(operator) = &self.credentials.operator {
            headers.push((OPERATOR_HEADER, operator.clone()));
        }
        Ok(headers)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, ClientError> {
        let url = self.url(path);
        let headers = self.auth_headers(&method, &url, self.clock.epoch_ms())?;
        let mut request = self.http.request(method, url);
        for (name, value) in headers {
            request = request.header(name, value);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        decode(status, &text)
    }

    pub async fn list(&self) -> Result<Vec<Bot>, ClientError> {
        self.send(Method::GET, "/bots", None).await
    }

    pub async fn status(&self, tenant_id: &str) -> Result<BotStatus, ClientError> {
        self.send(Method::GET, &format!("/bots/{tenant_id}/status"), None)
            .await
    }

    pub async fn audit(&self, tenant_id: &str) -> Result<Vec<AuditLogEntry>, ClientError> {
        self.send(Method::GET, &format!("/bots/{tenant_id}/audit"), None)
            .await
    }

    pub async fn register(
        &self,
        tenant_id: &str,
        token: &str,
        client_id: Option<&str>,
    ) -> Result<Bot, ClientError> {
        let mut body = serde_json::json!({ "tenantId": tenant_id, "token": token });
        if let Some(client_id) = client_id {
            body["clientId"] = client_id.into();
        }
        self.send(Method::POST, "/bots", Some(body)).await
    }

    pub async fn start(&self, tenant_id: &str) -> Result<StartResult, ClientError> {
        self.send(Method::POST, &format!("/bots/{tenant_id}/start"), None)
            .await
    }

    pub async fn stop(&self, tenant_id: &str) -> Result<StopResult, ClientError> {
        self.send(Method::POST, &format!("/bots/{tenant_id}/stop"), None)
            .await
    }

    pub async fn restart(&self, tenant_id: &str) -> Result<StartResult, ClientError> {
        self.send(Method::POST, &format!("/bots/{tenant_id}/restart"), None)
            .await
    }

    pub async fn reset_errors(&self, tenant_id: &str) -> Result<Bot, ClientError> {
        self.send(Method::POST, &format!("/bots/{tenant_id}/reset-errors"), None)
            .await
    }
}

/// Unwrap the `{success, data, error}` envelope.
fn decode<T: DeserializeOwned>(status: StatusCode, text: &str) -> Result<T, ClientError> {
    let api_error = |message: String| ClientError::Api {
        status: status.as_u16(),
        message,
    };
    let envelope: Envelope<T> = match serde_json::from_str(text) {
        Ok(envelope) => envelope,
        Err(e) if status.is_success() => return Err(api_error(format!("unexpected response: {e}"))),
        Err(_) => {
            let snippet: String = text.chars().take(200).collect();
            return Err(api_error(if snippet.is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                snippet
            }));
        }
    };
    match (status.is_success() && envelope.success, envelope.data) {
        (true, Some(data)) => Ok(data),
        (true, None) => Err(api_error("response carried no data".to_string())),
        (false, _) => Err(api_error(
            envelope.error.unwrap_or_else(|| "request failed".to_string()),
        )),
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
