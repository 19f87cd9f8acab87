// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/bots` handlers

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use fleet_adapters::WorkerAdapter;
use fleet_core::{
    AuditLogEntry, Clock, HealthSnapshot, Tenant, TenantId, TenantStatus, WorkerPhase,
};
use fleet_engine::{StartOutcome, WorkerStatus};
use serde::{Deserialize, Serialize};

use super::{ApiError, ApiState, Envelope, Operator};

type ApiResult<T> = Result<Json<Envelope<T>>, ApiError>;

/// Tenant record plus supervisor state. Never carries the credential.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BotView {
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

impl BotView {
    fn new(tenant: Tenant, worker: WorkerStatus) -> Self {
        Self {
            tenant_id: tenant.id,
            status: tenant.status,
            phase: worker.phase,
            is_running: tenant.is_running,
            process_id: tenant.process_id,
            client_id: tenant.client_id,
            error_count: tenant.error_count,
            last_error: tenant.last_error,
            restart_count: worker.restart_count,
            guilds: worker.guilds,
            last_started_at: tenant.last_started_at,
            last_stopped_at: tenant.last_stopped_at,
            created_at: tenant.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BotStatusView {
    #[serde(flatten)]
    pub bot: BotView,
    pub last_health: Option<HealthSnapshot>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartView {
    pub tenant_id: TenantId,
    pub pid: Option<u32>,
    pub already_running: bool,
}

impl StartView {
    fn new(tenant_id: TenantId, outcome: StartOutcome) -> Self {
        match outcome {
            StartOutcome::Started { pid } => Self {
                tenant_id,
                pid: Some(pid),
                already_running: false,
            },
            StartOutcome::AlreadyRunning { pid } => Self {
                tenant_id,
                pid,
                already_running: true,
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopView {
    pub tenant_id: TenantId,
    pub pid: u32,
    pub forced: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub tenant_id: String,
    pub token: String,
    #[serde(default)]
    pub client_id: Option<String>,
}

fn known_tenant<W: WorkerAdapter, C: Clock>(
    state: &ApiState<W, C>,
    tenant_id: &TenantId,
) -> Result<Tenant, ApiError> {
    state
        .supervisor
        .store()
        .get(tenant_id.as_str())
        .ok_or_else(|| ApiError::NotFound(format!("tenant not found: {tenant_id}")))
}

fn rate_limit<W: WorkerAdapter, C: Clock>(
    state: &ApiState<W, C>,
    operator: &Operator,
) -> Result<(), ApiError> {
    state
        .limiter
        .check(&operator.0, state.clock.now())
        .map_err(|retry_after| {
            tracing::warn!(operator = %operator.0, "mutation rate limit hit");
            ApiError::RateLimited { retry_after }
        })
}

pub(crate) async fn list<W: WorkerAdapter, C: Clock>(
    State(state): State<ApiState<W, C>>,
) -> ApiResult<Vec<BotView>> {
    let statuses = state.supervisor.statuses();
    let bots = state
        .supervisor
        .store()
        .list()
        .into_iter()
        .map(|tenant| {
            let worker = statuses.get(&tenant.id).cloned().unwrap_or_default();
            BotView::new(tenant, worker)
        })
        .collect();
    Ok(Json(Envelope::ok(bots)))
}

pub(crate) async fn register<W: WorkerAdapter, C: Clock>(
    State(state): State<ApiState<W, C>>,
    Extension(operator): Extension<Operator>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<BotView> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    if request.tenant_id.trim().is_empty() {
        return Err(ApiError::BadRequest("tenantId is required".to_string()));
    }
    if request.token.trim().is_empty() {
        return Err(ApiError::BadRequest("token is required".to_string()));
    }
    let tenant_id = TenantId::new(request.tenant_id.trim());
    let client_id = request.client_id.filter(|c| !c.trim().is_empty());
    let tenant = state
        .supervisor
        .register(&tenant_id, &request.token, client_id, &operator.0)?;
    let worker = state.supervisor.status(&tenant_id);
    Ok(Json(Envelope::ok(BotView::new(tenant, worker))))
}

pub(crate) async fn status<W: WorkerAdapter, C: Clock>(
    State(state): State<ApiState<W, C>>,
    Path(tenant_id): Path<String>,
) -> ApiResult<BotStatusView> {
    let tenant_id = TenantId::new(tenant_id);
    let tenant = known_tenant(&state, &tenant_id)?;
    let worker = state.supervisor.status(&tenant_id);
    let last_health = worker.last_health.clone();
    Ok(Json(Envelope::ok(BotStatusView {
        bot: BotView::new(tenant, worker),
        last_health,
    })))
}

pub(crate) async fn audit<W: WorkerAdapter, C: Clock>(
    State(state): State<ApiState<W, C>>,
    Path(tenant_id): Path<String>,
) -> ApiResult<Vec<AuditLogEntry>> {
    let tenant_id = TenantId::new(tenant_id);
    known_tenant(&state, &tenant_id)?;
    Ok(Json(Envelope::ok(
        state.supervisor.store().audit_for(tenant_id.as_str()),
    )))
}

pub(crate) async fn start<W: WorkerAdapter, C: Clock>(
    State(state): State<ApiState<W, C>>,
    Extension(operator): Extension<Operator>,
    Path(tenant_id): Path<String>,
) -> ApiResult<StartView> {
    rate_limit(&state, &operator)?;
    let tenant_id = TenantId::new(tenant_id);
    let outcome = state.supervisor.start(&tenant_id, &operator.0).await?;
    Ok(Json(Envelope::ok(StartView::new(tenant_id, outcome))))
}

pub(crate) async fn stop<W: WorkerAdapter, C: Clock>(
    State(state): State<ApiState<W, C>>,
    Extension(operator): Extension<Operator>,
    Path(tenant_id): Path<String>,
) -> ApiResult<StopView> {
    rate_limit(&state, &operator)?;
    let tenant_id = TenantId::new(tenant_id);
    let outcome = state.supervisor.stop(&tenant_id, &operator.0).await?;
    Ok(Json(Envelope::ok(StopView {
        tenant_id,
        pid: outcome.pid,
        forced: outcome.forced,
    })))
}

pub(crate) async fn restart<W: WorkerAdapter, C: Clock>(
    State(state): State<ApiState<W, C>>,
    Extension(operator): Extension<Operator>,
    Path(tenant_id): Path<String>,
) -> ApiResult<StartView> {
    rate_limit(&state, &operator)?;
    let tenant_id = TenantId::new(tenant_id);
    let outcome = state.supervisor.restart(&tenant_id, &operator.0).await?;
    Ok(Json(Envelope::ok(StartView::new(tenant_id, outcome))))
}

pub(crate) async fn reset_errors<W: WorkerAdapter, C: Clock>(
    State(state): State<ApiState<W, C>>,
    Extension(operator): Extension<Operator>,
    Path(tenant_id): Path<String>,
) -> ApiResult<BotView> {
    let tenant_id = TenantId::new(tenant_id);
    let tenant = state.supervisor.reset_errors(&tenant_id, &operator.0)?;
    let worker = state.supervisor.status(&tenant_id);
    Ok(Json(Envelope::ok(BotView::new(tenant, worker))))
}
