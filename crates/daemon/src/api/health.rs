// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Liveness probes; no authentication

use std::collections::BTreeMap;

use axum::extract::State;
use axum::Json;
use fleet_adapters::WorkerAdapter;
use fleet_core::{Clock, WorkerPhase};
use serde::Serialize;

use super::{ApiState, Envelope};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Liveness {
    pub status: &'static str,
    pub uptime_ms: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSummary {
    pub status: &'static str,
    pub uptime_ms: u64,
    pub tenants: usize,
    pub phases: BTreeMap<WorkerPhase, usize>,
    pub total_guilds: u64,
}

fn uptime_ms<W, C: Clock>(state: &ApiState<W, C>) -> u64 {
    state
        .clock
        .now()
        .saturating_duration_since(state.started_at)
        .as_millis() as u64
}

pub(crate) async fn live<W: WorkerAdapter, C: Clock>(
    State(state): State<ApiState<W, C>>,
) -> Json<Envelope<Liveness>> {
    Json(Envelope::ok(Liveness {
        status: "ok",
        uptime_ms: uptime_ms(&state),
    }))
}

pub(crate) async fn summary<W: WorkerAdapter, C: Clock>(
    State(state): State<ApiState<W, C>>,
) -> Json<Envelope<HealthSummary>> {
    let summary = state.supervisor.summary();
    Json(Envelope::ok(HealthSummary {
        status: "ok",
        uptime_ms: uptime_ms(&state),
        tenants: summary.phases.values().sum(),
        phases: summary.phases,
        total_guilds: summary.total_guilds,
    }))
}
