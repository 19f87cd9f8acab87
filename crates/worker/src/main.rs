// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! fleet-worker: one tenant's bot process, supervised by fleetd.
//!
//! stdout is reserved for IPC frames; logs go to stderr.

use anyhow::Context;
use fleet_adapters::RedisBus;
use fleet_core::SystemClock;
use fleet_engine::ConfigSubscriber;
use fleet_worker::{IdleSession, NoSettings, SettingsCache, WorkerEnv, WorkerRuntime};
use tokio::io::BufReader;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let env = WorkerEnv::from_env().context("worker environment")?;
    info!(tenant_id = %env.tenant_id, "fleet-worker starting");

    let settings = SettingsCache::new(NoSettings);
    let subscriber = ConfigSubscriber::new();
    settings.subscribe(&subscriber);

    // Without a broker the cache never goes stale
    let _listener = match env.redis_url.as_deref() {
        Some(url) => match RedisBus::open(url) {
            Ok(bus) => match subscriber.listen(&bus).await {
                Ok(handle) => Some(handle),
                Err(e) => {
                    warn!(error = %e, "config updates disabled");
                    None
                }
            },
            Err(e) => {
                warn!(error = %e, "config updates disabled");
                None
            }
        },
        None => None,
    };

    let mut stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let reason = WorkerRuntime::new(env, IdleSession::default(), SystemClock)
        .run(&mut stdin, &mut stdout)
        .await?;
    info!(?reason, "fleet-worker exiting");
    Ok(())
}
