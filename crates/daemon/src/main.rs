// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! fleetd
//!
//! Supervises one worker process per tenant and serves the Control API.

use fleet_daemon::lifecycle::{self, LifecycleError, StartupResult};
use fleet_daemon::logging::{setup_logging, write_startup_error, write_startup_marker};
use fleet_daemon::Config;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tracing::{error, info};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Handle info flags before any config/lock acquisition
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("fleetd {VERSION}");
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("fleetd {VERSION}");
                println!("Fleet manager - supervises per-tenant bot workers");
                println!();
                println!("USAGE:");
                println!("    fleetd");
                println!();
                println!("Configuration comes from $FLEET_CONFIG (or <state_dir>/fleetd.toml)");
                println!("and the environment. MANAGER_API_KEY, MANAGER_HMAC_SECRET and");
                println!("ENCRYPTION_KEY are required.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: fleetd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load()?;

    // Startup marker goes in before tracing so a reader can find this attempt
    write_startup_marker(&config.log_path)?;
    let log_guard = setup_logging(&config.log_path)?;

    info!(version = VERSION, "Starting fleetd");

    let StartupResult {
        daemon,
        listener,
        reconciled,
    } = match lifecycle::startup(&config).await {
        Ok(r) => r,
        Err(LifecycleError::LockFailed(_)) => {
            eprintln!("fleetd is already running");
            if let Some(pid) = lifecycle::read_pid(&config.lock_path) {
                eprintln!("  pid: {pid}");
            }
            std::process::exit(1);
        }
        Err(e) => {
            write_startup_error(&config.log_path, &e);
            error!("Failed to start fleetd: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };
    if reconciled > 0 {
        info!(reconciled, "reconciled tenants from previous run");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let monitor = daemon.health_monitor().spawn(shutdown_rx);
    let app = daemon.api_router();

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!(
        addr = %config.listen_addr,
        base_path = %config.base_path,
        "Control API listening"
    );
    println!("READY");

    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
            _ = sigint.recv() => info!("Received SIGINT, shutting down..."),
        }
    });
    if let Err(e) = server.await {
        error!("Control API server failed: {}", e);
    }

    let _ = shutdown_tx.send(true);
    if let Err(e) = monitor.await {
        error!("Health monitor task failed: {}", e);
    }
    daemon.shutdown().await?;
    info!("fleetd stopped");
    Ok(())
}
