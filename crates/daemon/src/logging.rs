// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon log file: startup marker, size-based rotation, tracing setup.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::lifecycle::LifecycleError;

/// Startup marker prefix written to log before anything else.
/// Full format: "--- fleetd: starting (pid: 12345) ---"
pub const STARTUP_MARKER_PREFIX: &str = "--- fleetd: starting (pid: ";

/// Rotate once the log grows past this size
pub const MAX_LOG_BYTES: u64 = 10 * 1024 * 1024;

/// Rotated generations kept (`fleetd.log.1` .. `fleetd.log.3`)
pub const KEEP_ROTATED: usize = 3;

fn rotated_path(log_path: &Path, generation: usize) -> PathBuf {
    let mut name = log_path.as_os_str().to_owned();
    name.push(format!(".{generation}"));
    PathBuf::from(name)
}

/// Shift `fleetd.log` to `fleetd.log.1` (and older generations up by one)
/// when it exceeds `max_bytes`. Returns whether a rotation happened.
pub fn rotate_if_needed(log_path: &Path, max_bytes: u64) -> std::io::Result<bool> {
    let size = match std::fs::metadata(log_path) {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    if size <= max_bytes {
        return Ok(false);
    }
    for generation in (1..KEEP_ROTATED).rev() {
        let from = rotated_path(log_path, generation);
        if from.exists() {
            std::fs::rename(&from, rotated_path(log_path, generation + 1))?;
        }
    }
    std::fs::rename(log_path, rotated_path(log_path, 1))?;
    Ok(true)
}

/// Write startup marker to log file (appends to existing log)
pub fn write_startup_marker(log_path: &Path) -> Result<(), LifecycleError> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    rotate_if_needed(log_path, MAX_LOG_BYTES)?;
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;
    writeln!(file, "{}{}) ---", STARTUP_MARKER_PREFIX, std::process::id())?;
    Ok(())
}

/// Write startup error synchronously; the non-blocking writer may not
/// flush before the process exits.
pub fn write_startup_error(log_path: &Path, error: &LifecycleError) {
    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
    else {
        return;
    };
    let _ = writeln!(file, "ERROR Failed to start fleetd: {}", error);
}

pub fn setup_logging(
    log_path: &Path,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let dir = log_path.parent().ok_or(LifecycleError::NoStateDir)?;
    std::fs::create_dir_all(dir)?;
    let file_appender = tracing_appender::rolling::never(
        dir,
        log_path.file_name().ok_or(LifecycleError::NoStateDir)?,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(guard)
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
