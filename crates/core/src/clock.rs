// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction so timeouts and timestamps can be driven by tests.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Source of monotonic and wall-clock time
pub trait Clock: Clone + Send + Sync + 'static {
    /// Monotonic instant, used for deadlines and uptime
    fn now(&self) -> Instant;

    /// Wall-clock time, used for persisted timestamps
    fn utc_now(&self) -> DateTime<Utc>;

    /// Wall-clock time as epoch milliseconds
    fn epoch_ms(&self) -> i64 {
        self.utc_now().timestamp_millis()
    }
}

/// Real system clock
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

struct FakeClockState {
    instant: Instant,
    utc: DateTime<Utc>,
}

/// Manually advanced clock for tests.
///
/// Both the monotonic and the wall-clock readings move together on
/// [`FakeClock::advance`].
#[derive(Clone)]
pub struct FakeClock {
    inner: Arc<Mutex<FakeClockState>>,
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeClock {
    pub fn new() -> Self {
        Self::at(DateTime::from_timestamp(1_728_000_000, 0).unwrap_or_default())
    }

    /// Start the fake clock at a fixed wall-clock time
    pub fn at(utc: DateTime<Utc>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeClockState {
                instant: Instant::now(),
                utc,
            })),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut state = self.inner.lock();
        state.instant += by;
        state.utc += chrono::Duration::from_std(by).unwrap_or_else(|_| chrono::Duration::zero());
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.inner.lock().instant
    }

    fn utc_now(&self) -> DateTime<Utc> {
        self.inner.lock().utc
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
