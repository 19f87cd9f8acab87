// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixed-window rate limit for mutating endpoints.
//!
//! Each operator gets its own window. All operators together share one more
//! window for the API credential, since the operator header is chosen by the
//! caller and only the credential is authenticated. A request is admitted
//! only if every applicable window has room, and then counts against each.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Bucket {
    Credential,
    Operator(String),
}

struct Window {
    started: Instant,
    count: u32,
}

pub struct RateLimiter {
    /// Requests per operator per window; zero disables
    limit: u32,
    /// Requests across all operators per window; zero disables
    total_limit: u32,
    window: Duration,
    windows: Mutex<HashMap<Bucket, Window>>,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            total_limit: 0,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Also cap the combined rate of every operator
    pub fn with_total(mut self, total_limit: u32) -> Self {
        self.total_limit = total_limit;
        self
    }

    /// Count one request by `operator`. Over a limit, returns how long until
    /// the fullest window ends.
    pub fn check(&self, operator: &str, now: Instant) -> Result<(), Duration> {
        let buckets = [
            (Bucket::Credential, self.total_limit),
            (Bucket::Operator(operator.to_string()), self.limit),
        ];
        let window = self.window;
        let mut windows = self.windows.lock();
        windows.retain(|_, w| now.saturating_duration_since(w.started) < window);

        let mut retry_after: Option<Duration> = None;
        for (bucket, limit) in &buckets {
            if *limit == 0 {
                continue;
            }
            if let Some(w) = windows.get(bucket).filter(|w| w.count >= *limit) {
                let wait = window.saturating_sub(now.saturating_duration_since(w.started));
                retry_after = Some(retry_after.map_or(wait, |r| r.max(wait)));
            }
        }
        if let Some(wait) = retry_after {
            return Err(wait);
        }

        for (bucket, limit) in buckets {
            if limit == 0 {
                continue;
            }
            windows
                .entry(bucket)
                .or_insert(Window {
                    started: now,
                    count: 0,
                })
                .count += 1;
        }
        Ok(())
    }

    /// Open windows across all buckets
    pub fn tracked(&self) -> usize {
        self.windows.lock().len()
    }
}

#[cfg(test)]
#[path = "rate_limit_tests.rs"]
mod tests;
