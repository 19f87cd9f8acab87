// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    first = { 0, Some(1) },
    second = { 1, Some(2) },
    third = { 2, Some(4) },
    capped = { 4, Some(10) },
    exhausted = { 5, None },
    far_past = { 40, None },
)]
fn delay_doubles_until_capped(attempt: u32, expected_secs: Option<u64>) {
    let policy = BackoffPolicy {
        base: Duration::from_secs(1),
        max: Duration::from_secs(10),
        max_restarts: 5,
    };
    assert_eq!(
        policy.delay_for(attempt),
        expected_secs.map(Duration::from_secs)
    );
}

#[test]
fn huge_attempts_do_not_overflow() {
    let policy = BackoffPolicy {
        base: Duration::from_secs(1),
        max: Duration::from_secs(30),
        max_restarts: u32::MAX,
    };
    assert_eq!(policy.delay_for(63), Some(Duration::from_secs(30)));
}

#[test]
fn zero_budget_never_restarts() {
    let policy = BackoffPolicy {
        max_restarts: 0,
        ..BackoffPolicy::default()
    };
    assert_eq!(policy.delay_for(0), None);
}
