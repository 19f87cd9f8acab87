// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::{Duration, TimeZone};
use fleet_core::{AuditAction, HealthSnapshot, TenantId, TenantStatus, WorkerPhase};
use serial_test::serial;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

fn bot(id: &str) -> Bot {
    Bot {
        tenant_id: TenantId::new(id),
        status: TenantStatus::Active,
        phase: WorkerPhase::Running,
        is_running: true,
        process_id: Some(4242),
        client_id: Some("app-1".to_string()),
        error_count: 0,
        last_error: None,
        restart_count: 1,
        guilds: Some(12),
        last_started_at: Some(now() - Duration::minutes(3)),
        last_stopped_at: None,
        created_at: now() - Duration::days(2),
    }
}

fn render(table: &Table) -> String {
    let mut buf = Vec::new();
    table.render(&mut buf);
    String::from_utf8(buf).unwrap()
}

#[test]
#[serial]
fn bot_table_lists_one_row_per_bot() {
    std::env::set_var("NO_COLOR", "1");
    let stopped = Bot {
        phase: WorkerPhase::Crashed,
        status: TenantStatus::Error,
        is_running: false,
        process_id: None,
        guilds: None,
        error_count: 2,
        last_error: Some("worker exited (exit code 1)".to_string()),
        ..bot("t2")
    };

    let out = render(&bot_table(&[bot("t1"), stopped], now()));
    let lines: Vec<&str> = out.lines().collect();

    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("TENANT  PHASE"));
    assert!(lines[1].contains("RUNNING"));
    assert!(lines[1].contains("4242"));
    assert!(lines[1].contains("3m"));
    assert!(lines[2].contains("CRASHED"));
    assert!(lines[2].contains("ERROR"));
    assert!(lines[2].ends_with("worker exited (exit code 1)"));
    std::env::remove_var("NO_COLOR");
}

#[test]
#[serial]
fn audit_table_shows_action_and_user() {
    std::env::set_var("NO_COLOR", "1");
    let entry = AuditLogEntry {
        id: "a1".to_string(),
        tenant_id: TenantId::new("t1"),
        user_id: "alice".to_string(),
        action: AuditAction::TenantStarted,
        timestamp: now() - Duration::hours(2),
    };

    let out = render(&audit_table(&[entry], now()));

    assert_eq!(out.lines().nth(1), Some("2h   TENANT_STARTED  alice"));
    std::env::remove_var("NO_COLOR");
}

#[test]
#[serial]
fn status_prefers_health_snapshot() {
    std::env::set_var("NO_COLOR", "1");
    let status = BotStatus {
        bot: bot("t1"),
        last_health: Some(HealthSnapshot {
            tenant_id: TenantId::new("t1"),
            guild_count: 15,
            uptime_ms: 125_000,
            memory_bytes: 48 * 1024 * 1024,
            observed_at: now() - Duration::seconds(10),
        }),
    };

    let out = format_status(&status, now());

    assert!(out.contains("Guilds     15\n"));
    assert!(out.contains("Uptime     2m\n"));
    assert!(out.contains("Memory     48.0 MiB\n"));
    assert!(out.contains("Checked    10s\n"));
    assert!(!out.contains("Error "));
    std::env::remove_var("NO_COLOR");
}

#[test]
#[serial]
fn status_without_health_uses_ready_guilds() {
    std::env::set_var("NO_COLOR", "1");
    let status = BotStatus {
        bot: Bot {
            last_error: Some("ready timeout".to_string()),
            ..bot("t1")
        },
        last_health: None,
    };

    let out = format_status(&status, now());

    assert!(out.contains("Guilds     12\n"));
    assert!(out.contains("Error      ready timeout\n"));
    std::env::remove_var("NO_COLOR");
}

#[yare::parameterized(
    started = { "Started", false, Some(10), "Started t1 (pid 10)" },
    already = { "Started", true, Some(10), "t1 already running (pid 10)" },
    restarted = { "Restarted", false, Some(11), "Restarted t1 (pid 11)" },
    starting_without_pid = { "Started", true, None, "t1 already running (pid -)" },
)]
fn start_messages(verb: &str, already_running: bool, pid: Option<u32>, expected: &str) {
    let result = StartResult {
        tenant_id: TenantId::new("t1"),
        pid,
        already_running,
    };
    assert_eq!(start_message(verb, &result), expected);
}

#[test]
fn stop_message_mentions_forced_kill() {
    let graceful = StopResult {
        tenant_id: TenantId::new("t1"),
        pid: 7,
        forced: false,
    };
    assert_eq!(stop_message(&graceful), "Stopped t1 (pid 7)");
    let forced = StopResult {
        forced: true,
        ..graceful
    };
    assert!(stop_message(&forced).contains("killed"));
}
