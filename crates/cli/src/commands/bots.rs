// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `fleet bots` - tenant bot lifecycle

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use fleet_core::{AuditLogEntry, Clock};
use std::io::BufRead;

use crate::client::{ApiClient, Bot, BotStatus, StartResult, StopResult};
use crate::color;
use crate::output::{format_bytes, format_elapsed, format_time_ago, or_dash, print_json, OutputFormat};
use crate::table::{Column, Table};

#[derive(Args)]
pub struct BotsArgs {
    #[command(subcommand)]
    pub command: BotsCommand,
}

#[derive(Subcommand)]
pub enum BotsCommand {
    /// List every registered bot
    List,
    /// Show one bot's state and latest health
    Status { tenant_id: String },
    /// Register a bot or replace its token
    Register {
        tenant_id: String,
        /// Upstream bot token; read from stdin when omitted
        #[arg(long)]
        token: Option<String>,
        /// Upstream application id
        #[arg(long)]
        client_id: Option<String>,
    },
    /// Start a bot's worker
    Start { tenant_id: String },
    /// Stop a bot's worker
    Stop { tenant_id: String },
    /// Stop then start a bot's worker
    Restart { tenant_id: String },
    /// Clear a bot's error count so it may start again
    ResetErrors { tenant_id: String },
    /// Show a bot's audit log
    Audit { tenant_id: String },
}

pub async fn handle<C: Clock>(
    command: BotsCommand,
    client: &ApiClient<C>,
    format: OutputFormat,
) -> Result<()> {
    let now = Utc::now();
    match command {
        BotsCommand::List => {
            let bots = client.list().await?;
            match format {
                OutputFormat::Json => print_json(&bots)?,
                OutputFormat::Text if bots.is_empty() => println!("No bots registered"),
                OutputFormat::Text => bot_table(&bots, now).render(&mut std::io::stdout()),
            }
        }
        BotsCommand::Status { tenant_id } => {
            let status = client.status(&tenant_id).await?;
            match format {
                OutputFormat::Json => print_json(&status)?,
                OutputFormat::Text => print!("{}", format_status(&status, now)),
            }
        }
        BotsCommand::Register {
            tenant_id,
            token,
            client_id,
        } => {
            let token = match token {
                Some(token) => token,
                None => read_token()?,
            };
            let bot = client
                .register(&tenant_id, &token, client_id.as_deref())
                .await?;
            match format {
                OutputFormat::Json => print_json(&bot)?,
                OutputFormat::Text => println!("Registered {}", bot.tenant_id),
            }
        }
        BotsCommand::Start { tenant_id } => {
            let result = client.start(&tenant_id).await?;
            match format {
                OutputFormat::Json => print_json(&result)?,
                OutputFormat::Text => println!("{}", start_message("Started", &result)),
            }
        }
        BotsCommand::Stop { tenant_id } => {
            let result = client.stop(&tenant_id).await?;
            match format {
                OutputFormat::Json => print_json(&result)?,
                OutputFormat::Text => println!("{}", stop_message(&result)),
            }
        }
        BotsCommand::Restart { tenant_id } => {
            let result = client.restart(&tenant_id).await?;
            match format {
                OutputFormat::Json => print_json(&result)?,
                OutputFormat::Text => println!("{}", start_message("Restarted", &result)),
            }
        }
        BotsCommand::ResetErrors { tenant_id } => {
            let bot = client.reset_errors(&tenant_id).await?;
            match format {
                OutputFormat::Json => print_json(&bot)?,
                OutputFormat::Text => println!("Cleared errors for {}", bot.tenant_id),
            }
        }
        BotsCommand::Audit { tenant_id } => {
            let entries = client.audit(&tenant_id).await?;
            match format {
                OutputFormat::Json => print_json(&entries)?,
                OutputFormat::Text if entries.is_empty() => println!("No audit entries"),
                OutputFormat::Text => audit_table(&entries, now).render(&mut std::io::stdout()),
            }
        }
    }
    Ok(())
}

fn read_token() -> Result<String> {
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let token = line.trim().to_string();
    if token.is_empty() {
        bail!("no token given: pass --token or pipe it on stdin");
    }
    Ok(token)
}

pub(crate) fn bot_table(bots: &[Bot], now: DateTime<Utc>) -> Table {
    let mut table = Table::new(vec![
        Column::left("TENANT"),
        Column::status("PHASE"),
        Column::status("STATUS"),
        Column::right("PID"),
        Column::right("GUILDS"),
        Column::right("ERRORS"),
        Column::right("RESTARTS"),
        Column::muted("STARTED"),
        Column::left("LAST ERROR").with_max(48),
    ]);
    for bot in bots {
        table.row(vec![
            bot.tenant_id.to_string(),
            bot.phase.to_string(),
            bot.status.to_string(),
            or_dash(bot.process_id),
            or_dash(bot.guilds),
            bot.error_count.to_string(),
            bot.restart_count.to_string(),
            format_time_ago(bot.last_started_at, now),
            bot.last_error.clone().unwrap_or_default(),
        ]);
    }
    table
}

pub(crate) fn audit_table(entries: &[AuditLogEntry], now: DateTime<Utc>) -> Table {
    let mut table = Table::new(vec![
        Column::muted("AGE"),
        Column::left("ACTION"),
        Column::left("USER"),
    ]);
    for entry in entries {
        table.row(vec![
            format_time_ago(Some(entry.timestamp), now),
            entry.action.to_string(),
            entry.user_id.clone(),
        ]);
    }
    table
}

pub(crate) fn format_status(status: &BotStatus, now: DateTime<Utc>) -> String {
    let bot = &status.bot;
    let mut out = String::new();
    let mut line = |label: &str, value: String| {
        out.push_str(&format!("{:<10} {}\n", color::header(label), value));
    };
    line("Tenant", bot.tenant_id.to_string());
    line("Phase", color::status(bot.phase.as_str()));
    line("Status", color::status(&bot.status.to_string()));
    line("PID", or_dash(bot.process_id));
    line("Client", or_dash(bot.client_id.as_deref()));
    line("Errors", bot.error_count.to_string());
    line("Restarts", bot.restart_count.to_string());
    line("Started", format_time_ago(bot.last_started_at, now));
    line("Stopped", format_time_ago(bot.last_stopped_at, now));
    if let Some(error) = &bot.last_error {
        line("Error", error.clone());
    }
    match &status.last_health {
        Some(health) => {
            line("Guilds", health.guild_count.to_string());
            line("Uptime", format_elapsed(health.uptime_ms / 1000));
            line("Memory", format_bytes(health.memory_bytes));
            line("Checked", format_time_ago(Some(health.observed_at), now));
        }
        None => line("Guilds", or_dash(bot.guilds)),
    }
    out
}

pub(crate) fn start_message(verb: &str, result: &StartResult) -> String {
    let pid = or_dash(result.pid);
    if result.already_running {
        format!("{} already running (pid {pid})", result.tenant_id)
    } else {
        format!("{verb} {} (pid {pid})", result.tenant_id)
    }
}

pub(crate) fn stop_message(result: &StopResult) -> String {
    if result.forced {
        format!(
            "Stopped {} (pid {}) after the grace period; worker was killed",
            result.tenant_id, result.pid
        )
    } else {
        format!("Stopped {} (pid {})", result.tenant_id, result.pid)
    }
}

#[cfg(test)]
#[path = "bots_tests.rs"]
mod tests;
