// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `fleet config` - notify workers that guild settings changed

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use fleet_adapters::{ConfigBus, ConfigPublisher, RedisBus};
use fleet_core::{ConfigAction, ConfigModule, GuildId, SystemClock};

use crate::output::{print_json, OutputFormat};

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Publish a config-changed notification
    Publish {
        /// Settings module, e.g. welcome
        module: ConfigModule,
        guild_id: String,
        /// create, update or delete
        action: ConfigAction,
        /// Broker URL (defaults to $REDIS_URL)
        #[arg(long)]
        redis_url: Option<String>,
    },
    /// List the pub/sub channel of every module
    Channels,
}

pub async fn handle(command: ConfigCommand, format: OutputFormat) -> Result<()> {
    match command {
        ConfigCommand::Publish {
            module,
            guild_id,
            action,
            redis_url,
        } => {
            let url = redis_url
                .or_else(crate::env::redis_url)
                .context("no broker configured: pass --redis-url or set REDIS_URL")?;
            let bus = RedisBus::open(&url)?;
            let message = publish(bus, module, GuildId::new(guild_id), action).await?;
            match format {
                OutputFormat::Json => print_json(&message)?,
                OutputFormat::Text => println!(
                    "Published {} {} for guild {} on {}",
                    message.module,
                    message.action,
                    message.guild_id,
                    message.channel()
                ),
            }
        }
        ConfigCommand::Channels => {
            let channels = ConfigModule::all_channels();
            match format {
                OutputFormat::Json => print_json(&channels)?,
                OutputFormat::Text => {
                    for channel in channels {
                        println!("{channel}");
                    }
                }
            }
        }
    }
    Ok(())
}

pub(crate) async fn publish<B: ConfigBus>(
    bus: B,
    module: ConfigModule,
    guild_id: GuildId,
    action: ConfigAction,
) -> Result<fleet_core::ConfigUpdateMessage> {
    let message = ConfigPublisher::new(bus, SystemClock)
        .publish(module, guild_id, action)
        .await?;
    Ok(message)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
