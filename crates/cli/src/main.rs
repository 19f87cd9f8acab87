// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fleet - operator CLI for the bot fleet manager

mod client;
mod color;
mod commands;
mod env;
mod output;
mod table;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use commands::{bots, config};
use output::OutputFormat;

use crate::client::ApiClient;

#[derive(Parser)]
#[command(
    name = "fleet",
    version,
    about = "Operate the multi-tenant bot fleet",
    styles = color::styles()
)]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, default_value_t, global = true)]
    output: OutputFormat,

    /// Control API URL including base path (defaults to $FLEET_API_URL)
    #[arg(long, global = true)]
    url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Bot lifecycle: list, start, stop, register...
    Bots(bots::BotsArgs),
    /// Config-change notifications
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", format_error(&e));
        std::process::exit(1);
    }
}

/// Render an error chain, skipping causes the top message already repeats.
fn format_error(err: &anyhow::Error) -> String {
    let top = err.to_string();
    let chain_redundant = err
        .chain()
        .skip(1)
        .all(|cause| top.contains(&cause.to_string()));
    if chain_redundant {
        return top;
    }
    let mut buf = top;
    for (i, cause) in err.chain().skip(1).enumerate() {
        buf.push_str(&format!("\n\nCaused by:\n    {}: {}", i, cause));
    }
    buf
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let format = cli.output;

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    match command {
        Commands::Bots(args) => {
            let url = cli.url.unwrap_or_else(env::api_url);
            let client = ApiClient::from_env(&url)?;
            bots::handle(args.command, &client, format).await
        }
        Commands::Config(args) => config::handle(args.command, format).await,
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
