// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use clap::error::ErrorKind;

fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
    Cli::try_parse_from(std::iter::once("fleet").chain(args.iter().copied()))
}

#[test]
fn version_flag() {
    let err = parse(&["--version"]).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::DisplayVersion);
}

#[test]
fn no_subcommand_is_allowed() {
    assert!(parse(&[]).unwrap().command.is_none());
}

#[test]
fn global_flags_after_subcommand() {
    let cli = parse(&["bots", "list", "-o", "json", "--url", "http://h:1/api"]).unwrap();
    assert_eq!(cli.output, OutputFormat::Json);
    assert_eq!(cli.url.as_deref(), Some("http://h:1/api"));
}

#[yare::parameterized(
    list = { &["bots", "list"] },
    status = { &["bots", "status", "t1"] },
    start = { &["bots", "start", "t1"] },
    stop = { &["bots", "stop", "t1"] },
    restart = { &["bots", "restart", "t1"] },
    reset = { &["bots", "reset-errors", "t1"] },
    audit = { &["bots", "audit", "t1"] },
    register = { &["bots", "register", "t1", "--token", "tok", "--client-id", "app"] },
    channels = { &["config", "channels"] },
)]
fn accepted_commands(args: &[&str]) {
    assert!(parse(args).is_ok(), "{args:?}");
}

#[yare::parameterized(
    missing_tenant = { &["bots", "start"] },
    unknown_bots_command = { &["bots", "purge", "t1"] },
    unknown_command = { &["deploy"] },
)]
fn rejected_commands(args: &[&str]) {
    assert!(parse(args).is_err(), "{args:?}");
}

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn error_chain_is_deduplicated() {
    let inner = anyhow::anyhow!("connection refused");
    let outer = inner.context("request failed: connection refused");
    assert_eq!(format_error(&outer), "request failed: connection refused");

    let inner = anyhow::anyhow!("connection refused");
    let outer = inner.context("listing bots");
    assert!(format_error(&outer).contains("Caused by:\n    0: connection refused"));
}
