// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::io::IsTerminal;

pub mod codes {
    /// Section headers: steel blue
    pub const HEADER: u8 = 74;
    /// Commands and literals: light grey
    pub const LITERAL: u8 = 250;
    /// Muted / secondary text: darker grey
    pub const MUTED: u8 = 240;
}

/// Determine if color output should be enabled.
///
/// Priority: `NO_COLOR=1` disables → `COLOR=1` forces → TTY check.
pub fn should_colorize() -> bool {
    if crate::env::no_color() {
        return false;
    }
    if crate::env::force_color() {
        return true;
    }
    std::io::stdout().is_terminal()
}

/// clap help styles matching the palette below
pub fn styles() -> clap::builder::styling::Styles {
    use clap::builder::styling::{Ansi256Color, Color, Style, Styles};
    if !should_colorize() {
        return Styles::plain();
    }
    let fg = |code: u8| Style::new().fg_color(Some(Color::Ansi256(Ansi256Color(code))));
    Styles::styled()
        .header(fg(codes::HEADER))
        .usage(fg(codes::HEADER))
        .literal(fg(codes::LITERAL))
        .placeholder(fg(codes::MUTED))
}

fn fg256(code: u8) -> String {
    format!("\x1b[38;5;{code}m")
}

const RESET: &str = "\x1b[0m";

pub fn header(text: &str) -> String {
    if should_colorize() {
        apply_header(text)
    } else {
        text.to_string()
    }
}

pub(crate) fn apply_header(text: &str) -> String {
    format!("{}{}{}", fg256(codes::HEADER), text, RESET)
}

pub fn muted(text: &str) -> String {
    if should_colorize() {
        apply_muted(text)
    } else {
        text.to_string()
    }
}

pub(crate) fn apply_muted(text: &str) -> String {
    format!("{}{}{}", fg256(codes::MUTED), text, RESET)
}

/// Colorize a tenant status or worker phase.
///
/// - Green: RUNNING
/// - Yellow: PENDING, STARTING, STOPPING, STOPPED
/// - Red: CRASHED, ERROR
pub fn status(text: &str) -> String {
    if !should_colorize() {
        return text.to_string();
    }
    apply_status(text)
}

pub(crate) fn apply_status(text: &str) -> String {
    let word = text.trim().to_ascii_uppercase();
    let code = match word.as_str() {
        "RUNNING" => "\x1b[32m",
        "PENDING" | "STARTING" | "STOPPING" | "STOPPED" => "\x1b[33m",
        "CRASHED" | "ERROR" => "\x1b[31m",
        _ => return text.to_string(),
    };
    format!("{code}{text}{RESET}")
}

#[cfg(test)]
#[path = "color_tests.rs"]
mod tests;
