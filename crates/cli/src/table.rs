// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Column-aligned renderer for `fleet bots` list views.

use std::io::Write;

use crate::color;

pub enum Align {
    Left,
    Right,
}

/// How a cell's text is styled after padding.
pub enum CellStyle {
    Plain,
    Muted,
    /// Colored by [`color::apply_status`]
    Status,
}

pub struct Column {
    pub name: &'static str,
    pub align: Align,
    pub style: CellStyle,
    /// Values longer than this are truncated
    pub max_width: Option<usize>,
}

impl Column {
    fn new(name: &'static str, align: Align, style: CellStyle) -> Self {
        Self {
            name,
            align,
            style,
            max_width: None,
        }
    }

    pub fn left(name: &'static str) -> Self {
        Self::new(name, Align::Left, CellStyle::Plain)
    }

    pub fn right(name: &'static str) -> Self {
        Self::new(name, Align::Right, CellStyle::Plain)
    }

    pub fn muted(name: &'static str) -> Self {
        Self::new(name, Align::Left, CellStyle::Muted)
    }

    pub fn status(name: &'static str) -> Self {
        Self::new(name, Align::Left, CellStyle::Status)
    }

    pub fn with_max(mut self, max: usize) -> Self {
        self.max_width = Some(max);
        self
    }
}

pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Vec<String>>,
    colorize: bool,
}

/// Column separator: double space.
const SEP: &str = "  ";

impl Table {
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            colorize: color::should_colorize(),
        }
    }

    /// Create a table that never emits color codes.
    #[cfg(test)]
    pub fn plain(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            colorize: false,
        }
    }

    #[cfg(test)]
    pub fn colored(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            colorize: true,
        }
    }

    pub fn row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render header and rows. The last column is never padded; color is
    /// applied after padding so escapes don't skew widths.
    pub fn render(&self, out: &mut impl Write) {
        if self.rows.is_empty() {
            return;
        }
        let widths = self.compute_widths();
        let last = self.columns.len().saturating_sub(1);

        let header: Vec<String> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, col)| {
                let padded = if i == last && matches!(col.align, Align::Left) {
                    col.name.to_string()
                } else {
                    pad(col.name, widths[i], &col.align)
                };
                if self.colorize {
                    color::apply_header(&padded)
                } else {
                    padded
                }
            })
            .collect();
        let _ = writeln!(out, "{}", header.join(SEP));

        for row in &self.rows {
            let cells: Vec<String> = self
                .columns
                .iter()
                .enumerate()
                .map(|(i, col)| {
                    let raw = row.get(i).map(String::as_str).unwrap_or("");
                    let truncated = truncate(raw, col.max_width);
                    let padded = if i == last && matches!(col.align, Align::Left) {
                        truncated.to_string()
                    } else {
                        pad(truncated, widths[i], &col.align)
                    };
                    stylize(&padded, &col.style, self.colorize)
                })
                .collect();
            let _ = writeln!(out, "{}", cells.join(SEP));
        }
    }

    fn compute_widths(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .map(|(i, col)| {
                let data = self
                    .rows
                    .iter()
                    .map(|row| {
                        let len = row.get(i).map(|s| s.chars().count()).unwrap_or(0);
                        col.max_width.map_or(len, |max| len.min(max))
                    })
                    .max()
                    .unwrap_or(0);
                col.name.len().max(data)
            })
            .collect()
    }
}

fn pad(text: &str, width: usize, align: &Align) -> String {
    match align {
        Align::Left => format!("{:<width$}", text),
        Align::Right => format!("{:>width$}", text),
    }
}

/// Truncate to at most `max` characters, on a char boundary.
fn truncate(s: &str, max: Option<usize>) -> &str {
    match max {
        Some(m) => match s.char_indices().nth(m) {
            Some((idx, _)) => &s[..idx],
            None => s,
        },
        None => s,
    }
}

fn stylize(text: &str, style: &CellStyle, colorize: bool) -> String {
    if !colorize {
        return text.to_string();
    }
    match style {
        CellStyle::Plain => text.to_string(),
        CellStyle::Muted => color::apply_muted(text),
        CellStyle::Status => color::apply_status(text),
    }
}

#[cfg(test)]
#[path = "table_tests.rs"]
mod tests;
