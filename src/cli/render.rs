//! Table output as aligned text, JSON or CSV.

use std::fmt::Write as _;

use anyhow::Context;
use clap::ValueEnum;
use rolling_release::Table;
use serde_json::{Map, Value};

use super::terminal::{self, Colorize};

/// Gap between two columns.
const GAP: &str = "  ";

/// Supported output formats.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

/// Prints `table` to stdout in `format`.
pub fn print(table: &Table, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Table => print!("{}", text(table)),
        OutputFormat::Json => {
            serde_json::to_writer_pretty(std::io::stdout(), &json(table))
                .context("failed to render json output")?;
            println!();
        }
        OutputFormat::Csv => print!("{}", csv(table)),
    }
    Ok(())
}

/// Aligned columns, or one block per row when the terminal is too narrow.
pub fn text(table: &Table) -> String {
    let widths = table.widths();
    let needed = widths.iter().sum::<usize>() + GAP.len() * widths.len().saturating_sub(1);
    if terminal::is_narrow(needed) {
        stacked(table)
    } else {
        aligned(table, &widths)
    }
}

fn aligned(table: &Table, widths: &[usize]) -> String {
    let last = widths.len().saturating_sub(1);
    let pad = |idx: usize, value: &str| {
        if idx == last {
            value.to_string()
        } else {
            format!("{value:<width$}", width = widths[idx])
        }
    };

    let mut out = String::new();
    let header: Vec<String> = table
        .columns
        .iter()
        .enumerate()
        .map(|(idx, column)| pad(idx, &column.title).emphasis())
        .collect();
    let _ = writeln!(out, "{}", header.join(GAP));

    let rule: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    let _ = writeln!(out, "{}", rule.join(GAP).dim());

    for row in &table.rows {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .take(widths.len())
            .map(|(idx, cell)| {
                let cell = pad(idx, cell);
                if table.columns[idx].emphasis {
                    cell.emphasis()
                } else {
                    cell
                }
            })
            .collect();
        let _ = writeln!(out, "{}", cells.join(GAP));
    }
    out
}

fn stacked(table: &Table) -> String {
    let label_width = table
        .columns
        .iter()
        .map(|column| column.title.chars().count())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for (position, row) in table.rows.iter().enumerate() {
        if position > 0 {
            out.push('\n');
        }
        for (column, cell) in table.columns.iter().zip(row) {
            let label = format!("{:>label_width$}", column.title);
            let _ = writeln!(out, "{}: {cell}", label.dim());
        }
    }
    out
}

/// One JSON object per row, keyed by column title.
pub fn json(table: &Table) -> Value {
    Value::Array(
        table
            .rows
            .iter()
            .map(|row| {
                let object: Map<String, Value> = table
                    .columns
                    .iter()
                    .zip(row)
                    .map(|(column, cell)| (column.title.clone(), Value::String(cell.clone())))
                    .collect();
                Value::Object(object)
            })
            .collect(),
    )
}

/// Header line followed by one line per row.
pub fn csv(table: &Table) -> String {
    let mut out = String::new();
    let header: Vec<String> = table
        .columns
        .iter()
        .map(|column| csv_escape(&column.title))
        .collect();
    let _ = writeln!(out, "{}", header.join(","));
    for row in &table.rows {
        let cells: Vec<String> = row.iter().map(|cell| csv_escape(cell)).collect();
        let _ = writeln!(out, "{}", cells.join(","));
    }
    out
}

fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        let escaped = value.replace('"', "\"\"");
        format!("\"{escaped}\"")
    } else {
        value.to_string()
    }
}
