//! CLI output handling.
//!
//! Results are rendered for a terminal, as JSON lines, or as bare rows in
//! quiet mode.

use std::io::{self, Write};

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;

use crate::result::{ResultKind, ResultPayload};

/// Print one value as a JSON line.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    io::stdout().flush()?;
    Ok(())
}

/// Print a statement result in the selected output mode.
pub fn print_result(payload: &ResultPayload, json_mode: bool, quiet_mode: bool) -> Result<()> {
    if json_mode {
        return print_json(payload);
    }

    let mut stdout = io::stdout().lock();
    if quiet_mode {
        for row in &payload.rows {
            writeln!(stdout, "{}", render_row(row))?;
        }
    } else {
        write!(stdout, "{}", render_table(payload))?;
        for image in &payload.images {
            writeln!(stdout, "[image: {} bytes]", image.len())?;
        }
    }
    stdout.flush()?;
    Ok(())
}

/// Render a result as tab separated text, with a header for tables.
pub fn render_table(payload: &ResultPayload) -> String {
    let mut out = String::new();
    if payload.kind == ResultKind::Table {
        let header: Vec<&str> = payload.schema.iter().map(|c| c.name.as_str()).collect();
        out.push_str(&header.join("\t"));
        out.push('\n');
    }
    for row in &payload.rows {
        out.push_str(&render_row(row));
        out.push('\n');
    }
    out
}

fn render_row(row: &[Value]) -> String {
    row.iter()
        .map(|cell| match cell {
            Value::String(s) => s.clone(),
            Value::Null => "NULL".to_string(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\t")
}
