//! Plain-text rendering of list results and batch outcomes.

use crate::ops::batch::{BatchResult, Outcome};
use crate::resource::ColumnDef;
use clap::ValueEnum;
use serde_json::Value;

/// How listings are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

/// Extract a value from JSON using a dot-notation path
pub fn extract_json_value(item: &Value, path: &str) -> String {
    let parts: Vec<&str> = path.split('.').collect();
    let mut current = item;

    for part in parts {
        // Handle array index
        if let Ok(idx) = part.parse::<usize>() {
            current = match current.get(idx) {
                Some(v) => v,
                None => return "-".to_string(),
            };
        } else {
            current = match current.get(part) {
                Some(v) => v,
                None => return "-".to_string(),
            };
        }
    }

    match current {
        Value::String(s) => shorten_link(s),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        Value::Array(arr) => arr
            .iter()
            .map(|v| match v {
                Value::String(s) => shorten_link(s),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object]".to_string(),
    }
}

/// Self-links are noise in a table; show their last path segment.
fn shorten_link(value: &str) -> String {
    if value.starts_with("https://") || value.starts_with("http://") {
        return value.rsplit('/').next().unwrap_or(value).to_string();
    }
    value.to_string()
}

/// Case-insensitive sort of items by a JSON field.
pub fn sort_items_by(items: &mut [Value], path: &str) {
    items.sort_by_key(|item| extract_json_value(item, path).to_lowercase());
}

/// Render items as an aligned column table.
pub fn render_table(columns: &[ColumnDef], items: &[Value]) -> String {
    let mut widths: Vec<usize> = columns
        .iter()
        .map(|c| c.width.max(c.header.len()))
        .collect();

    let rows: Vec<Vec<String>> = items
        .iter()
        .map(|item| {
            columns
                .iter()
                .map(|c| extract_json_value(item, &c.json_path))
                .collect()
        })
        .collect();

    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.len());
        }
    }

    let mut out = String::new();
    write_row(
        &mut out,
        &columns.iter().map(|c| c.header.clone()).collect::<Vec<_>>(),
        &widths,
    );
    for row in &rows {
        write_row(&mut out, row, &widths);
    }
    out
}

fn write_row(out: &mut String, cells: &[String], widths: &[usize]) {
    let last = cells.len().saturating_sub(1);
    for (i, cell) in cells.iter().enumerate() {
        if i == last {
            out.push_str(cell);
        } else {
            out.push_str(&format!("{:<width$}  ", cell, width = widths[i]));
        }
    }
    // Empty last cells leave separator padding dangling.
    while out.ends_with(' ') {
        out.pop();
    }
    out.push('\n');
}

/// Render the per-target outcome listing for a completed batch. Every
/// target appears, whatever its outcome.
pub fn render_batch_summary(result: &BatchResult) -> String {
    let mut out = String::new();
    for (target, outcome) in result.entries() {
        let line = match outcome {
            Outcome::Succeeded => format!("ok      {}", target),
            Outcome::Failed(cause) => format!("failed  {}: {}", target, cause),
            Outcome::Skipped(reason) => format!("skipped {}: {}", target, reason),
        };
        out.push_str(&line);
        out.push('\n');
    }
    out.push_str(&format!(
        "{} succeeded, {} failed, {} total\n",
        result.succeeded(),
        result.failed(),
        result.len()
    ));
    out
}
