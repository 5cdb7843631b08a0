//! Rendering for `--output`.
//!
//! Lists go through `tabled` in table mode; everything else is serialized
//! from the domain value itself so scripts see the same fields the engine
//! holds.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

use crate::cli::{ColorMode, OutputFormat};

// ── Color ────────────────────────────────────────────────────────────

pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => std::env::var_os("NO_COLOR").is_none() && io::stdout().is_terminal(),
    }
}

/// Green when `good`, red otherwise.
pub fn status_text(text: &str, good: bool, color: bool) -> String {
    if !color {
        return text.to_owned();
    }
    if good {
        text.green().to_string()
    } else {
        text.red().to_string()
    }
}

pub fn warn_text(text: &str, color: bool) -> String {
    if color {
        text.yellow().to_string()
    } else {
        text.to_owned()
    }
}

// ── Rendering ────────────────────────────────────────────────────────

/// Structured formats, or `None` for the two human-oriented ones.
fn structured<T: Serialize + ?Sized>(format: &OutputFormat, data: &T) -> Option<String> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(data).map_err(|e| e.to_string()),
        OutputFormat::JsonCompact => serde_json::to_string(data).map_err(|e| e.to_string()),
        OutputFormat::Yaml => serde_yaml::to_string(data).map_err(|e| e.to_string()),
        OutputFormat::Table | OutputFormat::Plain => return None,
    };
    Some(rendered.unwrap_or_else(|e| format!("error: could not serialize output: {e}")))
}

/// Render a collection. `plain` emits `key` per item, one per line.
pub fn render_list<T, R>(
    format: &OutputFormat,
    items: &[T],
    row: impl Fn(&T) -> R,
    key: impl Fn(&T) -> String,
) -> String
where
    T: Serialize,
    R: Tabled,
{
    if let Some(out) = structured(format, items) {
        return out;
    }
    match format {
        OutputFormat::Plain => items.iter().map(key).collect::<Vec<_>>().join("\n"),
        _ => {
            let rows: Vec<R> = items.iter().map(row).collect();
            Table::new(rows).with(Style::rounded()).to_string()
        }
    }
}

/// Render one value. Table mode uses `detail` instead of a table.
pub fn render_single<T: Serialize>(
    format: &OutputFormat,
    item: &T,
    detail: impl Fn(&T) -> String,
    key: impl Fn(&T) -> String,
) -> String {
    if let Some(out) = structured(format, item) {
        return out;
    }
    match format {
        OutputFormat::Plain => key(item),
        _ => detail(item),
    }
}

/// Write to stdout unless `--quiet`. Empty output prints nothing.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let _ = writeln!(io::stdout().lock(), "{output}");
}
