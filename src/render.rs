//! Result renderer - type-tagged views of a result record
//!
//! Each output field renders according to its declared type. Values whose
//! shape does not fit the declared type fall back to plain text.

use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::data_url::{self, DataUrlError};
use crate::descriptor::{OutputField, OutputKind, ToolDescriptor};
use crate::style;
use crate::Outputs;

/// Objects with more entries than this render as raw JSON only
const MAX_JSON_TABLE_ENTRIES: usize = 20;

const NO_DATA: &str = "No data";

/// A downloadable artifact carried by an output value
#[derive(Debug, Clone, Serialize)]
pub struct Download {
    pub file_name: String,
    pub data_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenderedField {
    pub id: String,
    pub label: String,
    pub kind: OutputKind,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download: Option<Download>,
    /// Offers the "use as input" action
    pub reversible: bool,
}

/// Render every output of the descriptor, in schema order
pub fn render_result(descriptor: &ToolDescriptor, outputs: &Outputs) -> Vec<RenderedField> {
    descriptor
        .outputs
        .iter()
        .map(|field| {
            let value = outputs.get(&field.id).filter(|v| !v.is_null());
            let mut rendered = render_field(field, value);
            rendered.reversible = descriptor.reversible && field.reversible && value.is_some();
            rendered
        })
        .collect()
}

pub fn render_field(field: &OutputField, value: Option<&Value>) -> RenderedField {
    let mut rendered = RenderedField {
        id: field.id.clone(),
        label: field.label.clone(),
        kind: field.kind,
        body: NO_DATA.to_string(),
        download: None,
        reversible: false,
    };
    let Some(value) = value else {
        return rendered;
    };

    match (field.kind, value) {
        (OutputKind::Image, Value::String(url)) if data_url::is_data_url(url) => {
            rendered.body = describe_data_url(url);
            rendered.download = Some(Download { file_name: format!("{}.jpg", field.id), data_url: url.clone() });
        }
        (OutputKind::Image, Value::String(url)) => {
            rendered.body = url.clone();
        }
        (OutputKind::Json, _) => {
            rendered.body = render_json(value);
        }
        (OutputKind::Table, Value::Array(rows)) if !rows.is_empty() => {
            rendered.body = render_table(rows);
        }
        (OutputKind::Table, _) => {}
        (OutputKind::Chart, _) => {
            rendered.body = "Chart rendering is not available; raw data:\n".to_string() + &pretty(value);
        }
        (OutputKind::File, Value::String(url)) if data_url::is_data_url(url) => {
            rendered.body = describe_data_url(url);
            rendered.download = Some(Download { file_name: format!("{}.txt", field.id), data_url: url.clone() });
        }
        _ => {
            rendered.body = plain_text(value);
        }
    }
    rendered
}

fn plain_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn describe_data_url(url: &str) -> String {
    match data_url::decode(url) {
        Ok(decoded) => format!("{} ({} bytes)", decoded.mime, decoded.bytes.len()),
        Err(e) => format!("unreadable data URL: {e}"),
    }
}

/// Small flat objects get a key/value table above the raw JSON
fn render_json(value: &Value) -> String {
    let Value::Object(map) = value else {
        return pretty(value);
    };
    let entries: Vec<(&String, &Value)> = map.iter().filter(|(_, v)| !v.is_null()).collect();
    if entries.is_empty() || entries.len() > MAX_JSON_TABLE_ENTRIES {
        return pretty(value);
    }

    let width = entries.iter().map(|(k, _)| k.chars().count()).max().unwrap_or(0);
    let mut lines: Vec<String> = entries
        .iter()
        .map(|(k, v)| format!("{:<width$}  {}", k, plain_text(v), width = width))
        .collect();
    lines.push(String::new());
    lines.push(pretty(value));
    lines.join("\n")
}

/// Empty table cells: null, false, 0 and ""
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Columns come from the first row's keys
fn render_table(rows: &[Value]) -> String {
    let headers: Vec<String> = match rows.first() {
        Some(Value::Object(first)) => first.keys().cloned().collect(),
        _ => return rows.iter().map(plain_text).collect::<Vec<_>>().join("\n"),
    };

    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            headers
                .iter()
                .map(|h| match row.get(h) {
                    Some(v) if !is_falsy(v) => plain_text(v),
                    _ => String::new(),
                })
                .collect()
        })
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            cells.iter().map(|r| r[i].chars().count()).chain(std::iter::once(h.chars().count())).max().unwrap_or(0)
        })
        .collect();

    let format_row = |row: &[String]| -> String {
        row.iter()
            .zip(&widths)
            .map(|(cell, w)| format!("{:<w$}", cell, w = *w))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![format_row(&headers)];
    lines.push(widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("-+-"));
    lines.extend(cells.iter().map(|r| format_row(r)));
    lines.join("\n")
}

/// Terminal view of rendered fields
pub fn to_text(fields: &[RenderedField]) -> String {
    let mut out = Vec::new();
    for field in fields {
        let mut header = style::section(&field.label);
        if field.reversible {
            header.push_str(&format!("  {}", style::dim(&format!("[use as input: --use-output {}]", field.id))));
        }
        out.push(header);
        out.push(field.body.clone());
        if let Some(download) = &field.download {
            out.push(style::dim(&format!("{} download: {}", style::arrow(), download.file_name)));
        }
        out.push(String::new());
    }
    out.join("\n")
}

/// Render errors
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Invalid download for '{field}': {source}")]
    InvalidDownload { field: String, source: DataUrlError },

    #[error("Failed to write {path}: {source}")]
    Write { path: PathBuf, source: std::io::Error },
}

/// Decode every download and write it into `dir`
pub async fn save_downloads(fields: &[RenderedField], dir: &Path) -> Result<Vec<PathBuf>, RenderError> {
    let mut saved = Vec::new();
    for field in fields {
        let Some(download) = &field.download else { continue };
        let decoded = data_url::decode(&download.data_url).map_err(|source| RenderError::InvalidDownload {
            field: field.id.clone(),
            source,
        })?;

        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| RenderError::Write { path: dir.to_path_buf(), source })?;
        let path = dir.join(&download.file_name);
        tokio::fs::write(&path, &decoded.bytes)
            .await
            .map_err(|source| RenderError::Write { path: path.clone(), source })?;
        tracing::info!(path = %path.display(), bytes = decoded.bytes.len(), "Saved download");
        saved.push(path);
    }
    Ok(saved)
}
