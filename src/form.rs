//! Form collection - raw submitted field values to typed inputs

use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::descriptor::{InputField, InputKind, ToolDescriptor};

/// Uploaded file passed to logic modules as a binary handle
#[derive(Debug, Clone, PartialEq)]
pub struct FileHandle {
    pub name: String,
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

impl FileHandle {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let mime = mime_from_name(&name).map(String::from);
        Self { name, mime, bytes }
    }

    /// Read a file from disk
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, FileError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| FileError { path: path.to_path_buf(), source })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, bytes))
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Failed to read {path}: {source}")]
pub struct FileError {
    pub path: PathBuf,
    pub source: std::io::Error,
}

fn mime_from_name(name: &str) -> Option<&'static str> {
    let ext = name.rsplit_once('.')?.1.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        "txt" => Some("text/plain"),
        "json" => Some("application/json"),
        _ => None,
    }
}

/// A typed input value
#[derive(Debug, Clone, PartialEq)]
pub enum InputValue {
    Text(String),
    Number(f64),
    Bool(bool),
    File(FileHandle),
}

/// Typed inputs handed to a logic module, keyed by input field id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inputs(BTreeMap<String, InputValue>);

impl Inputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, value: InputValue) {
        self.0.insert(id.into(), value);
    }

    pub fn with(mut self, id: impl Into<String>, value: InputValue) -> Self {
        self.insert(id, value);
        self
    }

    pub fn text(&self, id: &str) -> Option<&str> {
        match self.0.get(id) {
            Some(InputValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn number(&self, id: &str) -> Option<f64> {
        match self.0.get(id) {
            Some(InputValue::Number(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn flag(&self, id: &str) -> Option<bool> {
        match self.0.get(id) {
            Some(InputValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// Take a file out of the inputs, avoiding a copy of its bytes
    pub fn take_file(&mut self, id: &str) -> Option<FileHandle> {
        match self.0.remove(id) {
            Some(InputValue::File(f)) => Some(f),
            Some(other) => {
                self.0.insert(id.to_string(), other);
                None
            }
            None => None,
        }
    }

    /// JSON view for logging and `--output json`; files are summarized
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self.0.iter().map(|(k, v)| {
            let value = match v {
                InputValue::Text(s) => json!(s),
                InputValue::Number(n) => json!(n),
                InputValue::Bool(b) => json!(b),
                InputValue::File(f) => json!({"name": f.name, "type": f.mime, "size": f.size()}),
            };
            (k.clone(), value)
        }).collect();
        Value::Object(map)
    }
}

/// Raw named values as submitted by a form
#[derive(Debug, Clone, Default)]
pub struct FormSubmission {
    pub fields: BTreeMap<String, String>,
    pub files: BTreeMap<String, FileHandle>,
}

impl FormSubmission {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, id: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(id.into(), value.into());
        self
    }

    pub fn file(mut self, id: impl Into<String>, file: FileHandle) -> Self {
        self.files.insert(id.into(), file);
        self
    }
}

/// Form collection errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Field '{field}' must be one of: {allowed}")]
    InvalidOption { field: String, allowed: String },

    #[error("Field '{field}' is out of range ({value} not in {min}..={max})")]
    OutOfRange { field: String, value: f64, min: f64, max: f64 },
}

/// Leading-number parse, 0 on failure or NaN
fn parse_number(raw: &str) -> f64 {
    let trimmed = raw.trim();
    let bytes = trimmed.as_bytes();
    let mut end = 0;
    for (i, &b) in bytes.iter().enumerate() {
        let sign = (b == b'-' || b == b'+') && (i == 0 || matches!(bytes[i - 1], b'e' | b'E'));
        if b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E') || sign {
            end = i + 1;
        } else {
            break;
        }
    }
    // Shrink until the prefix parses ("12e" -> "12")
    let mut prefix = &trimmed[..end];
    while !prefix.is_empty() {
        if let Ok(n) = prefix.parse::<f64>() {
            return if n.is_nan() { 0.0 } else { n };
        }
        prefix = &prefix[..prefix.len() - 1];
    }
    0.0
}

fn parse_checkbox(raw: &str) -> bool {
    !matches!(raw.trim().to_ascii_lowercase().as_str(), "false" | "off" | "0" | "no")
}

/// Collect a submission into typed inputs according to the descriptor
pub fn collect_inputs(descriptor: &ToolDescriptor, submission: &FormSubmission) -> Result<Inputs, FormError> {
    let mut inputs = Inputs::new();
    for field in &descriptor.inputs {
        if let Some(value) = collect_field(field, submission)? {
            inputs.insert(field.id.clone(), value);
        }
    }
    Ok(inputs)
}

fn collect_field(field: &InputField, submission: &FormSubmission) -> Result<Option<InputValue>, FormError> {
    if field.kind == InputKind::File {
        return match submission.files.get(&field.id) {
            Some(file) => Ok(Some(InputValue::File(file.clone()))),
            None if field.required => Err(FormError::MissingField(field.id.clone())),
            None => Ok(None),
        };
    }

    let submitted = submission.fields.get(&field.id).cloned();
    let default = field.default_value.as_ref().map(|d| d.as_form_value());

    // Unchecked boxes are not submitted
    if field.kind == InputKind::Checkbox {
        let checked = submitted.map(|raw| parse_checkbox(&raw)).unwrap_or(false);
        return Ok(Some(InputValue::Bool(checked)));
    }

    let raw = match submitted.filter(|v| !v.is_empty()).or(default) {
        Some(raw) => raw,
        None if field.required => return Err(FormError::MissingField(field.id.clone())),
        None => match field.kind {
            InputKind::Number => return Ok(Some(InputValue::Number(0.0))),
            // A select without a chosen value submits its first option
            InputKind::Select => match field.options.first() {
                Some(first) => first.value.clone(),
                None => String::new(),
            },
            _ => String::new(),
        },
    };

    match field.kind {
        InputKind::Number => {
            let value = parse_number(&raw);
            let min = field.min.unwrap_or(f64::NEG_INFINITY);
            let max = field.max.unwrap_or(f64::INFINITY);
            if value < min || value > max {
                return Err(FormError::OutOfRange { field: field.id.clone(), value, min, max });
            }
            Ok(Some(InputValue::Number(value)))
        }
        InputKind::Select => {
            if !field.options.iter().any(|o| o.value == raw) {
                let allowed = field.options.iter().map(|o| o.value.as_str()).collect::<Vec<_>>().join(", ");
                return Err(FormError::InvalidOption { field: field.id.clone(), allowed });
            }
            Ok(Some(InputValue::Text(raw)))
        }
        _ => Ok(Some(InputValue::Text(raw))),
    }
}
