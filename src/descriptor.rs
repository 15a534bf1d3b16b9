//! Tool descriptors - the declarative inputs/outputs schema of a tool
//!
//! Descriptors are parsed from JSON (camelCase keys) and validated once at
//! load time. They are immutable afterwards.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub inputs: Vec<InputField>,
    pub outputs: Vec<OutputField>,
    /// Logic module key. Required for catalog content, optional for plugins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logic: Option<String>,
    #[serde(default)]
    pub reversible: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reverse_mapping: Vec<ReverseMapping>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Text,
    Number,
    File,
    Select,
    Textarea,
    Checkbox,
}

impl std::fmt::Display for InputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputKind::Text => write!(f, "text"),
            InputKind::Number => write!(f, "number"),
            InputKind::File => write!(f, "file"),
            InputKind::Select => write!(f, "select"),
            InputKind::Textarea => write!(f, "textarea"),
            InputKind::Checkbox => write!(f, "checkbox"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefaultValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl DefaultValue {
    /// Render the default the way a form field would hold it
    pub fn as_form_value(&self) -> String {
        match self {
            DefaultValue::Bool(b) => b.to_string(),
            DefaultValue::Number(n) => n.to_string(),
            DefaultValue::Text(s) => s.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputField {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: InputKind,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accept: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<DefaultValue>,
}

fn default_required() -> bool { true }

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    Text,
    Image,
    Json,
    Chart,
    Table,
    File,
}

impl std::fmt::Display for OutputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputKind::Text => write!(f, "text"),
            OutputKind::Image => write!(f, "image"),
            OutputKind::Json => write!(f, "json"),
            OutputKind::Chart => write!(f, "chart"),
            OutputKind::Table => write!(f, "table"),
            OutputKind::File => write!(f, "file"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputField {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: OutputKind,
    pub label: String,
    #[serde(default)]
    pub reversible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingKind {
    #[default]
    Direct,
    Transform,
}

/// Links an output field back to an input field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReverseMapping {
    pub from: String,
    pub to: String,
    #[serde(default, rename = "type")]
    pub kind: MappingKind,
}

/// Descriptor errors
#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    #[error("Malformed descriptor: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid tool '{tool}': {field}: {reason}")]
    Invalid { tool: String, field: String, reason: String },
}

impl ToolDescriptor {
    /// Parse and validate a catalog descriptor (logic key required)
    pub fn from_json(text: &str) -> Result<Self, DescriptorError> {
        let descriptor: ToolDescriptor = serde_json::from_str(text)?;
        descriptor.validate(true)?;
        Ok(descriptor)
    }

    pub fn input(&self, id: &str) -> Option<&InputField> {
        self.inputs.iter().find(|i| i.id == id)
    }

    pub fn output(&self, id: &str) -> Option<&OutputField> {
        self.outputs.iter().find(|o| o.id == id)
    }

    pub fn mapping_for(&self, output_id: &str) -> Option<&ReverseMapping> {
        self.reverse_mapping.iter().find(|m| m.from == output_id)
    }

    pub fn validate(&self, require_logic: bool) -> Result<(), DescriptorError> {
        let invalid = |field: &str, reason: &str| DescriptorError::Invalid {
            tool: if self.id.is_empty() { "<unnamed>".to_string() } else { self.id.clone() },
            field: field.to_string(),
            reason: reason.to_string(),
        };

        if self.id.trim().is_empty() {
            return Err(invalid("id", "must not be empty"));
        }
        if self.title.trim().is_empty() {
            return Err(invalid("title", "must not be empty"));
        }

        let mut seen = HashSet::new();
        for input in &self.inputs {
            if input.id.trim().is_empty() {
                return Err(invalid("inputs", "input id must not be empty"));
            }
            if !seen.insert(input.id.as_str()) {
                return Err(invalid(&format!("inputs.{}", input.id), "duplicate input id"));
            }
            let field = format!("inputs.{}", input.id);
            if input.kind == InputKind::Select && input.options.is_empty() {
                return Err(invalid(&field, "select input needs at least one option"));
            }
            if let (Some(min), Some(max)) = (input.min, input.max) {
                if min > max {
                    return Err(invalid(&field, "min is greater than max"));
                }
            }
            if let Some(step) = input.step {
                if step <= 0.0 {
                    return Err(invalid(&field, "step must be positive"));
                }
            }
        }

        let mut seen = HashSet::new();
        for output in &self.outputs {
            if output.id.trim().is_empty() {
                return Err(invalid("outputs", "output id must not be empty"));
            }
            if !seen.insert(output.id.as_str()) {
                return Err(invalid(&format!("outputs.{}", output.id), "duplicate output id"));
            }
        }

        if require_logic && self.logic.as_deref().map_or(true, |l| l.trim().is_empty()) {
            return Err(invalid("logic", "missing logic module key"));
        }

        for mapping in &self.reverse_mapping {
            if self.output(&mapping.from).is_none() {
                return Err(invalid(
                    "reverseMapping",
                    &format!("'{}' is not a declared output", mapping.from),
                ));
            }
            if self.input(&mapping.to).is_none() {
                return Err(invalid(
                    "reverseMapping",
                    &format!("'{}' is not a declared input", mapping.to),
                ));
            }
        }

        Ok(())
    }
}
