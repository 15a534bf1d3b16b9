//! Plugin loader - external tool descriptors bound to pre-registered handlers
//!
//! A plugin is a JSON document: a tool descriptor (logic optional) plus a
//! `run` member naming a handler registered here. Sources are local paths or
//! http(s) URLs. There is no integrity or origin check.

use serde_json::{json, Value};
use std::time::Duration;

use crate::descriptor::{DescriptorError, ToolDescriptor};
use crate::logic::LogicError;
use crate::runner::ToolRunner;
use crate::{BoxFuture, Inputs, Logic, Outputs};

/// Plugin load errors
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("Missing plugin source (src)")]
    MissingSource,

    #[error("Failed to fetch plugin {src}: {reason}")]
    Fetch { src: String, reason: String },

    #[error("Malformed plugin: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid plugin: missing run function")]
    MissingRun,

    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
}

/// A loaded plugin
pub struct Plugin {
    pub src: String,
    pub descriptor: ToolDescriptor,
    pub handler: Box<dyn Logic>,
}

impl Plugin {
    pub fn into_runner(self) -> ToolRunner {
        ToolRunner::with_handler(self.descriptor, self.handler)
    }
}

// ========== Handlers ==========

/// Reverses the `text` input
pub struct ReverseText;

impl Logic for ReverseText {
    fn name(&self) -> &'static str { "reverseText" }
    fn description(&self) -> &'static str { "Reverse the characters of the input text" }

    fn run(&self, inputs: Inputs) -> BoxFuture<'_, Result<Outputs, LogicError>> {
        Box::pin(async move {
            let text = inputs.text("text").unwrap_or_default();
            let mut outputs = Outputs::new();
            outputs.insert("result".into(), json!(text.chars().rev().collect::<String>()));
            Ok(outputs)
        })
    }
}

/// All handlers a plugin may name in `run`
pub fn handlers() -> Vec<Box<dyn Logic>> {
    vec![Box::new(ReverseText)]
}

pub fn find_handler(name: &str) -> Option<Box<dyn Logic>> {
    handlers().into_iter().find(|h| h.name() == name)
}

// ========== Loading ==========

fn is_remote(src: &str) -> bool {
    src.starts_with("http://") || src.starts_with("https://")
}

async fn fetch(src: &str, timeout: Duration) -> Result<String, PluginError> {
    let fail = |reason: String| PluginError::Fetch { src: src.to_string(), reason };

    if !is_remote(src) {
        return tokio::fs::read_to_string(src).await.map_err(|e| fail(e.to_string()));
    }

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| fail(e.to_string()))?;
    let response = client.get(src).send().await.map_err(|e| fail(e.to_string()))?;
    if !response.status().is_success() {
        return Err(fail(format!("HTTP {}", response.status())));
    }
    response.text().await.map_err(|e| fail(e.to_string()))
}

/// Split a plugin document into its descriptor and handler
pub fn parse_plugin(text: &str) -> Result<(ToolDescriptor, Box<dyn Logic>), PluginError> {
    let mut document: Value = serde_json::from_str(text)?;

    let run = document.as_object_mut().and_then(|m| m.remove("run"));
    let handler = match run {
        Some(Value::String(name)) => find_handler(&name).ok_or(PluginError::MissingRun)?,
        _ => return Err(PluginError::MissingRun),
    };

    let descriptor: ToolDescriptor = serde_json::from_value(document).map_err(DescriptorError::from)?;
    descriptor.validate(false)?;
    Ok((descriptor, handler))
}

/// Load a plugin from a path or URL
pub async fn load_plugin(src: Option<&str>, timeout: Duration) -> Result<Plugin, PluginError> {
    let src = src.filter(|s| !s.trim().is_empty()).ok_or(PluginError::MissingSource)?;
    tracing::info!(src, "Loading plugin");

    let text = fetch(src, timeout).await?;
    let (descriptor, handler) = parse_plugin(&text)?;
    tracing::debug!(tool = %descriptor.id, handler = handler.name(), "Plugin loaded");

    Ok(Plugin { src: src.to_string(), descriptor, handler })
}
