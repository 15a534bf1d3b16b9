//! Tool runner - form collection, logic dispatch and the reverse flow
//!
//! A `FormState` is the short-lived context of one runner session: the
//! current field values, the last result, and the loading/error flags.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::descriptor::{InputKind, ToolDescriptor};
use crate::form::{self, FileHandle, FormError, FormSubmission, Inputs};
use crate::logic::{self, DispatchError, LogicError};
use crate::{Logic, Outputs, RunResult};

/// Runner errors, one per failing boundary
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Form(#[from] FormError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Logic(#[from] LogicError),
}

/// Look up the logic module for `key` and run it
pub async fn dispatch(key: &str, inputs: Inputs) -> Result<Outputs, RunError> {
    let module = logic::resolve(key)?;
    tracing::debug!(logic = module.name(), "Dispatching");
    Ok(module.run(inputs).await?)
}

/// Ephemeral form/result state
#[derive(Debug, Clone, Default)]
pub struct FormState {
    pub values: BTreeMap<String, String>,
    pub files: BTreeMap<String, FileHandle>,
    pub result: Option<Outputs>,
    pub error: Option<String>,
    pub loading: bool,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh form with declared defaults filled in
    pub fn for_descriptor(descriptor: &ToolDescriptor) -> Self {
        let mut state = Self::new();
        for input in &descriptor.inputs {
            if let Some(default) = &input.default_value {
                state.set(input.id.clone(), default.as_form_value());
            }
        }
        state
    }

    pub fn set(&mut self, id: impl Into<String>, value: impl Into<String>) {
        self.values.insert(id.into(), value.into());
    }

    pub fn submission(&self) -> FormSubmission {
        FormSubmission { fields: self.values.clone(), files: self.files.clone() }
    }

    /// Copy an output value into its mapped input field.
    ///
    /// Returns the id of the updated input, or `None` when the tool is not
    /// reversible, the value is null, or no mapping exists for `output_id`.
    pub fn use_as_input(&mut self, descriptor: &ToolDescriptor, output_id: &str, value: &Value) -> Option<String> {
        if !descriptor.reversible || value.is_null() {
            return None;
        }
        let mapping = descriptor.mapping_for(output_id)?;
        // File inputs cannot hold text
        if descriptor.input(&mapping.to).map(|i| i.kind) == Some(InputKind::File) {
            tracing::warn!(input = %mapping.to, "Reverse mapping targets a file input; ignored");
            return None;
        }
        let processed = reverse_value(value);

        tracing::debug!(from = %output_id, to = %mapping.to, "Using output as input");
        self.values.insert(mapping.to.clone(), processed);
        Some(mapping.to.clone())
    }
}

/// Value copied by the reverse flow: objects yield their `result` member
/// when present, otherwise compact JSON.
pub fn reverse_value(value: &Value) -> String {
    match value {
        Value::Object(map) => match map.get("result") {
            Some(Value::String(s)) => s.clone(),
            Some(inner) => inner.to_string(),
            None => value.to_string(),
        },
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

enum Handler {
    /// Resolved by key on every submission
    Logic(String),
    /// Pre-registered plugin handler
    Plugin(Box<dyn Logic>),
}

/// Runs one tool: collects the form, dispatches, stores the outcome
pub struct ToolRunner {
    descriptor: ToolDescriptor,
    handler: Handler,
}

impl ToolRunner {
    /// Runner for a catalog tool; the logic key is looked up at submit time
    pub fn new(descriptor: ToolDescriptor) -> Self {
        let key = descriptor.logic.clone().unwrap_or_default();
        Self { descriptor, handler: Handler::Logic(key) }
    }

    /// Runner for a plugin tool with its own handler
    pub fn with_handler(descriptor: ToolDescriptor, handler: Box<dyn Logic>) -> Self {
        Self { descriptor, handler: Handler::Plugin(handler) }
    }

    pub fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, submission: &FormSubmission) -> Result<Outputs, RunError> {
        let inputs = form::collect_inputs(&self.descriptor, submission)?;
        tracing::debug!(tool = %self.descriptor.id, inputs = %inputs.to_json(), "Collected inputs");

        match &self.handler {
            Handler::Logic(key) => dispatch(key, inputs).await,
            Handler::Plugin(handler) => Ok(handler.run(inputs).await?),
        }
    }

    /// Submit the current form state. The state keeps either the result or
    /// the error message; the runner never retries.
    pub async fn submit(&self, state: &mut FormState) -> RunResult {
        state.loading = true;
        state.error = None;
        state.result = None;

        let outcome = self.execute(&state.submission()).await;
        state.loading = false;

        match outcome {
            Ok(outputs) => {
                tracing::info!(tool = %self.descriptor.id, fields = outputs.len(), "Tool finished");
                state.result = Some(outputs.clone());
                RunResult::ok(outputs)
            }
            Err(e) => {
                let message = e.to_string();
                tracing::warn!(tool = %self.descriptor.id, error = %message, "Tool failed");
                state.error = Some(message.clone());
                RunResult::err(message)
            }
        }
    }
}
