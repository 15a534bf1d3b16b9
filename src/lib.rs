//! Core toolbox definitions - shared between the library and the CLI
//!
//! A tool is a declarative descriptor plus a logic module. Logic modules are
//! defined once and dispatched by key from descriptors or plugins.

use serde::Serialize;
use serde_json::{Map, Value};
use std::future::Future;
use std::pin::Pin;

pub mod cli;
pub mod config;
pub mod content;
pub mod data_url;
pub mod descriptor;
pub mod form;
pub mod logic;
pub mod plugin;
pub mod render;
pub mod runner;
pub mod style;

pub use descriptor::ToolDescriptor;
pub use form::{FileHandle, FormSubmission, InputValue, Inputs};
pub use logic::LogicError;
pub use runner::{FormState, ToolRunner};

/// Plain output record returned by a logic module, keyed by output field id
pub type Outputs = Map<String, Value>;

/// Outcome of one form submission
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub success: bool,
    pub outputs: Outputs,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunResult {
    pub fn ok(outputs: Outputs) -> Self {
        Self { success: true, outputs, error: None }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self { success: false, outputs: Map::new(), error: Some(error.into()) }
    }
}

/// Boxed future for dyn compatibility
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait for logic modules and plugin handlers - dyn-compatible using BoxFuture
pub trait Logic: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn run(&self, inputs: Inputs) -> BoxFuture<'_, Result<Outputs, LogicError>>;
}
