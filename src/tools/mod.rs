//! Tools module - agent capabilities
//!
//! Tools are the read-only Classroom and Drive actions the agent can take.
//! A fresh set is built for every query, bound to the caller.

mod classroom;
mod drive;
mod runner;

pub use runner::{ToolDefinition, ToolRunner};

use async_trait::async_trait;
use serde_json::Value;
use crate::Result;

/// Tool trait - interface for all agent tools
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name used in function calls
    fn name(&self) -> &str;

    /// Description the model reads to decide when to call the tool
    fn description(&self) -> &str;

    /// JSON Schema for parameters
    fn parameters(&self) -> Value;

    /// Execute the tool with already validated parameters
    async fn execute(&self, params: Value) -> Result<String>;

    /// Convert to tool definition for LLM
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// Tool output is pretty-printed JSON.
pub(crate) fn to_output<T: serde::Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
