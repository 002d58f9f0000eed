//! Tool runner - manages, validates and executes tools

use std::collections::HashMap;

use jsonschema::{Draft, JSONSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::classroom::{
    GetAllCourseworkTool, GetAnnouncementsTool, GetAssignmentDetailsTool, GetCourseInfoTool,
    ListCourseMaterialsTool, ListCoursesTool, SearchAssignmentsTool,
};
use super::drive::{BatchGenerateDownloadUrlsTool, GenerateDownloadUrlTool, GetFileInfoTool};
use super::Tool;
use crate::classroom::Classroom;
use crate::error::Error;
use crate::Result;

/// Tool definition for LLM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Tool runner manages registered tools and executes them
pub struct ToolRunner {
    tools: HashMap<String, Box<dyn Tool>>,
    // registration order, so definitions are stable across calls
    order: Vec<String>,
}

impl ToolRunner {
    /// Create an empty tool runner
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// The full Classroom + Drive tool set bound to one caller
    pub fn for_user(classroom: Classroom) -> Self {
        let mut runner = Self::new();

        // Classroom tools
        runner.register(ListCoursesTool::new(classroom.clone()));
        runner.register(GetCourseInfoTool::new(classroom.clone()));
        runner.register(SearchAssignmentsTool::new(classroom.clone()));
        runner.register(GetAssignmentDetailsTool::new(classroom.clone()));
        runner.register(ListCourseMaterialsTool::new(classroom.clone()));
        runner.register(GetAnnouncementsTool::new(classroom.clone()));
        runner.register(GetAllCourseworkTool::new(classroom.clone()));

        // Drive tools
        runner.register(GetFileInfoTool::new(classroom.clone()));
        runner.register(GenerateDownloadUrlTool::new(classroom.clone()));
        runner.register(BatchGenerateDownloadUrlsTool::new(classroom));

        runner
    }

    /// Register a tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), Box::new(tool)).is_none() {
            self.order.push(name);
        }
    }

    /// Get tool definitions for LLM
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|t| t.to_definition())
            .collect()
    }

    /// Validate `params` against the tool's schema, then execute it
    pub async fn execute(&self, name: &str, params: Value) -> Result<String> {
        let tool = self.tools.get(name)
            .ok_or_else(|| Error::Tool(format!("Unknown tool: {}", name)))?;

        // Models send no arguments at all for parameterless calls
        let params = if params.is_null() {
            Value::Object(Default::default())
        } else {
            params
        };

        validate(&tool.parameters(), &params)?;
        tool.execute(params).await
    }

    /// Execute and fold every failure into an `Error: <message>` string the
    /// model can read and react to.
    pub async fn invoke(&self, name: &str, params: Value) -> String {
        match self.execute(name, params).await {
            Ok(output) => output,
            Err(e) => {
                tracing::debug!(tool = name, "Tool failed: {}", e);
                format!("Error: {}", tool_error_message(&e))
            }
        }
    }

    /// Check if a tool exists
    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// List registered tool names
    pub fn tool_names(&self) -> Vec<&str> {
        self.order.iter().map(|s| s.as_str()).collect()
    }
}

impl Default for ToolRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// `Error::Tool` already reads as a tool message; keep its text unprefixed.
fn tool_error_message(e: &Error) -> String {
    match e {
        Error::Tool(msg) => msg.clone(),
        other => other.to_string(),
    }
}

fn validate(schema: &Value, params: &Value) -> Result<()> {
    let compiled = JSONSchema::options()
        .with_draft(Draft::Draft7)
        .compile(schema)
        .map_err(|e| Error::Tool(format!("Invalid tool schema: {}", e)))?;

    if let Err(errors) = compiled.validate(params) {
        let messages: Vec<String> = errors
            .map(|e| {
                let path = e.instance_path.to_string();
                if path.is_empty() {
                    e.to_string()
                } else {
                    format!("{}: {}", path, e)
                }
            })
            .collect();
        return Err(Error::Validation(messages.join("; ")));
    }
    Ok(())
}
