//! LLM client abstraction layer.
//!
//! This module provides:
//! - [`LlmClient`] trait for swappable LLM providers
//! - [`LlmEvent`] / [`LlmStream`] for incremental output
//! - The Gemini implementation

mod types;

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;
use serde::{Deserialize, Serialize};

use crate::tools::ToolDefinition;
use crate::Result;

pub use types::*;

pub mod gemini;

#[cfg(test)]
pub mod testing;

pub use gemini::GeminiClient;

use super::message::{Message, ToolCallRequest};

/// Response from an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Text content of the response.
    pub content: Option<String>,

    /// Tool calls requested by the LLM.
    pub tool_calls: Vec<ToolCallRequest>,

    /// Reason the response finished.
    pub finish_reason: String,

    /// Token usage statistics.
    pub usage: Usage,
}

impl LlmResponse {
    /// Create a simple text response.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: vec![],
            finish_reason: "stop".to_string(),
            usage: Usage::default(),
        }
    }

    /// Replay a complete response as stream events.
    pub fn into_events(self) -> Vec<LlmEvent> {
        let mut events = Vec::with_capacity(self.tool_calls.len() + 2);
        if let Some(text) = self.content.filter(|t| !t.is_empty()) {
            events.push(LlmEvent::Text(text));
        }
        events.extend(self.tool_calls.into_iter().map(LlmEvent::ToolCall));
        events.push(LlmEvent::Usage(self.usage));
        events
    }
}

/// Token usage information.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

/// One increment of a streamed model turn.
#[derive(Debug, Clone, PartialEq)]
pub enum LlmEvent {
    /// A text delta, in order.
    Text(String),
    /// A complete tool call.
    ToolCall(ToolCallRequest),
    /// Final token counts for the turn.
    Usage(Usage),
}

pub type LlmStream = Pin<Box<dyn Stream<Item = Result<LlmEvent>> + Send>>;

/// LLM client trait - swappable provider abstraction.
///
/// Implement this trait to add a new LLM provider.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send messages and get response.
    async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<LlmResponse>;

    /// Send messages and receive the turn incrementally. Providers without
    /// native streaming replay the complete response.
    async fn chat_stream(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<LlmStream> {
        let response = self.chat(messages, tools).await?;
        let events = response.into_events().into_iter().map(Ok);
        Ok(Box::pin(futures_util::stream::iter(events)))
    }

    /// Get the default model for this provider.
    fn default_model(&self) -> &str;
}
