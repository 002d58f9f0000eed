//! Scripted LLM client for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{LlmClient, LlmEvent, LlmResponse, LlmStream, Usage};
use crate::agent::message::{Message, ToolCallRequest};
use crate::error::Error;
use crate::tools::ToolDefinition;
use crate::Result;

/// Plays back a fixed sequence of turns and records what it was sent.
/// Streamed text is split into word-sized deltas.
pub struct ScriptedLlm {
    turns: Mutex<VecDeque<LlmResponse>>,
    calls: Mutex<Vec<Vec<Message>>>,
    fail_with: Option<String>,
}

impl ScriptedLlm {
    pub fn new(turns: Vec<LlmResponse>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
            calls: Mutex::new(Vec::new()),
            fail_with: None,
        }
    }

    /// Every call fails with an `Error::Llm`.
    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::new(vec![])
        }
    }

    /// A turn that only calls one tool.
    pub fn tool_call(name: &str, args: serde_json::Value) -> LlmResponse {
        LlmResponse {
            content: None,
            tool_calls: vec![ToolCallRequest {
                id: format!("call_{}", name),
                name: name.to_string(),
                arguments: args,
            }],
            finish_reason: "tool_calls".to_string(),
            usage: Usage::default(),
        }
    }

    /// Messages sent on each call so far.
    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.calls.lock().unwrap().clone()
    }

    fn next_turn(&self, messages: &[Message]) -> Result<LlmResponse> {
        self.calls.lock().unwrap().push(messages.to_vec());
        if let Some(ref message) = self.fail_with {
            return Err(Error::Llm(message.clone()));
        }
        self.turns
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::Llm("No more scripted responses".to_string()))
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn chat(
        &self,
        messages: &[Message],
        _tools: &[ToolDefinition],
    ) -> Result<LlmResponse> {
        self.next_turn(messages)
    }

    async fn chat_stream(
        &self,
        messages: &[Message],
        _tools: &[ToolDefinition],
    ) -> Result<LlmStream> {
        let turn = self.next_turn(messages)?;

        let mut events: Vec<Result<LlmEvent>> = turn
            .content
            .unwrap_or_default()
            .split_inclusive(' ')
            .map(|word| Ok(LlmEvent::Text(word.to_string())))
            .collect();
        events.extend(turn.tool_calls.into_iter().map(|c| Ok(LlmEvent::ToolCall(c))));
        events.push(Ok(LlmEvent::Usage(turn.usage)));

        Ok(Box::pin(futures_util::stream::iter(events)))
    }

    fn default_model(&self) -> &str {
        "scripted-model"
    }
}
