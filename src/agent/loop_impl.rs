//! Agent loop - alternates model turns and tool execution

use std::sync::Arc;

use futures_util::StreamExt;
use serde_json::Value;
use tracing::{debug, info};

use super::llm::{LlmClient, LlmEvent};
use super::message::{Message, ToolCallRequest};
use crate::error::Error;
use crate::tools::ToolRunner;
use crate::Result;

/// What the loop reports while streaming.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopEvent {
    /// Model text delta.
    Content(String),
    /// A tool is about to run.
    ToolStart { name: String, args: Value },
}

/// A finished run.
#[derive(Debug, Clone)]
pub struct AgentOutcome {
    /// Text of the final model turn.
    pub answer: String,
    /// Every message of the run: prompt, history, query, model turns and
    /// tool results, in order.
    pub transcript: Vec<Message>,
}

/// The agent loop processes messages through LLM and tool execution
pub struct AgentLoop {
    client: Arc<dyn LlmClient>,
    max_iterations: usize,
}

impl AgentLoop {
    /// Create a new agent loop
    pub fn new(client: Arc<dyn LlmClient>, max_iterations: usize) -> Self {
        Self {
            client,
            max_iterations,
        }
    }

    /// Run to a final answer.
    pub async fn run(&self, mut messages: Vec<Message>, tools: &ToolRunner) -> Result<AgentOutcome> {
        let definitions = tools.definitions();
        info!("Starting agent loop with {} messages", messages.len());

        for iteration in 0..self.max_iterations {
            debug!("Iteration {}/{}", iteration + 1, self.max_iterations);

            let response = self.client.chat(&messages, &definitions).await?;
            let content = response.content.unwrap_or_default();

            if response.tool_calls.is_empty() {
                info!("Agent completed with response: {} chars", content.len());
                messages.push(Message::assistant(content.clone()));
                return Ok(AgentOutcome {
                    answer: content,
                    transcript: messages,
                });
            }

            messages.push(Message::assistant_with_tools(content, response.tool_calls.clone()));
            for tool_call in &response.tool_calls {
                let result = self.execute_tool(tools, tool_call).await;
                messages.push(Message::tool_result(tool_call, result));
            }
        }

        Err(Error::MaxIterations)
    }

    /// Run to a final answer, reporting text deltas as they arrive and each
    /// tool call just before it executes.
    pub async fn run_stream<F>(
        &self,
        mut messages: Vec<Message>,
        tools: &ToolRunner,
        mut on_event: F,
    ) -> Result<AgentOutcome>
    where
        F: FnMut(LoopEvent) + Send,
    {
        let definitions = tools.definitions();
        info!("Starting streaming agent loop with {} messages", messages.len());

        for iteration in 0..self.max_iterations {
            debug!("Iteration {}/{}", iteration + 1, self.max_iterations);

            let mut stream = self.client.chat_stream(&messages, &definitions).await?;
            let mut content = String::new();
            let mut tool_calls: Vec<ToolCallRequest> = Vec::new();

            while let Some(event) = stream.next().await {
                match event? {
                    LlmEvent::Text(delta) => {
                        content.push_str(&delta);
                        on_event(LoopEvent::Content(delta));
                    }
                    LlmEvent::ToolCall(call) => tool_calls.push(call),
                    LlmEvent::Usage(usage) => {
                        debug!("Turn used {} tokens", usage.total_tokens);
                    }
                }
            }

            if tool_calls.is_empty() {
                info!("Agent completed with response: {} chars", content.len());
                messages.push(Message::assistant(content.clone()));
                return Ok(AgentOutcome {
                    answer: content,
                    transcript: messages,
                });
            }

            messages.push(Message::assistant_with_tools(content, tool_calls.clone()));
            for tool_call in &tool_calls {
                on_event(LoopEvent::ToolStart {
                    name: tool_call.name.clone(),
                    args: tool_call.arguments.clone(),
                });
                let result = self.execute_tool(tools, tool_call).await;
                messages.push(Message::tool_result(tool_call, result));
            }
        }

        Err(Error::MaxIterations)
    }

    async fn execute_tool(&self, tools: &ToolRunner, tool_call: &ToolCallRequest) -> String {
        debug!("Executing tool: {} with args: {}", tool_call.name, tool_call.arguments);
        let result = tools.invoke(&tool_call.name, tool_call.arguments.clone()).await;
        debug!("Tool {} returned {} chars", tool_call.name, result.len());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::llm::testing::ScriptedLlm;
    use crate::agent::llm::LlmResponse;
    use crate::agent::message::Role;
    use serde_json::json;

    #[tokio::test]
    async fn test_agent_loop_simple() {
        let client = Arc::new(ScriptedLlm::new(vec![LlmResponse::text("Hello, human!")]));
        let agent = AgentLoop::new(client, 10);

        let outcome = agent
            .run(vec![Message::user("Hi there")], &ToolRunner::new())
            .await
            .unwrap();

        assert_eq!(outcome.answer, "Hello, human!");
        assert_eq!(outcome.transcript.len(), 2);
    }

    #[tokio::test]
    async fn test_agent_loop_with_unknown_tool() {
        let client = Arc::new(ScriptedLlm::new(vec![
            ScriptedLlm::tool_call("read_file", json!({"path": "test.txt"})),
            LlmResponse::text("I can't read files."),
        ]));
        let agent = AgentLoop::new(client.clone(), 10);

        let outcome = agent
            .run(vec![Message::user("Read test.txt")], &ToolRunner::new())
            .await
            .unwrap();

        assert_eq!(outcome.answer, "I can't read files.");
        let observation = &client.calls()[1].last().cloned().unwrap();
        assert_eq!(observation.role, Role::Tool);
        assert_eq!(observation.content, "Error: Unknown tool: read_file");
    }

    #[tokio::test]
    async fn test_max_iterations() {
        let turns = (0..3)
            .map(|_| ScriptedLlm::tool_call("list_courses", json!({})))
            .collect();
        let agent = AgentLoop::new(Arc::new(ScriptedLlm::new(turns)), 3);

        let err = agent
            .run(vec![Message::user("loop forever")], &ToolRunner::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MaxIterations));
    }

    #[tokio::test]
    async fn test_stream_reports_tool_start_before_following_text() {
        let client = Arc::new(ScriptedLlm::new(vec![
            ScriptedLlm::tool_call("lookup", json!({"q": 1})),
            LlmResponse::text("Found it."),
        ]));
        let agent = AgentLoop::new(client, 5);

        let mut events = Vec::new();
        let outcome = agent
            .run_stream(vec![Message::user("find")], &ToolRunner::new(), |e| events.push(e))
            .await
            .unwrap();

        assert_eq!(
            events,
            vec![
                LoopEvent::ToolStart { name: "lookup".to_string(), args: json!({"q": 1}) },
                LoopEvent::Content("Found ".to_string()),
                LoopEvent::Content("it.".to_string()),
            ]
        );
        assert_eq!(outcome.answer, "Found it.");
    }

    #[tokio::test]
    async fn test_stream_propagates_model_failure() {
        let agent = AgentLoop::new(Arc::new(ScriptedLlm::failing("model unreachable")), 5);
        let err = agent
            .run_stream(vec![Message::user("hi")], &ToolRunner::new(), |_| {})
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "LLM error: model unreachable");
    }
}
