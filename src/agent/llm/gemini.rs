//! Gemini LLM client implementation (API key authentication).

use std::time::Duration;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use reqwest::Client;
use serde_json::{json, Value};

use crate::config::Config;
use crate::error::Error;
use crate::tools::ToolDefinition;
use crate::Result;

use super::super::message::{Message, Role, ToolCallRequest};
use super::{GeminiResponse, LlmClient, LlmEvent, LlmResponse, LlmStream, Usage, UsageMetadata};

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Gemini API client using API key authentication.
#[derive(Clone)]
pub struct GeminiClient {
    api_key: String,
    model: String,
    temperature: f32,
    max_output_tokens: u32,
    base_url: String,
    client: Client,
}

impl GeminiClient {
    /// Create a new Gemini client with API key.
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            temperature: 0.7,
            max_output_tokens: 2048,
            base_url: GEMINI_API_URL.to_string(),
            client: Client::new(),
        }
    }

    /// Build from configuration: model, sampling settings and request timeout.
    pub fn from_config(config: &Config) -> Result<Self> {
        if config.gemini_api_key.is_empty() {
            return Err(Error::Config(
                "Gemini API key is not set (GEMINI_API_KEY or gemini_api_key in config)".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.llm_timeout_secs))
            .build()?;

        Ok(Self {
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            client,
            ..Self::new(&config.gemini_api_key, &config.model)
        })
    }

    /// Point at a different API root.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn build_url(&self, stream: bool) -> String {
        if stream {
            format!(
                "{}/{}:streamGenerateContent?alt=sse&key={}",
                self.base_url, self.model, self.api_key
            )
        } else {
            format!(
                "{}/{}:generateContent?key={}",
                self.base_url, self.model, self.api_key
            )
        }
    }

    /// Consecutive tool results become one `function` turn, matching the
    /// calls of the model turn before them.
    fn convert_messages(&self, messages: &[Message]) -> Vec<Value> {
        let mut contents: Vec<Value> = Vec::with_capacity(messages.len());
        let mut pending_results: Vec<Value> = Vec::new();

        for m in messages.iter().filter(|m| m.role != Role::System) {
            if m.role == Role::Tool {
                pending_results.push(json!({
                    "functionResponse": {
                        "name": m.tool_name.as_deref().unwrap_or("unknown"),
                        "response": {"result": m.content}
                    }
                }));
                continue;
            }

            if !pending_results.is_empty() {
                contents.push(json!({
                    "role": "function",
                    "parts": std::mem::take(&mut pending_results)
                }));
            }

            let role = match m.role {
                Role::Assistant => "model",
                _ => "user",
            };

            let mut parts = Vec::new();
            if !m.content.is_empty() || m.tool_calls.is_none() {
                parts.push(json!({"text": m.content}));
            }
            if let Some(ref tool_calls) = m.tool_calls {
                parts.extend(tool_calls.iter().map(|tc| {
                    json!({
                        "functionCall": {
                            "name": tc.name,
                            "args": tc.arguments
                        }
                    })
                }));
            }

            contents.push(json!({"role": role, "parts": parts}));
        }

        if !pending_results.is_empty() {
            contents.push(json!({"role": "function", "parts": pending_results}));
        }

        contents
    }

    fn get_system_instruction(&self, messages: &[Message]) -> Option<String> {
        messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.clone())
    }

    fn convert_tools(&self, tools: &[ToolDefinition]) -> Option<Value> {
        if tools.is_empty() {
            return None;
        }

        let function_declarations: Vec<Value> = tools
            .iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "parameters": gemini_schema(&t.parameters)
                })
            })
            .collect();

        Some(json!([{
            "functionDeclarations": function_declarations
        }]))
    }

    fn build_request(&self, messages: &[Message], tools: &[ToolDefinition]) -> Value {
        let mut request = json!({
            "contents": self.convert_messages(messages),
            "generationConfig": {
                "temperature": self.temperature,
                "maxOutputTokens": self.max_output_tokens
            }
        });

        if let Some(system) = self.get_system_instruction(messages) {
            request["systemInstruction"] = json!({
                "parts": [{"text": system}]
            });
        }

        if let Some(tool_config) = self.convert_tools(tools) {
            request["tools"] = tool_config;
        }

        request
    }

    fn parse_response(&self, response: &GeminiResponse) -> Result<LlmResponse> {
        let candidate = match response.candidates.first() {
            Some(candidate) => candidate,
            None => return Err(no_candidates(response)),
        };

        let mut content: Option<String> = None;
        let mut tool_calls = Vec::new();

        for part in &candidate.content.parts {
            if let Some(ref text) = part.text {
                content.get_or_insert_with(String::new).push_str(text);
            }

            if let Some(ref fc) = part.function_call {
                tool_calls.push(ToolCallRequest {
                    id: new_call_id(),
                    name: fc.name.clone(),
                    arguments: fc.args.clone(),
                });
            }
        }

        Ok(LlmResponse {
            content,
            tool_calls,
            finish_reason: candidate
                .finish_reason
                .clone()
                .unwrap_or_else(|| "stop".to_string()),
            usage: response.usage_metadata.as_ref().map(to_usage).unwrap_or_default(),
        })
    }

    async fn post(&self, stream: bool, request: &Value) -> Result<reqwest::Response> {
        let response = self.client.post(self.build_url(stream)).json(request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            let message = serde_json::from_str::<Value>(&error_text)
                .ok()
                .and_then(|v| v.pointer("/error/message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or(error_text);
            return Err(Error::Llm(format!("Gemini API error ({}): {}", status.as_u16(), message)));
        }

        Ok(response)
    }
}

/// Gemini accepts an OpenAPI subset; an object without properties must not
/// carry an empty `properties` map.
fn gemini_schema(schema: &Value) -> Value {
    let mut schema = schema.clone();
    if let Some(obj) = schema.as_object_mut() {
        let empty = obj
            .get("properties")
            .and_then(Value::as_object)
            .is_some_and(|p| p.is_empty());
        if empty {
            obj.remove("properties");
        }
    }
    schema
}

fn new_call_id() -> String {
    format!("call_{}", uuid::Uuid::new_v4().simple())
}

fn to_usage(u: &UsageMetadata) -> Usage {
    Usage {
        prompt_tokens: u.prompt_token_count.unwrap_or(0),
        completion_tokens: u.candidates_token_count.unwrap_or(0),
        total_tokens: u.total_token_count.unwrap_or(0),
    }
}

fn no_candidates(response: &GeminiResponse) -> Error {
    match response
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.as_deref())
    {
        Some(reason) => Error::Llm(format!("Prompt blocked by Gemini: {}", reason)),
        None => Error::Llm("No candidates in response".to_string()),
    }
}

/// Events carried by one streamed payload. Usage is cumulative, so only the
/// latest report is kept.
fn decode_chunk(payload: &str, usage: &mut Option<UsageMetadata>) -> Result<Vec<LlmEvent>> {
    if payload == "[DONE]" {
        return Ok(Vec::new());
    }

    let chunk: GeminiResponse = serde_json::from_str(payload)?;
    if chunk.candidates.is_empty() && chunk.usage_metadata.is_none() {
        return Err(no_candidates(&chunk));
    }
    if chunk.usage_metadata.is_some() {
        *usage = chunk.usage_metadata.clone();
    }

    let mut events = Vec::new();
    if let Some(candidate) = chunk.candidates.first() {
        for part in &candidate.content.parts {
            if let Some(text) = part.text.as_ref().filter(|t| !t.is_empty()) {
                events.push(LlmEvent::Text(text.clone()));
            }
            if let Some(ref fc) = part.function_call {
                events.push(LlmEvent::ToolCall(ToolCallRequest {
                    id: new_call_id(),
                    name: fc.name.clone(),
                    arguments: fc.args.clone(),
                }));
            }
        }
    }
    Ok(events)
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<LlmResponse> {
        let request = self.build_request(messages, tools);
        let response = self.post(false, &request).await?;

        let gemini_response: GeminiResponse = response.json().await?;
        self.parse_response(&gemini_response)
    }

    async fn chat_stream(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<LlmStream> {
        let request = self.build_request(messages, tools);
        let response = self.post(true, &request).await?;
        let mut events = Box::pin(response.bytes_stream().eventsource());

        let stream = async_stream::stream! {
            let mut usage: Option<UsageMetadata> = None;

            while let Some(event) = events.next().await {
                let event = match event {
                    Ok(event) => event,
                    Err(e) => {
                        yield Err(Error::Llm(format!("Gemini stream error: {}", e)));
                        return;
                    }
                };
                // keep-alives and comments carry no data
                if event.data.is_empty() {
                    continue;
                }

                match decode_chunk(&event.data, &mut usage) {
                    Ok(decoded) => {
                        for item in decoded {
                            yield Ok(item);
                        }
                    }
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }

            yield Ok(LlmEvent::Usage(usage.as_ref().map(to_usage).unwrap_or_default()));
        };

        Ok(Box::pin(stream))
    }

    fn default_model(&self) -> &str {
        &self.model
    }
}
