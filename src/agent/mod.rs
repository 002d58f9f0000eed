//! Agent module - core agent logic.
//!
//! This module contains:
//! - Message types (prompt messages, caller-supplied history)
//! - LLM client trait and the Gemini implementation
//! - Agent loop alternating model turns and tool calls
//! - Context builder for prompts
//! - Attachment extraction and response envelopes
//! - AgentService tying it together per query

mod attachments;
mod context;
mod loop_impl;
mod message;
mod response;
mod service;

// LLM providers in submodule
pub mod llm;

// Re-exports for convenience
pub use attachments::{extract_attachments, extract_thoughts};
pub use context::Context;
pub use llm::{GeminiClient, LlmClient, LlmEvent, LlmResponse, LlmStream, Usage};
pub use loop_impl::{AgentLoop, AgentOutcome, LoopEvent};
pub use message::{ConversationMessage, ConversationRole, Message, Role, ToolCallRequest};
pub use response::{AgentResponse, FileAttachment, StreamChunk};
pub use service::AgentService;
