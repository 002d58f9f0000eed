//! Response envelopes returned to API callers

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A downloadable file surfaced during a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileAttachment {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    /// Same-origin download reference.
    pub download_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub success: bool,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<FileAttachment>>,
    /// Diagnostic trace of actions and observations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thoughts: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AgentResponse {
    /// Empty lists are left out of the envelope.
    pub fn answered(answer: String, files: Vec<FileAttachment>, thoughts: Vec<String>) -> Self {
        Self {
            success: true,
            answer,
            files: Some(files).filter(|f| !f.is_empty()),
            thoughts: Some(thoughts).filter(|t| !t.is_empty()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            answer: String::new(),
            files: None,
            thoughts: None,
            error: Some(error.into()),
        }
    }
}

/// One frame of a streamed answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamChunk {
    Content { content: String },
    Thinking { action: String, args: Value },
    /// Always the last frame of a successful stream.
    Files { files: Vec<FileAttachment> },
    /// Sent by the HTTP layer when the stream aborts.
    Error { error: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chunk_wire_format() {
        let chunks = vec![
            StreamChunk::Thinking { action: "list_courses".to_string(), args: json!({}) },
            StreamChunk::Content { content: "Hi".to_string() },
            StreamChunk::Error { error: "boom".to_string() },
        ];
        assert_eq!(
            serde_json::to_value(&chunks).unwrap(),
            json!([
                {"type": "thinking", "action": "list_courses", "args": {}},
                {"type": "content", "content": "Hi"},
                {"type": "error", "error": "boom"}
            ])
        );
    }

    #[test]
    fn test_envelopes() {
        let ok = serde_json::to_value(AgentResponse::answered("Done".to_string(), vec![], vec![])).unwrap();
        assert_eq!(ok, json!({"success": true, "answer": "Done"}));

        let failed = serde_json::to_value(AgentResponse::failed("LLM error: down")).unwrap();
        assert_eq!(failed, json!({"success": false, "answer": "", "error": "LLM error: down"}));
    }
}
