//! Agent endpoints: query, streaming query, health, capabilities.

use std::convert::Infallible;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Extension, Json,
};
use chrono::{SecondsFormat, Utc};
use futures_util::Stream;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::agent::{ConversationMessage, StreamChunk};
use crate::server::auth::Caller;
use crate::server::error::ServerError;
use crate::server::state::AppState;

const QUERY_REQUIRED: &str = "Query is required and must be a non-empty string";
const HISTORY_NOT_ARRAY: &str = "History must be an array of conversation messages";
const HISTORY_INVALID: &str =
    "Invalid history format. Each message must have role (user/assistant) and content";

/// A validated query body.
#[derive(Debug, PartialEq)]
pub struct QueryRequest {
    pub query: String,
    pub history: Vec<ConversationMessage>,
}

impl QueryRequest {
    /// Validate a raw `{query, history?}` body.
    pub fn parse(body: &Value) -> Result<Self, ServerError> {
        let query = body
            .get("query")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| ServerError::BadRequest(QUERY_REQUIRED.to_string()))?;

        let history = match body.get("history") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(history_entry)
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| ServerError::BadRequest(HISTORY_INVALID.to_string()))?,
            Some(_) => return Err(ServerError::BadRequest(HISTORY_NOT_ARRAY.to_string())),
        };

        Ok(Self {
            query: query.to_string(),
            history,
        })
    }
}

fn history_entry(item: &Value) -> Option<ConversationMessage> {
    let content = item.get("content").and_then(Value::as_str)?;
    if content.is_empty() {
        return None;
    }
    serde_json::from_value(item.clone()).ok()
}

fn parse_body(body: Result<Json<Value>, JsonRejection>) -> Result<QueryRequest, ServerError> {
    let Json(body) = body.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    QueryRequest::parse(&body)
}

/// POST /api/agent/query
pub async fn query(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ServerError> {
    let request = parse_body(body)?;
    info!(user = %caller.0, "Agent query received");

    let response = state
        .service
        .process_query(&caller.0, &request.query, &request.history)
        .await;

    let status = if response.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    Ok((status, Json(response)).into_response())
}

/// POST /api/agent/query/stream
///
/// Each SSE event carries one JSON chunk. A failure after the stream opened
/// is reported as a final `error` chunk.
pub async fn query_stream(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ServerError> {
    let request = parse_body(body)?;
    info!(user = %caller.0, "Agent stream query received");

    let (tx, mut rx) = mpsc::unbounded_channel::<StreamChunk>();
    let service = state.service.clone();

    tokio::spawn(async move {
        let chunks = tx.clone();
        let result = service
            .process_query_stream(&caller.0, &request.query, &request.history, move |chunk| {
                // the client may have gone away
                let _ = chunks.send(chunk);
            })
            .await;

        if let Err(e) = result {
            error!(user = %caller.0, "Agent stream aborted: {}", e);
            let _ = tx.send(StreamChunk::Error {
                error: e.to_string(),
            });
        }
    });

    let sse_stream = async_stream::stream! {
        while let Some(chunk) = rx.recv().await {
            yield Ok(Event::default()
                .json_data(&chunk)
                .unwrap_or_else(|_| Event::default()));
        }
    };

    Ok(Sse::new(sse_stream).keep_alive(KeepAlive::default()))
}

/// GET /api/agent/health
pub async fn health(State(state): State<AppState>) -> Response {
    let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

    if state.service.health_check().await {
        Json(json!({
            "success": true,
            "message": "Agent service is healthy",
            "timestamp": timestamp,
        }))
        .into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "message": "Agent service is not responding properly",
                "timestamp": timestamp,
            })),
        )
            .into_response()
    }
}

/// GET /api/agent/capabilities
///
/// Hand-maintained; keep in step with `ToolRunner::for_user`.
pub async fn capabilities(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "description": "ReAct Agent with Google Classroom and Drive integration",
            "model": state.service.model(),
            "features": [
                "List and search courses",
                "Find assignments by date, course, or keyword",
                "Get detailed assignment information and submission status",
                "Access course materials and lecture slides",
                "Check course announcements",
                "Generate temporary download URLs for Drive files",
                "Batch download multiple files",
                "Natural language date parsing (tomorrow, this week, etc.)"
            ],
            "tools": {
                "classroom": [
                    "list_courses - List all active courses",
                    "get_course_info - Get detailed course information",
                    "search_assignments - Search and filter assignments",
                    "get_assignment_details - Get comprehensive assignment details",
                    "list_course_materials - List course materials and resources",
                    "get_announcements - Get course announcements",
                    "get_all_coursework - Get all coursework across all courses"
                ],
                "drive": [
                    "get_file_info - Get Drive file metadata",
                    "generate_download_url - Generate temporary download URL (1 hour expiry)",
                    "batch_generate_download_urls - Generate URLs for multiple files"
                ]
            },
            "exampleQueries": [
                "What assignments do I have due tomorrow?",
                "Fetch me the slides of Lecture 5 from IS Classroom",
                "What do I have to do in the last assignment of FSPM?",
                "Show me all materials in my Math class",
                "What are the upcoming deadlines this week?"
            ],
            "responseFormat": {
                "success": "boolean",
                "answer": "string - Natural language response",
                "files": "array - File attachments with download URLs (optional)",
                "thoughts": "array - Intermediate reasoning steps for debugging (optional)",
                "error": "string - Error message if failed (optional)"
            }
        }
    }))
}
