//! AgentService - one query in, one answer out
//!
//! A single service is shared by all requests. Each query gets its own tool
//! runner bound to the caller, its own context and its own transcript.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{error, info};

use super::attachments::{extract_attachments, extract_thoughts};
use super::context::Context;
use super::llm::LlmClient;
use super::loop_impl::{AgentLoop, LoopEvent};
use super::message::{ConversationMessage, Message};
use super::response::{AgentResponse, StreamChunk};
use crate::classroom::{Classroom, DownloadLinks};
use crate::config::Config;
use crate::google::{ClassroomApi, DriveApi};
use crate::tools::ToolRunner;
use crate::Result;

pub struct AgentService {
    llm: Arc<dyn LlmClient>,
    classroom_api: Arc<dyn ClassroomApi>,
    drive_api: Arc<dyn DriveApi>,
    links: Arc<DownloadLinks>,
    max_iterations: usize,
    today: Option<NaiveDate>,
}

impl AgentService {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        classroom_api: Arc<dyn ClassroomApi>,
        drive_api: Arc<dyn DriveApi>,
        links: Arc<DownloadLinks>,
        config: &Config,
    ) -> Self {
        Self {
            llm,
            classroom_api,
            drive_api,
            links,
            max_iterations: config.max_iterations,
            today: None,
        }
    }

    /// Pin "today" instead of reading the clock.
    pub fn with_date(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn model(&self) -> &str {
        self.llm.default_model()
    }

    /// Capabilities bound to `user_id`.
    pub fn classroom_for(&self, user_id: &str) -> Classroom {
        Classroom::new(
            self.classroom_api.clone(),
            self.drive_api.clone(),
            self.links.clone(),
            user_id,
        )
    }

    fn prepare(&self, user_id: &str, query: &str, history: &[ConversationMessage]) -> (Vec<Message>, ToolRunner) {
        let context = self.today.map(Context::with_date).unwrap_or_default();
        let messages = context.build_messages(history, query);
        let tools = ToolRunner::for_user(self.classroom_for(user_id));
        info!(
            user = user_id,
            history = history.len(),
            tools = tools.tool_names().len(),
            "Processing agent query"
        );
        (messages, tools)
    }

    /// Answer a query. Failures are reported in the envelope, never returned.
    pub async fn process_query(
        &self,
        user_id: &str,
        query: &str,
        history: &[ConversationMessage],
    ) -> AgentResponse {
        let (messages, tools) = self.prepare(user_id, query, history);
        let agent = AgentLoop::new(self.llm.clone(), self.max_iterations);

        match agent.run(messages, &tools).await {
            Ok(outcome) => {
                let files = extract_attachments(&outcome.transcript);
                let thoughts = extract_thoughts(&outcome.transcript);
                info!(user = user_id, files = files.len(), "Agent query answered");
                AgentResponse::answered(outcome.answer, files, thoughts)
            }
            Err(e) => {
                error!(user = user_id, "Agent query failed: {}", e);
                AgentResponse::failed(e.to_string())
            }
        }
    }

    /// Answer a query incrementally. Chunks are handed to `on_chunk` in
    /// production order; a `files` chunk, when there are files, comes last.
    /// An error aborts the stream and is returned to the caller.
    pub async fn process_query_stream<F>(
        &self,
        user_id: &str,
        query: &str,
        history: &[ConversationMessage],
        mut on_chunk: F,
    ) -> Result<()>
    where
        F: FnMut(StreamChunk) + Send,
    {
        let (messages, tools) = self.prepare(user_id, query, history);
        let agent = AgentLoop::new(self.llm.clone(), self.max_iterations);

        let outcome = agent
            .run_stream(messages, &tools, |event| match event {
                LoopEvent::Content(content) => on_chunk(StreamChunk::Content { content }),
                LoopEvent::ToolStart { name, args } => {
                    on_chunk(StreamChunk::Thinking { action: name, args })
                }
            })
            .await
            .map_err(|e| {
                error!(user = user_id, "Agent stream failed: {}", e);
                e
            })?;

        let files = extract_attachments(&outcome.transcript);
        info!(user = user_id, files = files.len(), "Agent stream complete");
        if !files.is_empty() {
            on_chunk(StreamChunk::Files { files });
        }
        Ok(())
    }

    /// One minimal model round-trip.
    pub async fn health_check(&self) -> bool {
        match self.llm.chat(&[Message::user("Hello")], &[]).await {
            Ok(_) => true,
            Err(e) => {
                error!("Agent health check failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::llm::testing::ScriptedLlm;
    use crate::agent::llm::LlmResponse;
    use crate::agent::message::Role;
    use crate::google::fake::FakeGoogle;
    use serde_json::json;

    fn google() -> Arc<FakeGoogle> {
        Arc::new(
            FakeGoogle::new()
                .course("c1", "Applied Mathematics")
                .course("c2", "Biology")
                .work("c1", "w1", "Limits worksheet", Some("2024-03-15"))
                .work("c1", "w2", "Integrals", Some("2024-03-22"))
                .work("c2", "w3", "Cells", Some("2024-03-15"))
                .file("f1", "Lecture 5", "application/vnd.google-apps.presentation", b"slides")
                .file("f2", "ps3.pdf", "application/pdf", b"%PDF"),
        )
    }

    fn service(llm: Arc<ScriptedLlm>) -> AgentService {
        let google = google();
        AgentService::new(
            llm,
            google.clone(),
            google,
            Arc::new(DownloadLinks::new("k", 3600)),
            &Config::default(),
        )
        .with_date(NaiveDate::from_ymd_opt(2024, 3, 14).unwrap())
    }

    #[tokio::test]
    async fn test_list_courses_query() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            ScriptedLlm::tool_call("list_courses", json!({})),
            LlmResponse::text("You're enrolled in Applied Mathematics and Biology."),
        ]));
        let response = service(llm.clone())
            .process_query("alice", "List my courses", &[])
            .await;

        assert!(response.success);
        assert!(response.answer.contains("Applied Mathematics"));
        assert!(response.answer.contains("Biology"));
        assert!(response.files.is_none());

        let thoughts = response.thoughts.unwrap();
        assert_eq!(thoughts[0], "Action: list_courses with {}");
        assert!(thoughts[1].starts_with("Observation: ["));

        // the tool result fed back to the model names both courses
        let second = &llm.calls()[1];
        let observation = second.last().unwrap();
        assert_eq!(observation.role, Role::Tool);
        assert!(observation.content.contains("Applied Mathematics"));
        assert!(observation.content.contains("Biology"));
    }

    #[tokio::test]
    async fn test_due_tomorrow_query_uses_context_date() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            ScriptedLlm::tool_call(
                "search_assignments",
                json!({"courseName": "Math", "dueDateStart": "2024-03-15", "dueDateEnd": "2024-03-15"}),
            ),
            LlmResponse::text("Tomorrow you have the Limits worksheet due in Applied Mathematics."),
        ]));
        let history = vec![
            ConversationMessage::user("Hi"),
            ConversationMessage::assistant("Hello! How can I help?"),
        ];
        let response = service(llm.clone())
            .process_query("alice", "What's due tomorrow in Math?", &history)
            .await;
        assert!(response.success);

        let calls = llm.calls();
        let first = &calls[0];
        assert_eq!(first[0].role, Role::System);
        assert!(first[0].content.contains("Current date: 2024-03-14"));
        assert_eq!(first[1].content, "Hi");
        assert_eq!(first[2].content, "Hello! How can I help?");
        assert_eq!(first.last().unwrap().content, "What's due tomorrow in Math?");

        let observation: serde_json::Value =
            serde_json::from_str(&calls[1].last().unwrap().content).unwrap();
        let found = observation.as_array().unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0]["title"], "Limits worksheet");
        assert_eq!(found[0]["courseName"], "Applied Mathematics");
    }

    #[tokio::test]
    async fn test_files_extracted_and_deduplicated() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            ScriptedLlm::tool_call("generate_download_url", json!({"fileId": "f1"})),
            ScriptedLlm::tool_call("batch_generate_download_urls", json!({"fileIds": ["f1", "f2", "nope"]})),
            LlmResponse::text("Here are the slides and the problem set."),
        ]));
        let response = service(llm).process_query("alice", "Get lecture files", &[]).await;

        let files = response.files.unwrap();
        let ids: Vec<_> = files.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["f1", "f2"]);
        assert_eq!(files[0].name, "Lecture 5.pdf");
        assert!(files.iter().all(|f| f.download_url.starts_with("/api/classroom/files/download/")));
    }

    #[tokio::test]
    async fn test_model_failure_becomes_envelope() {
        let response = service(Arc::new(ScriptedLlm::failing("connection refused")))
            .process_query("alice", "List my courses", &[])
            .await;

        assert!(!response.success);
        assert_eq!(response.answer, "");
        assert_eq!(response.error.as_deref(), Some("LLM error: connection refused"));
    }

    #[tokio::test]
    async fn test_stream_order_files_last() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            ScriptedLlm::tool_call("generate_download_url", json!({"fileId": "f2"})),
            LlmResponse::text("Your problem set is ready to download."),
        ]));

        let mut chunks = Vec::new();
        service(llm)
            .process_query_stream("alice", "Get ps3", &[], |c| chunks.push(c))
            .await
            .unwrap();

        assert!(matches!(&chunks[0], StreamChunk::Thinking { action, .. } if action == "generate_download_url"));
        let text: String = chunks
            .iter()
            .filter_map(|c| match c {
                StreamChunk::Content { content } => Some(content.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(text, "Your problem set is ready to download.");
        assert!(matches!(chunks.last(), Some(StreamChunk::Files { files }) if files.len() == 1));
        assert_eq!(
            chunks.iter().filter(|c| matches!(c, StreamChunk::Files { .. })).count(),
            1
        );
    }

    #[tokio::test]
    async fn test_stream_without_files_has_no_files_chunk() {
        let llm = Arc::new(ScriptedLlm::new(vec![LlmResponse::text("Hello there")]));
        let mut chunks = Vec::new();
        service(llm)
            .process_query_stream("alice", "Hi", &[], |c| chunks.push(c))
            .await
            .unwrap();

        assert!(chunks.iter().all(|c| matches!(c, StreamChunk::Content { .. })));
    }

    #[tokio::test]
    async fn test_stream_error_is_returned() {
        let mut chunks = Vec::new();
        let result = service(Arc::new(ScriptedLlm::failing("quota exceeded")))
            .process_query_stream("alice", "Hi", &[], |c| chunks.push(c))
            .await;

        assert!(result.is_err());
        assert!(chunks.is_empty());
    }

    #[tokio::test]
    async fn test_health_check() {
        let healthy = service(Arc::new(ScriptedLlm::new(vec![LlmResponse::text("Hi!")])));
        assert!(healthy.health_check().await);

        let down = service(Arc::new(ScriptedLlm::failing("unreachable")));
        assert!(!down.health_check().await);
    }
}
