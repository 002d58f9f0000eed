//! Context builder for agent prompts.
//!
//! Every query starts from a fresh system prompt carrying today's date, then
//! the caller's history in order, then the query itself. History is replayed
//! in full; trimming long conversations is left to the caller.

use chrono::{NaiveDate, Utc};

use super::message::{ConversationMessage, Message};

const GUIDELINES: &str = r#"Guidelines:
1. When users ask about dates like "tomorrow" or "this week", calculate the actual dates
2. For date-based queries, use ISO format (YYYY-MM-DD) in tool parameters
3. When mentioning files or materials with download capabilities, ALWAYS use the generate_download_url tool to create downloadable links
4. Extract and organize file information clearly in your response
5. Be conversational and helpful, explain what you found
6. If you need to search for something, start by listing courses to find the right course ID
7. For course-specific queries, first search for the course by name if you don't have the ID
8. When presenting assignments, include: title, due date, submission status if available
9. When presenting files, mention their names and that they can be downloaded via the provided link

Important: When you find files that users might want to access (from assignments, materials, or announcements),
proactively use the generate_download_url or batch_generate_download_urls tool to create download links for them.
The download links point at this backend and are opened with the user's own session."#;

/// Prompt inputs for one query.
#[derive(Debug, Clone)]
pub struct Context {
    today: NaiveDate,
}

impl Context {
    /// Context dated today (UTC).
    pub fn new() -> Self {
        Self::with_date(Utc::now().date_naive())
    }

    /// Context with a fixed "today".
    pub fn with_date(today: NaiveDate) -> Self {
        Self { today }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Build system prompt with the current date and tool guidelines.
    pub fn build_system_prompt(&self) -> String {
        format!(
            "You are a helpful AI assistant that helps students manage their Google Classroom coursework and materials.\n\
             Current date: {} ({})\n\n{}",
            self.today.format("%Y-%m-%d"),
            self.today.format("%A"),
            GUIDELINES
        )
    }

    /// Build messages list for LLM call: system prompt, history oldest
    /// first, current query.
    pub fn build_messages(&self, history: &[ConversationMessage], current: &str) -> Vec<Message> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(self.build_system_prompt()));
        messages.extend(history.iter().map(Message::from));
        messages.push(Message::user(current));
        messages
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
