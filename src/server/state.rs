//! Shared application state.

use std::collections::HashMap;
use std::sync::Arc;

use crate::agent::AgentService;
use crate::classroom::DownloadLinks;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AgentService>,
    pub links: Arc<DownloadLinks>,
    /// Bearer token -> user id.
    pub api_keys: Arc<HashMap<String, String>>,
}

impl AppState {
    pub fn new(
        service: Arc<AgentService>,
        links: Arc<DownloadLinks>,
        api_keys: HashMap<String, String>,
    ) -> Self {
        Self {
            service,
            links,
            api_keys: Arc::new(api_keys),
        }
    }

    /// User id behind a bearer token.
    pub fn caller_for(&self, token: &str) -> Option<&str> {
        self.api_keys.get(token).map(String::as_str)
    }
}
