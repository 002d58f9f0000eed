//! Error types for Mindly

use thiserror::Error;

/// Result type alias for Mindly operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Mindly
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("Invalid arguments: {0}")]
    Validation(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    /// The caller never linked a Google account.
    #[error("{0}")]
    NotConnected(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Non-success answer from a Google API.
    #[error("Google API error ({status}): {message}")]
    Remote { status: u16, message: String },

    #[error("Max iterations reached")]
    MaxIterations,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}
