//! Error types for the HTTP layer.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::error::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Download reference failed verification.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    fn status(&self) -> StatusCode {
        match self {
            ServerError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The text shown to the client.
    pub fn message(&self) -> &str {
        match self {
            ServerError::Unauthorized(m)
            | ServerError::BadRequest(m)
            | ServerError::Forbidden(m)
            | ServerError::NotFound(m)
            | ServerError::ServiceUnavailable(m)
            | ServerError::Internal(m) => m,
        }
    }
}

impl From<Error> for ServerError {
    fn from(e: Error) -> Self {
        match e {
            Error::NotFound(m) => ServerError::NotFound(m),
            Error::Validation(_) => ServerError::BadRequest(e.to_string()),
            Error::NotConnected(m) => ServerError::Unauthorized(m),
            Error::Auth(_) => ServerError::Unauthorized(e.to_string()),
            other => ServerError::Internal(other.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            ServerError::Internal(_) | ServerError::ServiceUnavailable(_) => {
                tracing::error!(status = %status, error = %self, "Server error");
            }
            _ => {
                tracing::warn!(status = %status, error = %self, "Client error");
            }
        }

        let body = ErrorResponse {
            success: false,
            message: self.message().to_string(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_map_to_statuses() {
        let cases = vec![
            (Error::NotFound("File not found: x.".into()), StatusCode::NOT_FOUND),
            (Error::Validation("fileId: required".into()), StatusCode::BAD_REQUEST),
            (Error::NotConnected("Google Classroom not connected".into()), StatusCode::UNAUTHORIZED),
            (Error::Remote { status: 500, message: "backend".into() }, StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ServerError::from(err).status(), status);
        }
    }

    #[test]
    fn test_message_has_no_variant_prefix() {
        let err = ServerError::BadRequest("Query is required and must be a non-empty string".into());
        assert_eq!(err.message(), "Query is required and must be a non-empty string");

        let not_found = ServerError::from(Error::NotFound("File not found: abc.".into()));
        assert_eq!(not_found.message(), "File not found: abc.");
    }
}
