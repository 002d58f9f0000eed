//! Bearer-token middleware.
//!
//! Every API route needs `Authorization: Bearer <key>`. The key is looked up
//! in `server.api_keys` and the resulting user id is attached to the request
//! as a [`Caller`] extension.

use axum::{
    body::Body,
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use super::error::ServerError;
use super::state::AppState;

/// The authenticated user id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller(pub String);

pub async fn require_caller(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ServerError> {
    let caller = resolve(&request, &state)?;
    tracing::debug!(user = %caller.0, path = %request.uri().path(), "Authenticated request");

    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}

fn resolve(request: &Request<Body>, state: &AppState) -> Result<Caller, ServerError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .ok_or_else(|| ServerError::Unauthorized("Missing authorization token".to_string()))?;

    let token = header
        .to_str()
        .ok()
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .ok_or_else(|| ServerError::Unauthorized("Invalid authorization format".to_string()))?;

    state
        .caller_for(token)
        .map(|user| Caller(user.to_string()))
        .ok_or_else(|| ServerError::Unauthorized("Invalid token".to_string()))
}

#[cfg(test)]
mod tests {
    use axum::http::{Request, StatusCode};
    use serde_json::Value;

    use crate::server::testing::{app, send, TOKEN};
    use axum::body::Body;

    #[tokio::test]
    async fn test_missing_token() {
        let (status, _, body) = send(
            app(vec![]),
            Request::get("/api/agent/capabilities").body(Body::empty()).unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Missing authorization token");
    }

    #[tokio::test]
    async fn test_unknown_token() {
        let (status, _, body) = send(
            app(vec![]),
            Request::get("/api/agent/capabilities")
                .header("authorization", "Bearer not-a-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["message"], "Invalid token");
    }

    #[tokio::test]
    async fn test_basic_scheme_rejected() {
        let (status, _, _) = send(
            app(vec![]),
            Request::get("/api/agent/capabilities")
                .header("authorization", format!("Basic {}", TOKEN))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
