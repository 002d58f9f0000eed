//! HTTP boundary for the agent.
//!
//! Every route sits behind the bearer-token middleware:
//! - `POST /api/agent/query` and `POST /api/agent/query/stream` (SSE)
//! - `GET /api/agent/health`, `GET /api/agent/capabilities`
//! - `GET /api/classroom/files/download/:file_id`

mod auth;
mod error;
pub mod routes;
mod state;

pub use auth::{require_caller, Caller};
pub use error::{ErrorResponse, ServerError};
pub use state::AppState;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::classroom::DOWNLOAD_ROUTE;
use crate::Result;

/// Build the router with all routes and middleware.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/agent/query", post(routes::agent::query))
        .route("/api/agent/query/stream", post(routes::agent::query_stream))
        .route("/api/agent/health", get(routes::agent::health))
        .route("/api/agent/capabilities", get(routes::agent::capabilities))
        .route(&format!("{}/:file_id", DOWNLOAD_ROUTE), get(routes::files::download))
        .layer(middleware::from_fn_with_state(state.clone(), require_caller))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until the listener fails.
pub async fn serve(state: AppState, bind: &str) -> Result<()> {
    let listener = TcpListener::bind(bind).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state)).await?;
    Ok(())
}
