//! Lead Engagement Server
//!
//! HTTP endpoints for the orchestrator: inbound handling, opt-out
//! processing, compliance status, session snapshots, health and metrics.

pub mod http;
pub mod metrics;
pub mod state;

pub use http::create_router;
pub use metrics::init_metrics;
pub use state::AppState;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use leadflow_orchestrator::OrchestratorError;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::InvalidRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            ServerError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
            ServerError::Orchestrator(OrchestratorError::MalformedInput(field)) => {
                (StatusCode::BAD_REQUEST, format!("malformed input: {field}"))
            }
            ServerError::Orchestrator(e) => {
                tracing::error!(error = %e, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };
        (status, axum::Json(serde_json::json!({"error": message}))).into_response()
    }
}
