//! Health check endpoints.

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::Serialize;

use crate::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: &'static str,
    /// Service version.
    pub version: &'static str,
    /// Whether the upload root and its destination folders are present.
    pub storage_ready: bool,
}

/// Health check handler.
///
/// Reports `degraded` with 503 when a destination folder has gone missing
/// since startup.
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let mut storage_ready = true;
    for dir in state.storage.config().required_dirs() {
        if !tokio::fs::try_exists(&dir).await.unwrap_or(false) {
            storage_ready = false;
            break;
        }
    }

    let (code, status) = if storage_ready {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            storage_ready,
        }),
    )
}

/// Creates health check routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
