//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - Upload routes for single, array and named-field submissions
//! - Stored file metadata lookup
//! - Health check

pub mod routes;

use axum::Router;
use sitevault_core::storage::StorageService;
use sitevault_core::upload::UploadPolicy;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Type policy and limits, fixed at startup.
    pub policy: Arc<UploadPolicy>,
    /// Storage for accepted files.
    pub storage: Arc<StorageService>,
}

impl AppState {
    /// Create state from a policy and a provisioned storage service.
    #[must_use]
    pub fn new(policy: UploadPolicy, storage: StorageService) -> Self {
        Self {
            policy: Arc::new(policy),
            storage: Arc::new(storage),
        }
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
