//! SiteVault API Server
//!
//! Main entry point for the SiteVault upload gateway.

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sitevault_api::{AppState, create_router};
use sitevault_core::storage::{StorageConfig, StorageService};
use sitevault_core::upload::UploadPolicy;
use sitevault_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sitevault=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Build the upload policy once; requests only read it
    let policy = UploadPolicy::from_settings(
        config.upload.max_file_size.as_deref(),
        config.upload.allowed_file_types.as_deref(),
    );
    for ext in policy.types.ignored() {
        warn!(extension = %ext, "Allowed file type has no known content-type; ignoring it");
    }
    info!(
        max_file_size = %policy.limits.max_file_size_label,
        allowed = ?policy.types.allowed_extensions().collect::<Vec<_>>(),
        "Upload policy loaded"
    );

    // Provision upload directories before accepting any request
    let storage = StorageService::from_config(StorageConfig::new(&config.upload.root))?;
    if let Err(e) = storage.provision().await {
        error!(error = %e, "Failed to provision upload directories");
        return Err(e.into());
    }
    info!(root = %config.upload.root, "Upload directories ready");

    // Create application state
    let state = AppState::new(policy, storage);

    // Create router
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
