mod config;
mod logging;
mod service;

use anyhow::Result;
use std::sync::Arc;

use config::ServerConfig;
use overhead_core::sat::SatelliteManager;
use service::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = ServerConfig::load("config.toml")?;

    // Initialize logging
    let _logging_guard = logging::init_logging("logs", "overhead-server", &config.log_level);

    tracing::info!("Overhead server starting...");
    tracing::info!(
        "Tracking up to {} satellites from {}",
        config.target_count,
        config.upstream_url
    );

    if !std::path::Path::new(&config.static_dir).exists() {
        tracing::warn!(
            "Static directory does not exist: {} (API endpoints still served)",
            config.static_dir
        );
    }

    let manager = SatelliteManager::new(
        &config.data_dir,
        config.target_count,
        config.upstream_url.clone(),
    );

    let state = AppState {
        manager: Arc::new(manager),
        maps_api_key: config.resolved_maps_api_key(),
    };

    let app = service::router(state, &config.static_dir);

    let listener = tokio::net::TcpListener::bind(config.server_address()).await?;
    tracing::info!("HTTP server listening on http://{}", config.server_address());
    axum::serve(listener, app).await?;

    Ok(())
}
