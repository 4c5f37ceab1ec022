use anyhow::{Context, Result};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cctv_stream_gateway::camera::CameraRegistry;
use cctv_stream_gateway::config::AppConfig;
use cctv_stream_gateway::server::{self, AppState};
use cctv_stream_gateway::session::ViewerTracker;
use cctv_stream_gateway::stream::StreamAccess;
use cctv_stream_gateway::upstream::Go2rtcClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cctv_stream_gateway=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting CCTV stream gateway");

    // Load configuration
    let config_path = std::env::var("CONFIG_PATH")
        .unwrap_or_else(|_| "config/gateway.yaml".to_string());

    let config = AppConfig::load_from_file(&config_path)
        .context("Failed to load configuration")?;

    tracing::info!("Loaded configuration with {} cameras", config.cameras.len());

    let registry = CameraRegistry::from_configs(config.cameras.clone())
        .await
        .context("Failed to register cameras")?;

    let gateway = Go2rtcClient::new(&config.upstream)?;
    tracing::info!("Media server: {}", gateway.base_url());

    match config.public_base_url() {
        Some(base_url) => tracing::info!("Public base URL: {}", base_url),
        None => tracing::info!("Public base URL not set, deriving it from request Host"),
    }

    let tracker = ViewerTracker::in_memory();
    tracker.spawn_housekeeping(config.sessions.retention(), config.sessions.prune_interval());

    let access = StreamAccess::new(Arc::new(registry), Arc::new(gateway), tracker);
    let state = AppState::new(access, config.public_base_url().map(str::to_string));

    // Start the server
    server::start_server(&config.server, state).await?;

    Ok(())
}
