use anyhow::{Context, Result};
use axum::http::{header::CONTENT_TYPE, HeaderName, HeaderValue, Method};
use axum::Router;
use std::net::SocketAddr;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::server::routes::{create_router, AppState, SESSION_HEADER};

pub fn build_app(state: AppState, allowed_origins: &[String]) -> Router {
    create_router(state)
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(SESSION_HEADER)]);

    if allowed_origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid allowed origin: {}", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

pub async fn start_server(config: &ServerConfig, state: AppState) -> Result<()> {
    let addr: SocketAddr = config
        .listen_address
        .parse()
        .context("Failed to parse listen address")?;

    let app = build_app(state, &config.allowed_origins);

    tracing::info!("Starting stream gateway on {}", addr);
    tracing::info!("Streams served at: /api/stream/{{stream_key}}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("Server error")?;

    Ok(())
}
