use axum::{
    body::Body,
    extract::{ConnectInfo, Path, RawQuery, State},
    http::{
        header::{CACHE_CONTROL, CONTENT_TYPE, HOST, USER_AGENT},
        HeaderMap, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use futures::StreamExt;
use serde::Serialize;
use std::net::SocketAddr;

use crate::error::StreamError;
use crate::server::envelope::ApiResponse;
use crate::session::ViewerIdentity;
use crate::stream::{PlaybackInfo, StreamAccess, StreamListing, StreamStats};

pub const SESSION_HEADER: &str = "x-session-id";
const FORWARDED_FOR: &str = "x-forwarded-for";
const FORWARDED_PROTO: &str = "x-forwarded-proto";

#[derive(Clone)]
pub struct AppState {
    pub access: StreamAccess,
    /// Configured public base URL; `None` falls back to the request's Host.
    pub public_base_url: Option<String>,
}

impl AppState {
    pub fn new(access: StreamAccess, public_base_url: Option<String>) -> Self {
        Self {
            access,
            public_base_url: public_base_url.map(|base| base.trim_end_matches('/').to_string()),
        }
    }

    fn base_url_for(&self, headers: &HeaderMap) -> String {
        if let Some(base) = &self.public_base_url {
            return base.clone();
        }

        let host = header_str(headers, HOST.as_str()).unwrap_or("localhost");
        let scheme = header_str(headers, FORWARDED_PROTO).unwrap_or("http");
        format!("{}://{}", scheme, host)
    }
}

#[derive(Debug, Serialize)]
struct ViewingStarted {
    session_id: String,
}

pub fn create_router(state: AppState) -> Router {
    let stream_routes = Router::new()
        .route("/stream", get(list_streams))
        .route("/stream/hls/:stream_key/*sub_path", get(proxy_hls))
        .route("/stream/mse/:stream_key", get(proxy_mse))
        .route("/stream/:stream_key", get(get_stream))
        .route("/stream/:stream_key/stats", get(get_stats))
        .route("/stream/:stream_key/start", post(start_viewing))
        .route("/stream/:stream_key/stop", post(stop_viewing));

    Router::new()
        .nest("/api", stream_routes)
        // Health check
        .route("/health", get(health_check))
        .with_state(state)
}

async fn list_streams(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<ApiResponse<Vec<StreamListing>>, StreamError> {
    let base_url = state.base_url_for(&headers);
    let streams = state.access.list_active_streams(&base_url).await?;
    tracing::debug!("Listing {} active streams", streams.len());
    Ok(ApiResponse::ok(streams))
}

async fn get_stream(
    State(state): State<AppState>,
    Path(stream_key): Path<String>,
    headers: HeaderMap,
) -> Result<ApiResponse<PlaybackInfo>, StreamError> {
    let base_url = state.base_url_for(&headers);
    let info = state.access.playback_info(&stream_key, &base_url).await?;
    Ok(ApiResponse::ok(info))
}

async fn proxy_hls(
    State(state): State<AppState>,
    Path((stream_key, sub_path)): Path<(String, String)>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Result<Response, StreamError> {
    tracing::debug!("HLS request for {}: {}", stream_key, sub_path);

    let base_url = state.base_url_for(&headers);
    let playlist = state
        .access
        .proxy_playlist(&stream_key, &sub_path, query.as_deref(), &base_url)
        .await?;

    let status = StatusCode::from_u16(playlist.status).unwrap_or(StatusCode::OK);
    Ok((
        status,
        [
            (CONTENT_TYPE, playlist.content_type),
            (CACHE_CONTROL, "no-cache".to_string()),
        ],
        playlist.body,
    )
        .into_response())
}

async fn proxy_mse(
    State(state): State<AppState>,
    Path(stream_key): Path<String>,
) -> Result<Response, StreamError> {
    let progressive = state.access.proxy_progressive(&stream_key).await?;

    // Headers are already sent by the time a chunk fails, so all we can do
    // is log and let the connection drop.
    let key = stream_key.clone();
    let body = progressive.body.inspect(move |chunk| {
        if let Err(e) = chunk {
            tracing::warn!("MP4 stream for {} interrupted: {}", key, e);
        }
    });

    let status = StatusCode::from_u16(progressive.status).unwrap_or(StatusCode::OK);
    Ok((
        status,
        [(CONTENT_TYPE, "video/mp4"), (CACHE_CONTROL, "no-cache")],
        Body::from_stream(body),
    )
        .into_response())
}

async fn get_stats(
    State(state): State<AppState>,
    Path(stream_key): Path<String>,
) -> Result<ApiResponse<StreamStats>, StreamError> {
    let stats = state.access.stats(&stream_key).await?;
    Ok(ApiResponse::ok(stats))
}

async fn start_viewing(
    State(state): State<AppState>,
    Path(stream_key): Path<String>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Result<ApiResponse<ViewingStarted>, StreamError> {
    let identity = viewer_identity(&headers, connect_info.map(|ConnectInfo(addr)| addr));
    let session_id = state.access.start_viewing(&stream_key, &identity).await?;

    tracing::info!("Viewer {} started watching {}", session_id, stream_key);

    Ok(ApiResponse::ok(ViewingStarted { session_id }))
}

async fn stop_viewing(
    State(state): State<AppState>,
    Path(stream_key): Path<String>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Result<ApiResponse<()>, StreamError> {
    let identity = viewer_identity(&headers, connect_info.map(|ConnectInfo(addr)| addr));
    state.access.stop_viewing(&stream_key, &identity).await?;

    tracing::info!("Viewer {} stopped watching {}", identity.session_id(), stream_key);

    Ok(ApiResponse::message("Viewing session ended"))
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn viewer_identity(headers: &HeaderMap, peer: Option<SocketAddr>) -> ViewerIdentity {
    let address = header_str(headers, FORWARDED_FOR)
        .and_then(|list| list.split(',').next())
        .map(|first| first.trim().to_string())
        .filter(|first| !first.is_empty())
        .or_else(|| peer.map(|addr| addr.ip().to_string()));

    ViewerIdentity::new(
        header_str(headers, SESSION_HEADER).map(str::to_string),
        address,
        header_str(headers, USER_AGENT.as_str()).map(str::to_string),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_identity_prefers_forwarded_address() {
        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED_FOR, HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        headers.insert(USER_AGENT, HeaderValue::from_static("Mozilla/5.0"));

        let peer: SocketAddr = "10.0.0.1:51000".parse().unwrap();
        let identity = viewer_identity(&headers, Some(peer));
        assert_eq!(identity.address.as_deref(), Some("203.0.113.7"));
        assert_eq!(identity.user_agent.as_deref(), Some("Mozilla/5.0"));
        assert!(identity.is_derived());
    }

    #[test]
    fn test_identity_uses_peer_and_session_header() {
        let mut headers = HeaderMap::new();
        headers.insert(SESSION_HEADER, HeaderValue::from_static("tab-1"));

        let peer: SocketAddr = "192.0.2.1:40000".parse().unwrap();
        let identity = viewer_identity(&headers, Some(peer));
        assert_eq!(identity.address.as_deref(), Some("192.0.2.1"));
        assert_eq!(identity.session_id(), "tab-1");
    }
}
