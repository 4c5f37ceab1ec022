pub mod client;
pub mod path;

pub use client::Go2rtcClient;
pub use path::{PlaylistPath, MASTER_PLAYLIST};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use thiserror::Error;

/// Why a request to the media server failed. All of these surface to the
/// client as 502.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("media server unreachable: {0}")]
    Unreachable(String),

    #[error("media server timed out")]
    Timeout,

    #[error("media server returned status {0}")]
    Status(u16),

    #[error("failed to read media server response: {0}")]
    Read(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout
        } else if err.is_body() || err.is_decode() {
            GatewayError::Read(err.to_string())
        } else {
            GatewayError::Unreachable(err.to_string())
        }
    }
}

#[derive(Debug, Clone)]
pub struct UpstreamPlaylist {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

pub type ByteStream = BoxStream<'static, Result<Bytes, GatewayError>>;

pub struct UpstreamProgressive {
    pub status: u16,
    pub body: ByteStream,
}

impl std::fmt::Debug for UpstreamProgressive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamProgressive")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// HTTP access to the media server's per-stream endpoints.
#[async_trait]
pub trait MediaGateway: Send + Sync {
    async fn fetch_playlist(
        &self,
        stream_key: &str,
        path: &PlaylistPath,
    ) -> Result<UpstreamPlaylist, GatewayError>;

    /// The body is pulled lazily; dropping the stream releases the upstream
    /// connection.
    async fn fetch_progressive(&self, stream_key: &str) -> Result<UpstreamProgressive, GatewayError>;
}
