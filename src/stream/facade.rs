use bytes::Bytes;
use serde::Serialize;
use std::sync::Arc;

use crate::camera::{Camera, CameraDetails, CameraDirectory, CameraId};
use crate::error::{StreamError, StreamResult};
use crate::session::{ViewerIdentity, ViewerTracker};
use crate::stream::PlaybackUrls;
use crate::translator::PlaylistRewriter;
use crate::upstream::{ByteStream, MediaGateway, PlaylistPath};

#[derive(Debug, Clone, Serialize)]
pub struct PlaybackInfo {
    pub camera_id: CameraId,
    pub name: String,
    pub stream_key: String,
    #[serde(flatten)]
    pub details: CameraDetails,
    #[serde(flatten)]
    pub urls: PlaybackUrls,
}

#[derive(Debug, Clone, Serialize)]
pub struct StreamStats {
    pub camera_id: CameraId,
    pub name: String,
    pub stream_key: String,
    pub viewer_count: usize,
    pub status: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct StreamListing {
    pub id: CameraId,
    pub name: String,
    pub stream_key: String,
    #[serde(flatten)]
    pub details: CameraDetails,
    #[serde(flatten)]
    pub urls: PlaybackUrls,
    pub status: &'static str,
}

#[derive(Debug)]
pub struct PlaylistResponse {
    pub status: u16,
    pub content_type: String,
    pub body: Bytes,
}

pub struct ProgressiveResponse {
    pub status: u16,
    pub body: ByteStream,
}

fn status_label(camera: &Camera) -> &'static str {
    if camera.enabled {
        "online"
    } else {
        "disabled"
    }
}

/// Content type to report when the media server does not send one.
fn fallback_content_type(path: &PlaylistPath) -> &'static str {
    let file = match path {
        PlaylistPath::Master => return "application/vnd.apple.mpegurl",
        PlaylistPath::Resource { path, .. } => path.rsplit('/').next().unwrap_or_default(),
    };

    match file.rsplit_once('.').map(|(_, ext)| ext) {
        Some("m3u8") => "application/vnd.apple.mpegurl",
        Some("ts") => "video/mp2t",
        Some("mp4") | Some("m4s") => "video/mp4",
        _ => "application/octet-stream",
    }
}

/// Entry point for everything the stream routes do: authorize by stream
/// key, then hand out links, proxy the media server, or track viewers.
#[derive(Clone)]
pub struct StreamAccess {
    directory: Arc<dyn CameraDirectory>,
    gateway: Arc<dyn MediaGateway>,
    tracker: ViewerTracker,
}

impl StreamAccess {
    pub fn new(
        directory: Arc<dyn CameraDirectory>,
        gateway: Arc<dyn MediaGateway>,
        tracker: ViewerTracker,
    ) -> Self {
        Self {
            directory,
            gateway,
            tracker,
        }
    }

    async fn lookup(&self, stream_key: &str) -> StreamResult<Camera> {
        match self.directory.resolve(stream_key).await? {
            Some(camera) => Ok(camera),
            None => {
                tracing::debug!("Unknown stream key: {}", stream_key);
                Err(StreamError::NotFound)
            }
        }
    }

    /// Lookup plus the enabled gate. Nothing reaches the media server
    /// without passing this.
    async fn authorize(&self, stream_key: &str) -> StreamResult<Camera> {
        let camera = self.lookup(stream_key).await?;
        if !camera.enabled {
            tracing::info!("Refusing stream for disabled camera {}", camera.id);
            return Err(StreamError::Forbidden);
        }
        Ok(camera)
    }

    pub async fn playback_info(&self, stream_key: &str, public_base_url: &str) -> StreamResult<PlaybackInfo> {
        let camera = self.authorize(stream_key).await?;
        Ok(PlaybackInfo {
            camera_id: camera.id,
            urls: PlaybackUrls::new(public_base_url, &camera.stream_key),
            name: camera.name,
            stream_key: camera.stream_key,
            details: camera.details,
        })
    }

    pub async fn proxy_playlist(
        &self,
        stream_key: &str,
        sub_path: &str,
        query: Option<&str>,
        public_base_url: &str,
    ) -> StreamResult<PlaylistResponse> {
        let camera = self.authorize(stream_key).await?;
        let path = PlaylistPath::parse(sub_path, query).map_err(StreamError::InvalidPath)?;

        let upstream = self.gateway.fetch_playlist(&camera.stream_key, &path).await?;
        let content_type = upstream
            .content_type
            .unwrap_or_else(|| fallback_content_type(&path).to_string());

        let body = if path.is_master() {
            match PlaylistRewriter::rewrite_bytes(&upstream.body, public_base_url, &camera.stream_key) {
                Some(rewritten) => Bytes::from(rewritten),
                None => upstream.body,
            }
        } else {
            upstream.body
        };

        Ok(PlaylistResponse {
            status: upstream.status,
            content_type,
            body,
        })
    }

    pub async fn proxy_progressive(&self, stream_key: &str) -> StreamResult<ProgressiveResponse> {
        let camera = self.authorize(stream_key).await?;
        let upstream = self.gateway.fetch_progressive(&camera.stream_key).await?;

        tracing::info!("Streaming MP4 for camera {}", camera.id);

        Ok(ProgressiveResponse {
            status: upstream.status,
            body: upstream.body,
        })
    }

    /// Does not check `enabled`: operators look up disabled cameras too.
    pub async fn stats(&self, stream_key: &str) -> StreamResult<StreamStats> {
        let camera = self.lookup(stream_key).await?;

        let viewer_count = match self.tracker.active_count(camera.id).await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!("Viewer count unavailable for camera {}: {:#}", camera.id, e);
                0
            }
        };

        Ok(StreamStats {
            camera_id: camera.id,
            status: status_label(&camera),
            name: camera.name,
            stream_key: camera.stream_key,
            viewer_count,
        })
    }

    pub async fn start_viewing(&self, stream_key: &str, identity: &ViewerIdentity) -> StreamResult<String> {
        let camera = self.lookup(stream_key).await?;
        Ok(self.tracker.start(camera.id, identity).await?)
    }

    pub async fn stop_viewing(&self, stream_key: &str, identity: &ViewerIdentity) -> StreamResult<()> {
        let camera = self.lookup(stream_key).await?;
        self.tracker.stop(camera.id, identity).await?;
        Ok(())
    }

    pub async fn list_active_streams(&self, public_base_url: &str) -> StreamResult<Vec<StreamListing>> {
        let cameras = self.directory.list_enabled().await?;
        Ok(cameras
            .into_iter()
            .map(|camera| StreamListing {
                id: camera.id,
                urls: PlaybackUrls::new(public_base_url, &camera.stream_key),
                status: status_label(&camera),
                name: camera.name,
                stream_key: camera.stream_key,
                details: camera.details,
            })
            .collect())
    }
}
