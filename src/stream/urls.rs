use serde::Serialize;

/// Public playback links for one stream key. Always routed through this
/// service, never at the media server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaybackUrls {
    /// Fragmented MP4 over HTTP, playable by a plain `<video>` element.
    pub mse_url: String,
    pub webrtc_url: String,
    pub hls_url: String,
}

impl PlaybackUrls {
    pub fn new(public_base_url: &str, stream_key: &str) -> Self {
        let base = public_base_url.trim_end_matches('/');
        Self {
            mse_url: Self::format_url(base, "mse", stream_key),
            webrtc_url: Self::format_url(base, "webrtc", stream_key),
            hls_url: format!("{}/index.m3u8", Self::format_url(base, "hls", stream_key)),
        }
    }

    fn format_url(base: &str, format: &str, stream_key: &str) -> String {
        format!("{}/api/stream/{}/{}", base, format, urlencoding::encode(stream_key))
    }
}
