/// Variant reference go2rtc writes into its master playlist, relative to
/// its own `/api/` root.
pub const VARIANT_REFERENCE: &str = "hls/playlist.m3u8";

pub struct PlaylistRewriter;

impl PlaylistRewriter {
    /// Points the master playlist's variant reference back through our own
    /// HLS route. Anything after the reference on its line (go2rtc appends
    /// `?id=...`) is preserved. Input without the reference is returned as is.
    pub fn rewrite(playlist: &str, public_base_url: &str, stream_key: &str) -> String {
        if !playlist.contains(VARIANT_REFERENCE) {
            tracing::debug!("Master playlist for {} has no variant reference", stream_key);
            return playlist.to_string();
        }

        playlist.replace(
            VARIANT_REFERENCE,
            &Self::variant_url(public_base_url, stream_key),
        )
    }

    /// Byte-level entry point for proxied bodies. A body that is not UTF-8 is
    /// not a playlist we understand and passes through untouched.
    pub fn rewrite_bytes(body: &[u8], public_base_url: &str, stream_key: &str) -> Option<String> {
        match std::str::from_utf8(body) {
            Ok(text) => Some(Self::rewrite(text, public_base_url, stream_key)),
            Err(_) => {
                tracing::warn!("Master playlist for {} is not valid UTF-8", stream_key);
                None
            }
        }
    }

    pub fn variant_url(public_base_url: &str, stream_key: &str) -> String {
        format!(
            "{}/api/stream/hls/{}/{}",
            public_base_url.trim_end_matches('/'),
            urlencoding::encode(stream_key),
            VARIANT_REFERENCE
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASTER: &str = "#EXTM3U\n\
#EXT-X-STREAM-INF:BANDWIDTH=192000,CODECS=\"avc1.640029\"\n\
hls/playlist.m3u8?id=Xk2pQ\n";

    #[test]
    fn test_rewrites_variant_reference_once() {
        let rewritten = PlaylistRewriter::rewrite(MASTER, "https://cctv.example.com", "gate-42");

        let expected = "https://cctv.example.com/api/stream/hls/gate-42/hls/playlist.m3u8";
        assert_eq!(rewritten.matches(expected).count(), 1);
        assert!(rewritten.contains(&format!("{}?id=Xk2pQ\n", expected)));
        assert!(rewritten.starts_with("#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=192000"));
    }

    #[test]
    fn test_no_reference_is_identity() {
        let playlist = "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1\nvariant/main.m3u8\n";
        let rewritten = PlaylistRewriter::rewrite(playlist, "https://cctv.example.com", "gate-42");
        assert_eq!(rewritten.as_bytes(), playlist.as_bytes());
    }

    #[test]
    fn test_trailing_slash_on_base_is_ignored() {
        assert_eq!(
            PlaylistRewriter::variant_url("http://host:3000/", "k"),
            "http://host:3000/api/stream/hls/k/hls/playlist.m3u8"
        );
    }

    #[test]
    fn test_stream_key_is_encoded_in_variant_url() {
        assert_eq!(
            PlaylistRewriter::variant_url("http://host:3000", "yard cam#2"),
            "http://host:3000/api/stream/hls/yard%20cam%232/hls/playlist.m3u8"
        );
    }

    #[test]
    fn test_non_utf8_body_is_not_rewritten() {
        assert!(PlaylistRewriter::rewrite_bytes(&[0xff, 0xfe, 0x00], "http://h", "k").is_none());
        assert!(PlaylistRewriter::rewrite_bytes(MASTER.as_bytes(), "http://h", "k").is_some());
    }
}
