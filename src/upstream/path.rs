//! go2rtc addresses the same HLS stream two ways: the master playlist by a
//! `src` query parameter, everything below it by path under `/api/`.

use url::{ParseError, Url};

/// Client-facing sub path that means "the top-level playlist".
pub const MASTER_PLAYLIST: &str = "index.m3u8";

/// Upstream resources reachable through the HLS proxy live under this prefix.
const RESOURCE_PREFIX: &str = "hls";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaylistPath {
    Master,
    Resource { path: String, query: Option<String> },
}

impl PlaylistPath {
    /// Classifies the sub path of an inbound HLS request. Resource paths are
    /// confined to the upstream HLS tree so the proxy cannot be pointed at any
    /// other media server API.
    pub fn parse(sub_path: &str, query: Option<&str>) -> Result<Self, String> {
        let sub_path = sub_path.trim_start_matches('/');

        if sub_path == MASTER_PLAYLIST {
            return Ok(PlaylistPath::Master);
        }

        let mut segments = sub_path.split('/');
        if segments.next() != Some(RESOURCE_PREFIX) {
            return Err(format!("unsupported playlist path: {}", sub_path));
        }

        let mut has_resource = false;
        for segment in segments {
            if segment.is_empty()
                || segment == "."
                || segment == ".."
                || segment.contains(&['\\', '?', '#', '%'][..])
            {
                return Err(format!("invalid playlist path: {}", sub_path));
            }
            has_resource = true;
        }
        if !has_resource {
            return Err(format!("invalid playlist path: {}", sub_path));
        }

        Ok(PlaylistPath::Resource {
            path: sub_path.to_string(),
            query: query.filter(|q| !q.is_empty()).map(str::to_string),
        })
    }

    pub fn is_master(&self) -> bool {
        matches!(self, PlaylistPath::Master)
    }

    pub fn upstream_url(&self, base_url: &str, stream_key: &str) -> Result<Url, ParseError> {
        match self {
            PlaylistPath::Master => {
                let mut url = Url::parse(&format!("{}/api/stream.m3u8", base_url))?;
                url.query_pairs_mut().append_pair("src", stream_key);
                Ok(url)
            }
            PlaylistPath::Resource { path, query } => {
                // Segments are pushed one by one so each is percent-encoded
                // and none can be reinterpreted as a dot segment.
                let mut url = Url::parse(base_url)?;
                url.path_segments_mut()
                    .map_err(|_| ParseError::RelativeUrlWithCannotBeABaseBase)?
                    .pop_if_empty()
                    .push("api")
                    .extend(path.split('/'));
                url.set_query(query.as_deref());
                Ok(url)
            }
        }
    }
}

/// Progressive MP4 endpoint for `stream_key`.
pub fn progressive_url(base_url: &str, stream_key: &str) -> Result<Url, ParseError> {
    let mut url = Url::parse(&format!("{}/api/stream.mp4", base_url))?;
    url.query_pairs_mut().append_pair("src", stream_key);
    Ok(url)
}
