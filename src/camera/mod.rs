pub mod directory;
pub mod record_id;

pub use directory::{CameraDirectory, CameraRegistry};
pub use record_id::RecordId;

use serde::Serialize;

use crate::config::CameraConfig;

pub type CameraId = RecordId;

/// Display metadata shown next to a stream. Empty fields are left out of
/// responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CameraDetails {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub location: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub group_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area_id: Option<RecordId>,
}

/// A camera as seen by the streaming path.
///
/// The private RTSP address is not part of it at all: go2rtc owns the
/// source, and camera records that carry one have it dropped on load.
#[derive(Debug, Clone)]
pub struct Camera {
    pub id: CameraId,
    pub name: String,
    pub stream_key: String,
    pub enabled: bool,
    pub details: CameraDetails,
}

impl Camera {
    pub fn new(id: CameraId, name: impl Into<String>, stream_key: impl Into<String>, enabled: bool) -> Self {
        Self {
            id,
            name: name.into(),
            stream_key: stream_key.into(),
            enabled,
            details: CameraDetails::default(),
        }
    }

    pub fn with_details(mut self, details: CameraDetails) -> Self {
        self.details = details;
        self
    }
}

impl From<CameraConfig> for Camera {
    fn from(config: CameraConfig) -> Self {
        Self {
            id: config.id,
            name: config.name,
            stream_key: config.stream_key,
            enabled: config.enabled,
            details: CameraDetails {
                description: config.description,
                location: config.location,
                group_name: config.group_name,
                area_id: config.area_id,
            },
        }
    }
}
