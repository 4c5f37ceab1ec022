use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::camera::RecordId;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub sessions: SessionConfig,
    #[serde(default)]
    pub cameras: Vec<CameraConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub listen_address: String,
    /// Externally routable base used in playback links. Empty means
    /// "derive it from the inbound request's Host header".
    #[serde(default)]
    pub public_base_url: String,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UpstreamConfig {
    /// go2rtc `host:port`
    pub address: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    /// How long ended sessions are kept before housekeeping drops them.
    pub retention_secs: u64,
    pub prune_interval_secs: u64,
}

/// Camera record as stored by the admin side. Fields this service has no use
/// for, `private_rtsp_url` among them, are ignored on load.
#[derive(Debug, Deserialize, Clone)]
pub struct CameraConfig {
    pub id: RecordId,
    pub name: String,
    pub stream_key: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub group_name: String,
    #[serde(default, deserialize_with = "crate::camera::record_id::optional")]
    pub area_id: Option<RecordId>,
}

fn default_enabled() -> bool {
    true
}

impl AppConfig {
    /// Loads the YAML file at `path` (if it exists) layered under `CCTV_*`
    /// environment variables.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::warn!(
                "Configuration file {} not found, using defaults and environment only",
                path.display()
            );
        }

        Self::build(File::from(path).format(FileFormat::Yaml).required(false))
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        Self::build(File::from_str(contents, FileFormat::Yaml))
    }

    fn build<S>(source: S) -> Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let settings = Config::builder()
            .set_default("server.listen_address", "0.0.0.0:3000")?
            .set_default("server.public_base_url", "")?
            .set_default("upstream.address", "localhost:1984")?
            .set_default("upstream.connect_timeout_secs", 5)?
            .set_default("upstream.request_timeout_secs", 10)?
            .set_default("sessions.retention_secs", 86400)?
            .set_default("sessions.prune_interval_secs", 300)?
            .add_source(source)
            .add_source(
                Environment::with_prefix("CCTV")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .context("Failed to build configuration")?;

        let mut config: AppConfig = settings
            .try_deserialize()
            .context("Failed to parse configuration")?;

        if let Ok(base_url) = std::env::var("PUBLIC_STREAM_BASE_URL") {
            config.server.public_base_url = base_url;
        }

        Ok(config)
    }

    pub fn public_base_url(&self) -> Option<&str> {
        let base = self.server.public_base_url.trim();
        (!base.is_empty()).then_some(base)
    }
}

impl UpstreamConfig {
    pub fn base_url(&self) -> String {
        if self.address.starts_with("http://") || self.address.starts_with("https://") {
            self.address.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", self.address)
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl SessionConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    pub fn prune_interval(&self) -> Duration {
        Duration::from_secs(self.prune_interval_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply_to_empty_file() {
        let config = AppConfig::from_yaml_str("cameras: []").unwrap();

        assert_eq!(config.upstream.address, "localhost:1984");
        assert_eq!(config.upstream.base_url(), "http://localhost:1984");
        assert_eq!(config.upstream.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.sessions.retention(), Duration::from_secs(86400));
        assert_eq!(config.sessions.prune_interval(), Duration::from_secs(300));
        assert!(config.cameras.is_empty());
    }

    #[test]
    fn test_camera_ids_accept_numbers_and_numeric_strings() {
        let yaml = r#"
cameras:
  - id: 7
    name: Gate
    stream_key: gate-42
    area_id: "3"
  - id: "8"
    name: Dock
    stream_key: dock-1
    enabled: false
    private_rtsp_url: rtsp://10.0.0.8:554/stream
    area_id: ""
"#;
        let config = AppConfig::from_yaml_str(yaml).unwrap();

        assert_eq!(config.cameras[0].id, RecordId(7));
        assert!(config.cameras[0].enabled);
        assert_eq!(config.cameras[0].area_id, Some(RecordId(3)));
        assert_eq!(config.cameras[1].id, RecordId(8));
        assert!(!config.cameras[1].enabled);
        assert_eq!(config.cameras[1].area_id, None);
    }

    #[test]
    fn test_non_numeric_camera_id_is_rejected() {
        let yaml = r#"
cameras:
  - id: front
    name: Gate
    stream_key: gate-42
"#;
        assert!(AppConfig::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_upstream_address_with_scheme() {
        let upstream = UpstreamConfig {
            address: "https://media.internal:1984/".to_string(),
            connect_timeout_secs: 1,
            request_timeout_secs: 1,
        };
        assert_eq!(upstream.base_url(), "https://media.internal:1984");
    }
}
