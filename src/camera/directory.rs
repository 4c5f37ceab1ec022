use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::camera::Camera;
use crate::config::CameraConfig;

/// Read access to camera records by their public stream key.
#[async_trait]
pub trait CameraDirectory: Send + Sync {
    /// `Ok(None)` when no camera uses `stream_key`. Disabled cameras are
    /// still returned so callers can tell "unknown" from "disabled".
    async fn resolve(&self, stream_key: &str) -> Result<Option<Camera>>;

    /// All enabled cameras, ordered by id.
    async fn list_enabled(&self) -> Result<Vec<Camera>>;
}

/// In-process camera directory indexed by stream key.
#[derive(Clone, Default)]
pub struct CameraRegistry {
    cameras: Arc<RwLock<HashMap<String, Camera>>>,
}

impl CameraRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn from_configs(configs: Vec<CameraConfig>) -> Result<Self> {
        let registry = Self::new();
        for config in configs {
            tracing::info!("Adding camera: {} ({})", config.name, config.id);
            registry.add_camera(config.into()).await?;
        }
        Ok(registry)
    }

    pub async fn add_camera(&self, camera: Camera) -> Result<()> {
        if camera.stream_key.trim().is_empty() {
            bail!("Camera {} has an empty stream key", camera.id);
        }

        let mut cameras = self.cameras.write().await;
        if let Some(existing) = cameras.get(&camera.stream_key) {
            bail!(
                "Stream key {} is already used by camera {}",
                camera.stream_key,
                existing.id
            );
        }

        tracing::debug!("Registered stream key {} for camera {}", camera.stream_key, camera.id);
        cameras.insert(camera.stream_key.clone(), camera);
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.cameras.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.cameras.read().await.is_empty()
    }
}

#[async_trait]
impl CameraDirectory for CameraRegistry {
    async fn resolve(&self, stream_key: &str) -> Result<Option<Camera>> {
        let cameras = self.cameras.read().await;
        Ok(cameras.get(stream_key).cloned())
    }

    async fn list_enabled(&self) -> Result<Vec<Camera>> {
        let cameras = self.cameras.read().await;
        let mut enabled: Vec<Camera> = cameras.values().filter(|c| c.enabled).cloned().collect();
        enabled.sort_by_key(|c| c.id);
        Ok(enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::RecordId;

    async fn registry() -> CameraRegistry {
        let registry = CameraRegistry::new();
        registry
            .add_camera(Camera::new(RecordId(9), "Yard", "yard-9", true))
            .await
            .unwrap();
        registry
            .add_camera(Camera::new(RecordId(8), "Dock", "dock-1", false))
            .await
            .unwrap();
        registry
            .add_camera(Camera::new(RecordId(7), "Gate", "gate-42", true))
            .await
            .unwrap();
        registry
    }

    #[tokio::test]
    async fn test_resolve_distinguishes_missing_and_disabled() {
        let registry = registry().await;

        let dock = registry.resolve("dock-1").await.unwrap().unwrap();
        assert!(!dock.enabled);
        assert!(registry.resolve("no-such-key").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_enabled_is_ordered_and_filtered() {
        let registry = registry().await;

        let ids: Vec<_> = registry
            .list_enabled()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![RecordId(7), RecordId(9)]);
    }

    #[tokio::test]
    async fn test_duplicate_stream_key_rejected() {
        let registry = registry().await;

        let result = registry
            .add_camera(Camera::new(RecordId(10), "Other", "gate-42", true))
            .await;
        assert!(result.is_err());
        assert_eq!(registry.len().await, 3);
    }
}
