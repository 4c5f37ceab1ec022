use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::camera::CameraId;
use crate::session::{InMemorySessionStore, SessionStore, ViewerIdentity};

/// Viewer bookkeeping on top of a [`SessionStore`].
///
/// `start` is an upsert and `stop` on an unknown or ended session succeeds
/// without doing anything, so clients can repeat either call freely.
#[derive(Clone)]
pub struct ViewerTracker {
    store: Arc<dyn SessionStore>,
}

impl ViewerTracker {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemorySessionStore::new()))
    }

    pub async fn start(&self, camera_id: CameraId, identity: &ViewerIdentity) -> Result<String> {
        let session_id = self.store.upsert_active(camera_id, identity, Utc::now()).await?;
        tracing::debug!(
            "Viewer session {} active on camera {} (derived={})",
            session_id,
            camera_id,
            identity.is_derived()
        );
        Ok(session_id)
    }

    pub async fn stop(&self, camera_id: CameraId, identity: &ViewerIdentity) -> Result<bool> {
        let session_id = identity.session_id();
        let ended = self.store.end_active(camera_id, &session_id, Utc::now()).await?;
        if ended {
            tracing::debug!("Viewer session {} ended on camera {}", session_id, camera_id);
        } else {
            tracing::debug!(
                "Stop for inactive viewer session {} on camera {}",
                session_id,
                camera_id
            );
        }
        Ok(ended)
    }

    pub async fn active_count(&self, camera_id: CameraId) -> Result<usize> {
        self.store.count_active(camera_id).await
    }

    /// Drops sessions that ended more than `retention` ago.
    pub async fn prune_ended(&self, retention: Duration) -> Result<usize> {
        let retention = chrono::Duration::from_std(retention).context("Retention period out of range")?;
        let removed = self.store.prune_ended(Utc::now() - retention).await?;
        if removed > 0 {
            tracing::debug!("Pruned {} ended viewer sessions", removed);
        }
        Ok(removed)
    }

    /// Runs [`prune_ended`](Self::prune_ended) every `interval` until the
    /// returned handle is aborted.
    pub fn spawn_housekeeping(&self, retention: Duration, interval: Duration) -> JoinHandle<()> {
        let tracker = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if let Err(e) = tracker.prune_ended(retention).await {
                    tracing::warn!("Viewer session housekeeping failed: {:#}", e);
                }
            }
        })
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }
}
