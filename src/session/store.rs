use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::camera::CameraId;
use crate::session::{ViewerIdentity, ViewerSession};

/// Storage for viewer sessions. Each method must apply its transition
/// atomically for its `(camera_id, session_id)` row.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert-or-reactivate. Returns the session id that was stored.
    async fn upsert_active(
        &self,
        camera_id: CameraId,
        identity: &ViewerIdentity,
        now: DateTime<Utc>,
    ) -> Result<String>;

    /// Ends the session if it is active. `Ok(false)` when there was nothing
    /// to end.
    async fn end_active(&self, camera_id: CameraId, session_id: &str, now: DateTime<Utc>) -> Result<bool>;

    async fn count_active(&self, camera_id: CameraId) -> Result<usize>;

    async fn get(&self, camera_id: CameraId, session_id: &str) -> Result<Option<ViewerSession>>;

    /// Drops sessions that ended before `cutoff`. Active sessions are kept
    /// regardless of age. Returns how many rows were removed.
    async fn prune_ended(&self, cutoff: DateTime<Utc>) -> Result<usize>;
}

type SessionKey = (CameraId, String);

#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<SessionKey, ViewerSession>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn upsert_active(
        &self,
        camera_id: CameraId,
        identity: &ViewerIdentity,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let session_id = identity.session_id();

        // Lookup and mutation happen under one write guard.
        let mut sessions = self.sessions.write().await;
        sessions
            .entry((camera_id, session_id.clone()))
            .and_modify(|session| session.reactivate(identity, now))
            .or_insert_with(|| ViewerSession::start(camera_id, identity, now));

        Ok(session_id)
    }

    async fn end_active(&self, camera_id: CameraId, session_id: &str, now: DateTime<Utc>) -> Result<bool> {
        let mut sessions = self.sessions.write().await;
        Ok(sessions
            .get_mut(&(camera_id, session_id.to_string()))
            .map(|session| session.end(now))
            .unwrap_or(false))
    }

    async fn count_active(&self, camera_id: CameraId) -> Result<usize> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .values()
            .filter(|s| s.camera_id == camera_id && s.is_active())
            .count())
    }

    async fn get(&self, camera_id: CameraId, session_id: &str) -> Result<Option<ViewerSession>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(&(camera_id, session_id.to_string())).cloned())
    }

    async fn prune_ended(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| match session.ended_at {
            Some(ended_at) => ended_at >= cutoff,
            None => true,
        });
        Ok(before - sessions.len())
    }
}
