pub mod identity;
pub mod store;
pub mod tracker;

pub use identity::ViewerIdentity;
pub use store::{InMemorySessionStore, SessionStore};
pub use tracker::ViewerTracker;

use chrono::{DateTime, Utc};

use crate::camera::CameraId;

/// One viewer of one camera. `ended_at == None` means the viewer is active.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerSession {
    pub camera_id: CameraId,
    pub session_id: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl ViewerSession {
    pub fn start(camera_id: CameraId, identity: &ViewerIdentity, now: DateTime<Utc>) -> Self {
        Self {
            camera_id,
            session_id: identity.session_id(),
            ip_address: identity.address.clone(),
            user_agent: identity.user_agent.clone(),
            started_at: now,
            ended_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }

    /// Active → Active (refresh) and Ended → Active.
    pub fn reactivate(&mut self, identity: &ViewerIdentity, now: DateTime<Utc>) {
        self.started_at = now;
        self.ended_at = None;
        self.ip_address = identity.address.clone();
        self.user_agent = identity.user_agent.clone();
    }

    /// Active → Ended. Returns false (and changes nothing) if already ended.
    pub fn end(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_active() {
            return false;
        }
        self.ended_at = Some(now);
        true
    }
}
