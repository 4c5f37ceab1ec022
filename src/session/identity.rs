use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha1::{Digest, Sha1};

const DERIVED_PREFIX: &str = "anon-";

/// Longest client-supplied session id kept as is. Anything longer is
/// treated as absent and the id is derived instead.
pub const MAX_SESSION_ID_LEN: usize = 128;

/// Who is asking to start or stop viewing.
///
/// An explicit session id from the client always wins. Without one the id is
/// derived from address and user agent, so clients behind the same NAT with
/// the same browser share a session, and a client whose agent string changes
/// gets a new one.
#[derive(Debug, Clone, Default)]
pub struct ViewerIdentity {
    pub session_hint: Option<String>,
    pub address: Option<String>,
    pub user_agent: Option<String>,
}

impl ViewerIdentity {
    pub fn new(
        session_hint: Option<String>,
        address: Option<String>,
        user_agent: Option<String>,
    ) -> Self {
        Self {
            session_hint: session_hint
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .filter(|s| {
                    let fits = s.len() <= MAX_SESSION_ID_LEN;
                    if !fits {
                        tracing::debug!("Ignoring {}-byte session id", s.len());
                    }
                    fits
                }),
            address,
            user_agent,
        }
    }

    pub fn is_derived(&self) -> bool {
        self.session_hint.is_none()
    }

    pub fn session_id(&self) -> String {
        match &self.session_hint {
            Some(hint) => hint.clone(),
            None => self.derived_session_id(),
        }
    }

    fn derived_session_id(&self) -> String {
        let mut hasher = Sha1::new();
        hasher.update(self.address.as_deref().unwrap_or("unknown").as_bytes());
        hasher.update(b"\n");
        hasher.update(self.user_agent.as_deref().unwrap_or_default().as_bytes());
        format!("{}{}", DERIVED_PREFIX, URL_SAFE_NO_PAD.encode(hasher.finalize()))
    }
}
