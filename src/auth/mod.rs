//! Session token persistence.
//!
//! A single bearer token is the only client-side state that outlives a
//! request. Stores never fail loudly: `save` and `clear` log and carry on when
//! there is nowhere to write, and `read` answers `None`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, warn};

/// Name of the cookie holding the bearer token.
pub const TOKEN_COOKIE: &str = "ttt_token";

/// Lifetime of a saved session.
pub fn session_ttl() -> Duration {
    Duration::hours(24)
}

pub trait TokenStore: Send + Sync {
    fn save(&self, token: &str);
    fn clear(&self);
    fn read(&self) -> Option<String>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct StoredToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl StoredToken {
    fn fresh(token: &str) -> Self {
        StoredToken {
            token: token.to_string(),
            expires_at: Utc::now() + session_ttl(),
        }
    }

    fn live(self) -> Option<String> {
        (Utc::now() < self.expires_at).then_some(self.token)
    }
}

/// Process-local store, used by tests and one-shot clients.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    slot: RwLock<Option<StoredToken>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        MemoryTokenStore {
            slot: RwLock::new(Some(StoredToken::fresh(token))),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn save(&self, token: &str) {
        if let Ok(mut slot) = self.slot.write() {
            *slot = Some(StoredToken::fresh(token));
        }
    }

    fn clear(&self) {
        if let Ok(mut slot) = self.slot.write() {
            *slot = None;
        }
    }

    fn read(&self) -> Option<String> {
        let slot = self.slot.read().ok()?;
        slot.clone().and_then(StoredToken::live)
    }
}

/// Session file for the terminal client; the CLI's equivalent of the cookie.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileTokenStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, stored: &StoredToken) -> Result<(), String> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)
                .map_err(|e| format!("failed to create {}: {e}", dir.display()))?;
        }
        let body = serde_json::to_string(stored).map_err(|e| format!("json error: {e}"))?;
        std::fs::write(&self.path, body)
            .map_err(|e| format!("failed to write {}: {e}", self.path.display()))
    }
}

impl TokenStore for FileTokenStore {
    fn save(&self, token: &str) {
        match self.write(&StoredToken::fresh(token)) {
            Ok(()) => debug!(path = %self.path.display(), "session saved"),
            Err(e) => warn!("could not save session: {e}"),
        }
    }

    fn clear(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "session cleared"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("could not clear session {}: {e}", self.path.display()),
        }
    }

    fn read(&self) -> Option<String> {
        let body = std::fs::read_to_string(&self.path).ok()?;
        let stored: StoredToken = serde_json::from_str(&body).ok()?;
        stored.live()
    }
}
