//! Client-side token storage.
//!
//! A stored session carries its own absolute expiry, independent of the
//! token lifetimes; an expired entry reads back as absent.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::models::{SessionUser, TokenPair};

/// How long a stored session is kept, regardless of token expiry.
pub const SESSION_STORAGE_DAYS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSession {
    pub tokens: TokenPair,
    pub user: SessionUser,
    pub expires_at: DateTime<Utc>,
}

impl StoredSession {
    pub fn new(tokens: TokenPair, user: SessionUser) -> Self {
        Self {
            tokens,
            user,
            expires_at: Utc::now() + Duration::days(SESSION_STORAGE_DAYS),
        }
    }

    fn is_live(&self) -> bool {
        self.expires_at > Utc::now()
    }
}

/// Where the client keeps its token pair between calls.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<StoredSession>>;
    fn save(&self, session: &StoredSession) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

#[derive(Default)]
pub struct MemoryTokenStore {
    session: Mutex<Option<StoredSession>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<StoredSession>> {
        let guard = self
            .session
            .lock()
            .map_err(|_| ClientError::Storage("token store lock poisoned".into()))?;
        Ok(guard.clone().filter(StoredSession::is_live))
    }

    fn save(&self, session: &StoredSession) -> Result<()> {
        *self
            .session
            .lock()
            .map_err(|_| ClientError::Storage("token store lock poisoned".into()))? =
            Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self
            .session
            .lock()
            .map_err(|_| ClientError::Storage("token store lock poisoned".into()))? = None;
        Ok(())
    }
}

/// JSON file store, used by the CLI.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store under the platform data dir (`<data_dir>/magic_villa/session.json`).
    pub fn default_location() -> Self {
        Self::new(default_session_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn default_session_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("magic_villa")
        .join("session.json")
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<StoredSession>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let session: StoredSession = serde_json::from_str(&raw)?;
        if !session.is_live() {
            debug!(path = %self.path.display(), "stored session expired");
            self.clear()?;
            return Ok(None);
        }
        Ok(Some(session))
    }

    fn save(&self, session: &StoredSession) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_vec_pretty(session)?)?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
