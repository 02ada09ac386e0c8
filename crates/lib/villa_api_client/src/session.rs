//! Session scope: the stored credentials of one signed-in user plus the
//! lock that serializes refreshes against them.

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::claims;
use crate::error::Result;
use crate::models::{SessionUser, TokenPair};
use crate::store::{MemoryTokenStore, StoredSession, TokenStore};

/// Shared by every client acting for the same stored credentials.
pub struct SessionScope {
    store: Arc<dyn TokenStore>,
    refresh_lock: Mutex<()>,
}

impl SessionScope {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self {
            store,
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryTokenStore::new()))
    }

    pub fn tokens(&self) -> Result<Option<TokenPair>> {
        Ok(self.store.load()?.map(|s| s.tokens))
    }

    pub fn user(&self) -> Result<Option<SessionUser>> {
        Ok(self.store.load()?.map(|s| s.user))
    }

    /// Store `tokens` and re-derive the session identity from its claims.
    pub fn sign_in(&self, tokens: TokenPair) -> Result<SessionUser> {
        let user = claims::session_user(&tokens.access_token)?;
        self.store.save(&StoredSession::new(tokens, user.clone()))?;
        debug!(user = %user.name, "session stored");
        Ok(user)
    }

    pub fn sign_out(&self) -> Result<()> {
        self.store.clear()?;
        debug!("session cleared");
        Ok(())
    }

    /// Held for the duration of a refresh so concurrent callers queue up.
    pub(crate) async fn lock_refresh(&self) -> MutexGuard<'_, ()> {
        self.refresh_lock.lock().await
    }
}

#[cfg(test)]
mod tests {
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    use super::*;

    fn access_token(name: &str) -> String {
        let payload = format!(r#"{{"unique_name":"{name}","role":"customer"}}"#);
        format!("h.{}.s", URL_SAFE_NO_PAD.encode(payload))
    }

    #[test]
    fn sign_in_derives_identity_from_claims() {
        let scope = SessionScope::in_memory();
        let user = scope.sign_in(TokenPair::new(access_token("a"), "r")).unwrap();
        assert_eq!(user.name, "a");
        assert_eq!(scope.user().unwrap(), Some(user));
        assert_eq!(scope.tokens().unwrap().unwrap().refresh_token, "r");

        scope.sign_out().unwrap();
        assert_eq!(scope.tokens().unwrap(), None);
    }

    #[test]
    fn malformed_access_token_is_not_stored() {
        let scope = SessionScope::in_memory();
        assert!(scope.sign_in(TokenPair::new("nope", "r")).is_err());
        assert_eq!(scope.tokens().unwrap(), None);
    }
}
