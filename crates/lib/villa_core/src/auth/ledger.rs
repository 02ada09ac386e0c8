//! Refresh token ledger.
//!
//! Every refresh token ever issued is a row; rows are invalidated, never
//! deleted. A chain is the set of rows sharing `(user_id, chain_id)`, and at
//! most one of them is valid at a time.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::AuthError;
use crate::models::auth::RefreshTokenRecord;

/// Result of an atomic rotation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotateOutcome {
    /// The current row was valid; it is now invalid and the replacement is stored.
    Rotated,
    /// The current row was already invalid; nothing was written.
    Stale,
}

/// Persisted refresh-token ledger.
#[async_trait]
pub trait TokenLedger: Send + Sync {
    async fn insert(&self, record: &RefreshTokenRecord) -> Result<(), AuthError>;

    async fn find_by_token(
        &self,
        refresh_token: &str,
    ) -> Result<Option<RefreshTokenRecord>, AuthError>;

    /// Mark one row invalid. Returns whether it was valid before.
    async fn invalidate(&self, id: Uuid) -> Result<bool, AuthError>;

    /// Mark every row of a chain invalid. Returns the number of rows flipped.
    async fn invalidate_chain(&self, user_id: Uuid, chain_id: &str) -> Result<u64, AuthError>;

    /// Invalidate `current_id` if and only if it is still valid, and store
    /// `replacement` in the same atomic unit.
    async fn rotate(
        &self,
        current_id: Uuid,
        replacement: &RefreshTokenRecord,
    ) -> Result<RotateOutcome, AuthError>;

    /// All rows of a chain, oldest first.
    async fn chain(
        &self,
        user_id: Uuid,
        chain_id: &str,
    ) -> Result<Vec<RefreshTokenRecord>, AuthError>;
}

/// Ledger kept in process memory. A single mutex makes each operation atomic.
#[derive(Default)]
pub struct MemoryLedger {
    rows: Mutex<HashMap<String, RefreshTokenRecord>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenLedger for MemoryLedger {
    async fn insert(&self, record: &RefreshTokenRecord) -> Result<(), AuthError> {
        let mut rows = self.rows.lock().await;
        if rows.contains_key(&record.refresh_token) {
            return Err(AuthError::Internal("duplicate refresh token".into()));
        }
        rows.insert(record.refresh_token.clone(), record.clone());
        Ok(())
    }

    async fn find_by_token(
        &self,
        refresh_token: &str,
    ) -> Result<Option<RefreshTokenRecord>, AuthError> {
        Ok(self.rows.lock().await.get(refresh_token).cloned())
    }

    async fn invalidate(&self, id: Uuid) -> Result<bool, AuthError> {
        let mut rows = self.rows.lock().await;
        Ok(rows
            .values_mut()
            .find(|r| r.id == id)
            .map(|r| std::mem::replace(&mut r.is_valid, false))
            .unwrap_or(false))
    }

    async fn invalidate_chain(&self, user_id: Uuid, chain_id: &str) -> Result<u64, AuthError> {
        let mut rows = self.rows.lock().await;
        let mut flipped = 0;
        for row in rows
            .values_mut()
            .filter(|r| r.user_id == user_id && r.chain_id == chain_id && r.is_valid)
        {
            row.is_valid = false;
            flipped += 1;
        }
        Ok(flipped)
    }

    async fn rotate(
        &self,
        current_id: Uuid,
        replacement: &RefreshTokenRecord,
    ) -> Result<RotateOutcome, AuthError> {
        let mut rows = self.rows.lock().await;
        let Some(current) = rows.values_mut().find(|r| r.id == current_id && r.is_valid) else {
            return Ok(RotateOutcome::Stale);
        };
        current.is_valid = false;
        rows.insert(replacement.refresh_token.clone(), replacement.clone());
        Ok(RotateOutcome::Rotated)
    }

    async fn chain(
        &self,
        user_id: Uuid,
        chain_id: &str,
    ) -> Result<Vec<RefreshTokenRecord>, AuthError> {
        let rows = self.rows.lock().await;
        let mut chain: Vec<_> = rows
            .values()
            .filter(|r| r.user_id == user_id && r.chain_id == chain_id)
            .cloned()
            .collect();
        chain.sort_by_key(|r| (r.created_at, r.id));
        Ok(chain)
    }
}
