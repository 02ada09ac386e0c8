//! Refresh-token rotation and revocation.
//!
//! A refresh token is single-use. Presenting one that was already consumed
//! is treated as theft and invalidates the whole chain, forcing a new login.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::AuthError;
use super::credentials::CredentialStore;
use super::issuer::TokenIssuer;
use super::jwt::read_unverified_claims;
use super::ledger::RotateOutcome;
use crate::models::auth::{RefreshTokenRecord, TokenPair};

/// Why a refresh was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// No ledger row carries this refresh token.
    Unknown,
    /// The access token does not belong to the refresh token's chain.
    Tamper,
    /// The refresh token was already consumed or revoked.
    ReuseDetected,
    Expired,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RejectReason::Unknown => "unknown refresh token",
            RejectReason::Tamper => "token pair does not match",
            RejectReason::ReuseDetected => "refresh token reuse detected",
            RejectReason::Expired => "refresh token expired",
        })
    }
}

/// Result of a refresh attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Rotated(TokenPair),
    Rejected(RejectReason),
}

impl RefreshOutcome {
    pub fn into_result(self) -> Result<TokenPair, AuthError> {
        match self {
            RefreshOutcome::Rotated(pair) => Ok(pair),
            RefreshOutcome::Rejected(reason) => Err(AuthError::Rejected(reason)),
        }
    }
}

/// Validates presented token pairs against the ledger and rotates them.
pub struct RefreshProtocol {
    issuer: Arc<TokenIssuer>,
    credentials: Arc<dyn CredentialStore>,
}

impl RefreshProtocol {
    pub fn new(issuer: Arc<TokenIssuer>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            issuer,
            credentials,
        }
    }

    /// Exchange `(access, refresh)` for a new pair on the same chain.
    ///
    /// Rejections are returned as [`RefreshOutcome::Rejected`]; only storage
    /// and signing failures are errors.
    pub async fn refresh(&self, presented: &TokenPair) -> Result<RefreshOutcome, AuthError> {
        let ledger = self.issuer.ledger();

        let Some(record) = ledger.find_by_token(&presented.refresh_token).await? else {
            debug!("refresh rejected: unknown refresh token");
            return Ok(RefreshOutcome::Rejected(RejectReason::Unknown));
        };

        if !belongs_to_chain(&presented.access_token, &record) {
            ledger.invalidate(record.id).await?;
            warn!(
                user_id = %record.user_id,
                chain_id = %record.chain_id,
                "refresh rejected: access token does not match refresh token"
            );
            return Ok(RefreshOutcome::Rejected(RejectReason::Tamper));
        }

        if !record.is_valid {
            return self.reuse_detected(&record).await;
        }

        if record.is_expired_at(Utc::now()) {
            ledger.invalidate(record.id).await?;
            debug!(user_id = %record.user_id, chain_id = %record.chain_id, "refresh rejected: expired");
            return Ok(RefreshOutcome::Rejected(RejectReason::Expired));
        }

        let Some(principal) = self.credentials.find_by_id(record.user_id).await? else {
            ledger
                .invalidate_chain(record.user_id, &record.chain_id)
                .await?;
            warn!(user_id = %record.user_id, "refresh rejected: user no longer exists");
            return Ok(RefreshOutcome::Rejected(RejectReason::Unknown));
        };

        let access_token = self.issuer.signer().sign(&principal, &record.chain_id)?;
        let replacement = self
            .issuer
            .new_refresh_record(record.user_id, &record.chain_id);

        match ledger.rotate(record.id, &replacement).await? {
            RotateOutcome::Rotated => {
                debug!(user_id = %record.user_id, chain_id = %record.chain_id, "rotated refresh token");
                Ok(RefreshOutcome::Rotated(TokenPair::new(
                    access_token,
                    replacement.refresh_token,
                )))
            }
            // Lost the race to a concurrent refresh of the same token.
            RotateOutcome::Stale => self.reuse_detected(&record).await,
        }
    }

    /// Invalidate the whole chain of a presented pair (logout).
    ///
    /// Unknown tokens and mismatched pairs are ignored.
    pub async fn revoke(&self, presented: &TokenPair) -> Result<(), AuthError> {
        let ledger = self.issuer.ledger();

        let Some(record) = ledger.find_by_token(&presented.refresh_token).await? else {
            return Ok(());
        };
        if !belongs_to_chain(&presented.access_token, &record) {
            debug!(user_id = %record.user_id, "revoke ignored: token pair does not match");
            return Ok(());
        }

        let flipped = ledger
            .invalidate_chain(record.user_id, &record.chain_id)
            .await?;
        info!(user_id = %record.user_id, chain_id = %record.chain_id, flipped, "revoked token chain");
        Ok(())
    }

    async fn reuse_detected(&self, record: &RefreshTokenRecord) -> Result<RefreshOutcome, AuthError> {
        let flipped = self
            .issuer
            .ledger()
            .invalidate_chain(record.user_id, &record.chain_id)
            .await?;
        warn!(
            user_id = %record.user_id,
            chain_id = %record.chain_id,
            flipped,
            "refresh token reuse detected, chain invalidated"
        );
        Ok(RefreshOutcome::Rejected(RejectReason::ReuseDetected))
    }
}

/// Whether the access token's `sub`/`jti` name the record's user and chain.
fn belongs_to_chain(access_token: &str, record: &RefreshTokenRecord) -> bool {
    match read_unverified_claims(access_token) {
        Ok(claims) => claims.sub == record.user_id.to_string() && claims.jti == record.chain_id,
        Err(_) => false,
    }
}
