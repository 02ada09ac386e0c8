//! Token issuance: access token + companion refresh token on login.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::debug;
use uuid::Uuid;

use super::AuthError;
use super::config::AuthConfig;
use super::jwt::{JwtSigner, new_chain_id};
use super::ledger::TokenLedger;
use crate::models::auth::{Principal, RefreshTokenRecord, TokenPair};
use crate::uuid::uuidv7;

/// Generate an opaque refresh token value (two random UUIDs).
pub fn generate_refresh_token() -> String {
    format!("{}-{}", Uuid::new_v4(), Uuid::new_v4())
}

/// Mints access tokens and records their refresh tokens in the ledger.
pub struct TokenIssuer {
    signer: JwtSigner,
    ledger: Arc<dyn TokenLedger>,
    refresh_token_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig, ledger: Arc<dyn TokenLedger>) -> Self {
        Self {
            signer: JwtSigner::new(config),
            ledger,
            refresh_token_ttl: Duration::seconds(config.refresh_token_ttl_secs),
        }
    }

    pub fn signer(&self) -> &JwtSigner {
        &self.signer
    }

    pub fn ledger(&self) -> &Arc<dyn TokenLedger> {
        &self.ledger
    }

    /// Start a new chain for `principal`: sign an access token and persist
    /// its refresh token.
    pub async fn issue(&self, principal: &Principal) -> Result<TokenPair, AuthError> {
        let chain_id = new_chain_id();
        let access_token = self.signer.sign(principal, &chain_id)?;
        let record = self.new_refresh_record(principal.id, &chain_id);
        self.ledger.insert(&record).await?;

        debug!(user_id = %principal.id, chain_id = %chain_id, "issued token pair");
        Ok(TokenPair::new(access_token, record.refresh_token))
    }

    /// A fresh, valid ledger row for an existing or new chain. Not persisted.
    pub fn new_refresh_record(&self, user_id: Uuid, chain_id: &str) -> RefreshTokenRecord {
        let now = Utc::now();
        RefreshTokenRecord {
            id: uuidv7(),
            refresh_token: generate_refresh_token(),
            user_id,
            chain_id: chain_id.to_string(),
            is_valid: true,
            created_at: now,
            expires_at: now + self.refresh_token_ttl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::read_unverified_claims;
    use crate::auth::ledger::MemoryLedger;
    use crate::models::auth::ROLE_CUSTOMER;

    fn principal() -> Principal {
        Principal {
            id: Uuid::new_v4(),
            user_name: "a".into(),
            name: "A".into(),
            normalized_email: "A".into(),
            roles: vec![ROLE_CUSTOMER.into()],
        }
    }

    #[tokio::test]
    async fn issue_persists_a_valid_row_for_the_new_chain() {
        let ledger = Arc::new(MemoryLedger::new());
        let issuer = TokenIssuer::new(&AuthConfig::new("s"), ledger.clone());
        let p = principal();

        let pair = issuer.issue(&p).await.unwrap();
        let claims = issuer.signer().verify(&pair.access_token).unwrap();
        assert_eq!(claims.sub, p.id.to_string());
        assert_eq!(claims.role, ROLE_CUSTOMER);

        let row = ledger
            .find_by_token(&pair.refresh_token)
            .await
            .unwrap()
            .expect("row persisted");
        assert!(row.is_valid);
        assert_eq!(row.user_id, p.id);
        assert_eq!(row.chain_id, claims.jti);
        assert!(row.expires_at > Utc::now() + Duration::days(29));
    }

    #[tokio::test]
    async fn each_login_starts_its_own_chain() {
        let issuer = TokenIssuer::new(&AuthConfig::new("s"), Arc::new(MemoryLedger::new()));
        let p = principal();
        let a = issuer.issue(&p).await.unwrap();
        let b = issuer.issue(&p).await.unwrap();

        assert_ne!(a.refresh_token, b.refresh_token);
        assert_ne!(
            read_unverified_claims(&a.access_token).unwrap().jti,
            read_unverified_claims(&b.access_token).unwrap().jti
        );
    }

    #[test]
    fn refresh_token_is_two_uuids() {
        let token = generate_refresh_token();
        assert_eq!(token.len(), 73);
        assert_ne!(token, generate_refresh_token());
    }
}
