//! Authentication service: login, registration and session maintenance.

use std::sync::Arc;

use sqlx::PgPool;
use tracing::{debug, info};

use super::AuthError;
use super::config::AuthConfig;
use super::credentials::{CredentialStore, MemoryCredentialStore};
use super::issuer::TokenIssuer;
use super::ledger::{MemoryLedger, TokenLedger};
use super::password::{hash_password, verify_password};
use super::queries::{PgCredentialStore, PgLedger};
use super::refresh::{RefreshOutcome, RefreshProtocol};
use crate::models::auth::{NewUser, Principal, ROLE_CUSTOMER, TokenClaims, TokenPair};

/// Input for [`AuthService::register`].
#[derive(Debug, Clone)]
pub struct Registration {
    pub user_name: String,
    pub name: String,
    pub password: String,
    /// Defaults to `customer` when absent or blank.
    pub role: Option<String>,
}

/// Entry point used by the HTTP layer.
pub struct AuthService {
    credentials: Arc<dyn CredentialStore>,
    issuer: Arc<TokenIssuer>,
    refresh: RefreshProtocol,
}

impl AuthService {
    pub fn new(
        config: &AuthConfig,
        credentials: Arc<dyn CredentialStore>,
        ledger: Arc<dyn TokenLedger>,
    ) -> Self {
        let issuer = Arc::new(TokenIssuer::new(config, ledger));
        let refresh = RefreshProtocol::new(issuer.clone(), credentials.clone());
        Self {
            credentials,
            issuer,
            refresh,
        }
    }

    /// Service backed by process-local stores.
    pub fn in_memory(config: &AuthConfig) -> Self {
        Self::new(
            config,
            Arc::new(MemoryCredentialStore::new()),
            Arc::new(MemoryLedger::new()),
        )
    }

    /// Service backed by PostgreSQL.
    pub fn postgres(config: &AuthConfig, pool: PgPool) -> Self {
        Self::new(
            config,
            Arc::new(PgCredentialStore::new(pool.clone())),
            Arc::new(PgLedger::new(pool)),
        )
    }

    /// Check username and password, then start a new token chain.
    ///
    /// Unknown users and wrong passwords fail identically and write nothing.
    pub async fn login(&self, user_name: &str, password: &str) -> Result<TokenPair, AuthError> {
        let Some(user) = self.credentials.find_by_user_name(user_name).await? else {
            debug!("login failed: unknown user");
            return Err(AuthError::InvalidCredentials);
        };
        if !verify_password(password, &user.password_hash)? {
            debug!(user_id = %user.principal.id, "login failed: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let pair = self.issuer.issue(&user.principal).await?;
        info!(user_id = %user.principal.id, "user logged in");
        Ok(pair)
    }

    pub async fn register(&self, registration: Registration) -> Result<Principal, AuthError> {
        let user_name = registration.user_name.trim();
        if user_name.is_empty() {
            return Err(AuthError::ValidationError("Username is required".into()));
        }
        if registration.password.is_empty() {
            return Err(AuthError::ValidationError("Password is required".into()));
        }
        if self.credentials.user_name_exists(user_name).await? {
            return Err(AuthError::DuplicateUser);
        }

        let role = registration
            .role
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(ROLE_CUSTOMER)
            .to_lowercase();

        let principal = self
            .credentials
            .create_user(NewUser {
                user_name: user_name.to_string(),
                name: registration.name,
                password_hash: hash_password(&registration.password)?,
                role,
            })
            .await?;
        info!(user_id = %principal.id, role = ?principal.primary_role(), "user registered");
        Ok(principal)
    }

    pub async fn refresh(&self, presented: &TokenPair) -> Result<RefreshOutcome, AuthError> {
        self.refresh.refresh(presented).await
    }

    pub async fn revoke(&self, presented: &TokenPair) -> Result<(), AuthError> {
        self.refresh.revoke(presented).await
    }

    /// Verify a bearer access token.
    pub fn validate_access_token(&self, token: &str) -> Result<TokenClaims, AuthError> {
        self.issuer.signer().verify(token)
    }
}
