//! Authentication and session logic.
//!
//! Password hashing, access-token signing, the refresh-token ledger and the
//! rotation protocol, shared by `villa_api` and `villa_api_client`.

pub mod config;
pub mod credentials;
pub mod issuer;
pub mod jwt;
pub mod ledger;
pub mod password;
pub mod queries;
pub mod refresh;
pub mod service;

use thiserror::Error;

pub use config::AuthConfig;
pub use credentials::{CredentialStore, MemoryCredentialStore};
pub use issuer::TokenIssuer;
pub use ledger::{MemoryLedger, RotateOutcome, TokenLedger};
pub use queries::{PgCredentialStore, PgLedger};
pub use refresh::{RefreshOutcome, RefreshProtocol, RejectReason};
pub use service::{AuthService, Registration};

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Username already exists")]
    DuplicateUser,

    #[error("Refresh rejected: {0}")]
    Rejected(RejectReason),

    #[error("Token error: {0}")]
    TokenError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DbError(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
