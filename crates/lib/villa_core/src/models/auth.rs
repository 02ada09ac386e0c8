//! Authentication domain models.
//!
//! `TokenPair` and `TokenClaims` cross the client/server boundary and are
//! shared by `villa_api` and `villa_api_client`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role granted to staff accounts.
pub const ROLE_ADMIN: &str = "admin";
/// Role granted when registration does not name one.
pub const ROLE_CUSTOMER: &str = "customer";

/// Authenticated identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: Uuid,
    pub user_name: String,
    pub name: String,
    pub normalized_email: String,
    pub roles: Vec<String>,
}

impl Principal {
    /// The role asserted in access tokens (first granted role).
    pub fn primary_role(&self) -> Option<&str> {
        self.roles.first().map(String::as_str)
    }
}

/// Principal with password hash (for internal auth flows).
#[derive(Debug, Clone)]
pub struct UserWithPassword {
    pub principal: Principal,
    pub password_hash: String,
}

/// Input for creating a user in a credential store.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub user_name: String,
    pub name: String,
    pub password_hash: String,
    pub role: String,
}

/// Refresh token ledger row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTokenRecord {
    pub id: Uuid,
    /// The opaque credential handed to the client.
    pub refresh_token: String,
    pub user_id: Uuid,
    /// `jti` of the access token this row was issued alongside.
    pub chain_id: String,
    pub is_valid: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// Access/refresh token pair handed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

/// JWT claims embedded in access tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user ID).
    pub sub: String,
    /// Username, used to rebuild the client-side session identity.
    pub unique_name: String,
    /// Primary role.
    pub role: String,
    /// Token-chain ID shared by every rotation of one login session.
    pub jti: String,
    pub iss: String,
    pub aud: String,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Not before (unix timestamp).
    pub nbf: i64,
    /// Expiry (unix timestamp).
    pub exp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(roles: &[&str]) -> Principal {
        Principal {
            id: Uuid::new_v4(),
            user_name: "a".into(),
            name: "A".into(),
            normalized_email: "A".into(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }

    #[test]
    fn primary_role_is_first_granted() {
        assert_eq!(
            principal(&[ROLE_ADMIN, ROLE_CUSTOMER]).primary_role(),
            Some(ROLE_ADMIN)
        );
        assert_eq!(principal(&[]).primary_role(), None);
    }

    #[test]
    fn token_pair_uses_camel_case() {
        let json = serde_json::to_value(TokenPair::new("a", "r")).unwrap();
        assert_eq!(json["accessToken"], "a");
        assert_eq!(json["refreshToken"], "r");
    }

    #[test]
    fn record_expiry_is_strict() {
        let now = Utc::now();
        let record = RefreshTokenRecord {
            id: Uuid::new_v4(),
            refresh_token: "r".into(),
            user_id: Uuid::new_v4(),
            chain_id: "JTIx".into(),
            is_valid: true,
            created_at: now,
            expires_at: now,
        };
        assert!(!record.is_expired_at(now));
        assert!(record.is_expired_at(now + chrono::Duration::seconds(1)));
    }
}
