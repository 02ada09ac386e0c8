//! JWT access token signing and verification.

use std::path::PathBuf;

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use tracing::info;
use uuid::Uuid;

use super::AuthError;
use super::config::AuthConfig;
use crate::models::auth::{Principal, TokenClaims};

/// Generate a fresh token-chain ID (`JTI` + random UUID).
pub fn new_chain_id() -> String {
    format!("JTI{}", Uuid::new_v4())
}

/// Signs and verifies HS256 access tokens with the server-held secret.
#[derive(Clone)]
pub struct JwtSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    access_token_ttl: Duration,
}

impl JwtSigner {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            access_token_ttl: Duration::seconds(config.access_token_ttl_secs),
        }
    }

    /// Mint an access token for `principal` bound to `chain_id`.
    pub fn sign(&self, principal: &Principal, chain_id: &str) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = TokenClaims {
            sub: principal.id.to_string(),
            unique_name: principal.user_name.clone(),
            role: principal.primary_role().unwrap_or_default().to_string(),
            jti: chain_id.to_string(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: (now + self.access_token_ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenError(format!("jwt encode: {e}")))
    }

    /// Verify signature, expiry, issuer and audience; return the claims.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);
        validation.leeway = 0;

        decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenError("token expired".into()),
                _ => AuthError::TokenError(format!("invalid token: {e}")),
            })
    }
}

/// Read access-token claims without checking signature, expiry or audience.
///
/// Used where the token is expected to be expired already (refresh, revoke)
/// and by clients rebuilding their session identity.
pub fn read_unverified_claims(token: &str) -> Result<TokenClaims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<TokenClaims>(token, &DecodingKey::from_secret(b""), &validation)
        .map(|data| data.claims)
        .map_err(|e| AuthError::TokenError(format!("malformed token: {e}")))
}

/// Resolve the JWT secret: env var `JWT_SECRET` → `API_SECRET` → persisted file.
pub fn resolve_jwt_secret() -> String {
    if let Ok(secret) = std::env::var("JWT_SECRET")
        && !secret.is_empty()
    {
        return secret;
    }
    if let Ok(secret) = std::env::var("API_SECRET")
        && !secret.is_empty()
    {
        return secret;
    }
    let secret_path = jwt_secret_path();
    if let Ok(existing) = std::fs::read_to_string(&secret_path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    let secret: String = rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();
    if let Some(parent) = secret_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = std::fs::write(&secret_path, &secret);
    info!(path = %secret_path.display(), "generated new JWT secret");
    secret
}

/// Path to the persisted JWT secret file.
fn jwt_secret_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("magic_villa")
        .join("jwt-secret")
}
