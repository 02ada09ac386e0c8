//! Reading access-token claims on the client.
//!
//! The client never holds the signing key; it only decodes the payload
//! segment to rebuild the local session identity.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

use crate::error::{ClientError, Result};
use crate::models::SessionUser;

#[derive(Debug, Deserialize)]
struct IdentityClaims {
    unique_name: String,
    #[serde(default)]
    role: String,
}

/// Decode `unique_name` and `role` from an access token without verifying it.
pub fn session_user(access_token: &str) -> Result<SessionUser> {
    let mut segments = access_token.split('.');
    let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => return Err(ClientError::Token("expected three segments".into())),
    };
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| ClientError::Token(format!("payload is not base64url: {e}")))?;
    let claims: IdentityClaims = serde_json::from_slice(&bytes)
        .map_err(|e| ClientError::Token(format!("payload is not a claim set: {e}")))?;
    Ok(SessionUser {
        name: claims.unique_name,
        role: claims.role,
    })
}
