//! Authentication configuration.

/// Default `iss` claim.
pub const DEFAULT_ISSUER: &str = "https://magicvilla-api.com";

/// Default `aud` claim.
pub const DEFAULT_AUDIENCE: &str = "https://test-magic-api.com";

/// Access token lifetime: 60 minutes.
pub const DEFAULT_ACCESS_TOKEN_TTL_SECS: i64 = 60 * 60;

/// Refresh token lifetime: 30 days.
pub const DEFAULT_REFRESH_TOKEN_TTL_SECS: i64 = 30 * 24 * 60 * 60;

/// Process-wide token settings, loaded once at startup.
#[derive(Clone)]
pub struct AuthConfig {
    /// HMAC-SHA256 signing secret.
    pub jwt_secret: String,
    /// `iss` claim written to and required from access tokens.
    pub issuer: String,
    /// `aud` claim written to and required from access tokens.
    pub audience: String,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
}

impl AuthConfig {
    /// Config with the default issuer, audience and lifetimes.
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            issuer: DEFAULT_ISSUER.into(),
            audience: DEFAULT_AUDIENCE.into(),
            access_token_ttl_secs: DEFAULT_ACCESS_TOKEN_TTL_SECS,
            refresh_token_ttl_secs: DEFAULT_REFRESH_TOKEN_TTL_SECS,
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("access_token_ttl_secs", &self.access_token_ttl_secs)
            .field("refresh_token_ttl_secs", &self.refresh_token_ttl_secs)
            .finish()
    }
}
