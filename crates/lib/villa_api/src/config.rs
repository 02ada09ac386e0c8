//! API server configuration.

use villa_core::auth::AuthConfig;
use villa_core::auth::config::{
    DEFAULT_ACCESS_TOKEN_TTL_SECS, DEFAULT_AUDIENCE, DEFAULT_ISSUER,
    DEFAULT_REFRESH_TOKEN_TTL_SECS,
};
use villa_core::auth::jwt::resolve_jwt_secret;

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:7001").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub pg_connection_url: String,
    /// Token signing and lifetime settings.
    pub auth: AuthConfig,
    /// Mark session cookies `Secure`. Enable when clients reach the API over HTTPS.
    pub secure_cookies: bool,
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                 | Default                                  |
    /// |--------------------------|------------------------------------------|
    /// | `BIND_ADDR`              | `127.0.0.1:7001`                         |
    /// | `DATABASE_URL`           | `postgres://localhost:5432/magic_villa`  |
    /// | `JWT_SECRET` / `API_SECRET` | generated & persisted to file         |
    /// | `JWT_ISSUER`             | `https://magicvilla-api.com`             |
    /// | `JWT_AUDIENCE`           | `https://test-magic-api.com`             |
    /// | `ACCESS_TOKEN_TTL_SECS`  | `3600`                                   |
    /// | `REFRESH_TOKEN_TTL_SECS` | `2592000` (30 days)                      |
    /// | `COOKIE_SECURE`          | `false`                                  |
    pub fn from_env() -> Self {
        Self {
            bind_addr: env_or("BIND_ADDR", "127.0.0.1:7001"),
            pg_connection_url: env_or("DATABASE_URL", "postgres://localhost:5432/magic_villa"),
            auth: AuthConfig {
                jwt_secret: resolve_jwt_secret(),
                issuer: env_or("JWT_ISSUER", DEFAULT_ISSUER),
                audience: env_or("JWT_AUDIENCE", DEFAULT_AUDIENCE),
                access_token_ttl_secs: env_secs("ACCESS_TOKEN_TTL_SECS")
                    .unwrap_or(DEFAULT_ACCESS_TOKEN_TTL_SECS),
                refresh_token_ttl_secs: env_secs("REFRESH_TOKEN_TTL_SECS")
                    .unwrap_or(DEFAULT_REFRESH_TOKEN_TTL_SECS),
            },
            secure_cookies: env_flag("COOKIE_SECURE"),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn env_secs(key: &str) -> Option<i64> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn env_flag(key: &str) -> bool {
    std::env::var(key).is_ok_and(|v| parse_flag(&v))
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_accept_common_truthy_spellings() {
        for v in ["1", "true", "TRUE", " yes ", "on"] {
            assert!(parse_flag(v), "{v:?}");
        }
        for v in ["", "0", "false", "off", "nope"] {
            assert!(!parse_flag(v), "{v:?}");
        }
    }
}
