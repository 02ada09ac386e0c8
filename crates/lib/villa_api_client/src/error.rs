//! Client error types.

use reqwest::StatusCode;
use thiserror::Error;

/// Convenience alias for client results.
pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The session could not be refreshed; stored credentials were cleared.
    /// Callers must sign in again rather than retry.
    #[error("Authentication failed, sign in again")]
    AuthFailed,

    /// The request was still unauthorized after a successful refresh.
    #[error("Unauthorized")]
    Unauthorized,

    /// No stored session for an operation that needs one.
    #[error("Not signed in")]
    NotSignedIn,

    /// The API answered with an unsuccessful envelope.
    #[error("API error ({status}): {}", messages.join("; "))]
    Api {
        status: StatusCode,
        messages: Vec<String>,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Malformed token: {0}")]
    Token(String),

    #[error("Token storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    /// Whether this error ends the session.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            ClientError::AuthFailed | ClientError::Unauthorized | ClientError::NotSignedIn
        )
    }
}
