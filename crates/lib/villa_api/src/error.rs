//! Application error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;
use villa_core::auth::AuthError;

use crate::models::ApiResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::Validation(m) | AppError::Unauthorized(m) => m,
            AppError::Internal(m) => {
                error!(error = %m, "request failed");
                "Internal server error".to_string()
            }
        };
        (status, Json(ApiResponse::<()>::error(status, message))).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials => {
                AppError::Validation("Username or password is incorrect".into())
            }
            AuthError::DuplicateUser => AppError::Validation("Username already exists".into()),
            AuthError::Rejected(reason) => AppError::Validation(format!("Invalid token: {reason}")),
            AuthError::TokenError(msg) => AppError::Unauthorized(msg),
            AuthError::ValidationError(msg) => AppError::Validation(msg),
            AuthError::DbError(e) => AppError::Internal(e.to_string()),
            AuthError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use villa_core::auth::RejectReason;

    #[test]
    fn auth_errors_map_to_statuses() {
        assert_eq!(
            AppError::from(AuthError::InvalidCredentials).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(AuthError::Rejected(RejectReason::ReuseDetected)).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(AuthError::TokenError("expired".into())).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::from(AuthError::DbError(sqlx::Error::PoolClosed)).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
