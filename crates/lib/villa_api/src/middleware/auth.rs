//! Authentication middleware: bearer token extraction and JWT verification.

use axum::http::header::AUTHORIZATION;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::debug;
use villa_core::models::auth::TokenClaims;

use crate::AppState;
use crate::error::AppError;

/// Key used to store `TokenClaims` in request extensions.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub TokenClaims);

/// Axum middleware: extracts `Authorization: Bearer <token>`, verifies the JWT,
/// and injects `AuthenticatedUser` into request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".into()))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization scheme".into()))?;

    let claims = state.auth.validate_access_token(token).map_err(|e| {
        debug!(error = %e, "bearer token rejected");
        AppError::Unauthorized("Invalid or expired token".into())
    })?;

    request.extensions_mut().insert(AuthenticatedUser(claims));

    Ok(next.run(request).await)
}
