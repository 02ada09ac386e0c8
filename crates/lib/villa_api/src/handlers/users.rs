//! User session request handlers.

use axum::extract::State;
use axum::{Extension, Json};
use axum_extra::extract::CookieJar;
use villa_core::auth::Registration;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{ApiResponse, LoginRequest, RegistrationRequest, SessionUser, TokenPair, UserDto};
use crate::services::cookies;

/// `POST /api/users/login`: authenticate with username + password.
pub async fn login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> AppResult<(CookieJar, Json<ApiResponse<TokenPair>>)> {
    let pair = state.auth.login(&body.user_name, &body.password).await?;
    Ok((cookies::store_tokens(jar, &pair, state.config.secure_cookies), Json(ApiResponse::ok(pair))))
}

/// `POST /api/users/register`: create a new user account.
pub async fn register_handler(
    State(state): State<AppState>,
    Json(body): Json<RegistrationRequest>,
) -> AppResult<Json<ApiResponse<UserDto>>> {
    let user = state
        .auth
        .register(Registration {
            user_name: body.user_name,
            name: body.name,
            password: body.password,
            role: body.role,
        })
        .await?;
    Ok(Json(ApiResponse::ok(user.into())))
}

/// `POST /api/users/refresh`: exchange a token pair for a rotated one.
pub async fn refresh_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<TokenPair>,
) -> AppResult<(CookieJar, Json<ApiResponse<TokenPair>>)> {
    if body.access_token.is_empty() || body.refresh_token.is_empty() {
        return Err(AppError::Validation("Invalid Input".into()));
    }
    let pair = state.auth.refresh(&body).await?.into_result()?;
    Ok((cookies::store_tokens(jar, &pair, state.config.secure_cookies), Json(ApiResponse::ok(pair))))
}

/// `POST /api/users/revoke`: end the session chain of a token pair.
pub async fn revoke_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<TokenPair>,
) -> AppResult<(CookieJar, Json<ApiResponse<()>>)> {
    state.auth.revoke(&body).await?;
    Ok((cookies::clear_tokens(jar, state.config.secure_cookies), Json(ApiResponse::ok(()))))
}

/// `GET /api/users/me`: the session identity of the bearer token.
pub async fn me_handler(
    Extension(AuthenticatedUser(claims)): Extension<AuthenticatedUser>,
) -> Json<ApiResponse<SessionUser>> {
    Json(ApiResponse::ok(SessionUser::from(&claims)))
}
