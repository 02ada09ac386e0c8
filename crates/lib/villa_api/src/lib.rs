//! # villa_api
//!
//! HTTP API library for Magic Villa: login, registration and the rotating
//! refresh-token session endpoints.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use villa_core::auth::AuthService;

use crate::config::ApiConfig;
use crate::handlers::users;

pub const POST_USERS_LOGIN: &str = "/api/users/login";
pub const POST_USERS_REGISTER: &str = "/api/users/register";
pub const POST_USERS_REFRESH: &str = "/api/users/refresh";
pub const POST_USERS_REVOKE: &str = "/api/users/revoke";
pub const GET_USERS_ME: &str = "/api/users/me";

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    /// API configuration.
    pub config: ApiConfig,
}

impl AppState {
    /// State backed by PostgreSQL.
    pub fn postgres(config: ApiConfig, pool: PgPool) -> Self {
        Self {
            auth: Arc::new(AuthService::postgres(&config.auth, pool)),
            config,
        }
    }

    /// State backed by process-local stores; sessions do not survive a restart.
    pub fn in_memory(config: ApiConfig) -> Self {
        Self {
            auth: Arc::new(AuthService::in_memory(&config.auth)),
            config,
        }
    }
}

/// Run embedded database migrations.
///
/// Delegates to `villa_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    villa_core::migrate::migrate(pool).await
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no auth required)
    let public = Router::new()
        .route(POST_USERS_LOGIN, post(users::login_handler))
        .route(POST_USERS_REGISTER, post(users::register_handler))
        .route(POST_USERS_REFRESH, post(users::refresh_handler))
        .route(POST_USERS_REVOKE, post(users::revoke_handler));

    // Protected routes (require auth)
    let protected = Router::new()
        .route(GET_USERS_ME, get(users::me_handler))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
