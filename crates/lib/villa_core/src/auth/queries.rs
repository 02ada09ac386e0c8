//! PostgreSQL-backed credential store and token ledger.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::AuthError;
use super::credentials::CredentialStore;
use super::ledger::{RotateOutcome, TokenLedger};
use crate::models::auth::{NewUser, Principal, RefreshTokenRecord, UserWithPassword};

type UserRow = (Uuid, String, String, String, String);

type RefreshTokenRow = (Uuid, String, Uuid, String, bool, DateTime<Utc>, DateTime<Utc>);

const REFRESH_TOKEN_COLUMNS: &str =
    "id, refresh_token, user_id, jwt_token_id, is_valid, created_at, expires_at";

fn record_from_row(row: RefreshTokenRow) -> RefreshTokenRecord {
    let (id, refresh_token, user_id, chain_id, is_valid, created_at, expires_at) = row;
    RefreshTokenRecord {
        id,
        refresh_token,
        user_id,
        chain_id,
        is_valid,
        created_at,
        expires_at,
    }
}

/// Credential store over the `users` and `user_roles` tables.
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn roles(&self, user_id: Uuid) -> Result<Vec<String>, AuthError> {
        let rows = sqlx::query_scalar::<_, String>(
            "SELECT role FROM user_roles WHERE user_id = $1 ORDER BY role",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn with_roles(&self, row: UserRow) -> Result<UserWithPassword, AuthError> {
        let (id, user_name, name, normalized_email, password_hash) = row;
        let roles = self.roles(id).await?;
        Ok(UserWithPassword {
            principal: Principal {
                id,
                user_name,
                name,
                normalized_email,
                roles,
            },
            password_hash,
        })
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_user_name(
        &self,
        user_name: &str,
    ) -> Result<Option<UserWithPassword>, AuthError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, user_name, name, normalized_email, password_hash \
             FROM users WHERE lower(user_name) = lower($1)",
        )
        .bind(user_name)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => Ok(Some(self.with_roles(row).await?)),
            None => Ok(None),
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Principal>, AuthError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, user_name, name, normalized_email, password_hash \
             FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => Ok(Some(self.with_roles(row).await?.principal)),
            None => Ok(None),
        }
    }

    async fn user_name_exists(&self, user_name: &str) -> Result<bool, AuthError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE lower(user_name) = lower($1))",
        )
        .bind(user_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn create_user(&self, user: NewUser) -> Result<Principal, AuthError> {
        let normalized_email = user.user_name.to_uppercase();
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO users (user_name, name, normalized_email, password_hash) \
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(&user.user_name)
        .bind(&user.name)
        .bind(&normalized_email)
        .bind(&user.password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => AuthError::DuplicateUser,
            other => AuthError::DbError(other),
        })?;

        sqlx::query("INSERT INTO user_roles (user_id, role) VALUES ($1, $2)")
            .bind(id)
            .bind(&user.role)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Principal {
            id,
            user_name: user.user_name,
            name: user.name,
            normalized_email,
            roles: vec![user.role],
        })
    }
}

/// Token ledger over the `refresh_tokens` table.
#[derive(Clone)]
pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn insert_record<'e, E>(executor: E, record: &RefreshTokenRecord) -> Result<(), sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(
        "INSERT INTO refresh_tokens \
         (id, refresh_token, user_id, jwt_token_id, is_valid, created_at, expires_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(record.id)
    .bind(&record.refresh_token)
    .bind(record.user_id)
    .bind(&record.chain_id)
    .bind(record.is_valid)
    .bind(record.created_at)
    .bind(record.expires_at)
    .execute(executor)
    .await?;
    Ok(())
}

#[async_trait]
impl TokenLedger for PgLedger {
    async fn insert(&self, record: &RefreshTokenRecord) -> Result<(), AuthError> {
        insert_record(&self.pool, record).await?;
        Ok(())
    }

    async fn find_by_token(
        &self,
        refresh_token: &str,
    ) -> Result<Option<RefreshTokenRecord>, AuthError> {
        let row = sqlx::query_as::<_, RefreshTokenRow>(&format!(
            "SELECT {REFRESH_TOKEN_COLUMNS} FROM refresh_tokens WHERE refresh_token = $1"
        ))
        .bind(refresh_token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(record_from_row))
    }

    async fn invalidate(&self, id: Uuid) -> Result<bool, AuthError> {
        let result =
            sqlx::query("UPDATE refresh_tokens SET is_valid = FALSE WHERE id = $1 AND is_valid")
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn invalidate_chain(&self, user_id: Uuid, chain_id: &str) -> Result<u64, AuthError> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET is_valid = FALSE \
             WHERE user_id = $1 AND jwt_token_id = $2 AND is_valid",
        )
        .bind(user_id)
        .bind(chain_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn rotate(
        &self,
        current_id: Uuid,
        replacement: &RefreshTokenRecord,
    ) -> Result<RotateOutcome, AuthError> {
        let mut tx = self.pool.begin().await?;

        // Compare-and-swap: only one concurrent caller sees the row as valid.
        let swapped =
            sqlx::query("UPDATE refresh_tokens SET is_valid = FALSE WHERE id = $1 AND is_valid")
                .bind(current_id)
                .execute(&mut *tx)
                .await?;
        if swapped.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(RotateOutcome::Stale);
        }

        insert_record(&mut *tx, replacement).await?;
        tx.commit().await?;
        Ok(RotateOutcome::Rotated)
    }

    async fn chain(
        &self,
        user_id: Uuid,
        chain_id: &str,
    ) -> Result<Vec<RefreshTokenRecord>, AuthError> {
        let rows = sqlx::query_as::<_, RefreshTokenRow>(&format!(
            "SELECT {REFRESH_TOKEN_COLUMNS} FROM refresh_tokens \
             WHERE user_id = $1 AND jwt_token_id = $2 \
             ORDER BY created_at, id"
        ))
        .bind(user_id)
        .bind(chain_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(record_from_row).collect())
    }
}
