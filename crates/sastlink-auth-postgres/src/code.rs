//! Authorization code storage.
//!
//! Consumption is a single `DELETE ... RETURNING`, so two concurrent
//! exchanges of the same code cannot both succeed.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use time::OffsetDateTime;

use sastlink_auth::oauth::AuthorizationCode;
use sastlink_auth::storage::AuthorizationCodeStorage;
use sastlink_auth::{AuthError, AuthResult};

use crate::{PgPool, StorageError};

type CodeRow = (
    String,
    String,
    String,
    String,
    Option<String>,
    OffsetDateTime,
    OffsetDateTime,
);

fn from_row(row: CodeRow) -> AuthorizationCode {
    AuthorizationCode {
        code: row.0,
        client_id: row.1,
        user_id: row.2,
        redirect_uri: row.3,
        scope: row.4,
        created_at: row.5,
        expires_at: row.6,
    }
}

/// PostgreSQL implementation of [`AuthorizationCodeStorage`].
#[derive(Debug, Clone)]
pub struct PostgresCodeStorage {
    pool: Arc<PgPool>,
}

impl PostgresCodeStorage {
    /// Create a new PostgreSQL code storage.
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthorizationCodeStorage for PostgresCodeStorage {
    async fn create(&self, code: &AuthorizationCode) -> AuthResult<()> {
        query(
            r#"
            INSERT INTO oauth_authorization_code
                (code, client_id, user_id, redirect_uri, scope, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&code.code)
        .bind(&code.client_id)
        .bind(&code.user_id)
        .bind(&code.redirect_uri)
        .bind(code.scope.as_deref())
        .bind(code.created_at)
        .bind(code.expires_at)
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| StorageError::from_insert(e, || "authorization code collision".to_string()))
        .map_err(|e| match e {
            StorageError::Conflict(message) => AuthError::internal(message),
            other => AuthError::from(other),
        })?;

        Ok(())
    }

    async fn consume(&self, code: &str) -> AuthResult<Option<AuthorizationCode>> {
        let row: Option<CodeRow> = query_as(
            r#"
            DELETE FROM oauth_authorization_code
            WHERE code = $1
            RETURNING code, client_id, user_id, redirect_uri, scope, created_at, expires_at
            "#,
        )
        .bind(code)
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(StorageError::from)?;

        Ok(row.map(from_row).filter(|stored| !stored.is_expired()))
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        let result = query(
            r#"
            DELETE FROM oauth_authorization_code
            WHERE expires_at < NOW()
            "#,
        )
        .execute(self.pool.as_ref())
        .await
        .map_err(StorageError::from)?;

        Ok(result.rows_affected())
    }
}
