//! OAuth client storage.
//!
//! One row per client in `oauth_client`. The primary key makes creation
//! atomic: a second insert with the same id fails with a unique violation,
//! which is reported as `AuthError::DuplicateClient`.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;

use sastlink_auth::storage::ClientStorage;
use sastlink_auth::types::Client;
use sastlink_auth::{AuthError, AuthResult};

use crate::{PgPool, StorageError};

/// PostgreSQL implementation of [`ClientStorage`].
#[derive(Debug, Clone)]
pub struct PostgresClientStorage {
    pool: Arc<PgPool>,
}

impl PostgresClientStorage {
    /// Create a new PostgreSQL client storage.
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClientStorage for PostgresClientStorage {
    async fn find_by_id(&self, client_id: &str) -> AuthResult<Option<Client>> {
        let row: Option<(String, Option<String>, String)> = query_as(
            r#"
            SELECT id, secret, redirect_domain
            FROM oauth_client
            WHERE id = $1
            "#,
        )
        .bind(client_id)
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(StorageError::from)?;

        Ok(row.map(|(id, secret, redirect_domain)| Client {
            id,
            secret,
            redirect_domain,
        }))
    }

    async fn create(&self, client: &Client) -> AuthResult<()> {
        query(
            r#"
            INSERT INTO oauth_client (id, secret, redirect_domain, created_at)
            VALUES ($1, $2, $3, NOW())
            "#,
        )
        .bind(&client.id)
        .bind(client.secret.as_deref())
        .bind(&client.redirect_domain)
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| {
            StorageError::from_insert(e, || format!("client '{}' already exists", client.id))
        })
        .map_err(|e| match e {
            StorageError::Conflict(_) => AuthError::duplicate_client(&client.id),
            other => AuthError::from(other),
        })?;

        Ok(())
    }
}
