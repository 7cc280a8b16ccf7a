//! Browser session storage.
//!
//! Session slots are kept as one JSONB object per session. A slot write is a
//! single upsert that touches only its own key. A take locks the row, removes
//! the key and returns the old value in one statement, so two requests on the
//! same session never both see a slot.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use time::OffsetDateTime;

use sastlink_auth::AuthResult;
use sastlink_auth::storage::{SessionRecord, SessionStorage};

use crate::{PgPool, StorageError, StorageResult};

/// PostgreSQL implementation of [`SessionStorage`].
#[derive(Debug, Clone)]
pub struct PostgresSessionStorage {
    pool: Arc<PgPool>,
}

impl PostgresSessionStorage {
    /// Create a new PostgreSQL session storage.
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

/// Converts the `data` column back into session slots.
fn values_from_column(id: &str, data: Value) -> StorageResult<Map<String, Value>> {
    match data {
        Value::Object(values) => Ok(values),
        Value::Null => Ok(Map::new()),
        other => Err(StorageError::corrupt_row(format!(
            "http_session '{id}' data is not an object (found {})",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[async_trait]
impl SessionStorage for PostgresSessionStorage {
    async fn load(&self, id: &str) -> AuthResult<Option<SessionRecord>> {
        let row: Option<(String, Value, OffsetDateTime)> = query_as(
            r#"
            SELECT id, data, expires_at
            FROM http_session
            WHERE id = $1
              AND expires_at > NOW()
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(StorageError::from)?;

        let Some((id, data, expires_at)) = row else {
            return Ok(None);
        };

        Ok(Some(SessionRecord {
            values: values_from_column(&id, data)?,
            id,
            expires_at,
        }))
    }

    async fn set_slot(
        &self,
        id: &str,
        slot: &str,
        value: Value,
        expires_at: OffsetDateTime,
    ) -> AuthResult<()> {
        // An expired row is started over rather than revived.
        query(
            r#"
            INSERT INTO http_session (id, data, expires_at)
            VALUES ($1, jsonb_build_object($2::text, $3::jsonb), $4)
            ON CONFLICT (id) DO UPDATE
                SET data = jsonb_set(
                        CASE WHEN http_session.expires_at > NOW()
                             THEN http_session.data
                             ELSE '{}'::jsonb
                        END,
                        ARRAY[$2::text],
                        $3::jsonb
                    ),
                    expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(id)
        .bind(slot)
        .bind(value)
        .bind(expires_at)
        .execute(self.pool.as_ref())
        .await
        .map_err(StorageError::from)?;

        Ok(())
    }

    async fn take_slot(&self, id: &str, slot: &str) -> AuthResult<Option<Value>> {
        let row: Option<(Value,)> = query_as(
            r#"
            WITH taken AS (
                SELECT id, data -> $2::text AS value
                FROM http_session
                WHERE id = $1
                  AND expires_at > NOW()
                  AND data ? $2::text
                FOR UPDATE
            )
            UPDATE http_session s
            SET data = s.data - $2::text
            FROM taken
            WHERE s.id = taken.id
            RETURNING taken.value
            "#,
        )
        .bind(id)
        .bind(slot)
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(StorageError::from)?;

        Ok(row.map(|(value,)| value))
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        let result = query("DELETE FROM http_session WHERE expires_at < NOW()")
            .execute(self.pool.as_ref())
            .await
            .map_err(StorageError::from)?;

        let deleted = result.rows_affected();
        if deleted > 0 {
            tracing::info!(deleted = deleted, "Cleaned up expired browser sessions");
        }
        Ok(deleted)
    }
}
