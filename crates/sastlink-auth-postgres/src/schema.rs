//! Table definitions.
//!
//! Every statement is idempotent, so `ensure` can run on each startup.

use sqlx_core::query::query;

use crate::{PgPool, StorageResult};

const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS oauth_client (
        id              TEXT PRIMARY KEY,
        secret          TEXT,
        redirect_domain TEXT NOT NULL,
        created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS oauth_authorization_code (
        code         TEXT PRIMARY KEY,
        client_id    TEXT NOT NULL,
        user_id      TEXT NOT NULL,
        redirect_uri TEXT NOT NULL,
        scope        TEXT,
        created_at   TIMESTAMPTZ NOT NULL,
        expires_at   TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS oauth_authorization_code_expires_at_idx
        ON oauth_authorization_code (expires_at)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS http_session (
        id         TEXT PRIMARY KEY,
        data       JSONB NOT NULL DEFAULT '{}'::jsonb,
        expires_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS http_session_expires_at_idx
        ON http_session (expires_at)
    "#,
];

/// Creates all tables and indexes that do not exist yet.
pub(crate) async fn ensure(pool: &PgPool) -> StorageResult<()> {
    for statement in STATEMENTS {
        query(statement).execute(pool).await?;
    }
    tracing::info!("Auth storage schema is up to date");
    Ok(())
}
