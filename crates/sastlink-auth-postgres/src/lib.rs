//! PostgreSQL storage backend for SAST Link Auth
//!
//! Provides persistent storage for:
//!
//! - OAuth clients (`oauth_client`)
//! - Authorization codes (`oauth_authorization_code`)
//! - Browser sessions carrying the pending authorize request (`http_session`)
//!
//! Tables are created by [`PostgresAuthStorage::ensure_schema`].
//!
//! # Example
//!
//! ```ignore
//! use sastlink_auth_postgres::PostgresAuthStorage;
//!
//! let storage = PostgresAuthStorage::connect("postgres://localhost/sastlink", 10).await?;
//! storage.ensure_schema().await?;
//!
//! let clients = Arc::new(storage.clients());
//! let registry = ClientRegistry::new(clients);
//! ```

pub mod client;
pub mod code;
pub mod schema;
pub mod session;

use std::sync::Arc;

use sastlink_auth::AuthError;
use sqlx_core::pool::{Pool, PoolOptions};
use sqlx_postgres::Postgres;

/// PostgreSQL connection pool type alias.
pub type PgPool = Pool<Postgres>;

pub use client::PostgresClientStorage;
pub use code::PostgresCodeStorage;
pub use session::PostgresSessionStorage;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during auth storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx_core::Error),

    /// Resource already exists (conflict).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A stored row has an unexpected shape.
    #[error("Corrupt row: {0}")]
    CorruptRow(String),
}

impl StorageError {
    /// Create a `Conflict` error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Create a `CorruptRow` error.
    #[must_use]
    pub fn corrupt_row(message: impl Into<String>) -> Self {
        Self::CorruptRow(message.into())
    }

    /// Returns `true` if this is a `Conflict` error.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Returns `true` if this is a database error.
    #[must_use]
    pub fn is_database_error(&self) -> bool {
        matches!(self, Self::Database(_))
    }

    /// Classifies a database error, turning unique violations into `Conflict`.
    pub(crate) fn from_insert(err: sqlx_core::Error, conflict: impl FnOnce() -> String) -> Self {
        if let sqlx_core::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return Self::conflict(conflict());
        }
        Self::from(err)
    }
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        let message = match &err {
            StorageError::Database(_) => "database operation failed",
            StorageError::Conflict(_) => "record already exists",
            StorageError::CorruptRow(_) => "stored row is corrupt",
        };
        AuthError::storage_with_source(message, err)
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// PostgreSQL Auth Storage
// =============================================================================

/// PostgreSQL storage backend for the hand-off.
///
/// Holds a connection pool and hands out the storage types implementing the
/// `sastlink-auth` storage traits. All of them share the pool.
#[derive(Debug, Clone)]
pub struct PostgresAuthStorage {
    pool: Arc<PgPool>,
}

impl PostgresAuthStorage {
    /// Create new storage with an existing connection pool.
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Create new storage by connecting to the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails.
    pub async fn connect(database_url: &str, max_connections: u32) -> StorageResult<Self> {
        let pool = PoolOptions::<Postgres>::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(Arc::new(pool)))
    }

    /// Creates the tables and indexes if they do not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if a DDL statement fails.
    pub async fn ensure_schema(&self) -> StorageResult<()> {
        schema::ensure(&self.pool).await
    }

    /// Get a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // -------------------------------------------------------------------------
    // Storage Accessors
    // -------------------------------------------------------------------------

    /// Get client storage.
    #[must_use]
    pub fn clients(&self) -> PostgresClientStorage {
        PostgresClientStorage::new(Arc::clone(&self.pool))
    }

    /// Get authorization code storage.
    #[must_use]
    pub fn codes(&self) -> PostgresCodeStorage {
        PostgresCodeStorage::new(Arc::clone(&self.pool))
    }

    /// Get browser session storage.
    #[must_use]
    pub fn sessions(&self) -> PostgresSessionStorage {
        PostgresSessionStorage::new(Arc::clone(&self.pool))
    }
}

// =============================================================================
// Tests
// =============================================================================
