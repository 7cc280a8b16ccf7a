//! Client storage trait.
//!
//! Defines the interface for OAuth client persistence operations.
//! Implementations are provided by storage backends (e.g., PostgreSQL).

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::Client;

/// Storage operations for OAuth 2.0 clients.
///
/// Both operations are single-record and must be atomic; the registry adds
/// no locking of its own.
///
/// # Example
///
/// ```ignore
/// use sastlink_auth::storage::ClientStorage;
///
/// async fn example(storage: &impl ClientStorage) -> sastlink_auth::AuthResult<()> {
///     if let Some(client) = storage.find_by_id("my-app").await? {
///         println!("redirects to {}", client.redirect_domain);
///     }
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait ClientStorage: Send + Sync {
    /// Find a client by its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_id(&self, client_id: &str) -> AuthResult<Option<Client>>;

    /// Insert a new client.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::DuplicateClient` if the id is taken, leaving the
    /// existing record untouched, or a storage error.
    async fn create(&self, client: &Client) -> AuthResult<()>;
}
