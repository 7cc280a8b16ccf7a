//! Authorization code storage trait.
//!
//! # Security Considerations
//!
//! - Never log authorization codes
//! - `consume` must be atomic so a code can be exchanged at most once

use async_trait::async_trait;

use crate::AuthResult;
use crate::oauth::code::AuthorizationCode;

/// Storage for issued authorization codes.
#[async_trait]
pub trait AuthorizationCodeStorage: Send + Sync {
    /// Persists a freshly issued code.
    ///
    /// # Errors
    ///
    /// Returns an error if the code cannot be stored.
    async fn create(&self, code: &AuthorizationCode) -> AuthResult<()>;

    /// Removes and returns the code if it exists and has not expired.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn consume(&self, code: &str) -> AuthResult<Option<AuthorizationCode>>;

    /// Deletes expired codes, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the cleanup operation fails.
    async fn cleanup_expired(&self) -> AuthResult<u64>;
}
