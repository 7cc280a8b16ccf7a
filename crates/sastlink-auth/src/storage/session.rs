//! Browser session storage trait.
//!
//! Session management is an external collaborator; the hand-off only needs
//! to look a session up and to write or take a single named slot.
//!
//! Slot writes and takes are atomic per session id: two takes of the same
//! slot never both return the value, and a take never undoes a later write.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::AuthResult;

/// Persisted form of a browser session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// Opaque session identifier (stored in the session cookie).
    pub id: String,

    /// Named slots.
    #[serde(default)]
    pub values: Map<String, Value>,

    /// Timestamp after which the session is gone.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl SessionRecord {
    /// Checks if the session has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() > self.expires_at
    }
}

/// Storage trait for browser sessions.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Loads a session by id.
    ///
    /// Returns `None` if the session does not exist or has expired.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn load(&self, id: &str) -> AuthResult<Option<SessionRecord>>;

    /// Writes one slot, creating the session if it does not exist yet.
    ///
    /// Other slots are left untouched, and the session's expiry is moved to
    /// `expires_at`. Writing to an expired session starts it over empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be stored.
    async fn set_slot(
        &self,
        id: &str,
        slot: &str,
        value: Value,
        expires_at: OffsetDateTime,
    ) -> AuthResult<()>;

    /// Removes one slot and returns the value it held.
    ///
    /// Returns `None` if the session is missing or expired, or the slot is
    /// empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn take_slot(&self, id: &str, slot: &str) -> AuthResult<Option<Value>>;

    /// Deletes expired sessions, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the cleanup operation fails.
    async fn cleanup_expired(&self) -> AuthResult<u64>;
}
