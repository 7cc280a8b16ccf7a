//! Per-request browser session handle.
//!
//! A [`Session`] names one browser session for the length of a request. It
//! carries no copy of the session's values: every slot write and take goes
//! straight to storage as one atomic operation, so concurrent requests on
//! the same session cannot overwrite each other's changes.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::storage::SessionStorage;
use crate::{AuthError, AuthResult};

/// A browser session resolved for one request.
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    ttl: Duration,
    is_new: bool,
}

impl Session {
    /// Resolves the session named by the request cookie, or starts a new one.
    ///
    /// An unknown or expired id yields a fresh session with a new id, so a
    /// client cannot choose its own session identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the session storage fails.
    pub async fn start(
        storage: &dyn SessionStorage,
        cookie_id: Option<&str>,
        ttl: Duration,
    ) -> AuthResult<Self> {
        if let Some(id) = cookie_id.filter(|id| !id.is_empty()) {
            if let Some(record) = storage.load(id).await? {
                return Ok(Self {
                    id: record.id,
                    ttl,
                    is_new: false,
                });
            }
            tracing::debug!("Session cookie did not match a live session, starting a new one");
        }

        Ok(Self::fresh(ttl))
    }

    /// Creates a new session with a random id. Nothing is stored until the
    /// first slot write.
    #[must_use]
    pub fn fresh(ttl: Duration) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            ttl,
            is_new: true,
        }
    }

    /// The session identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns `true` if the session did not exist before this request.
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Writes `value` into `slot` and extends the session by its ttl.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the value cannot be serialized, or the
    /// storage error if the write fails.
    pub async fn put_slot<T: Serialize>(
        &self,
        storage: &dyn SessionStorage,
        slot: &str,
        value: &T,
    ) -> AuthResult<()> {
        let value = serde_json::to_value(value)
            .map_err(|e| AuthError::internal(format!("cannot serialize session slot: {e}")))?;
        let ttl = time::Duration::try_from(self.ttl).unwrap_or(time::Duration::MAX);
        let expires_at = OffsetDateTime::now_utc().saturating_add(ttl);

        storage.set_slot(&self.id, slot, value, expires_at).await
    }

    /// Removes `slot` and returns what it held.
    ///
    /// Of several concurrent takes on the same slot, at most one sees the
    /// value.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn take_slot(
        &self,
        storage: &dyn SessionStorage,
        slot: &str,
    ) -> AuthResult<Option<Value>> {
        storage.take_slot(&self.id, slot).await
    }
}
