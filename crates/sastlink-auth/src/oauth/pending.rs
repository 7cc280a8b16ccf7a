//! Pending authorize requests.
//!
//! When an authorize call arrives without a usable login token, its form
//! parameters are stashed in the browser session before the user is sent to
//! the login page. The next authorize call on the same session restores them.
//!
//! # Lifecycle
//!
//! 1. `stash` overwrites the session's single pending slot in one storage
//!    write
//! 2. `restore_and_clear` takes the slot out of storage in one atomic
//!    operation, so of any number of concurrent restores on a session at
//!    most one gets the request, and a restore never erases a newer stash
//! 3. Otherwise the request lives until the session itself expires, unless
//!    a maximum age is configured

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::AuthResult;
use crate::session::Session;
use crate::storage::SessionStorage;
use crate::types::FormValues;

/// Session slot holding the pending request.
pub const PENDING_REQUEST_SLOT: &str = "pending_authorize_request";

/// A stashed authorize request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRequest {
    /// The original request's form parameters.
    pub form_values: FormValues,

    /// When the request was stashed.
    #[serde(with = "time::serde::rfc3339")]
    pub stashed_at: OffsetDateTime,
}

impl PendingRequest {
    /// Snapshots the given form values.
    #[must_use]
    pub fn new(form_values: FormValues) -> Self {
        Self {
            form_values,
            stashed_at: OffsetDateTime::now_utc(),
        }
    }

    /// Returns `true` if the request is older than `max_age`.
    #[must_use]
    pub fn is_older_than(&self, max_age: Duration) -> bool {
        let max_age = time::Duration::try_from(max_age).unwrap_or(time::Duration::MAX);
        OffsetDateTime::now_utc() - self.stashed_at > max_age
    }
}

/// Session-scoped store for pending authorize requests.
#[derive(Clone)]
pub struct PendingRequestStore {
    storage: Arc<dyn SessionStorage>,
    max_age: Option<Duration>,
}

impl PendingRequestStore {
    /// Creates a store backed by `storage`.
    #[must_use]
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            storage,
            max_age: None,
        }
    }

    /// Discards restored requests older than `max_age`.
    #[must_use]
    pub fn with_max_age(mut self, max_age: Option<Duration>) -> Self {
        self.max_age = max_age;
        self
    }

    /// Writes `form_values` into the session's pending slot.
    ///
    /// Any previously stashed request is overwritten.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be written.
    pub async fn stash(&self, session: &Session, form_values: &FormValues) -> AuthResult<()> {
        session
            .put_slot(
                self.storage.as_ref(),
                PENDING_REQUEST_SLOT,
                &PendingRequest::new(form_values.clone()),
            )
            .await?;

        tracing::debug!(
            session_id = %session.id(),
            params = form_values.len(),
            "Stashed pending authorize request"
        );
        Ok(())
    }

    /// Takes the pending request out of the session.
    ///
    /// Returns `None` when nothing is stashed. A value that is found has
    /// already been removed from storage, whatever the caller does with it.
    ///
    /// # Errors
    ///
    /// Returns an error if the session storage fails.
    pub async fn restore_and_clear(&self, session: &Session) -> AuthResult<Option<FormValues>> {
        let Some(value) = session
            .take_slot(self.storage.as_ref(), PENDING_REQUEST_SLOT)
            .await?
        else {
            return Ok(None);
        };

        let pending = match serde_json::from_value::<PendingRequest>(value) {
            Ok(pending) => pending,
            Err(e) => {
                tracing::warn!(
                    session_id = %session.id(),
                    error = %e,
                    "Discarding unreadable pending authorize request"
                );
                return Ok(None);
            }
        };

        if let Some(max_age) = self.max_age
            && pending.is_older_than(max_age)
        {
            tracing::info!(
                session_id = %session.id(),
                "Discarding stale pending authorize request"
            );
            return Ok(None);
        }

        tracing::debug!(
            session_id = %session.id(),
            params = pending.form_values.len(),
            "Restored pending authorize request"
        );
        Ok(Some(pending.form_values))
    }
}
