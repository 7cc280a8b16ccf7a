//! In-memory storage backends.
//!
//! Backed by `DashMap`, so every operation is atomic per key: client
//! creation uses the entry API (create-if-absent), code consumption is a
//! single `remove`, and session slots change under the key's shard lock.
//! Suitable for tests and single-node deployments; nothing survives a
//! restart.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::oauth::code::AuthorizationCode;
use crate::storage::{AuthorizationCodeStorage, ClientStorage, SessionRecord, SessionStorage};
use crate::types::Client;
use crate::{AuthError, AuthResult};

// =============================================================================
// Clients
// =============================================================================

/// In-memory client registry storage.
#[derive(Debug, Default)]
pub struct MemoryClientStorage {
    clients: DashMap<String, Client>,
}

impl MemoryClientStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered clients.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns `true` if no client is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[async_trait]
impl ClientStorage for MemoryClientStorage {
    async fn find_by_id(&self, client_id: &str) -> AuthResult<Option<Client>> {
        Ok(self.clients.get(client_id).map(|c| c.value().clone()))
    }

    async fn create(&self, client: &Client) -> AuthResult<()> {
        match self.clients.entry(client.id.clone()) {
            Entry::Occupied(_) => Err(AuthError::duplicate_client(&client.id)),
            Entry::Vacant(slot) => {
                slot.insert(client.clone());
                Ok(())
            }
        }
    }
}

// =============================================================================
// Authorization codes
// =============================================================================

/// In-memory authorization code storage.
#[derive(Debug, Default)]
pub struct MemoryCodeStorage {
    codes: DashMap<String, AuthorizationCode>,
}

impl MemoryCodeStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored codes, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Returns `true` if no code is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

#[async_trait]
impl AuthorizationCodeStorage for MemoryCodeStorage {
    async fn create(&self, code: &AuthorizationCode) -> AuthResult<()> {
        match self.codes.entry(code.code.clone()) {
            Entry::Occupied(_) => Err(AuthError::internal("authorization code collision")),
            Entry::Vacant(slot) => {
                slot.insert(code.clone());
                Ok(())
            }
        }
    }

    async fn consume(&self, code: &str) -> AuthResult<Option<AuthorizationCode>> {
        Ok(self
            .codes
            .remove(code)
            .map(|(_, stored)| stored)
            .filter(|stored| !stored.is_expired()))
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        let now = OffsetDateTime::now_utc();
        let before = self.codes.len();
        self.codes.retain(|_, code| code.expires_at >= now);
        Ok(before.saturating_sub(self.codes.len()) as u64)
    }
}

// =============================================================================
// Sessions
// =============================================================================

/// In-memory browser session storage.
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    sessions: DashMap<String, SessionRecord>,
}

impl MemorySessionStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStorage for MemorySessionStorage {
    async fn load(&self, id: &str) -> AuthResult<Option<SessionRecord>> {
        Ok(self
            .sessions
            .get(id)
            .map(|r| r.value().clone())
            .filter(|r| !r.is_expired()))
    }

    async fn set_slot(
        &self,
        id: &str,
        slot: &str,
        value: Value,
        expires_at: OffsetDateTime,
    ) -> AuthResult<()> {
        let mut record = self
            .sessions
            .entry(id.to_string())
            .or_insert_with(|| SessionRecord {
                id: id.to_string(),
                values: Map::new(),
                expires_at,
            });
        if record.is_expired() {
            record.values.clear();
        }
        record.values.insert(slot.to_string(), value);
        record.expires_at = expires_at;
        Ok(())
    }

    async fn take_slot(&self, id: &str, slot: &str) -> AuthResult<Option<Value>> {
        let Some(mut record) = self.sessions.get_mut(id) else {
            return Ok(None);
        };
        if record.is_expired() {
            return Ok(None);
        }
        Ok(record.values.remove(slot))
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        let now = OffsetDateTime::now_utc();
        let before = self.sessions.len();
        self.sessions.retain(|_, r| r.expires_at >= now);
        Ok(before.saturating_sub(self.sessions.len()) as u64)
    }
}
