//! Client registry.
//!
//! Thin policy layer over [`ClientStorage`]: validates registrations before
//! they reach storage and turns a missing client into [`AuthError::NotFound`].

use std::sync::Arc;

use uuid::Uuid;

use crate::storage::ClientStorage;
use crate::types::{Client, ClientValidationError};
use crate::{AuthError, AuthResult};

impl From<ClientValidationError> for AuthError {
    fn from(err: ClientValidationError) -> Self {
        AuthError::validation(err.to_string())
    }
}

/// Durable mapping from client id to its registration.
#[derive(Clone)]
pub struct ClientRegistry {
    storage: Arc<dyn ClientStorage>,
}

impl ClientRegistry {
    /// Creates a registry over the given storage.
    #[must_use]
    pub fn new(storage: Arc<dyn ClientStorage>) -> Self {
        Self { storage }
    }

    /// Registers a client under a caller-supplied id.
    ///
    /// # Errors
    ///
    /// - `Validation` if the id is blank or the redirect domain is not a URI
    /// - `DuplicateClient` if the id is already registered
    /// - `Storage` if the store fails
    pub async fn register(
        &self,
        id: &str,
        secret: Option<String>,
        redirect_domain: &str,
    ) -> AuthResult<Client> {
        let client = Client::new(id, secret, redirect_domain)?;
        self.storage.create(&client).await?;

        tracing::info!(
            client_id = %client.id,
            redirect_domain = %client.redirect_domain,
            "Registered OAuth client"
        );
        Ok(client)
    }

    /// Registers a client under a freshly generated id.
    ///
    /// # Errors
    ///
    /// Same as [`register`](Self::register).
    pub async fn register_generated(&self, redirect_domain: &str) -> AuthResult<Client> {
        let id = Uuid::new_v4().to_string();
        self.register(&id, None, redirect_domain).await
    }

    /// Looks up a client by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no client has this id.
    pub async fn lookup(&self, id: &str) -> AuthResult<Client> {
        self.storage
            .find_by_id(id)
            .await?
            .ok_or_else(|| AuthError::not_found(format!("client '{id}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryClientStorage;
    use tokio_test::block_on;

    fn registry() -> (ClientRegistry, Arc<MemoryClientStorage>) {
        let storage = Arc::new(MemoryClientStorage::new());
        (ClientRegistry::new(storage.clone()), storage)
    }

    #[tokio::test]
    async fn test_register_and_lookup() {
        let (registry, _) = registry();
        let client = registry
            .register("app", Some(String::new()), "https://app.example")
            .await
            .unwrap();
        assert!(client.secret.is_none());

        assert_eq!(registry.lookup("app").await.unwrap(), client);
    }

    #[tokio::test]
    async fn test_duplicate_id_keeps_first() {
        let (registry, _) = registry();
        registry
            .register("app", None, "https://first.example")
            .await
            .unwrap();

        let err = registry
            .register("app", None, "https://second.example")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateClient { .. }));

        let client = registry.lookup("app").await.unwrap();
        assert_eq!(client.redirect_domain, "https://first.example");
    }

    #[tokio::test]
    async fn test_invalid_domain_never_reaches_storage() {
        let (registry, storage) = registry();

        let err = registry.register_generated("").await.unwrap_err();
        assert!(matches!(err, AuthError::Validation { .. }));

        let err = registry.register_generated("no scheme").await.unwrap_err();
        assert!(matches!(err, AuthError::Validation { .. }));

        assert!(storage.is_empty());
    }

    #[test]
    fn test_generated_ids_are_distinct() {
        let (registry, storage) = registry();
        block_on(async {
            let a = registry
                .register_generated("https://app.example")
                .await
                .unwrap();
            let b = registry
                .register_generated("https://app.example")
                .await
                .unwrap();
            assert_ne!(a.id, b.id);
        });
        assert_eq!(storage.len(), 2);
    }

    #[tokio::test]
    async fn test_lookup_unknown() {
        let (registry, _) = registry();
        let err = registry.lookup("ghost").await.unwrap_err();
        assert!(matches!(err, AuthError::NotFound { .. }));
    }
}
