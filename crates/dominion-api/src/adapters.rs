//! Adapter that bridges the storage layer to the domain layer.
//!
//! The domain layer (dominion-domain) defines `CredentialReader`, the
//! credential lookups the session manager depends on. The storage layer
//! (dominion-storage) implements `DataStore` with concrete backends.
//!
//! This module implements `CredentialReader` over any `DataStore`, so the
//! API layer can hand the session manager whichever backend the server was
//! configured with.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use dominion_domain::auth::{CredentialReader, CredentialRecord};
use dominion_domain::error::{DomainError, DomainResult};
use dominion_storage::{DataStore, StorageError, UserRecord};

/// Adapter that implements `CredentialReader` using a `DataStore`.
pub struct StoreCredentials<S: DataStore> {
    storage: Arc<S>,
}

impl<S: DataStore> StoreCredentials<S> {
    /// Creates a new adapter wrapping the given storage.
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }
}

fn to_credential(user: UserRecord) -> CredentialRecord {
    CredentialRecord {
        id: user.id.to_string(),
        username: user.username,
        email: user.email,
        password_hash: user.password_hash,
        is_admin: user.is_admin,
    }
}

#[async_trait]
impl<S: DataStore> CredentialReader for StoreCredentials<S> {
    async fn find_by_username(&self, username: &str) -> DomainResult<Option<CredentialRecord>> {
        match self.storage.get_user_by_username(username).await {
            Ok(user) => Ok(Some(to_credential(user))),
            Err(StorageError::UserNotFound { .. }) => Ok(None),
            Err(e) => Err(DomainError::AdapterUnavailable {
                message: format!("storage error: {e}"),
            }),
        }
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<CredentialRecord>> {
        // An unparsable id cannot name a stored user, so it is a miss,
        // not an adapter failure.
        let user_id = match Uuid::parse_str(id) {
            Ok(user_id) => user_id,
            Err(_) => return Ok(None),
        };

        match self.storage.get_user(user_id).await {
            Ok(user) => Ok(Some(to_credential(user))),
            Err(StorageError::UserNotFound { .. }) => Ok(None),
            Err(e) => Err(DomainError::AdapterUnavailable {
                message: format!("storage error: {e}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dominion_storage::MemoryDataStore;

    /// Test: Lookup by username round-trips through the adapter
    #[tokio::test]
    async fn test_find_by_username_returns_stored_record() {
        let storage = Arc::new(MemoryDataStore::new());
        let created = storage
            .create_user("carol", "carol@example.com", "hash", false)
            .await
            .unwrap();

        let adapter = StoreCredentials::new(storage);
        let found = adapter.find_by_username("carol").await.unwrap().unwrap();

        assert_eq!(found.id, created.id.to_string());
        assert_eq!(found.username, "carol");
        assert_eq!(found.email, "carol@example.com");
        assert_eq!(found.password_hash, "hash");
        assert!(!found.is_admin);
    }

    /// Test: Missing username is Ok(None), not an error
    #[tokio::test]
    async fn test_find_by_username_miss_is_none() {
        let adapter = StoreCredentials::new(Arc::new(MemoryDataStore::new()));
        let found = adapter.find_by_username("nobody").await.unwrap();
        assert!(found.is_none());
    }

    /// Test: Lookup by id round-trips through the adapter
    #[tokio::test]
    async fn test_find_by_id_returns_stored_record() {
        let storage = Arc::new(MemoryDataStore::new());
        let created = storage
            .create_user("dave", "dave@example.com", "hash", true)
            .await
            .unwrap();

        let adapter = StoreCredentials::new(storage);
        let found = adapter
            .find_by_id(&created.id.to_string())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(found.username, "dave");
        assert!(found.is_admin);
    }

    /// Test: Malformed id is a miss, not an error
    #[tokio::test]
    async fn test_find_by_id_malformed_is_none() {
        let adapter = StoreCredentials::new(Arc::new(MemoryDataStore::new()));
        let found = adapter.find_by_id("not-a-uuid").await.unwrap();
        assert!(found.is_none());
    }
}
