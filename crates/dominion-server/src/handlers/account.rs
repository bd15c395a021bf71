//! Account registration handler.
//!
//! Registration hashes the password, then hands the record to the store,
//! which enforces username and email uniqueness atomically. The handler
//! never sees a duplicate race: whichever insert loses reports the
//! collision through `StorageError`.

use std::sync::Arc;

use dominion_domain::auth::password::hash_password;
use dominion_domain::DomainError;
use dominion_storage::{DataStore, StorageError, UserRecord};
use tracing::{debug, instrument};

/// A registration submission.
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    /// Desired login name.
    pub username: String,
    /// Contact address, unique per account.
    pub email: String,
    /// Plaintext password; hashed before it reaches storage.
    pub password: String,
}

/// Errors that can occur during registration.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    /// Another account already holds this username.
    #[error("Username already taken")]
    UsernameTaken,

    /// Another account already holds this email.
    #[error("Email already in use")]
    EmailTaken,

    /// The password could not be hashed.
    #[error("hashing error: {0}")]
    Hashing(String),

    /// Storage failure outside the uniqueness contract.
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<StorageError> for RegistrationError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::DuplicateUsername { .. } => RegistrationError::UsernameTaken,
            StorageError::DuplicateEmail { .. } => RegistrationError::EmailTaken,
            other => RegistrationError::Storage(other.to_string()),
        }
    }
}

impl From<DomainError> for RegistrationError {
    fn from(err: DomainError) -> Self {
        RegistrationError::Hashing(err.to_string())
    }
}

/// Result type for registration operations.
pub type RegistrationResult<T> = Result<T, RegistrationError>;

/// Handler for account registration.
pub struct AccountHandler<S: DataStore> {
    store: Arc<S>,
}

impl<S: DataStore> AccountHandler<S> {
    /// Creates a new account handler.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Registers a regular account.
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn register(&self, request: RegistrationRequest) -> RegistrationResult<UserRecord> {
        self.create(request, false).await
    }

    /// Registers an administrator account.
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn register_admin(
        &self,
        request: RegistrationRequest,
    ) -> RegistrationResult<UserRecord> {
        self.create(request, true).await
    }

    async fn create(
        &self,
        request: RegistrationRequest,
        is_admin: bool,
    ) -> RegistrationResult<UserRecord> {
        let password_hash = hash_password(&request.password)?;

        let user = self
            .store
            .create_user(&request.username, &request.email, &password_hash, is_admin)
            .await?;

        debug!(user_id = %user.id, is_admin, "Registered account");
        Ok(user)
    }
}
