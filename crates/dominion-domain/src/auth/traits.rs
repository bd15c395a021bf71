//! Trait for credential lookups needed by the session manager.

use async_trait::async_trait;

use crate::error::DomainResult;

/// A stored credential record.
///
/// The session manager treats this as read-only; the only field it ever
/// inspects beyond identity is `password_hash`, at login.
#[derive(Debug, Clone)]
pub struct CredentialRecord {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
}

/// Trait for the external credential store consulted at login.
///
/// Lookup misses are `Ok(None)`; `Err` is reserved for the store itself
/// being unreachable.
#[async_trait]
pub trait CredentialReader: Send + Sync {
    /// Finds a credential record by username.
    async fn find_by_username(&self, username: &str) -> DomainResult<Option<CredentialRecord>>;

    /// Finds a credential record by id.
    ///
    /// Not consulted on the login path; part of the adapter contract for
    /// callers resolving a stored record behind a principal id.
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<CredentialRecord>>;
}
