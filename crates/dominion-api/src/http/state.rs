//! Application state for HTTP handlers.

use std::sync::Arc;

use dominion_domain::auth::AuthConfig;
use dominion_domain::SessionManager;
use dominion_server::handlers::{AccountHandler, BattleHandler};
use dominion_storage::DataStore;

use crate::adapters::StoreCredentials;

/// Application state shared across all HTTP handlers.
///
/// # Type Parameters
///
/// * `S` - The storage backend implementing `DataStore`
///
/// # Architecture
///
/// The state bridges the storage layer to the domain layer through
/// `StoreCredentials<S>`, which implements `CredentialReader` over any
/// `DataStore`. The session manager never sees the backend directly.
#[derive(Clone)]
pub struct AppState<S: DataStore> {
    /// The storage backend.
    pub storage: Arc<S>,
    /// Login, refresh, and caller resolution over the configured secrets.
    pub sessions: Arc<SessionManager<StoreCredentials<S>>>,
    /// Account registration handler.
    pub accounts: Arc<AccountHandler<S>>,
    /// Battle orchestration handler.
    pub battles: Arc<BattleHandler<S>>,
}

impl<S: DataStore> AppState<S> {
    /// Creates a new application state over the given storage and secrets.
    pub fn new(storage: Arc<S>, auth: AuthConfig) -> Self {
        let credentials = Arc::new(StoreCredentials::new(Arc::clone(&storage)));

        Self {
            sessions: Arc::new(SessionManager::new(auth, credentials)),
            accounts: Arc::new(AccountHandler::new(Arc::clone(&storage))),
            battles: Arc::new(BattleHandler::new(Arc::clone(&storage))),
            storage,
        }
    }
}
