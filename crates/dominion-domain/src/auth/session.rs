//! Session manager: login, token refresh, and caller resolution.
//!
//! Tokens are stateless. The only states a token can be in are
//! valid-unexpired, expired, and malformed/forged; transitions happen by
//! wall-clock time or key mismatch, never by server-side revocation.

use std::sync::Arc;

use tracing::debug;

use crate::error::{DomainError, DomainResult};

use super::password;
use super::token::{AuthConfig, TokenCodec};
use super::traits::CredentialReader;

/// Constant token-type marker returned with every token pair.
pub const TOKEN_TYPE_BEARER: &str = "bearer";

/// Message shared by every login failure so responses cannot be used to
/// enumerate usernames.
const INVALID_CREDENTIALS: &str = "Invalid username or password";

/// An authenticated caller, reconstructed from a validated access token.
///
/// Derived, not stored: it has no lifecycle beyond the token's validity
/// window, and resolving it performs no database lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: String,
    pub username: String,
    pub is_admin: bool,
}

/// A freshly minted access + refresh token pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
}

/// Orchestrates login, token issuance, refresh, and caller resolution.
///
/// Depends on a [`CredentialReader`] for the single external lookup at
/// login; everything else is pure computation over the configured secrets.
pub struct SessionManager<C: CredentialReader> {
    credentials: Arc<C>,
    codec: TokenCodec,
}

impl<C: CredentialReader> SessionManager<C> {
    /// Creates a session manager over the given credential store.
    pub fn new(config: AuthConfig, credentials: Arc<C>) -> Self {
        Self {
            credentials,
            codec: TokenCodec::new(&config),
        }
    }

    /// Hashes a plaintext password for storage.
    pub fn hash_password(&self, plain: &str) -> DomainResult<String> {
        password::hash_password(plain)
    }

    /// Verifies a plaintext password against a stored hash.
    pub fn verify_password(&self, plain: &str, hash: &str) -> DomainResult<bool> {
        password::verify_password(plain, hash)
    }

    /// Authenticates a username/password pair and mints a token pair.
    ///
    /// An unknown username and a wrong password fail with the identical
    /// `AuthenticationFailed` error.
    pub async fn login(&self, username: &str, password: &str) -> DomainResult<TokenPair> {
        let record = self
            .credentials
            .find_by_username(username)
            .await?
            .ok_or_else(|| DomainError::AuthenticationFailed {
                message: INVALID_CREDENTIALS.to_string(),
            })?;

        let verified = self
            .verify_password(password, &record.password_hash)
            .unwrap_or(false);
        if !verified {
            debug!(username, "login rejected");
            return Err(DomainError::AuthenticationFailed {
                message: INVALID_CREDENTIALS.to_string(),
            });
        }

        debug!(username, "login accepted");
        self.issue_pair(&record.id, &record.username, record.is_admin)
    }

    /// Exchanges a refresh token for a brand-new access + refresh pair.
    ///
    /// The presented token is not rotated or invalidated; it stays usable
    /// until its own natural expiry.
    pub fn refresh(&self, refresh_token: &str) -> DomainResult<TokenPair> {
        let claims = self.codec.decode_refresh(refresh_token)?;

        if claims.id.is_empty() || claims.sub.is_empty() {
            return Err(DomainError::InvalidToken {
                message: "Invalid or expired refresh token".to_string(),
            });
        }

        self.issue_pair(&claims.id, &claims.sub, claims.is_admin)
    }

    /// Resolves the caller behind a bearer access token.
    ///
    /// This is the sole identity gate for downstream handlers; it performs
    /// no database lookup, so a stale token stays valid until expiry even
    /// if the underlying credential record changed.
    pub fn resolve_caller(&self, bearer_token: &str) -> DomainResult<Principal> {
        let claims = self.codec.decode_access(bearer_token)?;

        if claims.id.is_empty() || claims.sub.is_empty() {
            return Err(DomainError::AuthenticationFailed {
                message: "Could not validate credentials".to_string(),
            });
        }

        Ok(Principal {
            id: claims.id,
            username: claims.sub,
            is_admin: claims.is_admin,
        })
    }

    fn issue_pair(&self, id: &str, username: &str, is_admin: bool) -> DomainResult<TokenPair> {
        Ok(TokenPair {
            access_token: self.codec.issue_access(id, username, is_admin)?,
            refresh_token: self.codec.issue_refresh(id, username, is_admin)?,
            token_type: TOKEN_TYPE_BEARER,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use chrono::Duration;

    use super::super::traits::CredentialRecord;
    use super::*;

    /// In-memory credential store for session tests.
    struct FixedCredentials {
        by_username: HashMap<String, CredentialRecord>,
    }

    impl FixedCredentials {
        fn with_user(username: &str, password: &str, is_admin: bool) -> Self {
            let record = CredentialRecord {
                id: "11111111-1111-1111-1111-111111111111".to_string(),
                username: username.to_string(),
                email: format!("{username}@example.com"),
                password_hash: password::hash_password(password).unwrap(),
                is_admin,
            };
            let mut by_username = HashMap::new();
            by_username.insert(username.to_string(), record);
            Self { by_username }
        }
    }

    #[async_trait]
    impl CredentialReader for FixedCredentials {
        async fn find_by_username(
            &self,
            username: &str,
        ) -> DomainResult<Option<CredentialRecord>> {
            Ok(self.by_username.get(username).cloned())
        }

        async fn find_by_id(&self, id: &str) -> DomainResult<Option<CredentialRecord>> {
            Ok(self
                .by_username
                .values()
                .find(|record| record.id == id)
                .cloned())
        }
    }

    fn manager(store: FixedCredentials) -> SessionManager<FixedCredentials> {
        SessionManager::new(
            AuthConfig::new("session-access-secret", "session-refresh-secret"),
            Arc::new(store),
        )
    }

    /// Test: Login followed by resolve_caller returns the registered identity
    #[tokio::test]
    async fn test_login_then_resolve_caller_roundtrip() {
        let sessions = manager(FixedCredentials::with_user("alice", "open sesame", true));

        let pair = sessions.login("alice", "open sesame").await.unwrap();
        assert_eq!(pair.token_type, "bearer");

        let principal = sessions.resolve_caller(&pair.access_token).unwrap();
        assert_eq!(principal.username, "alice");
        assert!(principal.is_admin);
    }

    /// Test: Unknown username and wrong password fail identically
    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let sessions = manager(FixedCredentials::with_user("alice", "open sesame", false));

        let unknown = sessions.login("mallory", "open sesame").await.unwrap_err();
        let wrong = sessions.login("alice", "wrong password").await.unwrap_err();

        assert!(matches!(
            unknown,
            DomainError::AuthenticationFailed { .. }
        ));
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    /// Test: Refresh mints a new pair and leaves the old token usable
    #[tokio::test]
    async fn test_refresh_does_not_rotate() {
        let sessions = manager(FixedCredentials::with_user("alice", "open sesame", false));

        let pair = sessions.login("alice", "open sesame").await.unwrap();
        let first = sessions.refresh(&pair.refresh_token).unwrap();
        // The presented token is still valid after use.
        let second = sessions.refresh(&pair.refresh_token).unwrap();

        let principal = sessions.resolve_caller(&first.access_token).unwrap();
        assert_eq!(principal.username, "alice");
        let principal = sessions.resolve_caller(&second.access_token).unwrap();
        assert_eq!(principal.username, "alice");
    }

    /// Test: Refresh token signed with the wrong secret is rejected
    #[tokio::test]
    async fn test_refresh_rejects_foreign_secret() {
        let sessions = manager(FixedCredentials::with_user("alice", "open sesame", false));
        let foreign = SessionManager::new(
            AuthConfig::new("other-access-secret", "other-refresh-secret"),
            Arc::new(FixedCredentials::with_user("alice", "open sesame", false)),
        );

        let pair = foreign.login("alice", "open sesame").await.unwrap();

        assert!(matches!(
            sessions.refresh(&pair.refresh_token),
            Err(DomainError::InvalidToken { .. })
        ));
    }

    /// Test: Expired access token is rejected by resolve_caller
    #[tokio::test]
    async fn test_expired_access_token_rejected() {
        let mut config = AuthConfig::new("session-access-secret", "session-refresh-secret");
        config.access_ttl = Duration::seconds(-5);
        let sessions = SessionManager::new(
            config,
            Arc::new(FixedCredentials::with_user("alice", "open sesame", false)),
        );

        let pair = sessions.login("alice", "open sesame").await.unwrap();

        assert!(matches!(
            sessions.resolve_caller(&pair.access_token),
            Err(DomainError::AuthenticationFailed { .. })
        ));
    }

    /// Test: Refresh token with an empty subject claim is rejected
    #[tokio::test]
    async fn test_refresh_rejects_empty_subject() {
        use jsonwebtoken::{Algorithm, EncodingKey, Header};

        let sessions = manager(FixedCredentials::with_user("alice", "open sesame", false));

        let claims = super::super::token::TokenClaims {
            id: "u-1".to_string(),
            sub: String::new(),
            is_admin: false,
            exp: (chrono::Utc::now() + Duration::minutes(5)).timestamp(),
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"session-refresh-secret"),
        )
        .unwrap();

        assert!(matches!(
            sessions.refresh(&token),
            Err(DomainError::InvalidToken { .. })
        ));
    }

    /// Test: Credential store lookups by id honor the same contract
    #[tokio::test]
    async fn test_find_by_id_contract() {
        let store = FixedCredentials::with_user("alice", "open sesame", false);

        let record = store
            .find_by_id("11111111-1111-1111-1111-111111111111")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.username, "alice");
        assert!(store.find_by_id("missing").await.unwrap().is_none());
    }
}
