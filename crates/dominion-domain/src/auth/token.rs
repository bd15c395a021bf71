//! Signed token encoding and decoding.
//!
//! Access and refresh tokens share one claim shape but are signed under
//! independent secrets with independent lifetimes. Claims are a fixed
//! record rather than an open map, so a token missing a field fails at
//! decode time instead of at first use.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Claim set carried by both access and refresh tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Principal id.
    pub id: String,
    /// Subject, the principal's username (standard JWT `sub`).
    pub sub: String,
    /// Admin flag. Must be present, possibly false.
    pub is_admin: bool,
    /// Expiry (unix timestamp).
    pub exp: i64,
}

/// Signing secrets and token lifetimes for the session manager.
///
/// Constructed explicitly at startup and passed in; request-handling code
/// never reads ambient environment state.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Secret for access tokens.
    pub access_secret: String,
    /// Secret for refresh tokens. Must differ from the access secret so
    /// one token class cannot stand in for the other.
    pub refresh_secret: String,
    /// Access token lifetime.
    pub access_ttl: Duration,
    /// Refresh token lifetime.
    pub refresh_ttl: Duration,
}

impl AuthConfig {
    /// Standard access token lifetime in minutes.
    pub const ACCESS_TTL_MINUTES: i64 = 30;
    /// Standard refresh token lifetime in days.
    pub const REFRESH_TTL_DAYS: i64 = 7;

    /// Creates a config with the standard 30 minute / 7 day lifetimes.
    pub fn new(access_secret: impl Into<String>, refresh_secret: impl Into<String>) -> Self {
        Self {
            access_secret: access_secret.into(),
            refresh_secret: refresh_secret.into(),
            access_ttl: Duration::minutes(Self::ACCESS_TTL_MINUTES),
            refresh_ttl: Duration::days(Self::REFRESH_TTL_DAYS),
        }
    }
}

/// Encodes and decodes HS256 tokens under the access/refresh secret pair.
pub struct TokenCodec {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
    validation: Validation,
}

impl TokenCodec {
    /// Creates a codec from the given config.
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is exact: a token is invalid the moment `exp` passes.
        validation.leeway = 0;

        Self {
            access_encoding: EncodingKey::from_secret(config.access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_secret.as_bytes()),
            access_ttl: config.access_ttl,
            refresh_ttl: config.refresh_ttl,
            validation,
        }
    }

    /// Issues an access token for the given identity.
    pub fn issue_access(&self, id: &str, username: &str, is_admin: bool) -> DomainResult<String> {
        self.issue(id, username, is_admin, self.access_ttl, &self.access_encoding)
    }

    /// Issues a refresh token for the given identity.
    pub fn issue_refresh(&self, id: &str, username: &str, is_admin: bool) -> DomainResult<String> {
        self.issue(
            id,
            username,
            is_admin,
            self.refresh_ttl,
            &self.refresh_encoding,
        )
    }

    fn issue(
        &self,
        id: &str,
        username: &str,
        is_admin: bool,
        ttl: Duration,
        key: &EncodingKey,
    ) -> DomainResult<String> {
        let claims = TokenClaims {
            id: id.to_string(),
            sub: username.to_string(),
            is_admin,
            exp: (Utc::now() + ttl).timestamp(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, key).map_err(|e| {
            DomainError::AdapterUnavailable {
                message: format!("token signing failed: {e}"),
            }
        })
    }

    /// Decodes and verifies an access token.
    ///
    /// Signature, expiry, and claim-shape failures all collapse into
    /// `AuthenticationFailed`.
    pub fn decode_access(&self, token: &str) -> DomainResult<TokenClaims> {
        jsonwebtoken::decode::<TokenClaims>(token, &self.access_decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| DomainError::AuthenticationFailed {
                message: format!("Could not validate credentials: {e}"),
            })
    }

    /// Decodes and verifies a refresh token.
    pub fn decode_refresh(&self, token: &str) -> DomainResult<TokenClaims> {
        jsonwebtoken::decode::<TokenClaims>(token, &self.refresh_decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| DomainError::InvalidToken {
                message: format!("Invalid or expired refresh token: {e}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AuthConfig {
        AuthConfig::new("access-secret-for-tests", "refresh-secret-for-tests")
    }

    /// Test: Access token round-trips through encode and decode
    #[test]
    fn test_access_token_roundtrip() {
        let codec = TokenCodec::new(&test_config());

        let token = codec.issue_access("u-1", "alice", true).unwrap();
        let claims = codec.decode_access(&token).unwrap();

        assert_eq!(claims.id, "u-1");
        assert_eq!(claims.sub, "alice");
        assert!(claims.is_admin);
        assert!(claims.exp > Utc::now().timestamp());
    }

    /// Test: Access and refresh secrets are not interchangeable
    #[test]
    fn test_secrets_are_independent() {
        let codec = TokenCodec::new(&test_config());

        let access = codec.issue_access("u-1", "alice", false).unwrap();
        let refresh = codec.issue_refresh("u-1", "alice", false).unwrap();

        assert!(matches!(
            codec.decode_refresh(&access),
            Err(DomainError::InvalidToken { .. })
        ));
        assert!(matches!(
            codec.decode_access(&refresh),
            Err(DomainError::AuthenticationFailed { .. })
        ));
    }

    /// Test: Expired token is rejected even though correctly signed
    #[test]
    fn test_expired_token_rejected() {
        let mut config = test_config();
        config.access_ttl = Duration::seconds(-5);
        let codec = TokenCodec::new(&config);

        let token = codec.issue_access("u-1", "alice", false).unwrap();

        assert!(matches!(
            codec.decode_access(&token),
            Err(DomainError::AuthenticationFailed { .. })
        ));
    }

    /// Test: Token missing a claim field fails at decode
    #[test]
    fn test_missing_claim_fails_decode() {
        let config = test_config();
        let codec = TokenCodec::new(&config);

        // Sign a payload without `is_admin` under the correct secret.
        #[derive(Serialize)]
        struct Partial<'a> {
            id: &'a str,
            sub: &'a str,
            exp: i64,
        }
        let partial = Partial {
            id: "u-1",
            sub: "alice",
            exp: (Utc::now() + Duration::minutes(5)).timestamp(),
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &partial,
            &EncodingKey::from_secret(config.access_secret.as_bytes()),
        )
        .unwrap();

        assert!(matches!(
            codec.decode_access(&token),
            Err(DomainError::AuthenticationFailed { .. })
        ));
    }

    /// Test: Garbage input is rejected
    #[test]
    fn test_malformed_token_rejected() {
        let codec = TokenCodec::new(&test_config());
        assert!(codec.decode_access("not.a.token").is_err());
        assert!(codec.decode_refresh("").is_err());
    }
}
