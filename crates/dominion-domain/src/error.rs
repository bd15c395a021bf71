//! Domain error types for session and battle operations.

use thiserror::Error;

/// Domain-specific errors for session and battle operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Bad credentials or a bad/expired/forged access token.
    ///
    /// Deliberately shared between "user not found" and "wrong password"
    /// so login failures cannot be used to enumerate usernames.
    #[error("authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// Malformed or expired refresh token.
    #[error("invalid token: {message}")]
    InvalidToken { message: String },

    /// Ownership or admin policy violation.
    #[error("forbidden: {message}")]
    Forbidden { message: String },

    /// Missing user, fleet, or other record.
    #[error("not found: {message}")]
    NotFound { message: String },

    /// A caller attempted to battle their own fleet.
    #[error("cannot attack your own fleet")]
    SelfBattleForbidden,

    /// The external credential or ownership store cannot be reached.
    #[error("adapter unavailable: {message}")]
    AdapterUnavailable { message: String },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
