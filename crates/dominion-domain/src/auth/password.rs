//! Password hashing and verification.
//!
//! Hashes are bcrypt with a per-call random salt embedded in the output,
//! so hashing the same plaintext twice yields different strings that both
//! verify. Comparison inside `bcrypt::verify` is constant-time.

use crate::error::{DomainError, DomainResult};

/// Hashes a plaintext password with a fresh random salt.
pub fn hash_password(plain: &str) -> DomainResult<String> {
    bcrypt::hash(plain, bcrypt::DEFAULT_COST).map_err(|e| DomainError::AdapterUnavailable {
        message: format!("password hashing failed: {e}"),
    })
}

/// Verifies a plaintext password against a stored hash.
///
/// A stored hash that cannot be parsed fails verification instead of
/// surfacing a server fault, keeping the login error surface uniform.
pub fn verify_password(plain: &str, hash: &str) -> DomainResult<bool> {
    bcrypt::verify(plain, hash).map_err(|e| DomainError::AuthenticationFailed {
        message: format!("password verification failed: {e}"),
    })
}
