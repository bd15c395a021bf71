//! Credential and session lifecycle.
//!
//! Three leaves and one orchestrator:
//! - `password` - one-way hashing and verification
//! - `token`    - signed, expiring claim sets under two secrets
//! - `traits`   - the credential store contract
//! - `session`  - login, refresh, and caller resolution over the above

pub mod password;
pub mod session;
pub mod token;
pub mod traits;

pub use password::{hash_password, verify_password};
pub use session::{Principal, SessionManager, TokenPair, TOKEN_TYPE_BEARER};
pub use token::{AuthConfig, TokenClaims, TokenCodec};
pub use traits::{CredentialReader, CredentialRecord};
