//! dominion-domain: Core session and battle logic
//!
//! This crate contains the two pieces of the backend with real design
//! content:
//! - Credential/session lifecycle: password hashing, dual-token issuance,
//!   refresh, and caller resolution
//! - Deterministic battle resolution over fleet snapshots
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               dominion-domain                │
//! ├─────────────────────────────────────────────┤
//! │  auth/     - Password, tokens, sessions     │
//! │  battle.rs - Fleet comparison & reports     │
//! │  error.rs  - Domain error taxonomy          │
//! └─────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod battle;
pub mod error;

// Re-export commonly used types at the crate root
pub use auth::{AuthConfig, Principal, SessionManager, TokenPair};
pub use battle::{resolve_battle, BattleOutcome, FleetSnapshot};
pub use error::{DomainError, DomainResult};
