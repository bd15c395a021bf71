//! dominion-server: Configuration and request handlers
//!
//! This crate contains the business logic layer including:
//! - Account registration handler
//! - Battle engagement handler
//! - Configuration management
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              dominion-server                │
//! ├─────────────────────────────────────────────┤
//! │  config.rs   - Configuration management     │
//! │  handlers/   - Request handlers             │
//! │    account.rs - Registration                │
//! │    battle.rs  - Fleet battles               │
//! └─────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod handlers;

// Re-exports for convenience
pub use config::{ConfigLoadError, ServerConfig};
