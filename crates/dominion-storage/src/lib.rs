//! dominion-storage: Storage abstraction layer
//!
//! This crate provides the storage abstraction for the Dominion game
//! server, including:
//! - DataStore trait for game data operations
//! - In-memory implementation for testing
//! - PostgreSQL implementation for production
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              dominion-storage               │
//! ├─────────────────────────────────────────────┤
//! │  traits.rs   - DataStore trait definition   │
//! │  memory.rs   - In-memory implementation     │
//! │  postgres.rs - PostgreSQL implementation    │
//! └─────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod memory;
pub mod postgres;
pub mod traits;

// Re-export commonly used types
pub use error::{StorageError, StorageResult};
pub use memory::MemoryDataStore;
pub use postgres::{PostgresConfig, PostgresDataStore};
pub use traits::{
    BattleRecord, BuildingRecord, DataStore, FleetRecord, PlanetRecord, UserBuildingRecord,
    UserRecord,
};
