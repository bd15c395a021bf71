//! Storage error types.

use thiserror::Error;

/// Storage-specific errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// User not found (by id or username).
    #[error("user not found: {user}")]
    UserNotFound { user: String },

    /// Username already taken.
    #[error("username already taken: {username}")]
    DuplicateUsername { username: String },

    /// Email already in use.
    #[error("email already in use: {email}")]
    DuplicateEmail { email: String },

    /// Planet not found.
    #[error("planet not found: {planet_id}")]
    PlanetNotFound { planet_id: uuid::Uuid },

    /// Building not found (or not on a planet owned by the caller).
    #[error("building not found: {building_id}")]
    BuildingNotFound { building_id: uuid::Uuid },

    /// User building not found.
    #[error("user building not found: {user_building_id}")]
    UserBuildingNotFound { user_building_id: uuid::Uuid },

    /// Fleet not found.
    #[error("fleet not found: {fleet_id}")]
    FleetNotFound { fleet_id: uuid::Uuid },

    /// Database connection error.
    #[error("database connection error: {message}")]
    ConnectionError { message: String },

    /// Database query error.
    #[error("database query error: {message}")]
    QueryError { message: String },

    /// Query exceeded its timeout.
    #[error("query timeout in {operation} after {timeout:?}")]
    QueryTimeout {
        operation: String,
        timeout: std::time::Duration,
    },

    /// Serialization error (ships or resources payloads).
    #[error("serialization error: {message}")]
    SerializationError { message: String },
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
