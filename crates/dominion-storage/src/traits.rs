//! DataStore trait definition.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StorageResult;

/// A stored user account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
}

/// A stored planet.
///
/// `resources` is carried opaquely; the resource economy is not modeled
/// here.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanetRecord {
    pub id: Uuid,
    pub name: String,
    pub user_id: Uuid,
    pub resources: serde_json::Value,
    pub discovered_at: DateTime<Utc>,
    pub claimed_at: DateTime<Utc>,
}

/// A stored planetary building.
///
/// Buildings belong to planets; ownership is derived through the planet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildingRecord {
    pub id: Uuid,
    pub name: String,
    pub kind: String,
    pub planet_id: Uuid,
    pub level: i32,
}

/// A stored user-owned structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserBuildingRecord {
    pub id: Uuid,
    pub name: String,
    pub planet_id: Uuid,
    pub level: i32,
    pub user_id: Uuid,
}

/// A stored fleet: ship-type counts stationed at a planet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FleetRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub planet_id: Uuid,
    pub ships: HashMap<String, u64>,
    pub name: String,
}

/// A persisted battle outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BattleRecord {
    pub id: Uuid,
    pub attacker_id: Uuid,
    pub defender_id: Uuid,
    pub attacker_fleet_id: Uuid,
    pub defender_fleet_id: Uuid,
    pub winner_id: Uuid,
    pub loser_id: Uuid,
    pub attacker_total_ships: i64,
    pub defender_total_ships: i64,
    pub report: String,
    pub created_at: DateTime<Utc>,
}

/// Abstract storage interface for game data.
///
/// Implementations must be thread-safe (Send + Sync) and support
/// async operations. Lookup misses are `Err(*NotFound)`; `Ok` always
/// carries data.
#[async_trait]
pub trait DataStore: Send + Sync + 'static {
    // User operations

    /// Creates a user. The id is assigned by the store. Fails with
    /// `DuplicateUsername` / `DuplicateEmail` on collisions.
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> StorageResult<UserRecord>;

    /// Gets a user by id.
    async fn get_user(&self, id: Uuid) -> StorageResult<UserRecord>;

    /// Gets a user by username.
    async fn get_user_by_username(&self, username: &str) -> StorageResult<UserRecord>;

    /// Lists all users.
    async fn list_users(&self) -> StorageResult<Vec<UserRecord>>;

    /// Updates a user's profile fields.
    async fn update_user(
        &self,
        id: Uuid,
        username: &str,
        email: &str,
        is_admin: bool,
    ) -> StorageResult<()>;

    /// Deletes a user and everything they own (planets, buildings on
    /// those planets, user buildings, fleets).
    async fn delete_user(&self, id: Uuid) -> StorageResult<()>;

    // Planet operations

    /// Creates a planet. The caller supplies the id.
    async fn create_planet(&self, planet: PlanetRecord) -> StorageResult<PlanetRecord>;

    /// Gets a planet by id.
    async fn get_planet(&self, id: Uuid) -> StorageResult<PlanetRecord>;

    /// Lists planets owned by a user.
    async fn list_planets_by_owner(&self, user_id: Uuid) -> StorageResult<Vec<PlanetRecord>>;

    /// Updates a planet's mutable fields. Ownership checks are the
    /// caller's responsibility.
    async fn update_planet(
        &self,
        id: Uuid,
        name: &str,
        resources: serde_json::Value,
        discovered_at: DateTime<Utc>,
        claimed_at: DateTime<Utc>,
    ) -> StorageResult<()>;

    /// Deletes a planet.
    async fn delete_planet(&self, id: Uuid) -> StorageResult<()>;

    /// Transfers a planet to a new owner, stamping the claim time.
    async fn claim_planet(&self, id: Uuid, new_owner: Uuid) -> StorageResult<()>;

    /// Whether the planet exists and is owned by the given user.
    async fn planet_owned_by(&self, planet_id: Uuid, user_id: Uuid) -> StorageResult<bool>;

    // Building operations (scoped through planet ownership)

    /// Creates a building. The level in the passed record is ignored;
    /// the store assigns one above the highest existing level on the
    /// planet, starting at 1.
    async fn create_building(&self, building: BuildingRecord) -> StorageResult<BuildingRecord>;

    /// Gets a building that sits on a planet owned by `owner_id`.
    /// Absent and foreign-owned buildings are both `BuildingNotFound`.
    async fn get_building_for_owner(
        &self,
        building_id: Uuid,
        owner_id: Uuid,
    ) -> StorageResult<BuildingRecord>;

    /// Lists buildings across all planets owned by a user.
    async fn list_buildings_for_owner(&self, owner_id: Uuid)
        -> StorageResult<Vec<BuildingRecord>>;

    /// Increments a building's level by one, returning the new level.
    /// Scoped through planet ownership like `get_building_for_owner`.
    async fn upgrade_building(&self, building_id: Uuid, owner_id: Uuid) -> StorageResult<i32>;

    /// Deletes a building, scoped through planet ownership.
    async fn delete_building(&self, building_id: Uuid, owner_id: Uuid) -> StorageResult<()>;

    // User building operations

    /// Creates a user building. The caller supplies the id and has
    /// already validated planet ownership.
    async fn create_user_building(
        &self,
        user_building: UserBuildingRecord,
    ) -> StorageResult<UserBuildingRecord>;

    /// Gets a user building by id, regardless of owner.
    async fn get_user_building(&self, id: Uuid) -> StorageResult<UserBuildingRecord>;

    /// Lists a user's buildings.
    async fn list_user_buildings(&self, user_id: Uuid) -> StorageResult<Vec<UserBuildingRecord>>;

    /// Updates a user building's name and level.
    async fn update_user_building(&self, id: Uuid, name: &str, level: i32) -> StorageResult<()>;

    /// Deletes a user building.
    async fn delete_user_building(&self, id: Uuid) -> StorageResult<()>;

    // Fleet operations

    /// Creates a fleet. The caller supplies the id and has already
    /// validated planet ownership.
    async fn create_fleet(&self, fleet: FleetRecord) -> StorageResult<FleetRecord>;

    /// Gets a fleet by id, regardless of owner.
    async fn get_fleet(&self, id: Uuid) -> StorageResult<FleetRecord>;

    /// Lists a user's fleets.
    async fn list_fleets(&self, user_id: Uuid) -> StorageResult<Vec<FleetRecord>>;

    /// Updates a fleet's station, ships, and name.
    async fn update_fleet(
        &self,
        id: Uuid,
        planet_id: Uuid,
        ships: HashMap<String, u64>,
        name: &str,
    ) -> StorageResult<()>;

    /// Deletes a fleet.
    async fn delete_fleet(&self, id: Uuid) -> StorageResult<()>;

    // Battle operations

    /// Persists a resolved battle outcome.
    async fn record_battle(&self, battle: BattleRecord) -> StorageResult<()>;
}
