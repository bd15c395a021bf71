//! In-memory storage implementation for testing.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};
use crate::traits::{
    BattleRecord, BuildingRecord, DataStore, FleetRecord, PlanetRecord, UserBuildingRecord,
    UserRecord,
};

/// In-memory implementation of DataStore.
///
/// Uses DashMap for thread-safe concurrent access without a global lock.
/// Username and email uniqueness is enforced through secondary index maps
/// kept in step with the primary user map.
#[derive(Debug, Default)]
pub struct MemoryDataStore {
    users: DashMap<Uuid, UserRecord>,
    /// Secondary index: username -> user id.
    usernames: DashMap<String, Uuid>,
    /// Secondary index: email -> user id.
    emails: DashMap<String, Uuid>,
    planets: DashMap<Uuid, PlanetRecord>,
    buildings: DashMap<Uuid, BuildingRecord>,
    user_buildings: DashMap<Uuid, UserBuildingRecord>,
    fleets: DashMap<Uuid, FleetRecord>,
    battles: DashMap<Uuid, BattleRecord>,
}

impl MemoryDataStore {
    /// Creates a new in-memory data store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory data store wrapped in Arc.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn building_owned_planets(&self, owner_id: Uuid) -> Vec<Uuid> {
        self.planets
            .iter()
            .filter(|p| p.value().user_id == owner_id)
            .map(|p| *p.key())
            .collect()
    }
}

#[async_trait]
impl DataStore for MemoryDataStore {
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> StorageResult<UserRecord> {
        use dashmap::mapref::entry::Entry;

        // Index insertion order is usernames then emails everywhere, so two
        // concurrent creates cannot deadlock across the two maps.
        match self.usernames.entry(username.to_string()) {
            Entry::Occupied(_) => Err(StorageError::DuplicateUsername {
                username: username.to_string(),
            }),
            Entry::Vacant(username_slot) => match self.emails.entry(email.to_string()) {
                Entry::Occupied(_) => Err(StorageError::DuplicateEmail {
                    email: email.to_string(),
                }),
                Entry::Vacant(email_slot) => {
                    let user = UserRecord {
                        id: Uuid::new_v4(),
                        username: username.to_string(),
                        email: email.to_string(),
                        password_hash: password_hash.to_string(),
                        is_admin,
                    };
                    username_slot.insert(user.id);
                    email_slot.insert(user.id);
                    self.users.insert(user.id, user.clone());
                    Ok(user)
                }
            },
        }
    }

    async fn get_user(&self, id: Uuid) -> StorageResult<UserRecord> {
        self.users
            .get(&id)
            .map(|u| u.value().clone())
            .ok_or_else(|| StorageError::UserNotFound {
                user: id.to_string(),
            })
    }

    async fn get_user_by_username(&self, username: &str) -> StorageResult<UserRecord> {
        let id = self
            .usernames
            .get(username)
            .map(|entry| *entry.value())
            .ok_or_else(|| StorageError::UserNotFound {
                user: username.to_string(),
            })?;
        self.get_user(id).await
    }

    async fn list_users(&self) -> StorageResult<Vec<UserRecord>> {
        Ok(self.users.iter().map(|u| u.value().clone()).collect())
    }

    async fn update_user(
        &self,
        id: Uuid,
        username: &str,
        email: &str,
        is_admin: bool,
    ) -> StorageResult<()> {
        if let Some(other) = self.usernames.get(username) {
            if *other.value() != id {
                return Err(StorageError::DuplicateUsername {
                    username: username.to_string(),
                });
            }
        }
        if let Some(other) = self.emails.get(email) {
            if *other.value() != id {
                return Err(StorageError::DuplicateEmail {
                    email: email.to_string(),
                });
            }
        }

        let mut user = self
            .users
            .get_mut(&id)
            .ok_or_else(|| StorageError::UserNotFound {
                user: id.to_string(),
            })?;

        self.usernames.remove(&user.username);
        self.emails.remove(&user.email);
        user.username = username.to_string();
        user.email = email.to_string();
        user.is_admin = is_admin;
        self.usernames.insert(username.to_string(), id);
        self.emails.insert(email.to_string(), id);

        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> StorageResult<()> {
        let (_, user) = self
            .users
            .remove(&id)
            .ok_or_else(|| StorageError::UserNotFound {
                user: id.to_string(),
            })?;
        self.usernames.remove(&user.username);
        self.emails.remove(&user.email);

        // Cascade, mirroring the foreign keys of the postgres backend.
        let owned_planets = self.building_owned_planets(id);
        self.buildings
            .retain(|_, b| !owned_planets.contains(&b.planet_id));
        for planet_id in owned_planets {
            self.planets.remove(&planet_id);
        }
        self.user_buildings.retain(|_, ub| ub.user_id != id);
        self.fleets.retain(|_, f| f.user_id != id);

        Ok(())
    }

    async fn create_planet(&self, planet: PlanetRecord) -> StorageResult<PlanetRecord> {
        self.planets.insert(planet.id, planet.clone());
        Ok(planet)
    }

    async fn get_planet(&self, id: Uuid) -> StorageResult<PlanetRecord> {
        self.planets
            .get(&id)
            .map(|p| p.value().clone())
            .ok_or(StorageError::PlanetNotFound { planet_id: id })
    }

    async fn list_planets_by_owner(&self, user_id: Uuid) -> StorageResult<Vec<PlanetRecord>> {
        Ok(self
            .planets
            .iter()
            .filter(|p| p.value().user_id == user_id)
            .map(|p| p.value().clone())
            .collect())
    }

    async fn update_planet(
        &self,
        id: Uuid,
        name: &str,
        resources: serde_json::Value,
        discovered_at: chrono::DateTime<chrono::Utc>,
        claimed_at: chrono::DateTime<chrono::Utc>,
    ) -> StorageResult<()> {
        let mut planet = self
            .planets
            .get_mut(&id)
            .ok_or(StorageError::PlanetNotFound { planet_id: id })?;
        planet.name = name.to_string();
        planet.resources = resources;
        planet.discovered_at = discovered_at;
        planet.claimed_at = claimed_at;
        Ok(())
    }

    async fn delete_planet(&self, id: Uuid) -> StorageResult<()> {
        if self.planets.remove(&id).is_none() {
            return Err(StorageError::PlanetNotFound { planet_id: id });
        }
        self.buildings.retain(|_, b| b.planet_id != id);
        Ok(())
    }

    async fn claim_planet(&self, id: Uuid, new_owner: Uuid) -> StorageResult<()> {
        let mut planet = self
            .planets
            .get_mut(&id)
            .ok_or(StorageError::PlanetNotFound { planet_id: id })?;
        planet.user_id = new_owner;
        planet.claimed_at = chrono::Utc::now();
        Ok(())
    }

    async fn planet_owned_by(&self, planet_id: Uuid, user_id: Uuid) -> StorageResult<bool> {
        Ok(self
            .planets
            .get(&planet_id)
            .map(|p| p.value().user_id == user_id)
            .unwrap_or(false))
    }

    async fn create_building(&self, mut building: BuildingRecord) -> StorageResult<BuildingRecord> {
        let max_level = self
            .buildings
            .iter()
            .filter(|b| b.value().planet_id == building.planet_id)
            .map(|b| b.value().level)
            .max();
        building.level = max_level.map_or(1, |level| level + 1);

        self.buildings.insert(building.id, building.clone());
        Ok(building)
    }

    async fn get_building_for_owner(
        &self,
        building_id: Uuid,
        owner_id: Uuid,
    ) -> StorageResult<BuildingRecord> {
        let building = self
            .buildings
            .get(&building_id)
            .map(|b| b.value().clone())
            .ok_or(StorageError::BuildingNotFound { building_id })?;

        if !self.planet_owned_by(building.planet_id, owner_id).await? {
            return Err(StorageError::BuildingNotFound { building_id });
        }
        Ok(building)
    }

    async fn list_buildings_for_owner(
        &self,
        owner_id: Uuid,
    ) -> StorageResult<Vec<BuildingRecord>> {
        let owned_planets = self.building_owned_planets(owner_id);
        Ok(self
            .buildings
            .iter()
            .filter(|b| owned_planets.contains(&b.value().planet_id))
            .map(|b| b.value().clone())
            .collect())
    }

    async fn upgrade_building(&self, building_id: Uuid, owner_id: Uuid) -> StorageResult<i32> {
        // Ownership check first; holds no lock on the buildings map.
        self.get_building_for_owner(building_id, owner_id).await?;

        let mut building = self
            .buildings
            .get_mut(&building_id)
            .ok_or(StorageError::BuildingNotFound { building_id })?;
        building.level += 1;
        Ok(building.level)
    }

    async fn delete_building(&self, building_id: Uuid, owner_id: Uuid) -> StorageResult<()> {
        self.get_building_for_owner(building_id, owner_id).await?;
        self.buildings.remove(&building_id);
        Ok(())
    }

    async fn create_user_building(
        &self,
        user_building: UserBuildingRecord,
    ) -> StorageResult<UserBuildingRecord> {
        self.user_buildings
            .insert(user_building.id, user_building.clone());
        Ok(user_building)
    }

    async fn get_user_building(&self, id: Uuid) -> StorageResult<UserBuildingRecord> {
        self.user_buildings
            .get(&id)
            .map(|ub| ub.value().clone())
            .ok_or(StorageError::UserBuildingNotFound {
                user_building_id: id,
            })
    }

    async fn list_user_buildings(&self, user_id: Uuid) -> StorageResult<Vec<UserBuildingRecord>> {
        Ok(self
            .user_buildings
            .iter()
            .filter(|ub| ub.value().user_id == user_id)
            .map(|ub| ub.value().clone())
            .collect())
    }

    async fn update_user_building(&self, id: Uuid, name: &str, level: i32) -> StorageResult<()> {
        let mut user_building =
            self.user_buildings
                .get_mut(&id)
                .ok_or(StorageError::UserBuildingNotFound {
                    user_building_id: id,
                })?;
        user_building.name = name.to_string();
        user_building.level = level;
        Ok(())
    }

    async fn delete_user_building(&self, id: Uuid) -> StorageResult<()> {
        self.user_buildings
            .remove(&id)
            .map(|_| ())
            .ok_or(StorageError::UserBuildingNotFound {
                user_building_id: id,
            })
    }

    async fn create_fleet(&self, fleet: FleetRecord) -> StorageResult<FleetRecord> {
        self.fleets.insert(fleet.id, fleet.clone());
        Ok(fleet)
    }

    async fn get_fleet(&self, id: Uuid) -> StorageResult<FleetRecord> {
        self.fleets
            .get(&id)
            .map(|f| f.value().clone())
            .ok_or(StorageError::FleetNotFound { fleet_id: id })
    }

    async fn list_fleets(&self, user_id: Uuid) -> StorageResult<Vec<FleetRecord>> {
        Ok(self
            .fleets
            .iter()
            .filter(|f| f.value().user_id == user_id)
            .map(|f| f.value().clone())
            .collect())
    }

    async fn update_fleet(
        &self,
        id: Uuid,
        planet_id: Uuid,
        ships: HashMap<String, u64>,
        name: &str,
    ) -> StorageResult<()> {
        let mut fleet = self
            .fleets
            .get_mut(&id)
            .ok_or(StorageError::FleetNotFound { fleet_id: id })?;
        fleet.planet_id = planet_id;
        fleet.ships = ships;
        fleet.name = name.to_string();
        Ok(())
    }

    async fn delete_fleet(&self, id: Uuid) -> StorageResult<()> {
        self.fleets
            .remove(&id)
            .map(|_| ())
            .ok_or(StorageError::FleetNotFound { fleet_id: id })
    }

    async fn record_battle(&self, battle: BattleRecord) -> StorageResult<()> {
        self.battles.insert(battle.id, battle);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planet(owner: Uuid) -> PlanetRecord {
        PlanetRecord {
            id: Uuid::new_v4(),
            name: "Kepler-22b".to_string(),
            user_id: owner,
            resources: serde_json::json!({"metal": 100, "crystal": 50}),
            discovered_at: chrono::Utc::now(),
            claimed_at: chrono::Utc::now(),
        }
    }

    fn fleet(owner: Uuid, planet_id: Uuid, count: u64) -> FleetRecord {
        FleetRecord {
            id: Uuid::new_v4(),
            user_id: owner,
            planet_id,
            ships: HashMap::from([("fighter".to_string(), count)]),
            name: "First Fleet".to_string(),
        }
    }

    /// Test: Create and fetch a user by id and username
    #[tokio::test]
    async fn test_create_and_get_user() {
        let store = MemoryDataStore::new();

        let created = store
            .create_user("alice", "alice@example.com", "hash", false)
            .await
            .unwrap();

        let by_id = store.get_user(created.id).await.unwrap();
        assert_eq!(by_id, created);

        let by_username = store.get_user_by_username("alice").await.unwrap();
        assert_eq!(by_username.id, created.id);
    }

    /// Test: Username collisions are rejected
    #[tokio::test]
    async fn test_create_user_duplicate_username() {
        let store = MemoryDataStore::new();
        store
            .create_user("alice", "alice@example.com", "hash", false)
            .await
            .unwrap();

        let result = store
            .create_user("alice", "other@example.com", "hash", false)
            .await;
        assert!(matches!(
            result,
            Err(StorageError::DuplicateUsername { .. })
        ));
    }

    /// Test: Email collisions are rejected and leave no index debris
    #[tokio::test]
    async fn test_create_user_duplicate_email() {
        let store = MemoryDataStore::new();
        store
            .create_user("alice", "alice@example.com", "hash", false)
            .await
            .unwrap();

        let result = store
            .create_user("bob", "alice@example.com", "hash", false)
            .await;
        assert!(matches!(result, Err(StorageError::DuplicateEmail { .. })));

        // The failed create must not have reserved the username.
        store
            .create_user("bob", "bob@example.com", "hash", false)
            .await
            .unwrap();
    }

    /// Test: Updating a user rewrites the uniqueness indexes
    #[tokio::test]
    async fn test_update_user_moves_indexes() {
        let store = MemoryDataStore::new();
        let user = store
            .create_user("alice", "alice@example.com", "hash", false)
            .await
            .unwrap();

        store
            .update_user(user.id, "alicia", "alicia@example.com", true)
            .await
            .unwrap();

        assert!(matches!(
            store.get_user_by_username("alice").await,
            Err(StorageError::UserNotFound { .. })
        ));
        let updated = store.get_user_by_username("alicia").await.unwrap();
        assert!(updated.is_admin);

        // The old username is free again.
        store
            .create_user("alice", "new-alice@example.com", "hash", false)
            .await
            .unwrap();
    }

    /// Test: Updating a user to another user's username is rejected
    #[tokio::test]
    async fn test_update_user_rejects_taken_username() {
        let store = MemoryDataStore::new();
        store
            .create_user("alice", "alice@example.com", "hash", false)
            .await
            .unwrap();
        let bob = store
            .create_user("bob", "bob@example.com", "hash", false)
            .await
            .unwrap();

        let result = store
            .update_user(bob.id, "alice", "bob@example.com", false)
            .await;
        assert!(matches!(
            result,
            Err(StorageError::DuplicateUsername { .. })
        ));
    }

    /// Test: Deleting a user cascades to everything they own
    #[tokio::test]
    async fn test_delete_user_cascades() {
        let store = MemoryDataStore::new();
        let user = store
            .create_user("alice", "alice@example.com", "hash", false)
            .await
            .unwrap();

        let p = store.create_planet(planet(user.id)).await.unwrap();
        store
            .create_building(BuildingRecord {
                id: Uuid::new_v4(),
                name: "Shipyard".to_string(),
                kind: "military".to_string(),
                planet_id: p.id,
                level: 0,
            })
            .await
            .unwrap();
        let f = store.create_fleet(fleet(user.id, p.id, 5)).await.unwrap();

        store.delete_user(user.id).await.unwrap();

        assert!(matches!(
            store.get_planet(p.id).await,
            Err(StorageError::PlanetNotFound { .. })
        ));
        assert!(matches!(
            store.get_fleet(f.id).await,
            Err(StorageError::FleetNotFound { .. })
        ));
        assert!(store.list_buildings_for_owner(user.id).await.unwrap().is_empty());

        // Username and email are free again.
        store
            .create_user("alice", "alice@example.com", "hash", false)
            .await
            .unwrap();
    }

    /// Test: Planet listing is scoped to the owner
    #[tokio::test]
    async fn test_list_planets_by_owner() {
        let store = MemoryDataStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        store.create_planet(planet(alice)).await.unwrap();
        store.create_planet(planet(alice)).await.unwrap();
        store.create_planet(planet(bob)).await.unwrap();

        assert_eq!(store.list_planets_by_owner(alice).await.unwrap().len(), 2);
        assert_eq!(store.list_planets_by_owner(bob).await.unwrap().len(), 1);
    }

    /// Test: Claiming a planet transfers ownership and stamps the time
    #[tokio::test]
    async fn test_claim_planet_transfers_ownership() {
        let store = MemoryDataStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let p = store.create_planet(planet(alice)).await.unwrap();
        let before = p.claimed_at;

        store.claim_planet(p.id, bob).await.unwrap();

        let claimed = store.get_planet(p.id).await.unwrap();
        assert_eq!(claimed.user_id, bob);
        assert!(claimed.claimed_at >= before);
        assert!(store.planet_owned_by(p.id, bob).await.unwrap());
        assert!(!store.planet_owned_by(p.id, alice).await.unwrap());
    }

    /// Test: Building levels auto-increment per planet
    #[tokio::test]
    async fn test_building_level_assignment() {
        let store = MemoryDataStore::new();
        let owner = Uuid::new_v4();
        let p = store.create_planet(planet(owner)).await.unwrap();

        let make = |name: &str| BuildingRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            kind: "economy".to_string(),
            planet_id: p.id,
            level: 0,
        };

        let first = store.create_building(make("Mine")).await.unwrap();
        let second = store.create_building(make("Refinery")).await.unwrap();

        assert_eq!(first.level, 1);
        assert_eq!(second.level, 2);

        // A different planet starts over at level 1.
        let other = store.create_planet(planet(owner)).await.unwrap();
        let elsewhere = store
            .create_building(BuildingRecord {
                id: Uuid::new_v4(),
                name: "Mine".to_string(),
                kind: "economy".to_string(),
                planet_id: other.id,
                level: 0,
            })
            .await
            .unwrap();
        assert_eq!(elsewhere.level, 1);
    }

    /// Test: Building access is scoped through planet ownership
    #[tokio::test]
    async fn test_building_owner_scoping() {
        let store = MemoryDataStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let p = store.create_planet(planet(alice)).await.unwrap();

        let building = store
            .create_building(BuildingRecord {
                id: Uuid::new_v4(),
                name: "Shipyard".to_string(),
                kind: "military".to_string(),
                planet_id: p.id,
                level: 0,
            })
            .await
            .unwrap();

        assert!(store
            .get_building_for_owner(building.id, alice)
            .await
            .is_ok());
        // A foreign owner sees the same error as a missing building.
        assert!(matches!(
            store.get_building_for_owner(building.id, bob).await,
            Err(StorageError::BuildingNotFound { .. })
        ));
    }

    /// Test: Upgrading a building increments its level by one
    #[tokio::test]
    async fn test_upgrade_building() {
        let store = MemoryDataStore::new();
        let owner = Uuid::new_v4();
        let p = store.create_planet(planet(owner)).await.unwrap();
        let building = store
            .create_building(BuildingRecord {
                id: Uuid::new_v4(),
                name: "Mine".to_string(),
                kind: "economy".to_string(),
                planet_id: p.id,
                level: 0,
            })
            .await
            .unwrap();

        let new_level = store.upgrade_building(building.id, owner).await.unwrap();
        assert_eq!(new_level, building.level + 1);
    }

    /// Test: Fleet CRUD round trip
    #[tokio::test]
    async fn test_fleet_roundtrip() {
        let store = MemoryDataStore::new();
        let owner = Uuid::new_v4();
        let p = store.create_planet(planet(owner)).await.unwrap();

        let created = store.create_fleet(fleet(owner, p.id, 7)).await.unwrap();
        let fetched = store.get_fleet(created.id).await.unwrap();
        assert_eq!(fetched.ships["fighter"], 7);

        store
            .update_fleet(
                created.id,
                p.id,
                HashMap::from([("bomber".to_string(), 3)]),
                "Second Fleet",
            )
            .await
            .unwrap();
        let updated = store.get_fleet(created.id).await.unwrap();
        assert_eq!(updated.name, "Second Fleet");
        assert_eq!(updated.ships["bomber"], 3);

        store.delete_fleet(created.id).await.unwrap();
        assert!(matches!(
            store.get_fleet(created.id).await,
            Err(StorageError::FleetNotFound { .. })
        ));
    }

    /// Test: User building update and delete enforce existence
    #[tokio::test]
    async fn test_user_building_missing() {
        let store = MemoryDataStore::new();
        assert!(matches!(
            store.update_user_building(Uuid::new_v4(), "Hut", 2).await,
            Err(StorageError::UserBuildingNotFound { .. })
        ));
        assert!(matches!(
            store.delete_user_building(Uuid::new_v4()).await,
            Err(StorageError::UserBuildingNotFound { .. })
        ));
    }

    /// Test: Battle records persist
    #[tokio::test]
    async fn test_record_battle() {
        let store = MemoryDataStore::new();
        let battle = BattleRecord {
            id: Uuid::new_v4(),
            attacker_id: Uuid::new_v4(),
            defender_id: Uuid::new_v4(),
            attacker_fleet_id: Uuid::new_v4(),
            defender_fleet_id: Uuid::new_v4(),
            winner_id: Uuid::new_v4(),
            loser_id: Uuid::new_v4(),
            attacker_total_ships: 10,
            defender_total_ships: 5,
            report: "Battle ID: x\nAttacker wins!".to_string(),
            created_at: chrono::Utc::now(),
        };

        store.record_battle(battle.clone()).await.unwrap();
        assert_eq!(store.battles.get(&battle.id).unwrap().report, battle.report);
    }
}
