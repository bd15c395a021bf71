//! Battle engagement handler.
//!
//! Loads both fleets, enforces access checks in a fixed order, resolves
//! the battle through the pure domain resolver, and persists the outcome.
//! Check order is part of the contract: a caller probing someone else's
//! fleet id learns it exists before learning anything else, but never
//! learns anything about the defender without owning an attacker first.

use std::sync::Arc;

use chrono::Utc;
use dominion_domain::{resolve_battle, BattleOutcome, DomainError, FleetSnapshot};
use dominion_storage::{BattleRecord, DataStore, FleetRecord, StorageError};
use tracing::{debug, instrument};
use uuid::Uuid;

/// A battle engagement submission.
#[derive(Debug, Clone)]
pub struct EngageRequest {
    /// The authenticated user starting the battle.
    pub caller_id: Uuid,
    /// Fleet the caller attacks with. Must belong to the caller.
    pub attacker_fleet_id: Uuid,
    /// Fleet under attack.
    pub defender_fleet_id: Uuid,
}

/// Errors that can occur during battle engagement.
#[derive(Debug, thiserror::Error)]
pub enum EngageError {
    /// The attacker fleet id does not resolve to a fleet.
    #[error("Attacker fleet not found")]
    AttackerFleetNotFound,

    /// The attacker fleet belongs to someone other than the caller.
    #[error("You do not own the attacker fleet")]
    NotFleetOwner,

    /// The defender fleet id does not resolve to a fleet.
    #[error("Defender fleet not found")]
    DefenderFleetNotFound,

    /// Both fleets belong to the caller.
    #[error("Cannot attack your own fleet")]
    SelfBattle,

    /// Storage failure while loading fleets or persisting the outcome.
    #[error("storage error: {0}")]
    Storage(String),

    /// Resolver failure outside the self-battle rule.
    #[error("battle error: {0}")]
    Domain(String),
}

impl From<DomainError> for EngageError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::SelfBattleForbidden => EngageError::SelfBattle,
            other => EngageError::Domain(other.to_string()),
        }
    }
}

/// Result type for battle engagement.
pub type EngageResult<T> = Result<T, EngageError>;

fn snapshot(fleet: &FleetRecord) -> FleetSnapshot {
    FleetSnapshot {
        id: fleet.id,
        owner_id: fleet.user_id,
        ships: fleet.ships.clone(),
    }
}

/// Handler for fleet-versus-fleet battles.
pub struct BattleHandler<S: DataStore> {
    store: Arc<S>,
}

impl<S: DataStore> BattleHandler<S> {
    /// Creates a new battle handler.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Resolves a battle and records the outcome.
    #[instrument(skip(self, request), fields(caller_id = %request.caller_id))]
    pub async fn engage(&self, request: EngageRequest) -> EngageResult<BattleOutcome> {
        let attacker_fleet = match self.store.get_fleet(request.attacker_fleet_id).await {
            Ok(fleet) => fleet,
            Err(StorageError::FleetNotFound { .. }) => {
                return Err(EngageError::AttackerFleetNotFound)
            }
            Err(e) => return Err(EngageError::Storage(e.to_string())),
        };

        if attacker_fleet.user_id != request.caller_id {
            return Err(EngageError::NotFleetOwner);
        }

        let defender_fleet = match self.store.get_fleet(request.defender_fleet_id).await {
            Ok(fleet) => fleet,
            Err(StorageError::FleetNotFound { .. }) => {
                return Err(EngageError::DefenderFleetNotFound)
            }
            Err(e) => return Err(EngageError::Storage(e.to_string())),
        };

        if attacker_fleet.user_id == defender_fleet.user_id {
            return Err(EngageError::SelfBattle);
        }

        let outcome = resolve_battle(&snapshot(&attacker_fleet), &snapshot(&defender_fleet))?;

        self.store
            .record_battle(BattleRecord {
                id: outcome.battle_id,
                attacker_id: outcome.attacker_id,
                defender_id: outcome.defender_id,
                attacker_fleet_id: outcome.attacker_fleet_id,
                defender_fleet_id: outcome.defender_fleet_id,
                winner_id: outcome.winner_id,
                loser_id: outcome.loser_id,
                attacker_total_ships: outcome.attacker_total_ships as i64,
                defender_total_ships: outcome.defender_total_ships as i64,
                report: outcome.report.clone(),
                created_at: Utc::now(),
            })
            .await
            .map_err(|e| EngageError::Storage(e.to_string()))?;

        debug!(
            battle_id = %outcome.battle_id,
            winner_id = %outcome.winner_id,
            "Battle resolved"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dominion_storage::{MemoryDataStore, PlanetRecord};
    use std::collections::HashMap;

    async fn seed_fleet(store: &MemoryDataStore, owner: Uuid, count: u64) -> FleetRecord {
        let planet = store
            .create_planet(PlanetRecord {
                id: Uuid::new_v4(),
                name: "Vega III".to_string(),
                user_id: owner,
                resources: serde_json::json!({}),
                discovered_at: Utc::now(),
                claimed_at: Utc::now(),
            })
            .await
            .unwrap();

        store
            .create_fleet(FleetRecord {
                id: Uuid::new_v4(),
                user_id: owner,
                planet_id: planet.id,
                ships: HashMap::from([("fighter".to_string(), count)]),
                name: "Strike Group".to_string(),
            })
            .await
            .unwrap()
    }

    /// Test: A larger attacker fleet wins and the outcome is persisted
    #[tokio::test]
    async fn test_engage_attacker_wins() {
        let store = MemoryDataStore::new_shared();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let attacker = seed_fleet(&store, alice, 10).await;
        let defender = seed_fleet(&store, bob, 4).await;

        let handler = BattleHandler::new(Arc::clone(&store));
        let outcome = handler
            .engage(EngageRequest {
                caller_id: alice,
                attacker_fleet_id: attacker.id,
                defender_fleet_id: defender.id,
            })
            .await
            .unwrap();

        assert_eq!(outcome.winner_id, alice);
        assert_eq!(outcome.loser_id, bob);
        assert!(outcome.report.contains("Attacker wins"));
    }

    /// Test: Unknown attacker fleet id
    #[tokio::test]
    async fn test_engage_attacker_fleet_missing() {
        let store = MemoryDataStore::new_shared();
        let alice = Uuid::new_v4();
        let defender = seed_fleet(&store, Uuid::new_v4(), 4).await;

        let handler = BattleHandler::new(store);
        let err = handler
            .engage(EngageRequest {
                caller_id: alice,
                attacker_fleet_id: Uuid::new_v4(),
                defender_fleet_id: defender.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngageError::AttackerFleetNotFound));
    }

    /// Test: Borrowed fleets are rejected before the defender is even loaded
    #[tokio::test]
    async fn test_engage_foreign_attacker_fleet() {
        let store = MemoryDataStore::new_shared();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let bobs_fleet = seed_fleet(&store, bob, 10).await;

        let handler = BattleHandler::new(store);
        let err = handler
            .engage(EngageRequest {
                caller_id: alice,
                attacker_fleet_id: bobs_fleet.id,
                // Defender id is garbage; ownership must fail first.
                defender_fleet_id: Uuid::new_v4(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngageError::NotFleetOwner));
    }

    /// Test: Unknown defender fleet id
    #[tokio::test]
    async fn test_engage_defender_fleet_missing() {
        let store = MemoryDataStore::new_shared();
        let alice = Uuid::new_v4();
        let attacker = seed_fleet(&store, alice, 10).await;

        let handler = BattleHandler::new(store);
        let err = handler
            .engage(EngageRequest {
                caller_id: alice,
                attacker_fleet_id: attacker.id,
                defender_fleet_id: Uuid::new_v4(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngageError::DefenderFleetNotFound));
    }

    /// Test: Attacking your own fleet is rejected
    #[tokio::test]
    async fn test_engage_self_battle() {
        let store = MemoryDataStore::new_shared();
        let alice = Uuid::new_v4();
        let first = seed_fleet(&store, alice, 10).await;
        let second = seed_fleet(&store, alice, 4).await;

        let handler = BattleHandler::new(store);
        let err = handler
            .engage(EngageRequest {
                caller_id: alice,
                attacker_fleet_id: first.id,
                defender_fleet_id: second.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngageError::SelfBattle));
        assert_eq!(err.to_string(), "Cannot attack your own fleet");
    }

    /// Test: Ties go to the defender
    #[tokio::test]
    async fn test_engage_tie_defender_wins() {
        let store = MemoryDataStore::new_shared();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let attacker = seed_fleet(&store, alice, 6).await;
        let defender = seed_fleet(&store, bob, 6).await;

        let handler = BattleHandler::new(store);
        let outcome = handler
            .engage(EngageRequest {
                caller_id: alice,
                attacker_fleet_id: attacker.id,
                defender_fleet_id: defender.id,
            })
            .await
            .unwrap();

        assert_eq!(outcome.winner_id, bob);
        assert!(outcome.report.contains("Tie - Defender wins by default"));
    }
}
