//! Deterministic battle resolution.
//!
//! A battle is a pure aggregate-strength comparison: ship-type identity is
//! irrelevant, only the summed counts matter. The attacker must prove
//! superiority; equal totals go to the defender.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};

/// A fleet as seen at battle time: an owner plus ship-type counts.
///
/// Supplied by the caller as a consistent snapshot per invocation; the
/// resolver never re-reads it.
#[derive(Debug, Clone)]
pub struct FleetSnapshot {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub ships: HashMap<String, u64>,
}

impl FleetSnapshot {
    /// Total strength: the sum of all ship counts. An empty fleet has
    /// total 0 and is a legal participant.
    pub fn total_ships(&self) -> u64 {
        self.ships.values().sum()
    }
}

/// Immutable record of one resolved fleet-vs-fleet comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleOutcome {
    pub battle_id: Uuid,
    pub attacker_id: Uuid,
    pub defender_id: Uuid,
    pub attacker_fleet_id: Uuid,
    pub defender_fleet_id: Uuid,
    pub winner_id: Uuid,
    pub loser_id: Uuid,
    pub attacker_total_ships: u64,
    pub defender_total_ships: u64,
    pub report: String,
}

enum Verdict {
    AttackerWins,
    DefenderWins,
    TieDefenderWins,
}

impl Verdict {
    fn label(&self) -> &'static str {
        match self {
            Verdict::AttackerWins => "Attacker wins",
            Verdict::DefenderWins => "Defender wins",
            Verdict::TieDefenderWins => "Tie - Defender wins by default",
        }
    }
}

/// Resolves a battle between two fleet snapshots.
///
/// Ownership of the attacker fleet by the caller and existence of both
/// fleets are the caller's preconditions; the snapshots arrive already
/// validated. The one constraint enforced here is that a fleet cannot
/// battle another fleet of the same owner.
///
/// Winner determination, in order: strictly more attacker ships means the
/// attacker wins, strictly more defender ships means the defender wins,
/// and a tie goes to the defender.
///
/// No side effects: persistence of the outcome is the caller's job.
pub fn resolve_battle(
    attacker: &FleetSnapshot,
    defender: &FleetSnapshot,
) -> DomainResult<BattleOutcome> {
    if attacker.owner_id == defender.owner_id {
        return Err(DomainError::SelfBattleForbidden);
    }

    let attacker_total = attacker.total_ships();
    let defender_total = defender.total_ships();

    let verdict = if attacker_total > defender_total {
        Verdict::AttackerWins
    } else if defender_total > attacker_total {
        Verdict::DefenderWins
    } else {
        Verdict::TieDefenderWins
    };

    let (winner_id, loser_id) = match verdict {
        Verdict::AttackerWins => (attacker.owner_id, defender.owner_id),
        Verdict::DefenderWins | Verdict::TieDefenderWins => {
            (defender.owner_id, attacker.owner_id)
        }
    };

    let battle_id = Uuid::new_v4();
    let report = format!(
        "Battle ID: {battle_id}\n{}!\nAttacker ships: {attacker_total}\nDefender ships: {defender_total}",
        verdict.label()
    );

    Ok(BattleOutcome {
        battle_id,
        attacker_id: attacker.owner_id,
        defender_id: defender.owner_id,
        attacker_fleet_id: attacker.id,
        defender_fleet_id: defender.id,
        winner_id,
        loser_id,
        attacker_total_ships: attacker_total,
        defender_total_ships: defender_total,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fleet(owner_id: Uuid, ships: &[(&str, u64)]) -> FleetSnapshot {
        FleetSnapshot {
            id: Uuid::new_v4(),
            owner_id,
            ships: ships
                .iter()
                .map(|(kind, count)| (kind.to_string(), *count))
                .collect(),
        }
    }

    /// Test: Strictly larger attacker fleet wins
    #[test]
    fn test_attacker_wins_with_more_ships() {
        let attacker_owner = Uuid::new_v4();
        let defender_owner = Uuid::new_v4();
        let attacker = fleet(attacker_owner, &[("fighter", 10)]);
        let defender = fleet(defender_owner, &[("fighter", 5)]);

        let outcome = resolve_battle(&attacker, &defender).unwrap();

        assert_eq!(outcome.winner_id, attacker_owner);
        assert_eq!(outcome.loser_id, defender_owner);
        assert_eq!(outcome.attacker_total_ships, 10);
        assert_eq!(outcome.defender_total_ships, 5);
        assert!(outcome.report.contains("Attacker wins"));
    }

    /// Test: Ship-type identity is irrelevant, only totals matter
    #[test]
    fn test_mixed_fleet_totals() {
        let attacker = fleet(Uuid::new_v4(), &[("fighter", 3), ("bomber", 4)]);
        let defender = fleet(Uuid::new_v4(), &[("cruiser", 8)]);

        let outcome = resolve_battle(&attacker, &defender).unwrap();

        assert_eq!(outcome.attacker_total_ships, 7);
        assert_eq!(outcome.defender_total_ships, 8);
        assert_eq!(outcome.winner_id, defender.owner_id);
        assert!(outcome.report.contains("Defender wins"));
    }

    /// Test: A tie always goes to the defender, never the attacker
    #[test]
    fn test_tie_goes_to_defender() {
        let attacker_owner = Uuid::new_v4();
        let defender_owner = Uuid::new_v4();
        let attacker = fleet(attacker_owner, &[("fighter", 5)]);
        let defender = fleet(defender_owner, &[("bomber", 5)]);

        let outcome = resolve_battle(&attacker, &defender).unwrap();

        assert_eq!(outcome.winner_id, defender_owner);
        assert_ne!(outcome.winner_id, attacker_owner);
        assert!(outcome.report.contains("Tie - Defender wins by default"));
    }

    /// Test: Same owner on both sides is rejected regardless of fleets
    #[test]
    fn test_self_battle_forbidden() {
        let owner = Uuid::new_v4();
        let attacker = fleet(owner, &[("fighter", 100)]);
        let defender = fleet(owner, &[("fighter", 1)]);

        assert!(matches!(
            resolve_battle(&attacker, &defender),
            Err(DomainError::SelfBattleForbidden)
        ));
    }

    /// Test: Empty fleets are legal participants
    #[test]
    fn test_empty_fleets_are_legal() {
        let attacker = fleet(Uuid::new_v4(), &[]);
        let defender = fleet(Uuid::new_v4(), &[("fighter", 1)]);
        let outcome = resolve_battle(&attacker, &defender).unwrap();
        assert_eq!(outcome.attacker_total_ships, 0);
        assert_eq!(outcome.winner_id, defender.owner_id);

        // Two empty fleets tie, and the tie still goes to the defender.
        let attacker = fleet(Uuid::new_v4(), &[]);
        let defender = fleet(Uuid::new_v4(), &[("fighter", 0)]);
        let outcome = resolve_battle(&attacker, &defender).unwrap();
        assert_eq!(outcome.winner_id, defender.owner_id);
        assert!(outcome.report.contains("Tie - Defender wins by default"));
    }

    /// Test: Report carries the exact expected shape
    #[test]
    fn test_report_format() {
        let attacker = fleet(Uuid::new_v4(), &[("fighter", 10)]);
        let defender = fleet(Uuid::new_v4(), &[("fighter", 5)]);

        let outcome = resolve_battle(&attacker, &defender).unwrap();

        let expected = format!(
            "Battle ID: {}\nAttacker wins!\nAttacker ships: 10\nDefender ships: 5",
            outcome.battle_id
        );
        assert_eq!(outcome.report, expected);
    }

    /// Test: Every resolution generates a fresh battle id
    #[test]
    fn test_battle_ids_are_fresh() {
        let attacker = fleet(Uuid::new_v4(), &[("fighter", 10)]);
        let defender = fleet(Uuid::new_v4(), &[("fighter", 5)]);

        let first = resolve_battle(&attacker, &defender).unwrap();
        let second = resolve_battle(&attacker, &defender).unwrap();

        assert_ne!(first.battle_id, second.battle_id);
    }
}
