//! Raw snapshot rows and their assembly into a validated [`MapSnapshot`].
//!
//! Persistence backends and the campaign seed both produce
//! [`SnapshotRecords`]: flat rows exactly as stored. [`assemble`] turns
//! them into a snapshot, rejecting every row that breaks a map invariant
//! rather than failing the whole load. Rejected rows come back as
//! [`WorldError`]s so the caller can count them on the health signal.

use std::collections::BTreeMap;

use chrono::Utc;
use hegemony_types::{
    FactionId, FactionStanding, MAX_STRATEGIC_VALUE, MIN_STRATEGIC_VALUE, MapSnapshot, Territory,
    TerritoryId,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::WorldError;

/// One `territories` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerritoryRecord {
    /// Territory identifier.
    pub id: TerritoryId,
    /// Display name.
    pub name: String,
    /// Strategic value as stored (validated on assembly).
    pub strategic_value: i64,
    /// Contested flag.
    pub contested: bool,
}

/// One `territory_control` row: a faction's claim on a territory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlRecord {
    /// Claimed territory.
    pub territory_id: TerritoryId,
    /// Claiming faction.
    pub faction_id: FactionId,
}

/// One directed `territory_adjacency` row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdjacencyRecord {
    /// Edge source.
    pub from: TerritoryId,
    /// Edge target.
    pub to: TerritoryId,
    /// Dependency weight.
    pub weight: f64,
}

/// Everything needed to build a snapshot, as flat rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecords {
    /// Version to stamp on the assembled snapshot.
    pub version: u64,
    /// Territory rows.
    pub territories: Vec<TerritoryRecord>,
    /// Control claims, in storage order.
    pub control: Vec<ControlRecord>,
    /// Directed adjacency edges.
    pub adjacency: Vec<AdjacencyRecord>,
    /// Faction standings.
    pub factions: Vec<FactionStanding>,
}

impl SnapshotRecords {
    /// Flatten a snapshot back into rows.
    pub fn from_snapshot(snapshot: &MapSnapshot) -> Self {
        let mut records = Self {
            version: snapshot.version,
            factions: snapshot.factions.values().cloned().collect(),
            ..Self::default()
        };
        for territory in snapshot.territories.values() {
            records.territories.push(TerritoryRecord {
                id: territory.id,
                name: territory.name.clone(),
                strategic_value: i64::from(territory.strategic_value),
                contested: territory.contested,
            });
            if let Some(faction_id) = territory.controller {
                records.control.push(ControlRecord {
                    territory_id: territory.id,
                    faction_id,
                });
            }
            for (to, weight) in &territory.adjacency {
                records.adjacency.push(AdjacencyRecord {
                    from: territory.id,
                    to: *to,
                    weight: *weight,
                });
            }
        }
        records
    }
}

/// A snapshot plus the rows rejected while building it.
#[derive(Debug)]
pub struct Assembly {
    /// The validated snapshot.
    pub snapshot: MapSnapshot,
    /// One entry per rejected row.
    pub violations: Vec<WorldError>,
}

/// Build a snapshot from raw rows, rejecting invalid rows individually.
///
/// Rejected rows:
/// - duplicate territory or faction ids (later row loses)
/// - strategic value outside 1..=10
/// - control claims on unknown territories, by unknown factions, or on a
///   territory that already has a controller
/// - adjacency edges that self-loop, reference unknown territories, or carry
///   a weight outside `[0, 1]`
pub fn assemble(records: SnapshotRecords) -> Assembly {
    let mut violations = Vec::new();
    let mut factions: BTreeMap<FactionId, FactionStanding> = BTreeMap::new();
    for standing in records.factions {
        if factions.contains_key(&standing.faction_id) {
            violations.push(WorldError::DuplicateFaction(standing.faction_id));
            continue;
        }
        factions.insert(standing.faction_id, standing);
    }

    let mut territories: BTreeMap<TerritoryId, Territory> = BTreeMap::new();
    for row in records.territories {
        if territories.contains_key(&row.id) {
            violations.push(WorldError::DuplicateTerritory(row.id));
            continue;
        }
        let Some(strategic_value) = u8::try_from(row.strategic_value)
            .ok()
            .filter(|v| (MIN_STRATEGIC_VALUE..=MAX_STRATEGIC_VALUE).contains(v))
        else {
            violations.push(WorldError::InvalidStrategicValue {
                territory: row.id,
                value: row.strategic_value,
            });
            continue;
        };
        territories.insert(
            row.id,
            Territory {
                id: row.id,
                name: row.name,
                strategic_value,
                contested: row.contested,
                controller: None,
                adjacency: BTreeMap::new(),
            },
        );
    }

    for claim in records.control {
        if !factions.contains_key(&claim.faction_id) {
            violations.push(WorldError::FactionNotFound(claim.faction_id));
            continue;
        }
        let Some(territory) = territories.get_mut(&claim.territory_id) else {
            violations.push(WorldError::TerritoryNotFound(claim.territory_id));
            continue;
        };
        match territory.controller {
            Some(first) if first != claim.faction_id => {
                violations.push(WorldError::DuplicateController {
                    territory: claim.territory_id,
                    first,
                    second: claim.faction_id,
                });
            }
            _ => territory.controller = Some(claim.faction_id),
        }
    }

    for edge in records.adjacency {
        if edge.from == edge.to {
            violations.push(WorldError::SelfLoop(edge.from));
            continue;
        }
        if !(0.0..=1.0).contains(&edge.weight) {
            violations.push(WorldError::WeightOutOfRange {
                from: edge.from,
                to: edge.to,
                weight: edge.weight,
            });
            continue;
        }
        if !territories.contains_key(&edge.to) {
            violations.push(WorldError::UnknownAdjacency {
                from: edge.from,
                to: edge.to,
            });
            continue;
        }
        let Some(source) = territories.get_mut(&edge.from) else {
            violations.push(WorldError::UnknownAdjacency {
                from: edge.from,
                to: edge.to,
            });
            continue;
        };
        source.adjacency.insert(edge.to, edge.weight);
    }

    for violation in &violations {
        error!(error = %violation, "rejected snapshot record");
    }

    Assembly {
        snapshot: MapSnapshot {
            version: records.version,
            taken_at: Utc::now(),
            territories,
            factions,
        },
        violations,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn territory(id: u32, value: i64) -> TerritoryRecord {
        TerritoryRecord {
            id: TerritoryId::new(id),
            name: format!("T{id}"),
            strategic_value: value,
            contested: false,
        }
    }

    fn standing(id: u32) -> FactionStanding {
        FactionStanding {
            faction_id: FactionId::new(id),
            name: format!("F{id}"),
            military_strength: 50,
            resources: 100,
        }
    }

    fn base_records() -> SnapshotRecords {
        SnapshotRecords {
            version: 3,
            territories: vec![territory(1, 5), territory(2, 9)],
            control: Vec::new(),
            adjacency: vec![AdjacencyRecord {
                from: TerritoryId::new(1),
                to: TerritoryId::new(2),
                weight: 0.8,
            }],
            factions: vec![standing(1), standing(2)],
        }
    }

    #[test]
    fn clean_records_assemble_without_violations() {
        let assembly = assemble(base_records());
        assert!(assembly.violations.is_empty());
        assert_eq!(assembly.snapshot.version, 3);
        let t1 = assembly.snapshot.territory(TerritoryId::new(1)).unwrap();
        assert_eq!(t1.adjacency.get(&TerritoryId::new(2)).copied(), Some(0.8));
    }

    #[test]
    fn second_controller_is_rejected_and_first_kept() {
        let mut records = base_records();
        records.control = vec![
            ControlRecord {
                territory_id: TerritoryId::new(1),
                faction_id: FactionId::new(1),
            },
            ControlRecord {
                territory_id: TerritoryId::new(1),
                faction_id: FactionId::new(2),
            },
        ];
        let assembly = assemble(records);
        assert_eq!(assembly.violations.len(), 1);
        assert!(assembly.violations.iter().all(WorldError::is_invariant_violation));
        let t1 = assembly.snapshot.territory(TerritoryId::new(1)).unwrap();
        assert_eq!(t1.controller, Some(FactionId::new(1)));
    }

    #[test]
    fn bad_edges_are_rejected_individually() {
        let mut records = base_records();
        records.adjacency.extend([
            AdjacencyRecord {
                from: TerritoryId::new(2),
                to: TerritoryId::new(2),
                weight: 0.5,
            },
            AdjacencyRecord {
                from: TerritoryId::new(2),
                to: TerritoryId::new(7),
                weight: 0.5,
            },
            AdjacencyRecord {
                from: TerritoryId::new(2),
                to: TerritoryId::new(1),
                weight: 1.5,
            },
        ]);
        let assembly = assemble(records);
        assert_eq!(assembly.violations.len(), 3);
        let t2 = assembly.snapshot.territory(TerritoryId::new(2)).unwrap();
        assert!(t2.adjacency.is_empty());
        let t1 = assembly.snapshot.territory(TerritoryId::new(1)).unwrap();
        assert_eq!(t1.adjacency.len(), 1);
    }

    #[test]
    fn out_of_range_strategic_value_drops_territory() {
        let mut records = base_records();
        records.territories.push(territory(3, 11));
        let assembly = assemble(records);
        assert!(assembly.snapshot.territory(TerritoryId::new(3)).is_none());
        assert!(matches!(
            assembly.violations.first(),
            Some(WorldError::InvalidStrategicValue { value: 11, .. })
        ));
    }

    #[test]
    fn snapshot_flattens_back_to_equivalent_rows() {
        let mut records = base_records();
        records.control.push(ControlRecord {
            territory_id: TerritoryId::new(2),
            faction_id: FactionId::new(1),
        });
        let first = assemble(records).snapshot;
        let again = assemble(SnapshotRecords::from_snapshot(&first)).snapshot;
        assert_eq!(first.territories, again.territories);
        assert_eq!(first.factions, again.factions);
    }
}
