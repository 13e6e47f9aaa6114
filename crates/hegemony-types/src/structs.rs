//! Core entity records: territories, factions, and the immutable map
//! snapshot handed to every decision task.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{ActionKind, Specialization, StrategyArchetype};
use crate::ids::{FactionId, TerritoryId};

/// Lowest valid strategic value.
pub const MIN_STRATEGIC_VALUE: u8 = 1;

/// Highest valid strategic value.
pub const MAX_STRATEGIC_VALUE: u8 = 10;

// ---------------------------------------------------------------------------
// Territory
// ---------------------------------------------------------------------------

/// A unit of controllable map area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Territory {
    /// Row identifier.
    pub id: TerritoryId,
    /// Display name (lore content, matched against faction preferences).
    pub name: String,
    /// Strategic value, 1 through 10.
    pub strategic_value: u8,
    /// True only while an active challenge exists.
    pub contested: bool,
    /// The single controlling faction, if any.
    pub controller: Option<FactionId>,
    /// Adjacent territories and the dependency weight (0..=1) of each link.
    pub adjacency: BTreeMap<TerritoryId, f64>,
}

impl Territory {
    /// Whether the given faction controls this territory.
    pub fn is_held_by(&self, faction: FactionId) -> bool {
        self.controller == Some(faction)
    }
}

// ---------------------------------------------------------------------------
// Factions
// ---------------------------------------------------------------------------

/// Dynamic per-faction standing carried in the map snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactionStanding {
    /// Faction identifier.
    pub faction_id: FactionId,
    /// Display name.
    pub name: String,
    /// Simulated military strength.
    pub military_strength: u32,
    /// Resource stock available for action costs.
    pub resources: i64,
}

/// The five static trait scalars of a faction, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactionTraits {
    /// Appetite for conflict.
    pub aggression: f64,
    /// Drive to claim new land.
    pub expansion_priority: f64,
    /// Interest in economically valuable territory.
    pub resource_focus: f64,
    /// Inclination to talk rather than fight.
    pub diplomatic_tendency: f64,
    /// Willingness to act on contested ground.
    pub risk_tolerance: f64,
}

impl FactionTraits {
    /// Iterate the traits with their names, for validation messages.
    pub const fn named(&self) -> [(&'static str, f64); 5] {
        [
            ("aggression", self.aggression),
            ("expansion_priority", self.expansion_priority),
            ("resource_focus", self.resource_focus),
            ("diplomatic_tendency", self.diplomatic_tendency),
            ("risk_tolerance", self.risk_tolerance),
        ]
    }
}

/// One entry in a faction's rolling outcome window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    /// Whether the decision succeeded.
    pub success: bool,
    /// Influence gained (positive) or lost (negative).
    pub influence_delta: i64,
    /// When the outcome was recorded.
    pub timestamp: DateTime<Utc>,
    /// The action that produced this outcome.
    pub action: ActionKind,
    /// Strategic value of the decision's target.
    pub target_value: u8,
}

/// Mutable adaptation state nested inside a [`FactionProfile`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptationState {
    /// Rolling window of recent outcomes, oldest first.
    pub window: VecDeque<OutcomeRecord>,
    /// Maximum number of outcomes kept in the window.
    pub capacity: usize,
    /// Successes divided by window length (0 when empty).
    pub success_rate: f64,
    /// Activation score per specialization, each in `[0, 1]`.
    pub specializations: BTreeMap<Specialization, f64>,
}

impl AdaptationState {
    /// An empty state with the given window capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
            success_rate: 0.0,
            specializations: Specialization::ALL.iter().map(|s| (*s, 0.0)).collect(),
        }
    }

    /// Activation score for a specialization (0 when absent).
    pub fn activation(&self, specialization: Specialization) -> f64 {
        self.specializations
            .get(&specialization)
            .copied()
            .unwrap_or(0.0)
    }
}

/// Static traits plus mutable adaptation state for one faction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactionProfile {
    /// Faction identifier.
    pub faction_id: FactionId,
    /// Strategy archetype driving action selection.
    pub archetype: StrategyArchetype,
    /// Static trait scalars.
    pub traits: FactionTraits,
    /// Ordered territory-name substrings the faction prefers.
    pub preferred_territories: Vec<String>,
    /// Compatibility with other factions, each in `[0, 1]`.
    pub compatibility: BTreeMap<FactionId, f64>,
    /// Rolling outcome history and derived specialization scores.
    pub adaptation: AdaptationState,
}

impl FactionProfile {
    /// Compatibility with another faction. Unknown factions are neutral (0.5).
    pub fn compatibility_with(&self, other: FactionId) -> f64 {
        self.compatibility.get(&other).copied().unwrap_or(0.5)
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Immutable copy of the territorial map handed to decision tasks.
///
/// Snapshots are shared behind `Arc` and never mutated; the coordinator
/// publishes a new one with a higher `version` after applying changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapSnapshot {
    /// Monotonic version number.
    pub version: u64,
    /// When the snapshot was taken.
    pub taken_at: DateTime<Utc>,
    /// Territories keyed by identifier.
    pub territories: BTreeMap<TerritoryId, Territory>,
    /// Faction standings keyed by identifier.
    pub factions: BTreeMap<FactionId, FactionStanding>,
}

impl MapSnapshot {
    /// An empty snapshot at version 0.
    pub fn empty() -> Self {
        Self {
            version: 0,
            taken_at: Utc::now(),
            territories: BTreeMap::new(),
            factions: BTreeMap::new(),
        }
    }

    /// Look up a territory.
    pub fn territory(&self, id: TerritoryId) -> Option<&Territory> {
        self.territories.get(&id)
    }

    /// Look up a faction's standing.
    pub fn standing(&self, id: FactionId) -> Option<&FactionStanding> {
        self.factions.get(&id)
    }

    /// Simulated strength of a faction (0 when unknown).
    pub fn strength_of(&self, id: FactionId) -> u32 {
        self.standing(id).map_or(0, |s| s.military_strength)
    }

    /// Territories held by a faction, in identifier order.
    pub fn holdings_of(&self, faction: FactionId) -> impl Iterator<Item = &Territory> {
        self.territories
            .values()
            .filter(move |t| t.is_held_by(faction))
    }
}
