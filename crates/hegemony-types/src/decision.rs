//! The per-faction, per-cycle decision record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::ActionKind;
use crate::ids::{DecisionId, FactionId, TerritoryId};

/// One ranked decision produced by the Decision Engine for one faction in
/// one cycle. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Decision {
    /// Unique identifier.
    pub id: DecisionId,
    /// Scheduler cycle that produced the decision.
    pub cycle: u64,
    /// The deciding faction.
    pub faction_id: FactionId,
    /// Chosen action.
    pub action: ActionKind,
    /// Target territory.
    pub target: TerritoryId,
    /// Priority score in `[0, 1]`.
    pub priority: f64,
    /// Resources the action consumes.
    pub resource_cost: i64,
    /// Estimated risk in `[0, 1]`.
    pub risk: f64,
    /// Human-readable explanation.
    pub reasoning: String,
    /// Adaptation factors that shaped the decision, e.g.
    /// `economic_warfare:0.40`.
    pub adaptation_factors: Vec<String>,
    /// When the decision was made.
    pub created_at: DateTime<Utc>,
}
