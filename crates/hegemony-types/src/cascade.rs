//! Cascade records: the ephemeral effect tree and its persisted summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::TriggerKind;
use crate::ids::TerritoryId;

/// One downstream territory reached by a cascade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AffectedTerritory {
    /// The affected territory.
    pub territory_id: TerritoryId,
    /// Hop distance from the trigger (1 = direct neighbour).
    pub depth: u32,
    /// Probability that the effect materialises, in `[0, 1]`.
    pub probability: f64,
    /// Magnitude remaining after decay along the path.
    pub magnitude: f64,
    /// Outcome of the seeded roll against `probability`.
    pub realized: bool,
}

/// The computed effects of one trigger. Never mutated after computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CascadeEffect {
    /// Territory whose change started the cascade.
    pub trigger: TerritoryId,
    /// What kind of change it was.
    pub trigger_kind: TriggerKind,
    /// Starting magnitude.
    pub magnitude: f64,
    /// Downstream effects in breadth-first order.
    pub affected: Vec<AffectedTerritory>,
    /// True when the wall-clock budget truncated the walk.
    pub partial: bool,
}

impl CascadeEffect {
    /// Effects whose roll came up.
    pub fn realized(&self) -> impl Iterator<Item = &AffectedTerritory> {
        self.affected.iter().filter(|a| a.realized)
    }

    /// Summarise for persistence.
    pub fn summary(&self) -> CascadeSummary {
        CascadeSummary {
            trigger: self.trigger,
            trigger_kind: self.trigger_kind,
            magnitude: self.magnitude,
            affected_count: u32::try_from(self.affected.len()).unwrap_or(u32::MAX),
            realized_count: u32::try_from(self.realized().count()).unwrap_or(u32::MAX),
            max_probability: self
                .affected
                .iter()
                .map(|a| a.probability)
                .fold(0.0, f64::max),
            partial: self.partial,
            recorded_at: Utc::now(),
        }
    }
}

/// The persisted summary of a [`CascadeEffect`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CascadeSummary {
    /// Trigger territory.
    pub trigger: TerritoryId,
    /// Trigger kind.
    pub trigger_kind: TriggerKind,
    /// Starting magnitude.
    pub magnitude: f64,
    /// Number of affected territories.
    pub affected_count: u32,
    /// Number of realized effects.
    pub realized_count: u32,
    /// Highest probability among the effects.
    pub max_probability: f64,
    /// Whether the computation was truncated.
    pub partial: bool,
    /// When the summary was produced.
    pub recorded_at: DateTime<Utc>,
}
