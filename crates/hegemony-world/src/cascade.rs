//! Cascade propagation: second-order effects of a territorial change.
//!
//! A cascade is a breadth-first walk outward from a trigger territory over
//! adjacency edges. Each hop attenuates the carried magnitude by the edge
//! weight and the decay factor:
//!
//! ```text
//! probability(child) = clamp(base(kind) * w * decay * m_parent, 0, 1)
//! m_child            = m_parent * w * decay
//! ```
//!
//! Neighbours are visited in ascending id order and every emitted effect
//! consumes one roll from a seeded [`StdRng`], so the same snapshot and
//! seed always give the same [`CascadeEffect`]. The walk checks a
//! wall-clock budget before expanding each node and returns a partial
//! result when it runs out.

use std::collections::{BTreeSet, VecDeque};
use std::time::{Duration, Instant};

use hegemony_types::{AffectedTerritory, CascadeEffect, MapSnapshot, TerritoryId, TriggerKind};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use tracing::{debug, warn};

/// Errors raised by cascade computation.
#[derive(Debug, thiserror::Error)]
pub enum CascadeError {
    /// The trigger territory is not in the snapshot.
    #[error("cascade trigger {0} not found in snapshot")]
    UnknownTrigger(TerritoryId),

    /// The starting magnitude is negative or not finite.
    #[error("invalid cascade magnitude {0}")]
    InvalidMagnitude(f64),
}

/// Tuning for cascade propagation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CascadeConfig {
    /// Maximum hop depth from the trigger.
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
    /// Per-hop attenuation factor.
    #[serde(default = "default_decay")]
    pub decay: f64,
    /// Effects below this probability are neither emitted nor expanded.
    #[serde(default = "default_min_probability")]
    pub min_probability: f64,
    /// Wall-clock budget per cascade, in milliseconds.
    #[serde(default = "default_budget_ms")]
    pub budget_ms: u64,
    /// Base probability per trigger kind.
    #[serde(default)]
    pub base_probability: BaseProbabilities,
}

/// Base probability of an effect, per trigger kind.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BaseProbabilities {
    /// A territory changed hands.
    #[serde(default = "default_control_loss")]
    pub control_loss: f64,
    /// A high-value territory changed hands.
    #[serde(default = "default_strategic_node_loss")]
    pub strategic_node_loss: f64,
    /// A territory's resources ran out.
    #[serde(default = "default_resource_depletion")]
    pub resource_depletion: f64,
    /// An alliance broke down.
    #[serde(default = "default_alliance_collapse")]
    pub alliance_collapse: f64,
}

impl BaseProbabilities {
    /// Base probability for a trigger kind.
    pub const fn for_kind(&self, kind: TriggerKind) -> f64 {
        match kind {
            TriggerKind::ControlLoss => self.control_loss,
            TriggerKind::StrategicNodeLoss => self.strategic_node_loss,
            TriggerKind::ResourceDepletion => self.resource_depletion,
            TriggerKind::AllianceCollapse => self.alliance_collapse,
        }
    }
}

const fn default_max_depth() -> u32 {
    3
}
const fn default_decay() -> f64 {
    0.6
}
const fn default_min_probability() -> f64 {
    0.01
}
const fn default_budget_ms() -> u64 {
    50
}
const fn default_control_loss() -> f64 {
    0.6
}
const fn default_strategic_node_loss() -> f64 {
    0.8
}
const fn default_resource_depletion() -> f64 {
    0.4
}
const fn default_alliance_collapse() -> f64 {
    0.5
}

impl Default for BaseProbabilities {
    fn default() -> Self {
        Self {
            control_loss: default_control_loss(),
            strategic_node_loss: default_strategic_node_loss(),
            resource_depletion: default_resource_depletion(),
            alliance_collapse: default_alliance_collapse(),
        }
    }
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            decay: default_decay(),
            min_probability: default_min_probability(),
            budget_ms: default_budget_ms(),
            base_probability: BaseProbabilities::default(),
        }
    }
}

/// Strategic value at or above which a lost territory counts as a
/// strategic node.
pub const STRATEGIC_NODE_THRESHOLD: u8 = 8;

/// Trigger kind and starting magnitude for a territory changing hands.
pub fn control_change_trigger(strategic_value: u8) -> (TriggerKind, f64) {
    let kind = if strategic_value >= STRATEGIC_NODE_THRESHOLD {
        TriggerKind::StrategicNodeLoss
    } else {
        TriggerKind::ControlLoss
    };
    (kind, f64::from(strategic_value) / 5.0)
}

/// Computes cascade effects over immutable snapshots.
#[derive(Debug, Clone)]
pub struct CascadeEngine {
    config: CascadeConfig,
    budget: Duration,
}

impl CascadeEngine {
    /// Create an engine from configuration.
    pub const fn new(config: CascadeConfig) -> Self {
        let budget = Duration::from_millis(config.budget_ms);
        Self { config, budget }
    }

    /// Override the wall-clock budget.
    #[must_use]
    pub const fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    /// The active configuration.
    pub const fn config(&self) -> &CascadeConfig {
        &self.config
    }

    /// Propagate a trigger through the snapshot's adjacency graph.
    ///
    /// The trigger never appears in the output and no territory appears
    /// twice. `partial` is set when the budget stopped the walk early.
    pub fn propagate(
        &self,
        snapshot: &MapSnapshot,
        trigger: TerritoryId,
        kind: TriggerKind,
        magnitude: f64,
        max_depth: u32,
        seed: u64,
    ) -> Result<CascadeEffect, CascadeError> {
        if !magnitude.is_finite() || magnitude < 0.0 {
            return Err(CascadeError::InvalidMagnitude(magnitude));
        }
        if snapshot.territory(trigger).is_none() {
            return Err(CascadeError::UnknownTrigger(trigger));
        }

        let started = Instant::now();
        let base = self.config.base_probability.for_kind(kind);
        let decay = self.config.decay;
        let mut rng = StdRng::seed_from_u64(seed);
        let mut visited = BTreeSet::from([trigger]);
        let mut frontier = VecDeque::from([(trigger, 0_u32, magnitude)]);
        let mut affected = Vec::new();
        let mut partial = false;

        while let Some((node, depth, carried)) = frontier.pop_front() {
            if started.elapsed() >= self.budget {
                partial = true;
                break;
            }
            if depth >= max_depth {
                continue;
            }
            let Some(territory) = snapshot.territory(node) else {
                continue;
            };
            let child_depth = depth.saturating_add(1);
            for (&child, &weight) in &territory.adjacency {
                if visited.contains(&child) || snapshot.territory(child).is_none() {
                    continue;
                }
                let probability = (base * weight * decay * carried).clamp(0.0, 1.0);
                if probability < self.config.min_probability {
                    continue;
                }
                visited.insert(child);
                let roll: f64 = rng.random();
                let child_magnitude = carried * weight * decay;
                affected.push(AffectedTerritory {
                    territory_id: child,
                    depth: child_depth,
                    probability,
                    magnitude: child_magnitude,
                    realized: roll < probability,
                });
                frontier.push_back((child, child_depth, child_magnitude));
            }
        }

        if partial {
            warn!(
                trigger = %trigger,
                kind = %kind,
                emitted = affected.len(),
                "cascade budget exhausted, returning partial result"
            );
        } else {
            debug!(
                trigger = %trigger,
                kind = %kind,
                emitted = affected.len(),
                "cascade computed"
            );
        }

        Ok(CascadeEffect {
            trigger,
            trigger_kind: kind,
            magnitude,
            affected,
            partial,
        })
    }
}

impl Default for CascadeEngine {
    fn default() -> Self {
        Self::new(CascadeConfig::default())
    }
}
