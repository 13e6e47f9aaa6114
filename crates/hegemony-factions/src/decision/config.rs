//! Decision engine tuning. Every constant has a documented default.

use hegemony_types::{ActionKind, FactionProfile};
use serde::Deserialize;

/// Scoring, strategy, and cost constants for the decision engine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DecisionConfig {
    /// Added when a territory name contains a preferred substring.
    #[serde(default = "default_preference_bonus")]
    pub preference_bonus: f64,
    /// Multiplied by `resource_focus` and added for high-value territory.
    #[serde(default = "default_resource_focus_bonus")]
    pub resource_focus_bonus: f64,
    /// Strategic value at or above which a territory counts as high-value.
    #[serde(default = "default_high_value_threshold")]
    pub high_value_threshold: u8,
    /// Risk tolerance above which contested ground is attractive.
    #[serde(default = "default_risk_tolerance_threshold")]
    pub risk_tolerance_threshold: f64,
    /// Added for contested territory when risk tolerance is high.
    #[serde(default = "default_contested_bonus")]
    pub contested_bonus: f64,
    /// Subtracted for contested territory when risk tolerance is low.
    #[serde(default = "default_contested_penalty")]
    pub contested_penalty: f64,
    /// Compatibility above which a controller is treated as friendly.
    #[serde(default = "default_friendly_compatibility")]
    pub friendly_compatibility: f64,
    /// Subtracted for territory held by a friendly controller.
    #[serde(default = "default_friendly_penalty")]
    pub friendly_penalty: f64,
    /// Compatibility below which a controller is treated as hostile.
    #[serde(default = "default_hostile_compatibility")]
    pub hostile_compatibility: f64,
    /// Added for territory held by a hostile controller.
    #[serde(default = "default_hostile_bonus")]
    pub hostile_bonus: f64,
    /// Weight of a specialization's activation in its score multiplier.
    #[serde(default = "default_specialization_weight")]
    pub specialization_weight: f64,
    /// Aggressive factions attack only above this strength.
    #[serde(default = "default_attack_strength_threshold")]
    pub attack_strength_threshold: u32,
    /// Factions below this strength retreat from contested holdings.
    #[serde(default = "default_retreat_strength_threshold")]
    pub retreat_strength_threshold: u32,
    /// Opportunistic factions only attack targets at least this valuable.
    #[serde(default = "default_opportunistic_min_value")]
    pub opportunistic_min_value: u8,
    /// Opportunistic factions need this multiple of the defender's strength.
    #[serde(default = "default_opportunistic_strength_ratio")]
    pub opportunistic_strength_ratio: f64,
    /// Diplomatic factions negotiate only at or above this compatibility.
    #[serde(default = "default_negotiate_min_compatibility")]
    pub negotiate_min_compatibility: f64,
    /// Isolationist factions fortify only holdings at or below this value.
    #[serde(default = "default_isolationist_max_value")]
    pub isolationist_max_value: u8,
    /// Added to a holding's priority while it is contested.
    #[serde(default = "default_contested_holding_bonus")]
    pub contested_holding_bonus: f64,
    /// Resource costs per action.
    #[serde(default)]
    pub costs: ActionCosts,
}

/// Resource cost of each action. Acquisition costs grow with target value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ActionCosts {
    /// Fixed part of an expansion's cost.
    #[serde(default = "default_expand_base")]
    pub expand_base: i64,
    /// Expansion cost per point of strategic value.
    #[serde(default = "default_expand_per_value")]
    pub expand_per_value: i64,
    /// Fixed part of an attack's cost.
    #[serde(default = "default_attack_base")]
    pub attack_base: i64,
    /// Attack cost per point of strategic value.
    #[serde(default = "default_attack_per_value")]
    pub attack_per_value: i64,
    /// Cost of fortifying.
    #[serde(default = "default_fortify")]
    pub fortify: i64,
    /// Cost of defending.
    #[serde(default = "default_defend")]
    pub defend: i64,
    /// Cost of patrolling.
    #[serde(default = "default_patrol")]
    pub patrol: i64,
    /// Cost of negotiating.
    #[serde(default = "default_negotiate")]
    pub negotiate: i64,
    /// Cost of retreating.
    #[serde(default)]
    pub retreat: i64,
}

impl ActionCosts {
    /// Cost of `action` against a target of `strategic_value`.
    pub fn cost_of(&self, action: ActionKind, strategic_value: u8) -> i64 {
        let value = i64::from(strategic_value);
        match action {
            ActionKind::Expand => self
                .expand_base
                .saturating_add(self.expand_per_value.saturating_mul(value)),
            ActionKind::Attack => self
                .attack_base
                .saturating_add(self.attack_per_value.saturating_mul(value)),
            ActionKind::Fortify => self.fortify,
            ActionKind::Defend => self.defend,
            ActionKind::Patrol => self.patrol,
            ActionKind::Negotiate => self.negotiate,
            ActionKind::Retreat => self.retreat,
        }
    }
}

impl DecisionConfig {
    /// Whether contested ground attracts rather than repels this faction.
    pub fn embraces_contest(&self, profile: &FactionProfile) -> bool {
        profile.traits.risk_tolerance > self.risk_tolerance_threshold
    }
}

const fn default_preference_bonus() -> f64 {
    0.3
}
const fn default_resource_focus_bonus() -> f64 {
    0.2
}
const fn default_high_value_threshold() -> u8 {
    8
}
const fn default_risk_tolerance_threshold() -> f64 {
    0.6
}
const fn default_contested_bonus() -> f64 {
    0.1
}
const fn default_contested_penalty() -> f64 {
    0.2
}
const fn default_friendly_compatibility() -> f64 {
    0.5
}
const fn default_friendly_penalty() -> f64 {
    0.3
}
const fn default_hostile_compatibility() -> f64 {
    0.3
}
const fn default_hostile_bonus() -> f64 {
    0.2
}
const fn default_specialization_weight() -> f64 {
    0.25
}
const fn default_attack_strength_threshold() -> u32 {
    60
}
const fn default_retreat_strength_threshold() -> u32 {
    20
}
const fn default_opportunistic_min_value() -> u8 {
    6
}
const fn default_opportunistic_strength_ratio() -> f64 {
    1.2
}
const fn default_negotiate_min_compatibility() -> f64 {
    0.6
}
const fn default_isolationist_max_value() -> u8 {
    4
}
const fn default_contested_holding_bonus() -> f64 {
    0.2
}
const fn default_expand_base() -> i64 {
    10
}
const fn default_expand_per_value() -> i64 {
    2
}
const fn default_attack_base() -> i64 {
    20
}
const fn default_attack_per_value() -> i64 {
    3
}
const fn default_fortify() -> i64 {
    8
}
const fn default_defend() -> i64 {
    6
}
const fn default_patrol() -> i64 {
    3
}
const fn default_negotiate() -> i64 {
    5
}

impl Default for ActionCosts {
    fn default() -> Self {
        Self {
            expand_base: default_expand_base(),
            expand_per_value: default_expand_per_value(),
            attack_base: default_attack_base(),
            attack_per_value: default_attack_per_value(),
            fortify: default_fortify(),
            defend: default_defend(),
            patrol: default_patrol(),
            negotiate: default_negotiate(),
            retreat: 0,
        }
    }
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            preference_bonus: default_preference_bonus(),
            resource_focus_bonus: default_resource_focus_bonus(),
            high_value_threshold: default_high_value_threshold(),
            risk_tolerance_threshold: default_risk_tolerance_threshold(),
            contested_bonus: default_contested_bonus(),
            contested_penalty: default_contested_penalty(),
            friendly_compatibility: default_friendly_compatibility(),
            friendly_penalty: default_friendly_penalty(),
            hostile_compatibility: default_hostile_compatibility(),
            hostile_bonus: default_hostile_bonus(),
            specialization_weight: default_specialization_weight(),
            attack_strength_threshold: default_attack_strength_threshold(),
            retreat_strength_threshold: default_retreat_strength_threshold(),
            opportunistic_min_value: default_opportunistic_min_value(),
            opportunistic_strength_ratio: default_opportunistic_strength_ratio(),
            negotiate_min_compatibility: default_negotiate_min_compatibility(),
            isolationist_max_value: default_isolationist_max_value(),
            contested_holding_bonus: default_contested_holding_bonus(),
            costs: ActionCosts::default(),
        }
    }
}
