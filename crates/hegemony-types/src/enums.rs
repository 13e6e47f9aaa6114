//! Enumeration types shared across the coordinator.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Faction archetypes
// ---------------------------------------------------------------------------

/// The closed set of strategy archetypes a faction can follow.
///
/// The Decision Engine dispatches on this tag through a strategy table,
/// one pure selection function per archetype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum StrategyArchetype {
    /// Attacks when strong, otherwise expands or fortifies.
    Aggressive,
    /// Fortifies contested holdings and patrols its core.
    Defensive,
    /// Strikes only with a clear strength margin on valuable targets.
    Opportunistic,
    /// Negotiates with compatible controllers.
    Diplomatic,
    /// Keeps to remote low-value holdings.
    Isolationist,
}

impl StrategyArchetype {
    /// Every archetype, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Aggressive,
        Self::Defensive,
        Self::Opportunistic,
        Self::Diplomatic,
        Self::Isolationist,
    ];

    /// Stable lowercase name used in logs and reasoning strings.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Aggressive => "aggressive",
            Self::Defensive => "defensive",
            Self::Opportunistic => "opportunistic",
            Self::Diplomatic => "diplomatic",
            Self::Isolationist => "isolationist",
        }
    }
}

impl core::fmt::Display for StrategyArchetype {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// A territorial action a faction can decide on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ActionKind {
    /// Claim an uncontrolled territory.
    Expand,
    /// Hold a contested territory against a challenger.
    Defend,
    /// Take a territory held by another faction.
    Attack,
    /// Strengthen a held territory.
    Fortify,
    /// Show presence in a held territory.
    Patrol,
    /// Give up a held territory.
    Retreat,
    /// Open talks with a territory's controller.
    Negotiate,
}

impl ActionKind {
    /// Stable lowercase name used for persistence and the wire format.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Expand => "expand",
            Self::Defend => "defend",
            Self::Attack => "attack",
            Self::Fortify => "fortify",
            Self::Patrol => "patrol",
            Self::Retreat => "retreat",
            Self::Negotiate => "negotiate",
        }
    }

    /// Parse the persisted name back into an action.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "expand" => Some(Self::Expand),
            "defend" => Some(Self::Defend),
            "attack" => Some(Self::Attack),
            "fortify" => Some(Self::Fortify),
            "patrol" => Some(Self::Patrol),
            "retreat" => Some(Self::Retreat),
            "negotiate" => Some(Self::Negotiate),
            _ => None,
        }
    }

    /// Whether the action acquires or courts territory held by someone
    /// else (as opposed to acting on the faction's own holdings).
    pub const fn is_acquisition(self) -> bool {
        matches!(self, Self::Expand | Self::Attack | Self::Negotiate)
    }
}

impl core::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Cascades
// ---------------------------------------------------------------------------

/// What kind of upstream change started a cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum TriggerKind {
    /// A territory changed hands or was abandoned.
    ControlLoss,
    /// A high-value territory changed hands.
    StrategicNodeLoss,
    /// A territory's resources were exhausted.
    ResourceDepletion,
    /// An alliance between controllers broke down.
    AllianceCollapse,
}

impl TriggerKind {
    /// Stable lowercase name used for persistence.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ControlLoss => "control_loss",
            Self::StrategicNodeLoss => "strategic_node_loss",
            Self::ResourceDepletion => "resource_depletion",
            Self::AllianceCollapse => "alliance_collapse",
        }
    }
}

impl core::fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Adaptation
// ---------------------------------------------------------------------------

/// A behavioural specialization a faction grows into through repeated
/// successes of a matching action pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Specialization {
    /// Successful attacks on economically valuable territory.
    EconomicWarfare,
    /// Successful attacks on low-value border territory.
    BorderSkirmishing,
    /// Successful expansion into unclaimed land.
    RapidExpansion,
    /// Successful fortification and defence.
    FortressBuilding,
    /// Successful negotiation.
    DiplomaticNetwork,
}

impl Specialization {
    /// Every specialization, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::EconomicWarfare,
        Self::BorderSkirmishing,
        Self::RapidExpansion,
        Self::FortressBuilding,
        Self::DiplomaticNetwork,
    ];

    /// Stable lowercase name used in adaptation-factor tags.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EconomicWarfare => "economic_warfare",
            Self::BorderSkirmishing => "border_skirmishing",
            Self::RapidExpansion => "rapid_expansion",
            Self::FortressBuilding => "fortress_building",
            Self::DiplomaticNetwork => "diplomatic_network",
        }
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Lifecycle phase of a shard scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum SchedulerPhase {
    /// Waiting for the next cycle tick.
    Idle,
    /// Executing queued decision tasks.
    RunningCycle,
    /// Sustained high load; running with a stretched interval.
    Throttled,
    /// Shutting down: no new tasks, finishing queued work.
    Draining,
}

// ---------------------------------------------------------------------------
// Broadcast
// ---------------------------------------------------------------------------

/// The `type` tag of a broadcast delta message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum DeltaKind {
    /// A territory's controlling faction changed.
    ControlChanged,
    /// A territory's contested flag changed.
    ContestChanged,
    /// A faction recorded a decision.
    Decision,
    /// A cascade was computed from a trigger.
    Cascade,
    /// A shard finished a cycle.
    CycleSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_names_round_trip_through_parse() {
        for action in [
            ActionKind::Expand,
            ActionKind::Defend,
            ActionKind::Attack,
            ActionKind::Fortify,
            ActionKind::Patrol,
            ActionKind::Retreat,
            ActionKind::Negotiate,
        ] {
            assert_eq!(ActionKind::parse(action.as_str()), Some(action));
        }
        assert_eq!(ActionKind::parse("conquer"), None);
    }

    #[test]
    fn archetypes_serialize_snake_case() {
        let json = serde_json::to_string(&StrategyArchetype::Opportunistic).ok();
        assert_eq!(json.as_deref(), Some("\"opportunistic\""));
    }

    #[test]
    fn only_acquisition_actions_target_foreign_land() {
        assert!(ActionKind::Attack.is_acquisition());
        assert!(ActionKind::Expand.is_acquisition());
        assert!(ActionKind::Negotiate.is_acquisition());
        assert!(!ActionKind::Fortify.is_acquisition());
        assert!(!ActionKind::Retreat.is_acquisition());
    }
}
