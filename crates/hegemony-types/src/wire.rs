//! Broadcast wire format and control-surface payloads.
//!
//! Every delta pushed to subscribers is a tagged JSON object:
//!
//! ```json
//! {
//!   "type": "control_changed",
//!   "territoryID": 4,
//!   "controllingFactionID": 2,
//!   "timestamp": "2026-01-01T00:00:00Z",
//!   "payload": { "kind": "control_changed", "previous": 1, "current": 2, "cause": "attack" }
//! }
//! ```
//!
//! Subscribers open with `{"type":"subscribe","filter":{...}}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cascade::CascadeEffect;
use crate::decision::Decision;
use crate::enums::{ActionKind, DeltaKind, SchedulerPhase};
use crate::ids::{ConnectionId, FactionId, TerritoryId};

// ---------------------------------------------------------------------------
// Deltas
// ---------------------------------------------------------------------------

/// A single state change fanned out to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct StateDelta {
    /// Message tag, always consistent with `payload`.
    #[serde(rename = "type")]
    pub kind: DeltaKind,
    /// The territory the delta concerns, if any.
    #[serde(rename = "territoryID")]
    pub territory_id: Option<TerritoryId>,
    /// Controller of that territory after the change.
    #[serde(rename = "controllingFactionID")]
    pub controlling_faction_id: Option<FactionId>,
    /// When the change happened.
    pub timestamp: DateTime<Utc>,
    /// Kind-specific details.
    pub payload: DeltaPayload,
}

/// Kind-specific delta details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum DeltaPayload {
    /// Control over the territory moved.
    ControlChanged {
        /// Controller before the change.
        previous: Option<FactionId>,
        /// Controller after the change.
        current: Option<FactionId>,
        /// The action that caused it.
        cause: ActionKind,
    },
    /// The contested flag flipped.
    ContestChanged {
        /// New value of the flag.
        contested: bool,
    },
    /// A faction recorded a decision.
    Decision {
        /// The recorded decision.
        decision: Box<Decision>,
    },
    /// A cascade was computed.
    Cascade {
        /// The computed effect tree.
        effect: Box<CascadeEffect>,
    },
    /// A shard completed a cycle.
    CycleSummary {
        /// Shard index.
        shard: u32,
        /// Cycle number within the shard.
        cycle: u64,
        /// Decisions produced.
        decisions: u32,
        /// Tasks abandoned on deadline.
        abandoned: u32,
        /// Tasks left queued for the next cycle.
        deferred: u32,
        /// Wall-clock duration of the cycle.
        elapsed_ms: u64,
        /// Scheduler phase after the cycle.
        phase: SchedulerPhase,
        /// Sleep before the next cycle.
        next_interval_ms: u64,
    },
}

impl DeltaPayload {
    /// The `type` tag matching this payload.
    pub const fn kind(&self) -> DeltaKind {
        match self {
            Self::ControlChanged { .. } => DeltaKind::ControlChanged,
            Self::ContestChanged { .. } => DeltaKind::ContestChanged,
            Self::Decision { .. } => DeltaKind::Decision,
            Self::Cascade { .. } => DeltaKind::Cascade,
            Self::CycleSummary { .. } => DeltaKind::CycleSummary,
        }
    }
}

impl StateDelta {
    /// Build a delta, deriving the `type` tag from the payload.
    pub fn new(
        territory_id: Option<TerritoryId>,
        controlling_faction_id: Option<FactionId>,
        payload: DeltaPayload,
    ) -> Self {
        Self {
            kind: payload.kind(),
            territory_id,
            controlling_faction_id,
            timestamp: Utc::now(),
            payload,
        }
    }

    /// A control change on `territory`.
    pub fn control_changed(
        territory: TerritoryId,
        previous: Option<FactionId>,
        current: Option<FactionId>,
        cause: ActionKind,
    ) -> Self {
        Self::new(
            Some(territory),
            current,
            DeltaPayload::ControlChanged {
                previous,
                current,
                cause,
            },
        )
    }

    /// A contested-flag change on `territory`.
    pub fn contest_changed(
        territory: TerritoryId,
        controller: Option<FactionId>,
        contested: bool,
    ) -> Self {
        Self::new(
            Some(territory),
            controller,
            DeltaPayload::ContestChanged { contested },
        )
    }

    /// A recorded decision; `controller` is the target's current controller.
    pub fn decision(decision: Decision, controller: Option<FactionId>) -> Self {
        Self::new(
            Some(decision.target),
            controller,
            DeltaPayload::Decision {
                decision: Box::new(decision),
            },
        )
    }

    /// A computed cascade; `controller` is the trigger's current controller.
    pub fn cascade(effect: CascadeEffect, controller: Option<FactionId>) -> Self {
        Self::new(
            Some(effect.trigger),
            controller,
            DeltaPayload::Cascade {
                effect: Box::new(effect),
            },
        )
    }

    /// Factions this delta concerns, used by subscription filters.
    pub fn related_factions(&self) -> Vec<FactionId> {
        let mut out: Vec<FactionId> = self.controlling_faction_id.into_iter().collect();
        match &self.payload {
            DeltaPayload::ControlChanged { previous, .. } => out.extend(*previous),
            DeltaPayload::Decision { decision } => out.push(decision.faction_id),
            DeltaPayload::ContestChanged { .. }
            | DeltaPayload::Cascade { .. }
            | DeltaPayload::CycleSummary { .. } => {}
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Subscriptions
// ---------------------------------------------------------------------------

/// Which deltas a subscriber wants. Empty lists match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SubscriptionFilter {
    /// Only deltas about these territories.
    #[serde(default)]
    pub territories: Vec<TerritoryId>,
    /// Only deltas concerning these factions.
    #[serde(default)]
    pub factions: Vec<FactionId>,
    /// Only these delta kinds.
    #[serde(default)]
    pub kinds: Vec<DeltaKind>,
}

impl SubscriptionFilter {
    /// Whether `delta` passes this filter.
    ///
    /// Deltas without a territory (cycle summaries) pass the territory
    /// criterion; deltas without any related faction pass the faction
    /// criterion.
    pub fn matches(&self, delta: &StateDelta) -> bool {
        if !self.kinds.is_empty() && !self.kinds.contains(&delta.kind) {
            return false;
        }
        if !self.territories.is_empty() {
            if let Some(territory) = delta.territory_id {
                if !self.territories.contains(&territory) {
                    return false;
                }
            }
        }
        if !self.factions.is_empty() {
            let related = delta.related_factions();
            if !related.is_empty() && !related.iter().any(|f| self.factions.contains(f)) {
                return false;
            }
        }
        true
    }
}

/// Control messages sent by subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ClientMessage {
    /// Start (or replace) a subscription.
    Subscribe {
        /// Delta filter.
        #[serde(default)]
        filter: SubscriptionFilter,
    },
    /// Stop receiving deltas and close.
    Unsubscribe,
    /// Keep-alive; refreshes the inactivity timer.
    Ping,
}

/// Control replies sent to subscribers (deltas are sent as [`StateDelta`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ServerMessage {
    /// The subscription is active.
    Subscribed {
        /// Handle assigned to the connection.
        connection_id: ConnectionId,
    },
    /// Reply to [`ClientMessage::Ping`].
    Pong,
    /// The last client message could not be handled.
    Error {
        /// What went wrong.
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Control surface
// ---------------------------------------------------------------------------

/// Live load signals reported by `GET /api/metrics`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct LoadMetrics {
    /// Host CPU utilisation in `[0, 1]`.
    pub cpu: f64,
    /// Host memory utilisation in `[0, 1]`.
    pub memory: f64,
    /// Connected broadcast subscribers.
    pub active_connections: u64,
    /// Tasks queued across all shards.
    pub queue_depth: u64,
    /// Whether the hub is signalling connection pressure.
    pub connection_pressure: bool,
    /// Current phase of every shard scheduler.
    pub phases: Vec<SchedulerPhase>,
    /// Current cycle interval of every shard scheduler.
    pub cycle_interval_ms: Vec<u64>,
}
