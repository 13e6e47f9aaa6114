//! Shared type definitions for the Hegemony coordinator.
//!
//! Every crate in the workspace speaks in these types. Wire-facing types
//! derive `ts-rs` so observer clients can consume generated `TypeScript`
//! bindings.
//!
//! # Modules
//!
//! - [`ids`] -- Integer and UUID identifier wrappers
//! - [`enums`] -- Archetypes, actions, trigger kinds, specializations, phases
//! - [`structs`] -- Territories, faction profiles, the map snapshot
//! - [`decision`] -- The per-cycle decision record
//! - [`cascade`] -- Cascade effects and their persisted summaries
//! - [`wire`] -- Broadcast deltas, subscription filters, control payloads

pub mod cascade;
pub mod decision;
pub mod enums;
pub mod ids;
pub mod structs;
pub mod wire;

pub use cascade::{AffectedTerritory, CascadeEffect, CascadeSummary};
pub use decision::Decision;
pub use enums::{
    ActionKind, DeltaKind, SchedulerPhase, Specialization, StrategyArchetype, TriggerKind,
};
pub use ids::{ConnectionId, DecisionId, FactionId, TerritoryId};
pub use structs::{
    AdaptationState, FactionProfile, FactionStanding, FactionTraits, MAX_STRATEGIC_VALUE,
    MIN_STRATEGIC_VALUE, MapSnapshot, OutcomeRecord, Territory,
};
pub use wire::{
    ClientMessage, DeltaPayload, LoadMetrics, ServerMessage, StateDelta, SubscriptionFilter,
};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation for wire-facing types.

    #[test]
    fn export_bindings() {
        use ts_rs::TS;

        let _ = crate::ids::FactionId::export_all();
        let _ = crate::ids::TerritoryId::export_all();
        let _ = crate::ids::ConnectionId::export_all();
        let _ = crate::ids::DecisionId::export_all();

        let _ = crate::enums::StrategyArchetype::export_all();
        let _ = crate::enums::ActionKind::export_all();
        let _ = crate::enums::TriggerKind::export_all();
        let _ = crate::enums::Specialization::export_all();
        let _ = crate::enums::SchedulerPhase::export_all();
        let _ = crate::enums::DeltaKind::export_all();

        let _ = crate::decision::Decision::export_all();
        let _ = crate::cascade::AffectedTerritory::export_all();
        let _ = crate::cascade::CascadeEffect::export_all();

        let _ = crate::wire::StateDelta::export_all();
        let _ = crate::wire::DeltaPayload::export_all();
        let _ = crate::wire::SubscriptionFilter::export_all();
        let _ = crate::wire::ClientMessage::export_all();
        let _ = crate::wire::ServerMessage::export_all();
        let _ = crate::wire::LoadMetrics::export_all();
    }
}
