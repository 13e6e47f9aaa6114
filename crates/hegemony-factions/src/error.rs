//! Error types for the `hegemony-factions` crate.

use hegemony_types::FactionId;

/// Errors raised by the profile registry and the learning loop.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    /// No profile is registered for the faction.
    #[error("no profile registered for faction {0}")]
    UnknownFaction(FactionId),

    /// Two profiles were supplied for the same faction.
    #[error("duplicate profile for faction {0}")]
    DuplicateFaction(FactionId),

    /// A trait scalar lies outside `[0, 1]`.
    #[error("faction {faction} trait {name} = {value} is outside [0, 1]")]
    TraitOutOfRange {
        /// The offending faction.
        faction: FactionId,
        /// Trait name.
        name: &'static str,
        /// The offending value.
        value: f64,
    },

    /// A compatibility score lies outside `[0, 1]`.
    #[error("faction {faction} compatibility with {other} = {value} is outside [0, 1]")]
    CompatibilityOutOfRange {
        /// The offending faction.
        faction: FactionId,
        /// The other faction.
        other: FactionId,
        /// The offending value.
        value: f64,
    },

    /// The adaptation window must hold at least one outcome.
    #[error("adaptation window capacity must be at least 1")]
    EmptyWindow,
}

/// Errors raised while producing a decision.
#[derive(Debug, thiserror::Error)]
pub enum DecisionError {
    /// The per-task deadline expired before a decision was produced.
    #[error("faction {faction_id} decision timed out (deadline: {deadline_ms}ms)")]
    Timeout {
        /// The faction whose task expired.
        faction_id: FactionId,
        /// The deadline that was exceeded.
        deadline_ms: u64,
    },

    /// The snapshot carries no standing for the faction.
    #[error("faction {0} has no standing in the snapshot")]
    UnknownFaction(FactionId),
}
