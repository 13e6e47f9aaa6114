//! Error types for the `hegemony-world` crate.

use hegemony_types::{FactionId, TerritoryId};

/// Errors raised by territory-map operations, snapshot assembly, and
/// campaign loading.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// The territory does not exist in the map.
    #[error("territory not found: {0}")]
    TerritoryNotFound(TerritoryId),

    /// The faction does not exist in the map.
    #[error("faction not found: {0}")]
    FactionNotFound(FactionId),

    /// A territory id appeared twice.
    #[error("duplicate territory id: {0}")]
    DuplicateTerritory(TerritoryId),

    /// A faction id appeared twice.
    #[error("duplicate faction id: {0}")]
    DuplicateFaction(FactionId),

    /// Strategic value outside 1 through 10.
    #[error("territory {territory} has strategic value {value}, expected 1..=10")]
    InvalidStrategicValue {
        /// The offending territory.
        territory: TerritoryId,
        /// The out-of-range value.
        value: i64,
    },

    /// A second faction claimed control of an already-controlled territory.
    #[error("territory {territory} claimed by {second} but already controlled by {first}")]
    DuplicateController {
        /// The contested territory.
        territory: TerritoryId,
        /// The accepted controller.
        first: FactionId,
        /// The rejected claimant.
        second: FactionId,
    },

    /// An adjacency edge points at a territory that does not exist.
    #[error("adjacency {from} -> {to} references an unknown territory")]
    UnknownAdjacency {
        /// Edge source.
        from: TerritoryId,
        /// Edge target.
        to: TerritoryId,
    },

    /// An adjacency weight outside `[0, 1]`.
    #[error("adjacency {from} -> {to} has weight {weight}, expected 0..=1")]
    WeightOutOfRange {
        /// Edge source.
        from: TerritoryId,
        /// Edge target.
        to: TerritoryId,
        /// The offending weight.
        weight: f64,
    },

    /// An adjacency edge from a territory to itself.
    #[error("territory {0} is adjacent to itself")]
    SelfLoop(TerritoryId),

    /// The campaign seed file could not be read.
    #[error("failed to read campaign seed {path}: {source}")]
    CampaignRead {
        /// Path that was read.
        path: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The campaign seed is not valid YAML for the seed schema.
    #[error("failed to parse campaign seed: {source}")]
    CampaignParse {
        /// The underlying YAML error.
        #[from]
        source: serde_yml::Error,
    },
}

impl WorldError {
    /// Whether this error is a data-integrity violation that must be
    /// counted on the health signal.
    pub const fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Self::DuplicateController { .. }
                | Self::UnknownAdjacency { .. }
                | Self::WeightOutOfRange { .. }
                | Self::SelfLoop(_)
                | Self::InvalidStrategicValue { .. }
                | Self::DuplicateTerritory(_)
        )
    }
}
