//! The territorial world: authoritative map, snapshot assembly, campaign
//! seeds, and cascade propagation.
//!
//! # Modules
//!
//! - [`map`] -- [`TerritoryMap`], the single mutable map owned by the
//!   coordinator, with dirty-row tracking for persistence.
//! - [`records`] -- Flat storage rows and [`assemble`], which validates them
//!   into a [`MapSnapshot`] and reports rejected rows.
//! - [`campaign`] -- YAML campaign seeds and the built-in default campaign.
//! - [`cascade`] -- Breadth-first, seeded, budget-bounded cascade
//!   propagation.
//! - [`error`] -- [`WorldError`].
//!
//! [`MapSnapshot`]: hegemony_types::MapSnapshot

pub mod campaign;
pub mod cascade;
pub mod error;
pub mod map;
pub mod records;

pub use campaign::{CampaignSeed, FactionSeed, LinkSeed, TerritorySeed};
pub use cascade::{
    BaseProbabilities, CascadeConfig, CascadeEngine, CascadeError, STRATEGIC_NODE_THRESHOLD,
    control_change_trigger,
};
pub use error::WorldError;
pub use map::{Challenge, DirtyRows, TerritoryMap};
pub use records::{
    AdjacencyRecord, Assembly, ControlRecord, SnapshotRecords, TerritoryRecord, assemble,
};
