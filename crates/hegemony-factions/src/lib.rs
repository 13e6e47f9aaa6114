//! Faction behaviour for the Hegemony coordinator.
//!
//! # Modules
//!
//! - [`registry`] -- [`ProfileRegistry`]: validated profiles, each behind its
//!   own mutex.
//! - [`learning`] -- Rolling outcome windows and specialization scores.
//! - [`decision`] -- Opportunity scoring, archetype strategies, and
//!   [`DecisionEngine`].
//! - [`deadline`] -- Cooperative per-task [`Deadline`].
//! - [`error`] -- [`ProfileError`] and [`DecisionError`].

pub mod deadline;
pub mod decision;
pub mod error;
pub mod learning;
pub mod registry;

pub use deadline::Deadline;
pub use decision::{DecisionConfig, DecisionEngine};
pub use error::{DecisionError, ProfileError};
pub use learning::{LearningConfig, Outcome};
pub use registry::ProfileRegistry;
