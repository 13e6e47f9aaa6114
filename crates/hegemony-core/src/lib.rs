//! Scheduling, outcome resolution, and the cycle pipeline for the Hegemony
//! territorial-control coordinator.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `hegemony-config.yaml` into
//!   strongly-typed structs.
//! - [`scheduler`] -- [`BudgetScheduler`], the per-shard cooperative
//!   scheduler with cycle budgets, deadlines, throttling, and draining.
//! - [`resolution`] -- [`OutcomeResolver`], which applies decisions to the
//!   authoritative map.
//! - [`coordinator`] -- [`Coordinator`], the pipeline tying decisions,
//!   resolution, cascades, learning, persistence, and deltas together.
//! - [`learning`] -- The task that folds outcomes into faction profiles.
//! - [`load`] -- [`LoadGauge`] and the host sampler.
//! - [`health`] -- [`HealthReport`].
//! - [`sink`] -- [`DeltaSink`], where each cycle's deltas go.
//! - [`error`] -- [`CoordinatorError`].

pub mod config;
pub mod coordinator;
pub mod error;
pub mod health;
pub mod learning;
pub mod load;
pub mod resolution;
pub mod scheduler;
pub mod sink;

pub use config::{ConfigError, CoordinatorConfig};
pub use coordinator::{Coordinator, CoordinatorTasks, CycleOutcome};
pub use error::CoordinatorError;
pub use health::{HealthReport, HealthStatus, ShardHealth};
pub use learning::LearningInput;
pub use load::{LoadGauge, spawn_host_sampler};
pub use resolution::{OutcomeResolver, Resolution};
pub use scheduler::{BudgetScheduler, SchedulerError, TaskOutcome};
pub use sink::{DeltaSink, NoOpSink, RecordingSink};
