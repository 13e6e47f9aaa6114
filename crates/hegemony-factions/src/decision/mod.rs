//! The decision engine.
//!
//! - [`config`] -- [`DecisionConfig`] and per-action costs.
//! - [`opportunity`] -- Scoring of candidate territories and holdings.
//! - [`strategy`] -- The archetype strategy table.
//! - [`engine`] -- [`DecisionEngine::decide`].

pub mod config;
pub mod engine;
pub mod opportunity;
pub mod strategy;

pub use config::{ActionCosts, DecisionConfig};
pub use engine::DecisionEngine;
pub use opportunity::{Holding, Opportunity};
pub use strategy::{Choice, StrategyContext, StrategyFn, strategy_for};
