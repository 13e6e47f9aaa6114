//! Adaptive learning: rolling outcome windows and specialization scores.
//!
//! Each resolved decision appends one [`OutcomeRecord`] to the faction's
//! window. From the window two things are derived:
//!
//! | Specialization       | Successful outcomes that count       |
//! |----------------------|--------------------------------------|
//! | `economic_warfare`   | attack on a target valued >= 8       |
//! | `border_skirmishing` | attack on a target valued < 8        |
//! | `rapid_expansion`    | expand                               |
//! | `fortress_building`  | fortify or defend                    |
//! | `diplomatic_network` | negotiate                            |
//!
//! Activation is matching successes divided by window *capacity*, so a
//! score only reaches 1.0 once the whole window is full of matching
//! successes, and it never decreases until eviction starts.

use chrono::{DateTime, Utc};
use hegemony_types::{ActionKind, AdaptationState, OutcomeRecord, Specialization};
use serde::Deserialize;

/// Tuning for the learning loop.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LearningConfig {
    /// Number of outcomes kept per faction.
    #[serde(default = "default_window_capacity")]
    pub window_capacity: usize,
    /// Strategic value at or above which an attack counts as economic
    /// warfare rather than border skirmishing.
    #[serde(default = "default_economic_threshold")]
    pub economic_threshold: u8,
    /// Capacity of the channel feeding outcomes to the learning task.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

const fn default_window_capacity() -> usize {
    50
}

const fn default_economic_threshold() -> u8 {
    8
}

const fn default_channel_capacity() -> usize {
    1024
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            window_capacity: default_window_capacity(),
            economic_threshold: default_economic_threshold(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// Which specialization a successful outcome feeds, if any.
pub const fn specialization_for(
    action: ActionKind,
    target_value: u8,
    economic_threshold: u8,
) -> Option<Specialization> {
    match action {
        ActionKind::Attack if target_value >= economic_threshold => {
            Some(Specialization::EconomicWarfare)
        }
        ActionKind::Attack => Some(Specialization::BorderSkirmishing),
        ActionKind::Expand => Some(Specialization::RapidExpansion),
        ActionKind::Fortify | ActionKind::Defend => Some(Specialization::FortressBuilding),
        ActionKind::Negotiate => Some(Specialization::DiplomaticNetwork),
        ActionKind::Patrol | ActionKind::Retreat => None,
    }
}

/// One outcome to fold into a faction's adaptation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    /// The action that was taken.
    pub action: ActionKind,
    /// Whether it succeeded.
    pub success: bool,
    /// Influence gained or lost.
    pub influence_delta: i64,
    /// Strategic value of the target.
    pub target_value: u8,
    /// When the outcome was resolved.
    pub at: DateTime<Utc>,
}

impl Outcome {
    /// An outcome stamped with the current time.
    pub fn now(action: ActionKind, success: bool, influence_delta: i64, target_value: u8) -> Self {
        Self {
            action,
            success,
            influence_delta,
            target_value,
            at: Utc::now(),
        }
    }
}

/// Append an outcome, evicting the oldest entry beyond capacity, then
/// recompute the success rate and every specialization score.
pub fn apply_outcome(state: &mut AdaptationState, outcome: Outcome, economic_threshold: u8) {
    state.window.push_back(OutcomeRecord {
        success: outcome.success,
        influence_delta: outcome.influence_delta,
        timestamp: outcome.at,
        action: outcome.action,
        target_value: outcome.target_value,
    });
    while state.window.len() > state.capacity {
        state.window.pop_front();
    }
    recompute(state, economic_threshold);
}

/// Recompute derived scores from the window.
pub fn recompute(state: &mut AdaptationState, economic_threshold: u8) {
    let successes = state.window.iter().filter(|r| r.success).count();
    state.success_rate = ratio(successes, state.window.len());

    for specialization in Specialization::ALL {
        let matching = state
            .window
            .iter()
            .filter(|r| {
                r.success
                    && specialization_for(r.action, r.target_value, economic_threshold)
                        == Some(specialization)
            })
            .count();
        state
            .specializations
            .insert(specialization, ratio(matching, state.capacity));
    }
}

/// Clear the window and all derived scores.
pub fn reset(state: &mut AdaptationState) {
    state.window.clear();
    state.success_rate = 0.0;
    for specialization in Specialization::ALL {
        state.specializations.insert(specialization, 0.0);
    }
}

#[allow(clippy::cast_precision_loss)]
fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64).clamp(0.0, 1.0)
}
