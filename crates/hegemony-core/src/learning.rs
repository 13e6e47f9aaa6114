//! The learning task: folds resolved outcomes into faction profiles.
//!
//! Shard loops never touch adaptation state. They hand each resolved
//! decision to this task over a bounded channel; the task updates the
//! registry and stages the new profile for persistence. The task ends
//! when every sender is dropped.

use std::sync::Arc;

use hegemony_db::StoreAdapter;
use hegemony_factions::ProfileRegistry;
use hegemony_types::Decision;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// One resolved decision on its way to the learning loop.
#[derive(Debug, Clone, PartialEq)]
pub struct LearningInput {
    /// The decision that was resolved.
    pub decision: Decision,
    /// Whether it succeeded.
    pub success: bool,
    /// Influence gained or lost.
    pub influence_delta: i64,
    /// Strategic value of the target.
    pub target_value: u8,
}

/// Spawn the learning task. Resolves to the number of outcomes applied.
pub fn spawn_learning_task(
    registry: Arc<ProfileRegistry>,
    adapter: Arc<StoreAdapter>,
    mut outcomes: mpsc::Receiver<LearningInput>,
) -> JoinHandle<u64> {
    tokio::spawn(async move {
        let mut applied: u64 = 0;
        info!("learning task started");
        while let Some(input) = outcomes.recv().await {
            match registry.record_outcome(
                &input.decision,
                input.success,
                input.influence_delta,
                input.target_value,
            ) {
                Ok(profile) => {
                    adapter.stage_profile(profile).await;
                    applied = applied.saturating_add(1);
                }
                Err(e) => {
                    warn!(
                        faction_id = %input.decision.faction_id,
                        error = %e,
                        "outcome dropped"
                    );
                }
            }
        }
        info!(applied, "learning task stopped");
        applied
    })
}
