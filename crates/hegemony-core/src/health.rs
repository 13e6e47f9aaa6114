//! The health signal served on `GET /api/health`.
//!
//! Only two conditions make the coordinator unhealthy: persistence is
//! degraded, or stored rows broke a map invariant. Timeouts and
//! backpressure are routine and stay in the logs and cycle summaries.

use hegemony_db::StoreHealth;
use hegemony_types::SchedulerPhase;
use serde::Serialize;

/// Overall verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Everything nominal.
    Ok,
    /// Persistence is failing; the map is served from cache.
    Degraded,
    /// Persistence works but rows were rejected for breaking invariants.
    Inconsistent,
}

/// One shard's state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShardHealth {
    /// Shard index.
    pub shard: u32,
    /// Current phase.
    pub phase: SchedulerPhase,
    /// Queued tasks.
    pub queue_depth: usize,
    /// Current cycle interval.
    pub interval_ms: u64,
}

/// Full health report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    /// Overall verdict.
    pub status: HealthStatus,
    /// Persistence is degraded.
    pub degraded: bool,
    /// Rows rejected for breaking a map invariant.
    pub invariant_violations: u64,
    /// Seconds since the coordinator was built.
    pub uptime_secs: u64,
    /// Cycles run across all shards.
    pub cycles: u64,
    /// Persistence details.
    pub store: StoreHealth,
    /// Per-shard scheduler state.
    pub shards: Vec<ShardHealth>,
}

impl HealthReport {
    /// Derive the verdict from its parts.
    pub fn new(store: StoreHealth, shards: Vec<ShardHealth>, cycles: u64, uptime_secs: u64) -> Self {
        let status = if store.degraded {
            HealthStatus::Degraded
        } else if store.invariant_violations > 0 {
            HealthStatus::Inconsistent
        } else {
            HealthStatus::Ok
        };
        Self {
            status,
            degraded: store.degraded,
            invariant_violations: store.invariant_violations,
            uptime_secs,
            cycles,
            store,
            shards,
        }
    }

    /// Whether the status is [`HealthStatus::Ok`].
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Ok
    }
}
