//! Shared load signals and the host sampler that feeds them.
//!
//! The gauge is written by three parties (the host sampler, the broadcast
//! hub, and the schedulers) and read by every shard after each cycle to
//! pick its next interval. All fields are atomics; floats are stored as
//! their bit patterns.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use sysinfo::{CpuRefreshKind, MemoryRefreshKind, RefreshKind, System};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::LoadWeights;

/// Latest host and connection load, shared behind `Arc`.
#[derive(Debug)]
pub struct LoadGauge {
    cpu: AtomicU64,
    memory: AtomicU64,
    active_connections: AtomicU64,
    high_connections: u64,
    connection_pressure: AtomicBool,
}

impl LoadGauge {
    /// A gauge whose connection ratio is relative to `high_connections`.
    pub const fn new(high_connections: u64) -> Self {
        Self {
            cpu: AtomicU64::new(0),
            memory: AtomicU64::new(0),
            active_connections: AtomicU64::new(0),
            high_connections,
            connection_pressure: AtomicBool::new(false),
        }
    }

    /// Record a host sample. Values are clamped to `[0, 1]`.
    pub fn record_host(&self, cpu: f64, memory: f64) {
        self.cpu
            .store(clamp_unit(cpu).to_bits(), Ordering::Relaxed);
        self.memory
            .store(clamp_unit(memory).to_bits(), Ordering::Relaxed);
    }

    /// Host CPU utilisation in `[0, 1]`.
    pub fn cpu(&self) -> f64 {
        f64::from_bits(self.cpu.load(Ordering::Relaxed))
    }

    /// Host memory utilisation in `[0, 1]`.
    pub fn memory(&self) -> f64 {
        f64::from_bits(self.memory.load(Ordering::Relaxed))
    }

    /// Record the hub's active connection count.
    pub fn set_connections(&self, active: u64) {
        self.active_connections.store(active, Ordering::Relaxed);
    }

    /// Active connections as last reported by the hub.
    pub fn active_connections(&self) -> u64 {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// Connection count at which the hub raises pressure.
    pub const fn high_connections(&self) -> u64 {
        self.high_connections
    }

    /// Raise or clear connection pressure. Returns the previous value.
    pub fn set_pressure(&self, pressure: bool) -> bool {
        self.connection_pressure.swap(pressure, Ordering::Relaxed)
    }

    /// Whether the hub currently reports connection pressure.
    pub fn connection_pressure(&self) -> bool {
        self.connection_pressure.load(Ordering::Relaxed)
    }

    /// Active connections relative to the high threshold, capped at 1.
    pub fn connection_ratio(&self) -> f64 {
        if self.high_connections == 0 {
            return 0.0;
        }
        let active = u32::try_from(self.active_connections()).unwrap_or(u32::MAX);
        let high = u32::try_from(self.high_connections).unwrap_or(u32::MAX);
        clamp_unit(f64::from(active) / f64::from(high))
    }

    /// Weighted load score in `[0, 1]`.
    pub fn score(&self, weights: &LoadWeights) -> f64 {
        let total = weights.cpu + weights.memory + weights.connections;
        if total <= 0.0 {
            return 0.0;
        }
        let weighted = weights.cpu * self.cpu()
            + weights.memory * self.memory()
            + weights.connections * self.connection_ratio();
        clamp_unit(weighted / total)
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// Memory in use as a fraction of total.
fn memory_ratio(total_bytes: u64, available_bytes: u64) -> f64 {
    const MIB: u64 = 1024 * 1024;
    let total = u32::try_from(total_bytes / MIB).unwrap_or(u32::MAX);
    if total == 0 {
        return 0.0;
    }
    let used = u32::try_from(total_bytes.saturating_sub(available_bytes) / MIB).unwrap_or(u32::MAX);
    clamp_unit(f64::from(used) / f64::from(total))
}

/// Spawn the host sampler: refreshes CPU and memory every `period` until
/// `shutdown` flips to `true`.
pub fn spawn_host_sampler(
    gauge: Arc<LoadGauge>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut system = System::new_with_specifics(
            RefreshKind::new()
                .with_cpu(CpuRefreshKind::everything())
                .with_memory(MemoryRefreshKind::everything()),
        );
        let mut ticker = tokio::time::interval(period.max(Duration::from_millis(1)));
        info!(period_ms = period.as_millis(), "host sampler started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    system.refresh_cpu_usage();
                    system.refresh_memory();
                    let cpu = f64::from(system.global_cpu_info().cpu_usage()) / 100.0;
                    let memory = memory_ratio(system.total_memory(), system.available_memory());
                    gauge.record_host(cpu, memory);
                    debug!(cpu, memory, "host sample");
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("host sampler stopped");
    })
}
