//! The State Store Adapter: cached snapshot reads and batched writes in
//! front of a [`StateStore`].
//!
//! Reads are served from an in-process `Arc<MapSnapshot>` while it is
//! younger than the cache TTL, or while writes are still pending (the store
//! would be stale). A failed read logs and serves the last-known snapshot.
//!
//! Writes are staged into a [`PendingBatch`] and written by [`flush`], which
//! is serialized by a single-writer lock. Each sub-batch is retried with
//! bounded exponential backoff and each attempt is cut off after the write
//! timeout; a part that still fails is merged back into
//! the pending batch (newer staged rows win) and retried on the next flush.
//! After `degraded_after` consecutive failed flushes or reads the adapter
//! reports itself degraded until the next success.
//!
//! [`flush`]: StoreAdapter::flush

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use hegemony_types::{
    CascadeSummary, Decision, FactionId, FactionProfile, FactionStanding, MapSnapshot, Territory,
    TerritoryId,
};
use hegemony_world::{SnapshotRecords, WorldError, assemble};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::dragonfly::DragonflyPool;
use crate::error::StoreError;
use crate::store::StateStore;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Connection and write-path tuning for the adapter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoreConfig {
    /// `PostgreSQL` URL. `None` runs on the in-memory store.
    #[serde(default)]
    pub database_url: Option<String>,
    /// `Dragonfly` URL for the hot snapshot mirror. `None` disables it.
    #[serde(default)]
    pub dragonfly_url: Option<String>,
    /// How long a cached snapshot is served before re-reading the store.
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,
    /// Attempts per sub-batch within one flush.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    /// First backoff delay; doubles per attempt.
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,
    /// Backoff ceiling.
    #[serde(default = "default_retry_max_ms")]
    pub retry_max_ms: u64,
    /// Longest a single write attempt may take before it counts as failed.
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
    /// Consecutive failures before the degraded flag is raised.
    #[serde(default = "default_degraded_after")]
    pub degraded_after: u32,
    /// Cap on pending log rows (decisions plus cascade summaries); the
    /// oldest are dropped beyond it.
    #[serde(default = "default_max_pending")]
    pub max_pending: usize,
}

const fn default_cache_ttl_ms() -> u64 {
    250
}

const fn default_retry_attempts() -> u32 {
    3
}

const fn default_retry_base_ms() -> u64 {
    10
}

const fn default_retry_max_ms() -> u64 {
    200
}

const fn default_write_timeout_ms() -> u64 {
    2_000
}

const fn default_degraded_after() -> u32 {
    3
}

const fn default_max_pending() -> usize {
    10_000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            dragonfly_url: None,
            cache_ttl_ms: default_cache_ttl_ms(),
            retry_attempts: default_retry_attempts(),
            retry_base_ms: default_retry_base_ms(),
            retry_max_ms: default_retry_max_ms(),
            write_timeout_ms: default_write_timeout_ms(),
            degraded_after: default_degraded_after(),
            max_pending: default_max_pending(),
        }
    }
}

impl StoreConfig {
    /// Apply `DATABASE_URL` and `DRAGONFLY_URL` from the environment.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            if !url.is_empty() {
                self.database_url = Some(url);
            }
        }
        if let Ok(url) = std::env::var("DRAGONFLY_URL") {
            if !url.is_empty() {
                self.dragonfly_url = Some(url);
            }
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let delay = self
            .retry_base_ms
            .saturating_mul(2_u64.saturating_pow(attempt))
            .min(self.retry_max_ms);
        Duration::from_millis(delay)
    }
}

// ---------------------------------------------------------------------------
// Pending batch
// ---------------------------------------------------------------------------

/// Writes staged since the last successful flush.
#[derive(Debug, Default, Clone)]
pub struct PendingBatch {
    /// Decisions to append, oldest first.
    pub decisions: Vec<Decision>,
    /// Latest profile per faction.
    pub profiles: BTreeMap<FactionId, FactionProfile>,
    /// Latest control/contested state per territory.
    pub territories: BTreeMap<TerritoryId, Territory>,
    /// Latest standing per faction.
    pub standings: BTreeMap<FactionId, FactionStanding>,
    /// Cascade summaries to append, oldest first.
    pub cascades: Vec<CascadeSummary>,
}

impl PendingBatch {
    /// Whether nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
            && self.profiles.is_empty()
            && self.territories.is_empty()
            && self.standings.is_empty()
            && self.cascades.is_empty()
    }

    /// Total staged rows.
    pub fn len(&self) -> usize {
        self.decisions
            .len()
            .saturating_add(self.profiles.len())
            .saturating_add(self.territories.len())
            .saturating_add(self.standings.len())
            .saturating_add(self.cascades.len())
    }

    /// Put `newer` on top of `self`: log rows append after ours, keyed rows
    /// replace ours.
    fn absorb(&mut self, newer: Self) {
        self.decisions.extend(newer.decisions);
        self.cascades.extend(newer.cascades);
        self.profiles.extend(newer.profiles);
        self.territories.extend(newer.territories);
        self.standings.extend(newer.standings);
    }

    /// Drop the oldest log rows beyond `cap`. Returns how many were dropped.
    fn cap(&mut self, cap: usize) -> usize {
        let mut dropped = 0_usize;
        let logs = self.decisions.len().saturating_add(self.cascades.len());
        let mut excess = logs.saturating_sub(cap);
        if excess > 0 {
            let from_decisions = excess.min(self.decisions.len());
            self.decisions.drain(..from_decisions);
            excess = excess.saturating_sub(from_decisions);
            dropped = dropped.saturating_add(from_decisions);
            let from_cascades = excess.min(self.cascades.len());
            self.cascades.drain(..from_cascades);
            dropped = dropped.saturating_add(from_cascades);
        }
        dropped
    }
}

/// Rows written by one flush.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FlushReport {
    /// Decisions appended.
    pub decisions: usize,
    /// Profiles upserted.
    pub profiles: usize,
    /// Territories updated.
    pub territories: usize,
    /// Standings updated.
    pub standings: usize,
    /// Cascade summaries appended.
    pub cascades: usize,
}

impl FlushReport {
    /// Total rows written.
    pub const fn total(&self) -> usize {
        self.decisions
            .saturating_add(self.profiles)
            .saturating_add(self.territories)
            .saturating_add(self.standings)
            .saturating_add(self.cascades)
    }
}

// ---------------------------------------------------------------------------
// Startup and health
// ---------------------------------------------------------------------------

/// Where the starting map came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotSource {
    /// Rows already in the durable store.
    Store,
    /// The `Dragonfly` mirror, because the store was unreachable.
    HotCache,
    /// The campaign seed.
    Seed,
}

/// Map and profiles to start the coordinator on.
#[derive(Debug)]
pub struct InitialState {
    /// The starting snapshot.
    pub snapshot: MapSnapshot,
    /// Starting profiles (stored ones, or the seed's).
    pub profiles: Vec<FactionProfile>,
    /// Where the snapshot came from.
    pub source: SnapshotSource,
    /// Rows rejected while assembling the snapshot.
    pub violations: Vec<WorldError>,
}

/// Persistence health as reported on `GET /api/health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreHealth {
    /// Backend name.
    pub backend: &'static str,
    /// Whether persistence is failing persistently.
    pub degraded: bool,
    /// Consecutive failed flushes or reads.
    pub consecutive_failures: u32,
    /// Rows staged but not yet written.
    pub pending_writes: usize,
    /// Rows rejected for breaking a map invariant.
    pub invariant_violations: u64,
    /// Log rows dropped because the pending batch was full.
    pub dropped_writes: u64,
    /// Age of the cached snapshot.
    pub cache_age_ms: u64,
    /// Version of the cached snapshot.
    pub snapshot_version: u64,
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct CachedSnapshot {
    snapshot: Arc<MapSnapshot>,
    fetched_at: Instant,
}

/// Cached reads and single-writer batched persistence over a [`StateStore`].
pub struct StoreAdapter {
    store: Arc<dyn StateStore>,
    hot: Option<DragonflyPool>,
    config: StoreConfig,
    cache: RwLock<CachedSnapshot>,
    ttl_ms: AtomicU64,
    pending: Mutex<PendingBatch>,
    flush_lock: Mutex<()>,
    consecutive_failures: AtomicU32,
    degraded: AtomicBool,
    load_violations: AtomicU64,
    runtime_violations: AtomicU64,
    dropped_writes: AtomicU64,
}

impl StoreAdapter {
    /// Wrap a store. `hot` mirrors good snapshots when present.
    pub fn new(store: Arc<dyn StateStore>, hot: Option<DragonflyPool>, config: StoreConfig) -> Self {
        Self {
            store,
            hot,
            ttl_ms: AtomicU64::new(config.cache_ttl_ms),
            config,
            cache: RwLock::new(CachedSnapshot {
                snapshot: Arc::new(MapSnapshot::empty()),
                fetched_at: Instant::now(),
            }),
            pending: Mutex::new(PendingBatch::default()),
            flush_lock: Mutex::new(()),
            consecutive_failures: AtomicU32::new(0),
            degraded: AtomicBool::new(false),
            load_violations: AtomicU64::new(0),
            runtime_violations: AtomicU64::new(0),
            dropped_writes: AtomicU64::new(0),
        }
    }

    /// Name of the wrapped backend.
    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    /// Load the starting map.
    ///
    /// Stored rows win. An empty store is seeded from `seed`. An unreachable
    /// store falls back to the `Dragonfly` mirror, then to the seed.
    pub async fn load_initial(
        &self,
        seed: &SnapshotRecords,
        seed_profiles: &[FactionProfile],
    ) -> InitialState {
        let state = match self.store.load_snapshot().await {
            Ok(records) if !records.territories.is_empty() => {
                let profiles = match self.store.load_profiles().await {
                    Ok(stored) if !stored.is_empty() => stored,
                    Ok(_) => seed_profiles.to_vec(),
                    Err(e) => {
                        warn!(error = %e, "profile load failed, using campaign profiles");
                        seed_profiles.to_vec()
                    }
                };
                let assembly = assemble(records);
                InitialState {
                    snapshot: assembly.snapshot,
                    profiles,
                    source: SnapshotSource::Store,
                    violations: assembly.violations,
                }
            }
            Ok(_) => {
                if let Err(e) = self.store.seed_campaign(seed, seed_profiles).await {
                    error!(error = %e, "seeding the store failed; running from the seed in memory");
                    self.note_failure();
                }
                self.from_seed(seed, seed_profiles)
            }
            Err(e) => {
                warn!(error = %e, backend = self.backend(), "store unreachable at startup");
                self.note_failure();
                match (self.hot.as_ref(), self.hot_snapshot().await) {
                    (Some(hot), Some(snapshot)) => InitialState {
                        snapshot,
                        profiles: recover_profiles(seed_profiles, move |id| hot.get_profile(id)).await,
                        source: SnapshotSource::HotCache,
                        violations: Vec::new(),
                    },
                    _ => self.from_seed(seed, seed_profiles),
                }
            }
        };

        self.load_violations
            .store(state.violations.len() as u64, Ordering::Relaxed);
        self.publish(Arc::new(state.snapshot.clone())).await;
        info!(
            source = ?state.source,
            version = state.snapshot.version,
            territories = state.snapshot.territories.len(),
            factions = state.snapshot.factions.len(),
            violations = state.violations.len(),
            "initial snapshot loaded"
        );
        state
    }

    fn from_seed(&self, seed: &SnapshotRecords, seed_profiles: &[FactionProfile]) -> InitialState {
        let assembly = assemble(seed.clone());
        debug!(backend = self.backend(), "starting from campaign seed");
        InitialState {
            snapshot: assembly.snapshot,
            profiles: seed_profiles.to_vec(),
            source: SnapshotSource::Seed,
            violations: assembly.violations,
        }
    }

    async fn hot_snapshot(&self) -> Option<MapSnapshot> {
        let hot = self.hot.as_ref()?;
        match hot.get_snapshot().await {
            Ok(snapshot) => {
                info!(version = snapshot.version, "recovered snapshot from Dragonfly");
                Some(snapshot)
            }
            Err(e) => {
                warn!(error = %e, "no usable Dragonfly snapshot");
                None
            }
        }
    }

    /// The current map snapshot.
    ///
    /// Served from cache while fresh or while writes are pending; otherwise
    /// re-read from the store. A failed read serves the last-known snapshot.
    pub async fn snapshot(&self) -> Arc<MapSnapshot> {
        let ttl = Duration::from_millis(self.ttl_ms.load(Ordering::Relaxed));
        let current = {
            let cache = self.cache.read().await;
            if cache.fetched_at.elapsed() < ttl || !self.pending.lock().await.is_empty() {
                return Arc::clone(&cache.snapshot);
            }
            Arc::clone(&cache.snapshot)
        };

        match self.store.load_snapshot().await {
            Ok(mut records) => {
                records.version = current.version;
                let assembly = assemble(records);
                self.load_violations
                    .store(assembly.violations.len() as u64, Ordering::Relaxed);
                self.note_success();
                let fresh = Arc::new(assembly.snapshot);
                self.publish(Arc::clone(&fresh)).await;
                fresh
            }
            Err(e) => {
                warn!(error = %e, version = current.version, "snapshot read failed, serving last-known");
                self.note_failure();
                // Back off for one TTL before asking the store again.
                self.cache.write().await.fetched_at = Instant::now();
                current
            }
        }
    }

    /// The cached snapshot, without consulting the store.
    pub async fn cached(&self) -> Arc<MapSnapshot> {
        Arc::clone(&self.cache.read().await.snapshot)
    }

    /// Replace the cached snapshot with one the coordinator just built.
    pub async fn publish(&self, snapshot: Arc<MapSnapshot>) {
        let mut cache = self.cache.write().await;
        cache.snapshot = snapshot;
        cache.fetched_at = Instant::now();
    }

    /// Stage decisions for the next flush.
    pub async fn stage_decisions(&self, decisions: &[Decision]) {
        if decisions.is_empty() {
            return;
        }
        let mut pending = self.pending.lock().await;
        pending.decisions.extend_from_slice(decisions);
        self.enforce_cap(&mut pending);
    }

    /// Stage a profile upsert; a later profile for the same faction wins.
    pub async fn stage_profile(&self, profile: FactionProfile) {
        self.pending
            .lock()
            .await
            .profiles
            .insert(profile.faction_id, profile);
    }

    /// Stage territory state; a later row for the same territory wins.
    pub async fn stage_territories(&self, territories: Vec<Territory>) {
        let mut pending = self.pending.lock().await;
        for territory in territories {
            pending.territories.insert(territory.id, territory);
        }
    }

    /// Stage faction standings; a later row for the same faction wins.
    pub async fn stage_standings(&self, standings: Vec<FactionStanding>) {
        let mut pending = self.pending.lock().await;
        for standing in standings {
            pending.standings.insert(standing.faction_id, standing);
        }
    }

    /// Stage a cascade summary.
    pub async fn stage_cascade(&self, summary: CascadeSummary) {
        let mut pending = self.pending.lock().await;
        pending.cascades.push(summary);
        self.enforce_cap(&mut pending);
    }

    fn enforce_cap(&self, pending: &mut PendingBatch) {
        let dropped = pending.cap(self.config.max_pending);
        if dropped > 0 {
            self.dropped_writes
                .fetch_add(dropped as u64, Ordering::Relaxed);
            warn!(dropped, cap = self.config.max_pending, "pending batch full, dropped oldest rows");
        }
    }

    /// Rows staged but not yet written.
    pub async fn pending_len(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Write everything staged.
    ///
    /// Only one flush runs at a time. On error the unwritten rows stay
    /// pending and the last error is returned.
    pub async fn flush(&self) -> Result<FlushReport, StoreError> {
        let _writer = self.flush_lock.lock().await;
        let batch = std::mem::take(&mut *self.pending.lock().await);
        if batch.is_empty() {
            return Ok(FlushReport::default());
        }

        let mut report = FlushReport::default();
        let mut unwritten = PendingBatch::default();
        let mut last_error = None;

        if !batch.decisions.is_empty() {
            match self
                .with_retry("append_decisions", || {
                    self.store.append_decisions(&batch.decisions)
                })
                .await
            {
                Ok(()) => report.decisions = batch.decisions.len(),
                Err(e) => {
                    unwritten.decisions.clone_from(&batch.decisions);
                    last_error = Some(e);
                }
            }
        }

        for profile in batch.profiles.values() {
            match self
                .with_retry("update_profile", || self.store.update_profile(profile))
                .await
            {
                Ok(()) => report.profiles = report.profiles.saturating_add(1),
                Err(e) => {
                    unwritten.profiles.insert(profile.faction_id, profile.clone());
                    last_error = Some(e);
                }
            }
        }

        if !batch.territories.is_empty() {
            let rows: Vec<Territory> = batch.territories.values().cloned().collect();
            match self
                .with_retry("update_territories", || self.store.update_territories(&rows))
                .await
            {
                Ok(()) => report.territories = rows.len(),
                Err(e) => {
                    unwritten.territories.clone_from(&batch.territories);
                    last_error = Some(e);
                }
            }
        }

        if !batch.standings.is_empty() {
            let rows: Vec<FactionStanding> = batch.standings.values().cloned().collect();
            match self
                .with_retry("update_standings", || self.store.update_standings(&rows))
                .await
            {
                Ok(()) => report.standings = rows.len(),
                Err(e) => {
                    unwritten.standings.clone_from(&batch.standings);
                    last_error = Some(e);
                }
            }
        }

        if !batch.cascades.is_empty() {
            match self
                .with_retry("append_cascades", || {
                    self.store.append_cascades(&batch.cascades)
                })
                .await
            {
                Ok(()) => report.cascades = batch.cascades.len(),
                Err(e) => {
                    unwritten.cascades.clone_from(&batch.cascades);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            None => {
                self.note_success();
                self.mirror(&batch).await;
                debug!(rows = report.total(), "flushed pending batch");
                Ok(report)
            }
            Some(e) => {
                {
                    let mut pending = self.pending.lock().await;
                    let newer = std::mem::take(&mut *pending);
                    unwritten.absorb(newer);
                    *pending = unwritten;
                    self.enforce_cap(&mut pending);
                }
                self.note_failure();
                error!(
                    error = %e,
                    written = report.total(),
                    failures = self.consecutive_failures.load(Ordering::Relaxed),
                    "flush failed, rows kept pending"
                );
                Err(e)
            }
        }
    }

    async fn with_retry<F, Fut>(&self, op: &'static str, mut call: F) -> Result<(), StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), StoreError>>,
    {
        let attempts = self.config.retry_attempts.max(1);
        let limit = Duration::from_millis(self.config.write_timeout_ms);
        let mut attempt = 0_u32;
        loop {
            let outcome = tokio::time::timeout(limit, call())
                .await
                .unwrap_or_else(|_| {
                    Err(StoreError::Unavailable(format!(
                        "{op} timed out after {}ms",
                        limit.as_millis()
                    )))
                });
            match outcome {
                Ok(()) => return Ok(()),
                Err(e) => {
                    attempt = attempt.saturating_add(1);
                    if attempt >= attempts {
                        return Err(e);
                    }
                    let delay = self.config.backoff(attempt.saturating_sub(1));
                    warn!(op, attempt, delay_ms = delay.as_millis(), error = %e, "store write failed, retrying");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn mirror(&self, batch: &PendingBatch) {
        let Some(hot) = self.hot.as_ref() else {
            return;
        };
        let snapshot = self.cached().await;
        if let Err(e) = hot.set_snapshot(&snapshot).await {
            warn!(error = %e, "Dragonfly snapshot mirror failed");
        }
        for profile in batch.profiles.values() {
            if let Err(e) = hot.set_profile(profile).await {
                warn!(error = %e, faction_id = %profile.faction_id, "Dragonfly profile mirror failed");
            }
        }
    }

    fn note_success(&self) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
        if self.degraded.swap(false, Ordering::Relaxed) {
            info!(backend = self.backend(), "state store recovered");
        }
    }

    fn note_failure(&self) {
        let failures = self
            .consecutive_failures
            .fetch_add(1, Ordering::Relaxed)
            .saturating_add(1);
        if failures >= self.config.degraded_after && !self.degraded.swap(true, Ordering::Relaxed) {
            error!(backend = self.backend(), failures, "state store degraded");
        }
    }

    /// Shrink the cache TTL while the scheduler is throttled.
    pub fn set_throttled(&self, throttled: bool) {
        let ttl = if throttled {
            self.config.cache_ttl_ms / 2
        } else {
            self.config.cache_ttl_ms
        };
        self.ttl_ms.store(ttl, Ordering::Relaxed);
    }

    /// The cache TTL currently in force.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms.load(Ordering::Relaxed))
    }

    /// Count invariant violations detected outside snapshot assembly.
    pub fn record_violations(&self, count: u64) {
        self.runtime_violations.fetch_add(count, Ordering::Relaxed);
    }

    /// Whether persistence is degraded.
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    /// Current persistence health.
    pub async fn health(&self) -> StoreHealth {
        let (cache_age_ms, snapshot_version) = {
            let cache = self.cache.read().await;
            (
                u64::try_from(cache.fetched_at.elapsed().as_millis()).unwrap_or(u64::MAX),
                cache.snapshot.version,
            )
        };
        StoreHealth {
            backend: self.backend(),
            degraded: self.is_degraded(),
            consecutive_failures: self.consecutive_failures.load(Ordering::Relaxed),
            pending_writes: self.pending_len().await,
            invariant_violations: self
                .load_violations
                .load(Ordering::Relaxed)
                .saturating_add(self.runtime_violations.load(Ordering::Relaxed)),
            dropped_writes: self.dropped_writes.load(Ordering::Relaxed),
            cache_age_ms,
            snapshot_version,
        }
    }
}

/// Profiles mirrored next to a recovered snapshot, one per seed faction.
///
/// A faction whose mirror is missing, unreadable, or belongs to someone else
/// keeps its seed profile.
async fn recover_profiles<F, Fut>(seed_profiles: &[FactionProfile], mut fetch: F) -> Vec<FactionProfile>
where
    F: FnMut(FactionId) -> Fut,
    Fut: Future<Output = Result<FactionProfile, StoreError>>,
{
    let mut profiles = Vec::with_capacity(seed_profiles.len());
    let mut recovered = 0_usize;
    for seed in seed_profiles {
        match fetch(seed.faction_id).await {
            Ok(profile) if profile.faction_id == seed.faction_id => {
                recovered = recovered.saturating_add(1);
                profiles.push(profile);
            }
            Ok(profile) => {
                warn!(
                    faction_id = %seed.faction_id,
                    stored = %profile.faction_id,
                    "mirrored profile under the wrong key, using the seed"
                );
                profiles.push(seed.clone());
            }
            Err(StoreError::KeyNotFound(_)) => {
                debug!(faction_id = %seed.faction_id, "no mirrored profile, using the seed");
                profiles.push(seed.clone());
            }
            Err(e) => {
                warn!(error = %e, faction_id = %seed.faction_id, "mirrored profile unreadable, using the seed");
                profiles.push(seed.clone());
            }
        }
    }
    info!(recovered, total = profiles.len(), "recovered profiles from Dragonfly");
    profiles
}

impl core::fmt::Debug for StoreAdapter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StoreAdapter")
            .field("backend", &self.backend())
            .field("hot_cache", &self.hot.is_some())
            .field("degraded", &self.is_degraded())
            .finish_non_exhaustive()
    }
}
