//! The coordinator pipeline.
//!
//! One [`Coordinator`] owns the authoritative [`TerritoryMap`] behind a
//! single mutex, one [`BudgetScheduler`] per shard, and the sending side
//! of the learning channel. Each shard loop repeats:
//!
//! 1. Run a scheduler cycle: decide for queued factions on the cached
//!    snapshot.
//! 2. Under the map lock, clear lapsed challenges, resolve the decisions,
//!    and publish a new snapshot.
//! 3. Propagate cascades on that snapshot; realized effects contest
//!    controlled territories.
//! 4. Stage decisions, changed rows, and cascade summaries.
//! 5. Forward outcomes to the learning task.
//! 6. Push deltas to the sink and flush persistence.
//!
//! Shutdown switches every scheduler to draining; each shard finishes its
//! queued work, flushes, and exits.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::{Duration, Instant};

use hegemony_db::{DragonflyPool, InitialState, StateStore, StoreAdapter};
use hegemony_factions::{Deadline, DecisionEngine, DecisionError, ProfileError, ProfileRegistry};
use hegemony_types::{
    CascadeEffect, Decision, DeltaPayload, FactionId, FactionProfile, LoadMetrics, MapSnapshot,
    SchedulerPhase, StateDelta,
};
use hegemony_world::{CampaignSeed, CascadeEngine, DirtyRows, TerritoryMap};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::CoordinatorConfig;
use crate::error::CoordinatorError;
use crate::health::{HealthReport, ShardHealth};
use crate::learning::{LearningInput, spawn_learning_task};
use crate::load::{LoadGauge, spawn_host_sampler};
use crate::resolution::{self, ContestChange, OutcomeResolver, Resolution};
use crate::scheduler::{BudgetScheduler, CycleReport, Pacing, TaskOutcome};
use crate::sink::DeltaSink;

/// The map and the roll source, locked together so resolution order and
/// rolls stay in step.
struct World {
    map: TerritoryMap,
    rng: StdRng,
}

/// What one shard cycle did.
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    /// Scheduler accounting.
    pub report: CycleReport,
    /// Phase and interval after the cycle.
    pub pacing: Pacing,
    /// Decisions produced.
    pub decisions: usize,
    /// Territories that changed hands.
    pub control_changes: usize,
    /// Cascades computed.
    pub cascades: usize,
    /// Version of the last snapshot published, if the map changed.
    pub snapshot_version: Option<u64>,
}

#[derive(Default)]
struct Applied {
    resolutions: Vec<(Decision, Resolution)>,
    cascades: Vec<CascadeEffect>,
    cascade_contests: Vec<ContestChange>,
    expired: Vec<ContestChange>,
    dirty: DirtyRows,
    snapshot: Option<Arc<MapSnapshot>>,
}

/// The territorial-control coordinator.
pub struct Coordinator {
    config: CoordinatorConfig,
    world: Mutex<World>,
    schedulers: Vec<BudgetScheduler>,
    factions: Vec<FactionId>,
    registry: Arc<ProfileRegistry>,
    engine: DecisionEngine,
    resolver: OutcomeResolver,
    cascades: CascadeEngine,
    adapter: Arc<StoreAdapter>,
    gauge: Arc<LoadGauge>,
    sink: Arc<dyn DeltaSink>,
    learning_tx: StdMutex<Option<mpsc::Sender<LearningInput>>>,
    learning_rx: StdMutex<Option<mpsc::Receiver<LearningInput>>>,
    cycles: AtomicU64,
    abandoned: AtomicU64,
    started_at: Instant,
}

impl Coordinator {
    /// Build a coordinator on an already-loaded starting state.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError`] if the config is out of range or a
    /// starting profile is invalid.
    pub fn new(
        config: CoordinatorConfig,
        initial: InitialState,
        adapter: Arc<StoreAdapter>,
        gauge: Arc<LoadGauge>,
        sink: Arc<dyn DeltaSink>,
    ) -> Result<Self, CoordinatorError> {
        config.validate()?;
        for violation in &initial.violations {
            error!(error = %violation, "row rejected from starting map");
        }

        let registry = Arc::new(ProfileRegistry::new(
            initial.profiles,
            config.learning.clone(),
        )?);
        let factions = registry.faction_ids();
        let schedulers = (0..config.scheduler.shards)
            .map(|shard| BudgetScheduler::new(shard, config.scheduler.clone()))
            .collect();
        let (tx, rx) = mpsc::channel(config.learning.channel_capacity.max(1));

        info!(
            shards = config.scheduler.shards,
            factions = factions.len(),
            territories = initial.snapshot.territories.len(),
            source = ?initial.source,
            "coordinator built"
        );

        Ok(Self {
            world: Mutex::new(World {
                map: TerritoryMap::from_snapshot(&initial.snapshot),
                rng: StdRng::seed_from_u64(config.campaign.rng_seed),
            }),
            schedulers,
            factions,
            registry,
            engine: DecisionEngine::new(config.decision.clone()),
            resolver: OutcomeResolver::new(config.resolution.clone()),
            cascades: CascadeEngine::new(config.cascade.clone()),
            adapter,
            gauge,
            sink,
            learning_tx: StdMutex::new(Some(tx)),
            learning_rx: StdMutex::new(Some(rx)),
            cycles: AtomicU64::new(0),
            abandoned: AtomicU64::new(0),
            started_at: Instant::now(),
            config,
        })
    }

    /// Load the campaign, wrap `store` in an adapter, load the starting
    /// map, and build the coordinator.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError`] if the campaign seed cannot be loaded
    /// or the coordinator cannot be built.
    pub async fn bootstrap(
        config: CoordinatorConfig,
        store: Arc<dyn StateStore>,
        hot: Option<DragonflyPool>,
        gauge: Arc<LoadGauge>,
        sink: Arc<dyn DeltaSink>,
    ) -> Result<Arc<Self>, CoordinatorError> {
        let seed = CampaignSeed::load(config.campaign.path.as_deref())?;
        info!(campaign = %seed.name, "campaign loaded");
        let adapter = Arc::new(StoreAdapter::new(store, hot, config.store.clone()));
        let initial = adapter
            .load_initial(
                &seed.to_records(),
                &seed.profiles(config.learning.window_capacity),
            )
            .await;
        Ok(Arc::new(Self::new(config, initial, adapter, gauge, sink)?))
    }

    // -----------------------------------------------------------------------
    // Cycle pipeline
    // -----------------------------------------------------------------------

    /// Run one cycle on `shard`.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::UnknownShard`] for an out-of-range index.
    pub async fn run_cycle(&self, shard: usize) -> Result<CycleOutcome, CoordinatorError> {
        let scheduler = self
            .schedulers
            .get(shard)
            .ok_or(CoordinatorError::UnknownShard(shard))?;

        if self.config.scheduler.auto_enqueue && scheduler.phase() != SchedulerPhase::Draining {
            if let Err(e) = scheduler.enqueue_missing(&self.members(scheduler.shard())) {
                debug!(shard, error = %e, "auto-enqueue stopped early");
            }
        }

        let snapshot = self.adapter.snapshot().await;
        let cycle = self.cycles.fetch_add(1, Ordering::Relaxed).saturating_add(1);
        let mut decisions = Vec::new();
        let report = scheduler.run_cycle(|faction, deadline| {
            self.decide(cycle, faction, &snapshot, deadline, &mut decisions)
        });

        let applied = self.apply(cycle, &decisions).await;

        self.stage(&decisions, &applied).await;
        self.forward_outcomes(&applied.resolutions);

        let load = self.gauge.score(&self.config.scheduler.load_weights);
        let pacing = scheduler.finish_cycle(load, self.gauge.connection_pressure());
        if pacing.throttle_changed.is_some() {
            let any_throttled = self
                .schedulers
                .iter()
                .any(|s| s.phase() == SchedulerPhase::Throttled);
            self.adapter.set_throttled(any_throttled);
        }

        let outcome = CycleOutcome {
            decisions: decisions.len(),
            control_changes: applied
                .resolutions
                .iter()
                .filter(|(_, r)| r.control_change.is_some())
                .count(),
            cascades: applied.cascades.len(),
            snapshot_version: applied.snapshot.as_ref().map(|s| s.version),
            report,
            pacing,
        };

        let mut deltas = deltas_for(&applied);
        deltas.push(cycle_summary(&outcome));
        self.sink.push(deltas);

        match self.adapter.flush().await {
            Ok(flushed) if flushed.total() > 0 => {
                debug!(shard, rows = flushed.total(), "persistence flushed");
            }
            Ok(_) => {}
            Err(e) => warn!(shard, error = %e, "flush failed, rows kept pending"),
        }

        debug!(
            shard,
            cycle = outcome.report.cycle,
            started = outcome.report.started,
            decisions = outcome.decisions,
            abandoned = outcome.report.abandoned,
            control_changes = outcome.control_changes,
            cascades = outcome.cascades,
            elapsed_us = outcome.report.elapsed.as_micros(),
            next_interval_ms = outcome.pacing.next_interval.as_millis(),
            "cycle complete"
        );
        Ok(outcome)
    }

    fn decide(
        &self,
        cycle: u64,
        faction: FactionId,
        snapshot: &MapSnapshot,
        deadline: &Deadline,
        out: &mut Vec<Decision>,
    ) -> TaskOutcome {
        let profile = match self.registry.get(faction) {
            Ok(profile) => profile,
            Err(e) => {
                warn!(faction_id = %faction, error = %e, "task for unregistered faction");
                return TaskOutcome::Failed;
            }
        };
        match self.engine.decide(cycle, &profile, snapshot, deadline) {
            Ok(Some(decision)) => {
                out.push(decision);
                TaskOutcome::Decided
            }
            Ok(None) => TaskOutcome::NoAction,
            Err(DecisionError::Timeout { .. }) => {
                self.abandoned.fetch_add(1, Ordering::Relaxed);
                TaskOutcome::Abandoned
            }
            Err(e @ DecisionError::UnknownFaction(_)) => {
                warn!(faction_id = %faction, error = %e, "decision failed");
                TaskOutcome::Failed
            }
        }
    }

    /// Expire challenges, resolve, publish, and cascade under the map lock.
    async fn apply(&self, cycle: u64, decisions: &[Decision]) -> Applied {
        let mut guard = self.world.lock().await;
        let World { map, rng } = &mut *guard;
        let mut applied = Applied {
            expired: self.resolver.expire_challenges(map, cycle),
            ..Applied::default()
        };
        if !applied.expired.is_empty() {
            debug!(cycle, cleared = applied.expired.len(), "lapsed challenges cleared");
        }

        for decision in decisions {
            match self.resolver.resolve(map, decision, rng) {
                Ok(resolution) => applied.resolutions.push((decision.clone(), resolution)),
                Err(e) if e.is_invariant_violation() => {
                    error!(decision_id = %decision.id, error = %e, "resolution broke a map invariant");
                    self.adapter.record_violations(1);
                }
                Err(e) => {
                    warn!(decision_id = %decision.id, error = %e, "decision could not be resolved");
                }
            }
        }
        if applied.expired.is_empty() && applied.resolutions.iter().all(|(_, r)| r.stale) {
            return applied;
        }

        let mut snapshot = Arc::new(map.snapshot());
        self.adapter.publish(Arc::clone(&snapshot)).await;

        let triggers: Vec<_> = applied
            .resolutions
            .iter()
            .filter_map(|(_, r)| r.trigger)
            .collect();
        for trigger in triggers {
            let seed: u64 = rng.random();
            match self.cascades.propagate(
                &snapshot,
                trigger.territory,
                trigger.kind,
                trigger.magnitude,
                self.cascades.config().max_depth,
                seed,
            ) {
                Ok(effect) => {
                    let expires_at = self.resolver.challenge_expiry(cycle);
                    match resolution::apply_cascade(map, &effect, expires_at) {
                        Ok(changes) => applied.cascade_contests.extend(changes),
                        Err(e) => warn!(trigger = %trigger.territory, error = %e, "cascade effects not applied"),
                    }
                    applied.cascades.push(effect);
                }
                Err(e) => warn!(trigger = %trigger.territory, error = %e, "cascade skipped"),
            }
        }

        if !applied.cascade_contests.is_empty() {
            snapshot = Arc::new(map.snapshot());
            self.adapter.publish(Arc::clone(&snapshot)).await;
        }
        applied.dirty = map.take_dirty();
        applied.snapshot = Some(snapshot);
        applied
    }

    async fn stage(&self, decisions: &[Decision], applied: &Applied) {
        self.adapter.stage_decisions(decisions).await;
        if !applied.dirty.territories.is_empty() {
            self.adapter
                .stage_territories(applied.dirty.territories.clone())
                .await;
        }
        if !applied.dirty.factions.is_empty() {
            self.adapter
                .stage_standings(applied.dirty.factions.clone())
                .await;
        }
        for effect in &applied.cascades {
            self.adapter.stage_cascade(effect.summary()).await;
        }
    }

    fn forward_outcomes(&self, resolutions: &[(Decision, Resolution)]) {
        let Some(tx) = self
            .learning_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        else {
            return;
        };
        for (decision, resolution) in resolutions.iter().filter(|(_, r)| !r.stale) {
            let input = LearningInput {
                decision: decision.clone(),
                success: resolution.success,
                influence_delta: resolution.influence_delta,
                target_value: resolution.target_value,
            };
            if let Err(e) = tx.try_send(input) {
                warn!(faction_id = %decision.faction_id, error = %e, "learning channel full, outcome dropped");
            }
        }
    }

    // -----------------------------------------------------------------------
    // Shard loops
    // -----------------------------------------------------------------------

    /// Start the shard loops, the learning task, and the host sampler.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::AlreadyRunning`] on a second call.
    pub fn spawn(self: &Arc<Self>) -> Result<CoordinatorTasks, CoordinatorError> {
        let outcomes = self
            .learning_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(CoordinatorError::AlreadyRunning)?;
        let (shutdown, shutdown_rx) = watch::channel(false);

        let learning = spawn_learning_task(
            Arc::clone(&self.registry),
            Arc::clone(&self.adapter),
            outcomes,
        );
        let sampler = spawn_host_sampler(
            Arc::clone(&self.gauge),
            Duration::from_millis(self.config.scheduler.sample_interval_ms),
            shutdown_rx.clone(),
        );
        let shards = (0..self.schedulers.len())
            .map(|shard| {
                let coordinator = Arc::clone(self);
                let rx = shutdown_rx.clone();
                tokio::spawn(async move { coordinator.shard_loop(shard, rx).await })
            })
            .collect();

        info!(shards = self.schedulers.len(), "coordinator running");
        Ok(CoordinatorTasks {
            coordinator: Arc::clone(self),
            shutdown,
            shards,
            learning,
            sampler,
        })
    }

    async fn shard_loop(self: Arc<Self>, shard: usize, mut shutdown: watch::Receiver<bool>) {
        let Some(scheduler) = self.schedulers.get(shard) else {
            return;
        };
        info!(shard, "shard loop started");
        loop {
            if *shutdown.borrow() {
                scheduler.begin_drain();
            }
            let pacing = match self.run_cycle(shard).await {
                Ok(outcome) => outcome.pacing,
                Err(e) => {
                    error!(shard, error = %e, "shard loop aborted");
                    break;
                }
            };
            if pacing.phase == SchedulerPhase::Draining {
                if scheduler.is_drained() {
                    break;
                }
                continue;
            }
            tokio::select! {
                () = tokio::time::sleep(pacing.next_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        scheduler.begin_drain();
                    }
                }
            }
        }
        if let Err(e) = self.adapter.flush().await {
            error!(shard, error = %e, "final flush failed");
        }
        info!(shard, queued = scheduler.queue_depth(), "shard loop stopped");
    }

    fn close_learning(&self) {
        self.learning_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    // -----------------------------------------------------------------------
    // Control surface
    // -----------------------------------------------------------------------

    /// Queue a decision cycle for each faction.
    ///
    /// Returns `true` only when every faction was queued. Unknown factions
    /// and full or draining shards are rejected without blocking.
    pub fn enqueue_faction_cycle(&self, factions: &[FactionId]) -> bool {
        let mut accepted = true;
        for &faction in factions {
            if self.factions.binary_search(&faction).is_err() {
                warn!(faction_id = %faction, "cycle requested for unknown faction");
                accepted = false;
                continue;
            }
            let Some(scheduler) = self.shard_for(faction) else {
                accepted = false;
                continue;
            };
            if let Err(e) = scheduler.try_enqueue(faction) {
                warn!(faction_id = %faction, error = %e, "cycle request rejected");
                accepted = false;
            }
        }
        accepted
    }

    /// Current load signals and scheduler state.
    pub fn load_metrics(&self) -> LoadMetrics {
        let queue_depth = self
            .schedulers
            .iter()
            .fold(0_usize, |acc, s| acc.saturating_add(s.queue_depth()));
        LoadMetrics {
            cpu: self.gauge.cpu(),
            memory: self.gauge.memory(),
            active_connections: self.gauge.active_connections(),
            queue_depth: u64::try_from(queue_depth).unwrap_or(u64::MAX),
            connection_pressure: self.gauge.connection_pressure(),
            phases: self.schedulers.iter().map(BudgetScheduler::phase).collect(),
            cycle_interval_ms: self
                .schedulers
                .iter()
                .map(|s| u64::try_from(s.interval().as_millis()).unwrap_or(u64::MAX))
                .collect(),
        }
    }

    /// The latest published map snapshot.
    pub async fn snapshot(&self) -> Arc<MapSnapshot> {
        self.adapter.cached().await
    }

    /// A faction's current profile.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::UnknownFaction`] for an unregistered id.
    pub fn profile(&self, faction: FactionId) -> Result<FactionProfile, ProfileError> {
        self.registry.get(faction)
    }

    /// Clear a faction's adaptation state and stage the result.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::UnknownFaction`] for an unregistered id.
    pub async fn reset_adaptation(&self, faction: FactionId) -> Result<FactionProfile, ProfileError> {
        let profile = self.registry.reset_adaptation(faction)?;
        self.adapter.stage_profile(profile.clone()).await;
        Ok(profile)
    }

    /// Health of persistence and the schedulers.
    pub async fn health(&self) -> HealthReport {
        let shards = self
            .schedulers
            .iter()
            .map(|s| ShardHealth {
                shard: s.shard(),
                phase: s.phase(),
                queue_depth: s.queue_depth(),
                interval_ms: u64::try_from(s.interval().as_millis()).unwrap_or(u64::MAX),
            })
            .collect();
        HealthReport::new(
            self.adapter.health().await,
            shards,
            self.cycles.load(Ordering::Relaxed),
            self.started_at.elapsed().as_secs(),
        )
    }

    /// Registered faction ids in ascending order.
    pub fn factions(&self) -> &[FactionId] {
        &self.factions
    }

    /// Number of shards.
    pub fn shard_count(&self) -> usize {
        self.schedulers.len()
    }

    /// Decision tasks abandoned at their deadline since start.
    pub fn abandoned_tasks(&self) -> u64 {
        self.abandoned.load(Ordering::Relaxed)
    }

    /// The shared load gauge.
    pub const fn gauge(&self) -> &Arc<LoadGauge> {
        &self.gauge
    }

    /// The persistence adapter.
    pub const fn adapter(&self) -> &Arc<StoreAdapter> {
        &self.adapter
    }

    /// The active configuration.
    pub const fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    fn shard_for(&self, faction: FactionId) -> Option<&BudgetScheduler> {
        let shards = u32::try_from(self.schedulers.len()).ok()?;
        let index = faction.into_inner().checked_rem(shards)?;
        self.schedulers.get(usize::try_from(index).ok()?)
    }

    fn members(&self, shard: u32) -> Vec<FactionId> {
        let shards = self.config.scheduler.shards;
        self.factions
            .iter()
            .copied()
            .filter(|f| f.into_inner().checked_rem(shards) == Some(shard))
            .collect()
    }
}

impl core::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Coordinator")
            .field("shards", &self.schedulers.len())
            .field("factions", &self.factions.len())
            .field("cycles", &self.cycles.load(Ordering::Relaxed))
            .field("adapter", &self.adapter)
            .finish_non_exhaustive()
    }
}

/// Handles to a running coordinator's background tasks.
#[derive(Debug)]
pub struct CoordinatorTasks {
    coordinator: Arc<Coordinator>,
    shutdown: watch::Sender<bool>,
    shards: Vec<JoinHandle<()>>,
    learning: JoinHandle<u64>,
    sampler: JoinHandle<()>,
}

impl CoordinatorTasks {
    /// Drain every shard, stop the learning task and sampler, and flush.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Task`] if a background task panicked.
    pub async fn shutdown(self) -> Result<(), CoordinatorError> {
        info!("coordinator draining");
        for scheduler in &self.coordinator.schedulers {
            scheduler.begin_drain();
        }
        if self.shutdown.send(true).is_err() {
            debug!("no task was listening for shutdown");
        }

        for joined in futures::future::join_all(self.shards).await {
            joined.map_err(|e| task_failed("shard", &e))?;
        }
        self.coordinator.close_learning();
        let learned = self
            .learning
            .await
            .map_err(|e| task_failed("learning", &e))?;
        self.sampler
            .await
            .map_err(|e| task_failed("sampler", &e))?;

        match self.coordinator.adapter.flush().await {
            Ok(flushed) => info!(rows = flushed.total(), learned, "coordinator stopped"),
            Err(e) => error!(error = %e, learned, "coordinator stopped with unflushed rows"),
        }
        Ok(())
    }
}

fn task_failed(task: &'static str, err: &tokio::task::JoinError) -> CoordinatorError {
    CoordinatorError::Task {
        task,
        reason: err.to_string(),
    }
}

/// Deltas for one cycle, in causal order.
fn deltas_for(applied: &Applied) -> Vec<StateDelta> {
    let controller_of = |territory| {
        applied
            .snapshot
            .as_ref()
            .and_then(|s| s.territory(territory))
            .and_then(|t| t.controller)
    };
    let mut deltas = Vec::new();
    for change in &applied.expired {
        deltas.push(StateDelta::contest_changed(
            change.territory,
            change.controller,
            change.contested,
        ));
    }
    for (decision, resolution) in &applied.resolutions {
        deltas.push(StateDelta::decision(
            decision.clone(),
            controller_of(decision.target),
        ));
        if let Some(change) = resolution.control_change {
            deltas.push(StateDelta::control_changed(
                change.territory,
                change.previous,
                change.current,
                change.cause,
            ));
        }
        for change in &resolution.contest_changes {
            deltas.push(StateDelta::contest_changed(
                change.territory,
                change.controller,
                change.contested,
            ));
        }
    }
    for effect in &applied.cascades {
        deltas.push(StateDelta::cascade(effect.clone(), controller_of(effect.trigger)));
    }
    for change in &applied.cascade_contests {
        deltas.push(StateDelta::contest_changed(
            change.territory,
            change.controller,
            change.contested,
        ));
    }
    deltas
}

fn cycle_summary(outcome: &CycleOutcome) -> StateDelta {
    let report = &outcome.report;
    StateDelta::new(
        None,
        None,
        DeltaPayload::CycleSummary {
            shard: report.shard,
            cycle: report.cycle,
            decisions: report.decided,
            abandoned: report.abandoned,
            deferred: report.deferred.saturating_add(report.carried_over),
            elapsed_ms: u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
            phase: outcome.pacing.phase,
            next_interval_ms: u64::try_from(outcome.pacing.next_interval.as_millis())
                .unwrap_or(u64::MAX),
        },
    )
}
