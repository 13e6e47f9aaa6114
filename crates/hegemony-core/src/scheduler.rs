//! The budget-aware cooperative scheduler, one per shard of factions.
//!
//! A shard owns a bounded FIFO of faction tasks. [`BudgetScheduler::run_cycle`]
//! works through the tasks that were queued when the cycle started, checking
//! the cycle budget before starting each one, so a cycle overshoots its
//! budget by at most the task already in flight. Tasks not started stay at
//! the front of the queue for the next cycle.
//!
//! After each cycle [`BudgetScheduler::finish_cycle`] turns the shared load
//! score into the next interval and drives the phase machine. The shard's
//! own budget use (a smoothed ratio of cycle time to budget) counts as load
//! too, so a shard whose cycles keep hitting the budget backs off until its
//! cycles fit again:
//!
//! ```text
//! Idle --cycle--> RunningCycle --done--> Idle
//!   \                                     |
//!    `-- load > high_water for N cycles --> Throttled --load < low_water--> Idle
//! any --begin_drain--> Draining (terminal)
//! ```

use std::collections::{BTreeSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use hegemony_factions::Deadline;
use hegemony_types::{FactionId, SchedulerPhase};
use tracing::{debug, info, warn};

use crate::config::SchedulerConfig;

/// Why a task could not be enqueued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    /// The shard queue is at capacity.
    #[error("shard {shard} queue full ({capacity} tasks)")]
    Backpressure {
        /// Rejecting shard.
        shard: u32,
        /// Queue capacity.
        capacity: usize,
    },

    /// The shard is shutting down.
    #[error("shard {0} is draining")]
    Draining(u32),
}

/// What happened to one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// A decision was produced.
    Decided,
    /// The faction had nothing valid to do.
    NoAction,
    /// The task hit its deadline and was discarded.
    Abandoned,
    /// The task failed for another reason (already logged).
    Failed,
}

/// Summary of one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Shard index.
    pub shard: u32,
    /// Shard-local cycle number, starting at 1.
    pub cycle: u64,
    /// Tasks started.
    pub started: u32,
    /// Tasks that produced a decision.
    pub decided: u32,
    /// Tasks abandoned at their deadline.
    pub abandoned: u32,
    /// Duplicate tasks pushed to the next cycle.
    pub deferred: u32,
    /// Tasks left queued because the budget ran out.
    pub carried_over: u32,
    /// Wall-clock time spent.
    pub elapsed: Duration,
}

/// Result of post-cycle load accounting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pacing {
    /// Phase after the transition.
    pub phase: SchedulerPhase,
    /// Wait before the next cycle.
    pub next_interval: Duration,
    /// `Some(true)` on entering throttling, `Some(false)` on leaving it.
    pub throttle_changed: Option<bool>,
}

#[derive(Debug)]
struct PhaseState {
    phase: SchedulerPhase,
    high_load_cycles: u32,
    drain_cycles: u32,
    cycle: u64,
    interval: Duration,
    utilization: f64,
}

/// Weight of the latest cycle in the smoothed budget utilization.
const UTILIZATION_SMOOTHING: f64 = 0.5;

/// One shard's queue, budget, and phase.
#[derive(Debug)]
pub struct BudgetScheduler {
    shard: u32,
    config: SchedulerConfig,
    queue: Mutex<VecDeque<FactionId>>,
    state: Mutex<PhaseState>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl BudgetScheduler {
    /// An idle scheduler for `shard`.
    pub fn new(shard: u32, config: SchedulerConfig) -> Self {
        let interval = Duration::from_millis(config.min_interval_ms);
        Self {
            shard,
            queue: Mutex::new(VecDeque::with_capacity(config.max_queue_depth)),
            state: Mutex::new(PhaseState {
                phase: SchedulerPhase::Idle,
                high_load_cycles: 0,
                drain_cycles: 0,
                cycle: 0,
                interval,
                utilization: 0.0,
            }),
            config,
        }
    }

    /// Shard index.
    pub const fn shard(&self) -> u32 {
        self.shard
    }

    /// Current phase.
    pub fn phase(&self) -> SchedulerPhase {
        lock(&self.state).phase
    }

    /// Interval chosen after the last cycle.
    pub fn interval(&self) -> Duration {
        lock(&self.state).interval
    }

    /// Smoothed ratio of cycle time to cycle budget, in `[0, 1]`.
    pub fn utilization(&self) -> f64 {
        lock(&self.state).utilization
    }

    /// Tasks waiting.
    pub fn queue_depth(&self) -> usize {
        lock(&self.queue).len()
    }

    /// Queue a faction task without blocking.
    pub fn try_enqueue(&self, faction: FactionId) -> Result<(), SchedulerError> {
        if self.phase() == SchedulerPhase::Draining {
            return Err(SchedulerError::Draining(self.shard));
        }
        let mut queue = lock(&self.queue);
        if queue.len() >= self.config.max_queue_depth {
            return Err(SchedulerError::Backpressure {
                shard: self.shard,
                capacity: self.config.max_queue_depth,
            });
        }
        queue.push_back(faction);
        Ok(())
    }

    /// Queue each faction that is not already waiting. Returns how many
    /// were added; stops at the first rejection.
    pub fn enqueue_missing(&self, factions: &[FactionId]) -> Result<usize, SchedulerError> {
        let mut added = 0_usize;
        for faction in factions {
            if lock(&self.queue).contains(faction) {
                continue;
            }
            self.try_enqueue(*faction)?;
            added = added.saturating_add(1);
        }
        Ok(added)
    }

    /// Run one cycle, calling `process` for each started task.
    ///
    /// Only tasks queued when the cycle starts are considered. A faction
    /// appearing twice is processed once; the repeat is deferred to the
    /// next cycle.
    pub fn run_cycle<F>(&self, mut process: F) -> CycleReport
    where
        F: FnMut(FactionId, &Deadline) -> TaskOutcome,
    {
        let started_at = Instant::now();
        let budget = Duration::from_millis(self.config.cycle_budget_ms);
        let task_budget = Duration::from_millis(self.config.task_deadline_ms);
        let cycle = {
            let mut state = lock(&self.state);
            state.cycle = state.cycle.saturating_add(1);
            if state.phase == SchedulerPhase::Idle {
                state.phase = SchedulerPhase::RunningCycle;
            }
            state.cycle
        };

        let mut report = CycleReport {
            shard: self.shard,
            cycle,
            started: 0,
            decided: 0,
            abandoned: 0,
            deferred: 0,
            carried_over: 0,
            elapsed: Duration::ZERO,
        };
        let mut seen = BTreeSet::new();
        let mut deferred = Vec::new();
        let mut remaining = self.queue_depth();

        while remaining > 0 {
            if started_at.elapsed() >= budget {
                break;
            }
            let Some(faction) = lock(&self.queue).pop_front() else {
                break;
            };
            remaining = remaining.saturating_sub(1);
            if !seen.insert(faction) {
                deferred.push(faction);
                continue;
            }
            report.started = report.started.saturating_add(1);
            let deadline = Deadline::after(task_budget);
            match process(faction, &deadline) {
                TaskOutcome::Decided => report.decided = report.decided.saturating_add(1),
                TaskOutcome::Abandoned => {
                    report.abandoned = report.abandoned.saturating_add(1);
                    warn!(shard = self.shard, cycle, faction_id = %faction, "decision task abandoned at deadline");
                }
                TaskOutcome::NoAction | TaskOutcome::Failed => {}
            }
        }

        {
            let mut queue = lock(&self.queue);
            for faction in deferred.iter().rev() {
                queue.push_front(*faction);
            }
        }
        report.deferred = u32::try_from(deferred.len()).unwrap_or(u32::MAX);
        report.carried_over = u32::try_from(remaining).unwrap_or(u32::MAX);
        report.elapsed = started_at.elapsed();
        {
            let mut state = lock(&self.state);
            state.utilization = UTILIZATION_SMOOTHING.mul_add(
                budget_ratio(report.elapsed, budget),
                (1.0 - UTILIZATION_SMOOTHING) * state.utilization,
            );
        }
        if report.elapsed > budget {
            debug!(
                shard = self.shard,
                cycle,
                elapsed_us = report.elapsed.as_micros(),
                budget_ms = self.config.cycle_budget_ms,
                "cycle overshot budget by the in-flight task"
            );
        }
        report
    }

    /// Account for load after a cycle and pick the next interval.
    ///
    /// `load` is the shared load score in `[0, 1]`; `pressure` is the hub's
    /// connection pressure flag. The shard's smoothed budget utilization
    /// replaces `load` when it is higher.
    pub fn finish_cycle(&self, load: f64, pressure: bool) -> Pacing {
        let mut state = lock(&self.state);
        let mut throttle_changed = None;
        let load = sanitize_load(load).max(state.utilization);

        match state.phase {
            SchedulerPhase::Draining => {
                state.drain_cycles = state.drain_cycles.saturating_add(1);
            }
            SchedulerPhase::Throttled if load < self.config.low_water => {
                state.phase = SchedulerPhase::Idle;
                state.high_load_cycles = 0;
                throttle_changed = Some(false);
                info!(shard = self.shard, load, "load recovered, leaving throttled mode");
            }
            SchedulerPhase::Throttled => {}
            SchedulerPhase::Idle | SchedulerPhase::RunningCycle => {
                state.phase = SchedulerPhase::Idle;
                if load > self.config.high_water {
                    state.high_load_cycles = state.high_load_cycles.saturating_add(1);
                    if state.high_load_cycles >= self.config.sustained_cycles {
                        state.phase = SchedulerPhase::Throttled;
                        throttle_changed = Some(true);
                        warn!(
                            shard = self.shard,
                            load,
                            cycles = state.high_load_cycles,
                            "sustained high load, throttling"
                        );
                    }
                } else {
                    state.high_load_cycles = 0;
                }
            }
        }

        let interval = self.interval_for(load, pressure, state.phase == SchedulerPhase::Throttled);
        state.interval = interval;
        Pacing {
            phase: state.phase,
            next_interval: interval,
            throttle_changed,
        }
    }

    /// `min + (max - min) * load`, stretched under pressure, clamped, and
    /// doubled while throttled.
    fn interval_for(&self, load: f64, pressure: bool, throttled: bool) -> Duration {
        let min = Duration::from_millis(self.config.min_interval_ms);
        let max = Duration::from_millis(self.config.max_interval_ms);
        let span = max.saturating_sub(min);
        let mut interval = min.saturating_add(span.mul_f64(sanitize_load(load)));
        if pressure {
            interval = stretch(interval, self.config.pressure_multiplier, max);
        }
        interval = interval.clamp(min, max);
        if throttled {
            interval = interval.saturating_mul(2);
        }
        interval
    }

    /// Switch to draining: new tasks are rejected, queued ones still run.
    pub fn begin_drain(&self) {
        let mut state = lock(&self.state);
        if state.phase != SchedulerPhase::Draining {
            state.phase = SchedulerPhase::Draining;
            info!(shard = self.shard, queued = self.queue_depth(), "shard draining");
        }
    }

    /// Whether a draining shard is done: queue empty or out of drain cycles.
    pub fn is_drained(&self) -> bool {
        let state = lock(&self.state);
        state.phase == SchedulerPhase::Draining
            && (self.queue_depth() == 0 || state.drain_cycles >= self.config.drain_max_cycles)
    }
}

fn sanitize_load(load: f64) -> f64 {
    if load.is_nan() { 0.0 } else { load.clamp(0.0, 1.0) }
}

/// Elapsed time over budget, clamped to `[0, 1]`. A zero budget is always
/// fully used.
fn budget_ratio(elapsed: Duration, budget: Duration) -> f64 {
    if budget.is_zero() {
        return 1.0;
    }
    sanitize_load(elapsed.as_secs_f64() / budget.as_secs_f64())
}

/// `interval * factor`, or `cap` when the product is not a valid duration.
fn stretch(interval: Duration, factor: f64, cap: Duration) -> Duration {
    Duration::try_from_secs_f64(interval.as_secs_f64() * factor.max(1.0)).unwrap_or(cap)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn config() -> SchedulerConfig {
        SchedulerConfig {
            max_queue_depth: 4,
            cycle_budget_ms: 1_000,
            min_interval_ms: 100,
            max_interval_ms: 1_000,
            high_water: 0.8,
            low_water: 0.4,
            sustained_cycles: 2,
            drain_max_cycles: 2,
            ..SchedulerConfig::default()
        }
    }

    fn ids(raw: &[u32]) -> Vec<FactionId> {
        raw.iter().copied().map(FactionId::new).collect()
    }

    #[test]
    fn full_queue_rejects_without_blocking() {
        let s = BudgetScheduler::new(0, config());
        for id in 1..=4 {
            assert!(s.try_enqueue(FactionId::new(id)).is_ok());
        }
        assert_eq!(
            s.try_enqueue(FactionId::new(5)),
            Err(SchedulerError::Backpressure {
                shard: 0,
                capacity: 4
            })
        );
        assert_eq!(s.queue_depth(), 4);
    }

    #[test]
    fn tasks_run_in_fifo_order_and_duplicates_wait() {
        let s = BudgetScheduler::new(0, config());
        for id in ids(&[3, 1, 3, 2]) {
            assert!(s.try_enqueue(id).is_ok());
        }
        let mut order = Vec::new();
        let report = s.run_cycle(|f, _| {
            order.push(f);
            TaskOutcome::Decided
        });
        assert_eq!(order, ids(&[3, 1, 2]));
        assert_eq!(report.decided, 3);
        assert_eq!(report.deferred, 1);
        assert_eq!(s.queue_depth(), 1);

        let mut next = Vec::new();
        s.run_cycle(|f, _| {
            next.push(f);
            TaskOutcome::NoAction
        });
        assert_eq!(next, ids(&[3]));
    }

    #[test]
    fn tasks_queued_during_a_cycle_wait_for_the_next() {
        let s = BudgetScheduler::new(0, config());
        assert!(s.try_enqueue(FactionId::new(1)).is_ok());
        let report = s.run_cycle(|_, _| {
            assert!(s.try_enqueue(FactionId::new(2)).is_ok());
            TaskOutcome::Decided
        });
        assert_eq!(report.started, 1);
        assert_eq!(s.queue_depth(), 1);
    }

    #[test]
    fn budget_overshoot_is_at_most_one_task() {
        let s = BudgetScheduler::new(
            0,
            SchedulerConfig {
                cycle_budget_ms: 12,
                max_queue_depth: 16,
                ..config()
            },
        );
        for id in 1..=10 {
            assert!(s.try_enqueue(FactionId::new(id)).is_ok());
        }
        let mut order = Vec::new();
        let report = s.run_cycle(|f, _| {
            order.push(f);
            std::thread::sleep(Duration::from_millis(5));
            TaskOutcome::Decided
        });
        // Budget 12ms, 5ms per task: the third task starts at ~10ms and is
        // the only one allowed to run past the budget.
        assert!(report.started <= 3, "started {}", report.started);
        assert!(report.elapsed < Duration::from_millis(30));
        assert_eq!(
            report.carried_over,
            10_u32.saturating_sub(report.started)
        );
        // The unstarted tasks are still at the front, in order.
        order.extend(lock(&s.queue).drain(..));
        assert_eq!(order, ids(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]));
    }

    #[test]
    fn abandoned_tasks_are_counted() {
        let s = BudgetScheduler::new(0, config());
        assert!(s.try_enqueue(FactionId::new(1)).is_ok());
        let report = s.run_cycle(|_, _| TaskOutcome::Abandoned);
        assert_eq!(report.abandoned, 1);
        assert_eq!(s.queue_depth(), 0);
    }

    #[test]
    fn interval_scales_with_load_and_pressure() {
        let s = BudgetScheduler::new(0, config());
        assert_eq!(s.finish_cycle(0.0, false).next_interval, Duration::from_millis(100));
        assert_eq!(s.finish_cycle(0.5, false).next_interval, Duration::from_millis(550));
        assert_eq!(s.finish_cycle(0.2, true).next_interval, Duration::from_millis(420));
        assert_eq!(s.finish_cycle(0.7, true).next_interval, Duration::from_millis(1_000));
    }

    #[test]
    fn sustained_load_throttles_until_it_recovers() {
        let s = BudgetScheduler::new(0, config());
        assert_eq!(s.finish_cycle(0.9, false).phase, SchedulerPhase::Idle);
        let pacing = s.finish_cycle(0.9, false);
        assert_eq!(pacing.phase, SchedulerPhase::Throttled);
        assert_eq!(pacing.throttle_changed, Some(true));
        assert_eq!(pacing.next_interval, Duration::from_millis(1_820));

        // Between the water marks nothing changes.
        let pacing = s.finish_cycle(0.6, false);
        assert_eq!(pacing.phase, SchedulerPhase::Throttled);
        assert_eq!(pacing.throttle_changed, None);

        let pacing = s.finish_cycle(0.1, false);
        assert_eq!(pacing.phase, SchedulerPhase::Idle);
        assert_eq!(pacing.throttle_changed, Some(false));
    }

    #[test]
    fn over_budget_cycles_stretch_the_interval_until_they_fit() {
        let s = BudgetScheduler::new(
            0,
            SchedulerConfig {
                cycle_budget_ms: 1,
                max_queue_depth: 16,
                ..config()
            },
        );
        let slow_cycle = || {
            assert!(s.try_enqueue(FactionId::new(1)).is_ok());
            s.run_cycle(|_, _| {
                std::thread::sleep(Duration::from_millis(3));
                TaskOutcome::Decided
            });
            s.finish_cycle(0.0, false)
        };

        // Every cycle runs past its budget: the interval only grows, and
        // never beyond twice the maximum.
        let mut intervals = Vec::new();
        let mut throttled = false;
        for _ in 0..6 {
            let pacing = slow_cycle();
            throttled |= pacing.phase == SchedulerPhase::Throttled;
            intervals.push(pacing.next_interval);
        }
        assert!(intervals.windows(2).all(|w| w[0] <= w[1]), "{intervals:?}");
        assert!(intervals[0] > Duration::from_millis(100));
        assert!(throttled);
        assert!(*intervals.last().unwrap() <= Duration::from_millis(2_000));
        assert!(s.utilization() > 0.9);

        // Once cycles fit the budget again the shard recovers.
        let recovered: Vec<Pacing> = (0..8)
            .map(|_| {
                s.run_cycle(|_, _| TaskOutcome::NoAction);
                s.finish_cycle(0.0, false)
            })
            .collect();
        let pacing = recovered.last().unwrap();
        assert_eq!(pacing.phase, SchedulerPhase::Idle);
        assert!(pacing.next_interval < *intervals.last().unwrap());
        assert!(s.utilization() < 0.4);
    }

    #[test]
    fn unbounded_pressure_multiplier_caps_the_interval() {
        let s = BudgetScheduler::new(
            0,
            SchedulerConfig {
                pressure_multiplier: f64::INFINITY,
                ..config()
            },
        );
        assert_eq!(s.finish_cycle(0.5, true).next_interval, Duration::from_millis(1_000));
    }

    #[test]
    fn a_dip_resets_the_high_load_streak() {
        let s = BudgetScheduler::new(0, config());
        s.finish_cycle(0.9, false);
        s.finish_cycle(0.5, false);
        assert_eq!(s.finish_cycle(0.9, false).phase, SchedulerPhase::Idle);
    }

    #[test]
    fn draining_rejects_new_work_and_finishes_queued_work() {
        let s = BudgetScheduler::new(3, config());
        assert!(s.try_enqueue(FactionId::new(1)).is_ok());
        s.begin_drain();
        assert_eq!(
            s.try_enqueue(FactionId::new(2)),
            Err(SchedulerError::Draining(3))
        );
        assert!(!s.is_drained());
        s.run_cycle(|_, _| TaskOutcome::Decided);
        s.finish_cycle(0.0, false);
        assert!(s.is_drained());
        assert_eq!(s.phase(), SchedulerPhase::Draining);
    }

    #[test]
    fn drain_gives_up_after_max_cycles() {
        let s = BudgetScheduler::new(
            0,
            SchedulerConfig {
                cycle_budget_ms: 0,
                ..config()
            },
        );
        assert!(s.try_enqueue(FactionId::new(1)).is_ok());
        s.begin_drain();
        for _ in 0..2 {
            s.run_cycle(|_, _| TaskOutcome::Decided);
            s.finish_cycle(0.0, false);
        }
        assert_eq!(s.queue_depth(), 1);
        assert!(s.is_drained());
    }

    #[test]
    fn enqueue_missing_skips_waiting_factions() {
        let s = BudgetScheduler::new(0, config());
        assert!(s.try_enqueue(FactionId::new(2)).is_ok());
        assert_eq!(s.enqueue_missing(&ids(&[1, 2, 3])), Ok(2));
        assert_eq!(s.queue_depth(), 3);
    }
}
