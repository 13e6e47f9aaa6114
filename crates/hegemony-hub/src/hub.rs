//! The broadcast hub: fans each state delta out to filtered subscribers.
//!
//! Every delta is serialized once; the encoded frame is shared by all
//! matching sessions. Each session owns a bounded outbound queue. When a
//! queue is full the oldest frame is dropped, so a slow subscriber only
//! ever loses its own backlog and never holds up the others.
//!
//! The hub also reports the active connection count to the shared
//! [`LoadGauge`] and raises connection pressure at the configured high
//! threshold, clearing it again below 80% of that threshold.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::{Duration, Instant};

use axum::extract::ws::Utf8Bytes;
use hegemony_core::config::HubConfig;
use hegemony_core::{DeltaSink, LoadGauge};
use hegemony_types::{ConnectionId, StateDelta, SubscriptionFilter};
use serde::Serialize;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::HubError;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One subscriber's filter and outbound queue.
#[derive(Debug)]
pub struct Session {
    id: ConnectionId,
    filter: Mutex<SubscriptionFilter>,
    queue: Mutex<VecDeque<Utf8Bytes>>,
    ready: Notify,
    capacity: usize,
    dropped: AtomicU64,
    last_active: Mutex<Instant>,
    closed: AtomicBool,
}

impl Session {
    fn new(filter: SubscriptionFilter, capacity: usize) -> Self {
        Self {
            id: ConnectionId::new(),
            filter: Mutex::new(filter),
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            ready: Notify::new(),
            capacity: capacity.max(1),
            dropped: AtomicU64::new(0),
            last_active: Mutex::new(Instant::now()),
            closed: AtomicBool::new(false),
        }
    }

    /// Connection handle.
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// The active filter.
    pub fn filter(&self) -> SubscriptionFilter {
        lock(&self.filter).clone()
    }

    /// Replace the filter. Frames already queued stay queued.
    pub fn set_filter(&self, filter: SubscriptionFilter) {
        *lock(&self.filter) = filter;
        self.touch();
    }

    /// Record client activity, resetting the inactivity timer.
    pub fn touch(&self) {
        *lock(&self.last_active) = Instant::now();
    }

    /// Time since the client was last heard from.
    pub fn idle_for(&self) -> Duration {
        lock(&self.last_active).elapsed()
    }

    /// Frames dropped from this session's queue.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Frames waiting to be sent.
    pub fn queued(&self) -> usize {
        lock(&self.queue).len()
    }

    /// Whether the hub has closed this session.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn matches(&self, delta: &StateDelta) -> bool {
        lock(&self.filter).matches(delta)
    }

    /// Queue a frame. Returns `true` if the oldest frame was dropped to
    /// make room.
    fn offer(&self, frame: &Utf8Bytes) -> bool {
        let dropped = {
            let mut queue = lock(&self.queue);
            let dropped = if queue.len() >= self.capacity {
                queue.pop_front().is_some()
            } else {
                false
            };
            queue.push_back(frame.clone());
            dropped
        };
        if dropped {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        self.ready.notify_one();
        dropped
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.ready.notify_one();
    }

    /// Take the next queued frame without waiting.
    pub fn try_recv(&self) -> Option<Utf8Bytes> {
        lock(&self.queue).pop_front()
    }

    /// Wait for the next frame. Returns `None` once the session is closed
    /// and its queue is empty.
    pub async fn recv(&self) -> Option<Utf8Bytes> {
        loop {
            if let Some(frame) = self.try_recv() {
                return Some(frame);
            }
            if self.is_closed() {
                return None;
            }
            self.ready.notified().await;
        }
    }
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// One session as reported by `GET /api/hub`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Connection handle.
    pub connection_id: ConnectionId,
    /// Frames waiting to be sent.
    pub queued: usize,
    /// Frames dropped because the queue was full.
    pub dropped: u64,
    /// Milliseconds since the client was last heard from.
    pub idle_ms: u64,
    /// Active filter.
    pub filter: SubscriptionFilter,
}

/// Hub-wide counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HubStats {
    /// Subscribed sessions.
    pub active_connections: u64,
    /// Whether connection pressure is raised.
    pub connection_pressure: bool,
    /// Deltas broadcast.
    pub broadcasts: u64,
    /// Frames queued across all sessions.
    pub delivered: u64,
    /// Frames dropped across all sessions.
    pub dropped: u64,
    /// Per-session detail.
    pub sessions: Vec<SessionStats>,
}

// ---------------------------------------------------------------------------
// Hub
// ---------------------------------------------------------------------------

/// Connection registry and delta fan-out.
#[derive(Debug)]
pub struct BroadcastHub {
    config: HubConfig,
    gauge: Arc<LoadGauge>,
    sessions: RwLock<BTreeMap<ConnectionId, Arc<Session>>>,
    broadcasts: AtomicU64,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl BroadcastHub {
    /// An empty hub reporting to `gauge`.
    pub fn new(config: HubConfig, gauge: Arc<LoadGauge>) -> Self {
        Self {
            config,
            gauge,
            sessions: RwLock::new(BTreeMap::new()),
            broadcasts: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Register a subscriber.
    pub fn subscribe(&self, filter: SubscriptionFilter) -> Arc<Session> {
        let session = Arc::new(Session::new(filter, self.config.queue_capacity));
        let mut sessions = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        sessions.insert(session.id(), Arc::clone(&session));
        // Under the registry lock so gauge updates land in registry order.
        self.update_pressure(sessions.len());
        debug!(connection_id = %session.id(), active = sessions.len(), "subscriber added");
        drop(sessions);
        session
    }

    /// Remove a subscriber and close its session. Returns `false` if the
    /// id was not registered.
    pub fn unsubscribe(&self, id: ConnectionId) -> bool {
        let mut sessions = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(session) = sessions.remove(&id) else {
            return false;
        };
        let active = sessions.len();
        self.update_pressure(active);
        drop(sessions);
        session.close();
        debug!(connection_id = %id, active, "subscriber removed");
        true
    }

    /// Queue `delta` on every matching session. Returns the number of
    /// sessions it was queued on.
    pub fn broadcast(&self, delta: &StateDelta) -> Result<usize, HubError> {
        let frame = Utf8Bytes::from(serde_json::to_string(delta)?);
        let mut delivered: usize = 0;
        let mut dropped: u64 = 0;
        {
            let sessions = self
                .sessions
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            for session in sessions.values() {
                if session.is_closed() || !session.matches(delta) {
                    continue;
                }
                if session.offer(&frame) {
                    dropped = dropped.saturating_add(1);
                }
                delivered = delivered.saturating_add(1);
            }
        }
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
        self.delivered.fetch_add(
            u64::try_from(delivered).unwrap_or(u64::MAX),
            Ordering::Relaxed,
        );
        if dropped > 0 {
            self.dropped.fetch_add(dropped, Ordering::Relaxed);
            debug!(kind = ?delta.kind, dropped, "slow subscribers lost frames");
        }
        Ok(delivered)
    }

    /// How long a client may stay silent before it is closed.
    pub const fn inactivity_timeout(&self) -> Duration {
        Duration::from_millis(self.config.inactivity_timeout_ms)
    }

    /// Subscribed sessions.
    pub fn active_connections(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Frames dropped across all sessions since start.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Counters and per-session detail.
    pub fn stats(&self) -> HubStats {
        let sessions: Vec<SessionStats> = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|s| SessionStats {
                connection_id: s.id(),
                queued: s.queued(),
                dropped: s.dropped(),
                idle_ms: millis(s.idle_for()),
                filter: s.filter(),
            })
            .collect();
        HubStats {
            active_connections: u64::try_from(sessions.len()).unwrap_or(u64::MAX),
            connection_pressure: self.gauge.connection_pressure(),
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped(),
            sessions,
        }
    }

    /// Close every session idle longer than the inactivity timeout.
    pub fn reap_idle(&self) -> Vec<ConnectionId> {
        let timeout = self.inactivity_timeout();
        let idle: Vec<ConnectionId> = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|s| s.idle_for() > timeout)
            .map(|s| s.id())
            .collect();
        for id in &idle {
            if self.unsubscribe(*id) {
                info!(connection_id = %id, "idle subscriber closed");
            }
        }
        idle
    }

    /// Run [`reap_idle`](Self::reap_idle) every `reap_interval_ms` until
    /// `shutdown` flips to `true`.
    pub fn spawn_reaper(self: &Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let hub = Arc::clone(self);
        let period = Duration::from_millis(self.config.reap_interval_ms.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let reaped = hub.reap_idle();
                        if !reaped.is_empty() {
                            debug!(reaped = reaped.len(), "reaper pass");
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("reaper stopped");
        })
    }

    fn update_pressure(&self, active: usize) {
        let active = u64::try_from(active).unwrap_or(u64::MAX);
        self.gauge.set_connections(active);
        let high = self.config.high_connections;
        if high == 0 {
            return;
        }
        let raised = self.gauge.connection_pressure();
        if !raised && active >= high {
            self.gauge.set_pressure(true);
            warn!(active, high, "connection pressure raised");
        } else if raised && active.saturating_mul(5) < high.saturating_mul(4) {
            self.gauge.set_pressure(false);
            info!(active, high, "connection pressure cleared");
        }
    }
}

impl DeltaSink for BroadcastHub {
    fn push(&self, deltas: Vec<StateDelta>) {
        for delta in &deltas {
            if let Err(e) = self.broadcast(delta) {
                warn!(kind = ?delta.kind, error = %e, "delta not broadcast");
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use hegemony_types::{ActionKind, DeltaKind, FactionId, TerritoryId};

    use super::*;

    fn hub(queue_capacity: usize, high_connections: u64) -> BroadcastHub {
        let config = HubConfig {
            queue_capacity,
            high_connections,
            ..HubConfig::default()
        };
        BroadcastHub::new(config, Arc::new(LoadGauge::new(high_connections)))
    }

    fn change(territory: u32) -> StateDelta {
        StateDelta::control_changed(
            TerritoryId::new(territory),
            None,
            Some(FactionId::new(1)),
            ActionKind::Expand,
        )
    }

    #[test]
    fn broadcast_respects_filters() {
        let hub = hub(8, 100);
        let everything = hub.subscribe(SubscriptionFilter::default());
        let narrow = hub.subscribe(SubscriptionFilter {
            territories: vec![TerritoryId::new(5)],
            ..SubscriptionFilter::default()
        });

        assert_eq!(hub.broadcast(&change(1)).unwrap(), 1);
        assert_eq!(hub.broadcast(&change(5)).unwrap(), 2);
        assert_eq!(everything.queued(), 2);
        assert_eq!(narrow.queued(), 1);

        let frame = narrow.try_recv().unwrap();
        let json: serde_json::Value = serde_json::from_str(frame.as_str()).unwrap();
        assert_eq!(json["type"], "control_changed");
        assert_eq!(json["territoryID"], 5);
    }

    #[test]
    fn slow_subscriber_drops_oldest_without_blocking_others() {
        let hub = hub(2, 100);
        let slow = hub.subscribe(SubscriptionFilter::default());
        let fast = hub.subscribe(SubscriptionFilter::default());

        for territory in 1..=3 {
            hub.broadcast(&change(territory)).unwrap();
            // The fast subscriber keeps up.
            assert!(fast.try_recv().is_some());
        }

        assert_eq!(slow.dropped(), 1);
        assert_eq!(fast.dropped(), 0);
        assert_eq!(hub.dropped(), 1);

        let first: serde_json::Value =
            serde_json::from_str(slow.try_recv().unwrap().as_str()).unwrap();
        assert_eq!(first["territoryID"], 2);
        let second: serde_json::Value =
            serde_json::from_str(slow.try_recv().unwrap().as_str()).unwrap();
        assert_eq!(second["territoryID"], 3);
        assert!(slow.try_recv().is_none());
    }

    #[test]
    fn filter_can_be_replaced() {
        let hub = hub(8, 100);
        let session = hub.subscribe(SubscriptionFilter {
            kinds: vec![DeltaKind::Cascade],
            ..SubscriptionFilter::default()
        });
        assert_eq!(hub.broadcast(&change(1)).unwrap(), 0);

        session.set_filter(SubscriptionFilter::default());
        assert_eq!(hub.broadcast(&change(1)).unwrap(), 1);
    }

    #[tokio::test]
    async fn recv_wakes_on_broadcast_and_ends_on_unsubscribe() {
        let hub = Arc::new(hub(8, 100));
        let session = hub.subscribe(SubscriptionFilter::default());

        let reader = {
            let session = Arc::clone(&session);
            tokio::spawn(async move {
                let mut frames = 0_u32;
                while session.recv().await.is_some() {
                    frames = frames.saturating_add(1);
                }
                frames
            })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        hub.broadcast(&change(1)).unwrap();
        hub.broadcast(&change(2)).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(hub.unsubscribe(session.id()));
        assert!(!hub.unsubscribe(session.id()));

        assert_eq!(reader.await.unwrap(), 2);
        assert!(session.is_closed());
        assert_eq!(hub.active_connections(), 0);
    }

    #[test]
    fn pressure_raises_at_threshold_and_clears_below_eighty_percent() {
        let hub = hub(8, 5);
        let sessions: Vec<_> = (0..5)
            .map(|_| hub.subscribe(SubscriptionFilter::default()))
            .collect();
        assert!(hub.gauge.connection_pressure());
        assert_eq!(hub.gauge.active_connections(), 5);

        let mut ids = sessions.iter().map(|s| s.id());
        hub.unsubscribe(ids.next().unwrap());
        // Four of five is exactly 80%: still raised.
        assert!(hub.gauge.connection_pressure());
        hub.unsubscribe(ids.next().unwrap());
        assert!(!hub.gauge.connection_pressure());
        assert_eq!(hub.gauge.active_connections(), 3);
    }

    #[test]
    fn connection_gauge_matches_the_registry_under_churn() {
        let hub = Arc::new(hub(4, 6));
        let workers: Vec<_> = (0..8)
            .map(|_| {
                let hub = Arc::clone(&hub);
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        let session = hub.subscribe(SubscriptionFilter::default());
                        hub.unsubscribe(session.id());
                    }
                    hub.subscribe(SubscriptionFilter::default())
                })
            })
            .collect();
        let kept: Vec<Arc<Session>> = workers.into_iter().map(|w| w.join().unwrap()).collect();

        assert_eq!(hub.active_connections(), kept.len());
        assert_eq!(hub.gauge.active_connections(), 8);
        assert!(hub.gauge.connection_pressure());

        for session in kept.iter().take(4) {
            hub.unsubscribe(session.id());
        }
        assert_eq!(hub.gauge.active_connections(), 4);
        assert!(!hub.gauge.connection_pressure());
    }

    #[test]
    fn idle_sessions_are_reaped() {
        let config = HubConfig {
            inactivity_timeout_ms: 0,
            ..HubConfig::default()
        };
        let hub = BroadcastHub::new(config, Arc::new(LoadGauge::new(100)));
        let session = hub.subscribe(SubscriptionFilter::default());
        std::thread::sleep(Duration::from_millis(5));

        assert_eq!(hub.reap_idle(), vec![session.id()]);
        assert!(session.is_closed());
        assert_eq!(hub.active_connections(), 0);
    }

    #[test]
    fn active_sessions_survive_the_reaper() {
        let hub = hub(8, 100);
        let session = hub.subscribe(SubscriptionFilter::default());
        session.touch();
        assert!(hub.reap_idle().is_empty());
        assert_eq!(hub.stats().active_connections, 1);
    }

    #[test]
    fn sink_pushes_every_delta() {
        let hub = hub(8, 100);
        let session = hub.subscribe(SubscriptionFilter::default());
        hub.push(vec![change(1), change(2), change(3)]);
        assert_eq!(session.queued(), 3);

        let stats = hub.stats();
        assert_eq!(stats.broadcasts, 3);
        assert_eq!(stats.delivered, 3);
        assert_eq!(stats.sessions.first().unwrap().queued, 3);
    }
}
