//! Where the coordinator sends state deltas after each cycle.

use std::sync::Mutex;

use hegemony_types::StateDelta;

/// Receives the deltas produced by a cycle, in order.
///
/// Implementations must not block: the call is made from a shard loop.
pub trait DeltaSink: Send + Sync {
    /// Deliver one cycle's deltas.
    fn push(&self, deltas: Vec<StateDelta>);
}

/// Discards every delta.
#[derive(Debug, Default)]
pub struct NoOpSink;

impl DeltaSink for NoOpSink {
    fn push(&self, _deltas: Vec<StateDelta>) {}
}

/// Keeps every delta in memory, for tests and replay tooling.
#[derive(Debug, Default)]
pub struct RecordingSink {
    deltas: Mutex<Vec<StateDelta>>,
}

impl RecordingSink {
    /// An empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything received so far.
    pub fn take(&self) -> Vec<StateDelta> {
        std::mem::take(
            &mut *self
                .deltas
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner),
        )
    }
}

impl DeltaSink for RecordingSink {
    fn push(&self, deltas: Vec<StateDelta>) {
        self.deltas
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .extend(deltas);
    }
}
