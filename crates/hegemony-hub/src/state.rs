//! Shared application state for the control API.

use std::sync::Arc;

use hegemony_core::Coordinator;

use crate::hub::BroadcastHub;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor. The
/// hub is the same instance the coordinator pushes deltas into.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The running coordinator.
    pub coordinator: Arc<Coordinator>,
    /// Subscriber registry and fan-out.
    pub hub: Arc<BroadcastHub>,
}

impl AppState {
    /// Bundle a coordinator with the hub it broadcasts through.
    pub const fn new(coordinator: Arc<Coordinator>, hub: Arc<BroadcastHub>) -> Self {
        Self { coordinator, hub }
    }
}
