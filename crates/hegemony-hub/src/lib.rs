//! Broadcast hub and control API for the Hegemony coordinator.
//!
//! - [`hub`] -- [`BroadcastHub`], the subscriber registry that fans state
//!   deltas out over bounded per-connection queues. It implements
//!   [`DeltaSink`](hegemony_core::DeltaSink), so the coordinator pushes
//!   straight into it.
//! - [`ws`] -- the `GET /ws/deltas` `WebSocket` endpoint.
//! - [`handlers`] -- the REST control surface (`/api/cycles`,
//!   `/api/metrics`, `/api/health`, and read-only views).
//! - [`router`] / [`server`] -- Axum assembly and lifecycle.

pub mod error;
pub mod handlers;
pub mod hub;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

pub use error::{ApiError, HubError};
pub use hub::{BroadcastHub, HubStats, Session, SessionStats};
pub use router::build_router;
pub use server::{ServerError, spawn_server};
pub use state::AppState;
