//! Axum router construction for the control API.
//!
//! Assembles the REST routes and the `WebSocket` endpoint into a single
//! [`Router`] with permissive CORS for dashboard clients and request
//! tracing.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete router.
///
/// - `GET /ws/deltas` -- `WebSocket` delta stream
/// - `POST /api/cycles` -- queue decision cycles
/// - `GET /api/metrics` -- load signals
/// - `GET /api/health` -- health report
/// - `GET /api/territories` -- latest snapshot
/// - `GET /api/factions/{id}` -- one faction
/// - `POST /api/factions/{id}/reset` -- reset adaptation
/// - `GET /api/hub` -- hub counters
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws/deltas", get(ws::ws_deltas))
        .route("/api/cycles", post(handlers::enqueue_cycles))
        .route("/api/metrics", get(handlers::get_metrics))
        .route("/api/health", get(handlers::get_health))
        .route("/api/territories", get(handlers::list_territories))
        .route("/api/factions/{id}", get(handlers::get_faction))
        .route("/api/factions/{id}/reset", post(handlers::reset_faction))
        .route("/api/hub", get(handlers::get_hub))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
