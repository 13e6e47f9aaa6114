//! REST handlers for the coordinator control surface.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/cycles` | Queue decision cycles (202, 404, 429) |
//! | `GET` | `/api/metrics` | Live load signals |
//! | `GET` | `/api/health` | Persistence and invariant health (200 / 503) |
//! | `GET` | `/api/territories` | Latest map snapshot |
//! | `GET` | `/api/factions/{id}` | Profile, standing, and holdings |
//! | `POST` | `/api/factions/{id}/reset` | Clear a faction's adaptation state |
//! | `GET` | `/api/hub` | Broadcast hub counters |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use hegemony_types::{FactionId, FactionProfile, FactionStanding, Territory, TerritoryId};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Body of `POST /api/cycles`.
#[derive(Debug, Default, Deserialize)]
pub struct CycleRequest {
    /// Factions to queue. Empty queues every faction.
    #[serde(default)]
    pub factions: Vec<FactionId>,
}

/// Reply to an accepted `POST /api/cycles`.
#[derive(Debug, Serialize)]
pub struct CycleAccepted {
    /// Factions queued.
    pub factions: Vec<FactionId>,
    /// Tasks queued across all shards after the request.
    pub queue_depth: u64,
}

/// Query parameters for `GET /api/territories`.
#[derive(Debug, Default, Deserialize)]
pub struct TerritoriesQuery {
    /// Only territories held by this faction id.
    pub controller: Option<u32>,
    /// Only territories with this contested flag.
    pub contested: Option<bool>,
}

/// Body of `GET /api/territories`.
#[derive(Debug, Serialize)]
pub struct TerritoriesView<'a> {
    /// Snapshot version.
    pub version: u64,
    /// When the snapshot was published.
    pub taken_at: DateTime<Utc>,
    /// Territories passing the query, in id order.
    pub territories: Vec<&'a Territory>,
    /// Every faction's standing.
    pub factions: Vec<&'a FactionStanding>,
}

/// Body of `GET /api/factions/{id}`.
#[derive(Debug, Serialize)]
pub struct FactionView {
    /// Traits and adaptation state.
    pub profile: FactionProfile,
    /// Strength and resources, if the map has a row for the faction.
    pub standing: Option<FactionStanding>,
    /// Territories the faction controls.
    pub holdings: Vec<TerritoryId>,
}

// ---------------------------------------------------------------------------
// POST /api/cycles
// ---------------------------------------------------------------------------

/// Queue a decision cycle for each requested faction.
///
/// Unknown factions fail the whole request with 404 before anything is
/// queued. A full or draining shard answers 429; factions on other shards
/// may already have been queued.
pub async fn enqueue_cycles(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CycleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let coordinator = &state.coordinator;
    let factions = if request.factions.is_empty() {
        coordinator.factions().to_vec()
    } else {
        request.factions
    };

    if let Some(unknown) = factions
        .iter()
        .find(|f| coordinator.factions().binary_search(f).is_err())
    {
        return Err(ApiError::NotFound(format!("faction {unknown}")));
    }

    if !coordinator.enqueue_faction_cycle(&factions) {
        return Err(ApiError::Backpressure(String::from(
            "scheduler queue full or draining",
        )));
    }

    info!(count = factions.len(), "decision cycles queued");
    let queue_depth = coordinator.load_metrics().queue_depth;
    Ok((
        StatusCode::ACCEPTED,
        Json(CycleAccepted {
            factions,
            queue_depth,
        }),
    ))
}

// ---------------------------------------------------------------------------
// GET /api/metrics, GET /api/health
// ---------------------------------------------------------------------------

/// Current CPU, memory, connection, and queue signals.
pub async fn get_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.coordinator.load_metrics())
}

/// Health report; 503 when persistence is degraded or rows were rejected.
pub async fn get_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let report = state.coordinator.health().await;
    let status = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}

// ---------------------------------------------------------------------------
// GET /api/territories
// ---------------------------------------------------------------------------

/// The latest published snapshot, optionally filtered.
///
/// # Query Parameters
///
/// - `controller`: faction id
/// - `contested`: `true` | `false`
pub async fn list_territories(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TerritoriesQuery>,
) -> impl IntoResponse {
    let snapshot = state.coordinator.snapshot().await;
    let view = TerritoriesView {
        version: snapshot.version,
        taken_at: snapshot.taken_at,
        territories: snapshot
            .territories
            .values()
            .filter(|t| {
                params
                    .controller
                    .is_none_or(|f| t.controller == Some(FactionId::new(f)))
            })
            .filter(|t| params.contested.is_none_or(|c| t.contested == c))
            .collect(),
        factions: snapshot.factions.values().collect(),
    };
    Json(view).into_response()
}

// ---------------------------------------------------------------------------
// /api/factions/{id}
// ---------------------------------------------------------------------------

/// A faction's profile, standing, and holdings.
pub async fn get_faction(
    State(state): State<Arc<AppState>>,
    Path(raw): Path<u32>,
) -> Result<impl IntoResponse, ApiError> {
    let id = FactionId::new(raw);
    let profile = state
        .coordinator
        .profile(id)
        .map_err(|e| ApiError::NotFound(e.to_string()))?;
    let snapshot = state.coordinator.snapshot().await;
    let holdings = snapshot
        .territories
        .values()
        .filter(|t| t.is_held_by(id))
        .map(|t| t.id)
        .collect();

    Ok(Json(FactionView {
        profile,
        standing: snapshot.factions.get(&id).cloned(),
        holdings,
    }))
}

/// Clear a faction's outcome window and specialization scores.
pub async fn reset_faction(
    State(state): State<Arc<AppState>>,
    Path(raw): Path<u32>,
) -> Result<impl IntoResponse, ApiError> {
    let id = FactionId::new(raw);
    let profile = state
        .coordinator
        .reset_adaptation(id)
        .await
        .map_err(|e| ApiError::NotFound(e.to_string()))?;
    info!(faction_id = %id, "adaptation reset");
    Ok(Json(profile))
}

// ---------------------------------------------------------------------------
// GET /api/hub
// ---------------------------------------------------------------------------

/// Subscriber counts, drop counters, and per-session detail.
pub async fn get_hub(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.hub.stats())
}
