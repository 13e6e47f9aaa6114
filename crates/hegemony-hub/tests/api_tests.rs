//! Integration tests for the control API.
//!
//! Requests go straight through the router via `tower::ServiceExt`, with
//! a coordinator running the built-in campaign on the in-memory store.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use hegemony_core::{Coordinator, CoordinatorConfig, LoadGauge};
use hegemony_db::MemoryStore;
use hegemony_hub::{AppState, BroadcastHub, build_router};
use hegemony_types::SubscriptionFilter;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tower::ServiceExt;

fn config() -> CoordinatorConfig {
    let mut config = CoordinatorConfig::default();
    config.scheduler.cycle_budget_ms = 5_000;
    config.scheduler.task_deadline_ms = 5_000;
    config.store.retry_attempts = 1;
    config.store.retry_base_ms = 1;
    config.store.retry_max_ms = 1;
    config
}

async fn make_state(config: CoordinatorConfig) -> (Arc<AppState>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let gauge = Arc::new(LoadGauge::new(config.hub.high_connections));
    let hub = Arc::new(BroadcastHub::new(config.hub.clone(), Arc::clone(&gauge)));
    let coordinator = Coordinator::bootstrap(config, store.clone(), None, gauge, hub.clone())
        .await
        .unwrap();
    (Arc::new(AppState::new(coordinator, hub)), store)
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(path: &str) -> Request<Body> {
    Request::get(path).body(Body::empty()).unwrap()
}

fn post_json(path: &str, body: &str) -> Request<Body> {
    Request::post(path)
        .header("content-type", "application/json")
        .body(Body::from(body.to_owned()))
        .unwrap()
}

// =========================================================================
// POST /api/cycles
// =========================================================================

#[tokio::test]
async fn test_enqueue_all_factions() {
    let (state, _store) = make_state(config()).await;
    let router = build_router(state);

    let response = router
        .oneshot(post_json("/api/cycles", "{}"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["factions"].as_array().unwrap().len(), 5);
    assert_eq!(json["queue_depth"], 5);
}

#[tokio::test]
async fn test_enqueue_unknown_faction_is_not_found() {
    let (state, _store) = make_state(config()).await;
    let router = build_router(Arc::clone(&state));

    let response = router
        .oneshot(post_json("/api/cycles", r#"{"factions":[2,42]}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], 404);
    assert!(json["error"].as_str().unwrap().contains("42"));
    // Nothing was queued.
    assert_eq!(state.coordinator.load_metrics().queue_depth, 0);
}

#[tokio::test]
async fn test_enqueue_full_queue_is_too_many_requests() {
    let mut config = config();
    config.scheduler.max_queue_depth = 1;
    let (state, _store) = make_state(config).await;
    let router = build_router(state);

    // Factions 2 and 4 share shard 0, which only has room for one task.
    let response = router
        .oneshot(post_json("/api/cycles", r#"{"factions":[2,4]}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], 429);
}

// =========================================================================
// GET /api/metrics, GET /api/health
// =========================================================================

#[tokio::test]
async fn test_metrics_use_camel_case() {
    let (state, _store) = make_state(config()).await;
    let _session = state.hub.subscribe(SubscriptionFilter::default());
    let router = build_router(state);

    let response = router.oneshot(get("/api/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["activeConnections"], 1);
    assert_eq!(json["queueDepth"], 0);
    assert!(json["cpu"].is_number());
    assert!(json["memory"].is_number());
}

#[tokio::test]
async fn test_health_ok() {
    let (state, _store) = make_state(config()).await;
    let router = build_router(state);

    let response = router.oneshot(get("/api/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["shards"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_health_degraded_when_store_fails() {
    let mut config = config();
    config.store.degraded_after = 1;
    let (state, store) = make_state(config).await;
    store.set_failing(true);
    state.coordinator.run_cycle(0).await.unwrap();
    state.coordinator.run_cycle(1).await.unwrap();
    let router = build_router(state);

    let response = router.oneshot(get("/api/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["degraded"], true);
}

// =========================================================================
// GET /api/territories
// =========================================================================

#[tokio::test]
async fn test_list_territories() {
    let (state, _store) = make_state(config()).await;
    let router = build_router(state);

    let response = router.oneshot(get("/api/territories")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["territories"].as_array().unwrap().len(), 12);
    assert_eq!(json["factions"].as_array().unwrap().len(), 5);
    assert!(json["version"].is_u64());
}

#[tokio::test]
async fn test_list_territories_filtered() {
    let (state, _store) = make_state(config()).await;
    let router = build_router(state);

    let response = router
        .oneshot(get("/api/territories?controller=2&contested=false"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    let territories = json["territories"].as_array().unwrap();
    assert!(!territories.is_empty());
    for territory in territories {
        assert_eq!(territory["controller"], 2);
        assert_eq!(territory["contested"], false);
    }
}

// =========================================================================
// /api/factions/{id}
// =========================================================================

#[tokio::test]
async fn test_get_faction() {
    let (state, _store) = make_state(config()).await;
    let router = build_router(state);

    let response = router.oneshot(get("/api/factions/2")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["profile"]["faction_id"], 2);
    assert_eq!(json["standing"]["faction_id"], 2);
    let holdings: Vec<u64> = json["holdings"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_u64().unwrap())
        .collect();
    assert_eq!(holdings, vec![2, 12]);
}

#[tokio::test]
async fn test_get_faction_not_found() {
    let (state, _store) = make_state(config()).await;
    let router = build_router(state);

    let response = router.oneshot(get("/api/factions/99")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], 404);
}

#[tokio::test]
async fn test_reset_faction() {
    let (state, _store) = make_state(config()).await;
    let router = build_router(state);

    let response = router
        .oneshot(
            Request::post("/api/factions/3/reset")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["faction_id"], 3);
    assert!(json["adaptation"]["window"].as_array().unwrap().is_empty());
}

// =========================================================================
// GET /api/hub
// =========================================================================

#[tokio::test]
async fn test_hub_stats_after_a_cycle() {
    let (state, _store) = make_state(config()).await;
    let session = state.hub.subscribe(SubscriptionFilter::default());
    state.coordinator.run_cycle(0).await.unwrap();
    let router = build_router(Arc::clone(&state));

    let response = router.oneshot(get("/api/hub")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["active_connections"], 1);
    assert!(json["broadcasts"].as_u64().unwrap() >= 1);
    assert_eq!(
        json["sessions"][0]["connection_id"],
        session.id().to_string()
    );
    // The cycle summary reached the subscriber.
    let mut kinds = Vec::new();
    while let Some(frame) = session.try_recv() {
        let delta: Value = serde_json::from_str(frame.as_str()).unwrap();
        kinds.push(delta["type"].as_str().unwrap().to_owned());
    }
    assert_eq!(kinds.last().map(String::as_str), Some("cycle_summary"));
}

#[tokio::test]
async fn test_unknown_route_returns_404() {
    let (state, _store) = make_state(config()).await;
    let router = build_router(state);

    let response = router.oneshot(get("/api/nonexistent")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =========================================================================
// GET /ws/deltas
// =========================================================================

/// Upgrade a raw TCP connection to a `WebSocket` and return whatever the
/// server sends after the handshake, up to the point it hangs up.
async fn silent_ws_client(addr: std::net::SocketAddr) -> (String, Vec<u8>) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "GET /ws/deltas HTTP/1.1\r\n\
         Host: {addr}\r\n\
         Connection: Upgrade\r\n\
         Upgrade: websocket\r\n\
         Sec-WebSocket-Version: 13\r\n\
         Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\r\n"
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut received = Vec::new();
    stream.read_to_end(&mut received).await.unwrap();
    let split = received
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("handshake response")
        + 4;
    let head = String::from_utf8_lossy(&received[..split]).into_owned();
    (head, received[split..].to_vec())
}

#[tokio::test]
async fn test_ws_client_that_never_subscribes_is_closed() {
    let mut config = config();
    config.hub.inactivity_timeout_ms = 100;
    let (state, _store) = make_state(config).await;
    let hub = Arc::clone(&state.hub);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, shutdown) = watch::channel(false);
    let server = tokio::spawn(hegemony_hub::server::serve(listener, state, shutdown));

    let (head, frames) = tokio::time::timeout(Duration::from_secs(5), silent_ws_client(addr))
        .await
        .expect("server should hang up on a silent client");

    assert!(head.starts_with("HTTP/1.1 101"), "{head}");
    // An unmasked close frame with no payload.
    assert_eq!(frames, vec![0x88, 0x00]);
    assert_eq!(hub.active_connections(), 0);

    stop.send(true).unwrap();
    server.await.unwrap().unwrap();
}
