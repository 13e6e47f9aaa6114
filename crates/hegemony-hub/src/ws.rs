//! `WebSocket` endpoint for live state deltas.
//!
//! Clients connect to `GET /ws/deltas` and send
//! `{"type":"subscribe","filter":{...}}` to start receiving deltas. A
//! second `subscribe` replaces the filter on the same connection.
//! `{"type":"ping"}` refreshes the inactivity timer and is answered with
//! `{"type":"pong"}`; `{"type":"unsubscribe"}` closes the connection.
//! A client that has not subscribed within the inactivity timeout is sent a
//! close frame and dropped.
//!
//! Each connection owns one loop that waits on its session queue and the
//! socket at the same time, so outbound frames never wait on inbound
//! traffic and vice versa.

use std::sync::Arc;

use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use hegemony_types::{ClientMessage, ServerMessage};
use tracing::{debug, warn};

use crate::hub::{BroadcastHub, Session};
use crate::state::AppState;

/// What to do after handling a client text frame.
#[derive(Debug, PartialEq, Eq)]
enum Reply {
    Send(ServerMessage),
    Close,
}

/// Upgrade to a `WebSocket` and stream deltas once the client subscribes.
///
/// # Route
///
/// `GET /ws/deltas`
pub async fn ws_deltas(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    debug!("WebSocket client connected");
    let idle = state.hub.inactivity_timeout();
    let mut session: Option<Arc<Session>> = None;

    loop {
        let keep_open = if let Some(live) = session.clone() {
            tokio::select! {
                frame = live.recv() => on_frame(&mut socket, frame).await,
                msg = socket.recv() => on_inbound(&mut socket, &state.hub, &mut session, msg).await,
            }
        } else {
            // Not registered with the hub yet, so the reaper cannot see it.
            match tokio::time::timeout(idle, socket.recv()).await {
                Ok(msg) => on_inbound(&mut socket, &state.hub, &mut session, msg).await,
                Err(_) => {
                    debug!(idle_ms = idle.as_millis(), "client never subscribed, closing");
                    close(&mut socket).await;
                    false
                }
            }
        };
        if !keep_open {
            break;
        }
    }

    if let Some(s) = session {
        state.hub.unsubscribe(s.id());
    }
}

/// Forward a queued frame. Returns `false` once the connection is done.
async fn on_frame(socket: &mut WebSocket, frame: Option<Utf8Bytes>) -> bool {
    let Some(frame) = frame else {
        debug!("session closed by hub");
        close(socket).await;
        return false;
    };
    if socket.send(Message::Text(frame)).await.is_err() {
        debug!("WebSocket client disconnected (send failed)");
        return false;
    }
    true
}

/// Handle one inbound socket event. Returns `false` once the connection is
/// done.
async fn on_inbound(
    socket: &mut WebSocket,
    hub: &BroadcastHub,
    session: &mut Option<Arc<Session>>,
    msg: Option<Result<Message, axum::Error>>,
) -> bool {
    match msg {
        Some(Ok(Message::Text(text))) => match handle_client_text(hub, session, text.as_str()) {
            Reply::Send(reply) => send_reply(socket, &reply).await,
            Reply::Close => {
                close(socket).await;
                false
            }
        },
        Some(Ok(Message::Ping(data))) => {
            if let Some(s) = session {
                s.touch();
            }
            if socket.send(Message::Pong(data)).await.is_err() {
                debug!("WebSocket client disconnected (pong failed)");
                return false;
            }
            true
        }
        Some(Ok(Message::Close(_))) | None => {
            debug!("WebSocket client disconnected");
            false
        }
        Some(Err(e)) => {
            debug!("WebSocket error: {e}");
            false
        }
        Some(Ok(_)) => true,
    }
}

async fn close(socket: &mut WebSocket) {
    if socket.send(Message::Close(None)).await.is_err() {
        debug!("close frame not delivered");
    }
}

fn handle_client_text(
    hub: &BroadcastHub,
    session: &mut Option<Arc<Session>>,
    text: &str,
) -> Reply {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Subscribe { filter }) => {
            let connection_id = if let Some(s) = session {
                s.set_filter(filter);
                s.id()
            } else {
                let s = hub.subscribe(filter);
                let id = s.id();
                *session = Some(s);
                id
            };
            Reply::Send(ServerMessage::Subscribed { connection_id })
        }
        Ok(ClientMessage::Unsubscribe) => Reply::Close,
        Ok(ClientMessage::Ping) => {
            if let Some(s) = session {
                s.touch();
            }
            Reply::Send(ServerMessage::Pong)
        }
        Err(e) => Reply::Send(ServerMessage::Error {
            message: format!("invalid message: {e}"),
        }),
    }
}

/// Returns `false` once the socket is gone.
async fn send_reply(socket: &mut WebSocket, reply: &ServerMessage) -> bool {
    let json = match serde_json::to_string(reply) {
        Ok(j) => j,
        Err(e) => {
            warn!("Failed to serialize server message: {e}");
            return true;
        }
    };
    if socket.send(Message::Text(json.into())).await.is_err() {
        debug!("WebSocket client disconnected (reply failed)");
        return false;
    }
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use hegemony_core::LoadGauge;
    use hegemony_core::config::HubConfig;
    use hegemony_types::{DeltaKind, SubscriptionFilter};

    use super::*;

    fn hub() -> BroadcastHub {
        BroadcastHub::new(HubConfig::default(), Arc::new(LoadGauge::new(100)))
    }

    #[test]
    fn first_subscribe_registers_a_session() {
        let hub = hub();
        let mut session = None;
        let reply = handle_client_text(
            &hub,
            &mut session,
            r#"{"type":"subscribe","filter":{"kinds":["cascade"]}}"#,
        );

        let s = session.unwrap();
        assert_eq!(
            reply,
            Reply::Send(ServerMessage::Subscribed {
                connection_id: s.id()
            })
        );
        assert_eq!(s.filter().kinds, vec![DeltaKind::Cascade]);
        assert_eq!(hub.active_connections(), 1);
    }

    #[test]
    fn resubscribe_replaces_the_filter_in_place() {
        let hub = hub();
        let mut session = Some(hub.subscribe(SubscriptionFilter {
            kinds: vec![DeltaKind::Cascade],
            ..SubscriptionFilter::default()
        }));
        let id = session.as_ref().unwrap().id();

        let reply = handle_client_text(&hub, &mut session, r#"{"type":"subscribe"}"#);
        assert_eq!(
            reply,
            Reply::Send(ServerMessage::Subscribed { connection_id: id })
        );
        assert!(session.unwrap().filter().kinds.is_empty());
        assert_eq!(hub.active_connections(), 1);
    }

    #[test]
    fn ping_unsubscribe_and_garbage() {
        let hub = hub();
        let mut session = None;
        assert_eq!(
            handle_client_text(&hub, &mut session, r#"{"type":"ping"}"#),
            Reply::Send(ServerMessage::Pong)
        );
        assert_eq!(
            handle_client_text(&hub, &mut session, r#"{"type":"unsubscribe"}"#),
            Reply::Close
        );
        assert!(matches!(
            handle_client_text(&hub, &mut session, "not json"),
            Reply::Send(ServerMessage::Error { .. })
        ));
        assert!(session.is_none());
    }
}
