use std::time::Duration;

use axum::{
    body::Bytes,
    debug_handler,
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{session::CurrentUser, AppState};

use super::{
    events::{ClientEvent, ServerEvent},
    router,
};

/// A connection that cannot take a ping is treated as disconnected.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Upgrade gate for `/ws`. The `CurrentUser` extractor rejects an
/// unauthenticated upgrade with 401 before any connection state exists.
#[debug_handler(state = crate::AppState)]
pub async fn chat_ws(user: CurrentUser, State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_session(state, user, socket))
}

/// One task per live connection: the only place presence, typing state, and
/// channel subscriptions are created or torn down.
async fn run_session(state: AppState, user: CurrentUser, socket: WebSocket) {
    let session_id = Uuid::now_v7();
    let (tx, mut rx) = mpsc::unbounded_channel();

    state.channels.register(session_id, tx).await;
    state.channels.subscribe(session_id, user.id).await;
    let users = state.presence.mark_online(user.id, user.username.clone()).await;
    state.channels.broadcast_all(ServerEvent::UpdateUserStatus { users }).await;
    tracing::info!(user = %user.username, "websocket connected");

    let (mut sink, mut stream) = socket.split();
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await;

    loop {
        tokio::select! {
            outbound = rx.recv() => {
                let Some(event) = outbound else { break };
                let Ok(payload) = serde_json::to_string(&event) else { continue };
                if sink.send(Message::Text(payload.into())).await.is_err() {
                    break;
                }
            }
            inbound = stream.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        let Ok(event) = serde_json::from_str::<ClientEvent>(&text) else {
                            tracing::debug!(user = %user.username, "ignoring unparseable frame");
                            continue;
                        };
                        router::dispatch(&state, session_id, &user, event).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
            _ = heartbeat.tick() => {
                if sink.send(Message::Ping(Bytes::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    state.channels.unregister(session_id).await;
    state.typing.clear(user.id).await;
    let users = state.presence.mark_offline(user.id).await;
    state.channels.broadcast_all(ServerEvent::UpdateUserStatus { users }).await;
    tracing::info!(user = %user.username, "websocket disconnected");
}
