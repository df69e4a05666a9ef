use std::sync::Arc;

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use uuid::Uuid;

use crate::state::AppState;
use crate::websocket::message_types::ChatEvent;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub session_id: String,
    pub user_id: Uuid,
}

/// GET /api/v1/ws?session_id=&user_id=
///
/// Upgrades to a per-session subscription: replays the newest bounded
/// window of messages oldest-first, then streams every committed
/// message live. Membership is checked before the upgrade.
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let session = match state.store.get_session(&params.session_id).await {
        Ok(Some(session)) => session,
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "session lookup failed before ws upgrade");
            return StatusCode::SERVICE_UNAVAILABLE.into_response();
        }
    };
    if !session.is_participant(params.user_id) {
        return StatusCode::FORBIDDEN.into_response();
    }

    ws.on_upgrade(move |socket| handle_socket(state, params, socket))
}

async fn handle_socket(state: AppState, params: WsParams, socket: WebSocket) {
    let (mut sink, stream) = socket.split();

    // Subscribe before replaying: anything committed during the replay
    // is queued and delivered afterwards. The overlap can duplicate a
    // message (delivery is at-least-once); clients order by
    // sequence_number.
    let mut rx = state.registry.subscribe(&params.session_id).await;

    let replay = match state
        .store
        .recent_messages(&params.session_id, state.config.replay_limit)
        .await
    {
        Ok(messages) => messages,
        Err(e) => {
            tracing::warn!(error = %e, session = %params.session_id, "replay fetch failed; closing subscriber");
            return;
        }
    };
    for message in replay {
        let event = ChatEvent::Message {
            session_id: params.session_id.clone(),
            message,
        };
        if send_event(&mut sink, &event).await.is_err() {
            return;
        }
    }

    deliver_loop(&mut sink, stream, &mut rx).await;
    // Dropping rx unsubscribes; the registry prunes the sender on the
    // next publish.
}

async fn deliver_loop(
    sink: &mut SplitSink<WebSocket, WsMessage>,
    mut stream: SplitStream<WebSocket>,
    rx: &mut tokio::sync::mpsc::Receiver<Arc<ChatEvent>>,
) {
    loop {
        tokio::select! {
            delivered = rx.recv() => match delivered {
                Some(event) => {
                    if send_event(sink, &event).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            incoming = stream.next() => match incoming {
                Some(Ok(WsMessage::Close(_))) | None => break,
                Some(Ok(_)) => {
                    // Pings are answered by the framework; other inbound
                    // frames are ignored on this read-only stream.
                }
                Some(Err(_)) => break,
            },
        }
    }
}

async fn send_event(
    sink: &mut SplitSink<WebSocket, WsMessage>,
    event: &ChatEvent,
) -> Result<(), axum::Error> {
    match serde_json::to_string(event) {
        Ok(text) => sink.send(WsMessage::Text(text)).await,
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize outbound event");
            Ok(())
        }
    }
}
