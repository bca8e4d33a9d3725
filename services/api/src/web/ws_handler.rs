//! services/api/src/web/ws_handler.rs
//!
//! Per-session WebSocket connection: registers presence for the lifetime of
//! the socket, forwards this session's committed events to the client, and
//! accepts inbound chat text frames.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    response::{IntoResponse, Response},
    Extension,
};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::state::AppState;
use skill_exchange_core::ports::PortError;

/// Error frame sent back to the client when an inbound message is rejected.
#[derive(Serialize)]
struct ErrorFrame<'a> {
    r#type: &'a str,
    message: String,
}

/// The handler for upgrading HTTP requests to WebSocket connections.
///
/// Participation is checked before the upgrade so that outsiders never get
/// a socket at all.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(session_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let session = app_state.sessions.get(session_id).await?;
    if !session.is_participant(user_id) {
        return Err(ApiError::Port(PortError::AccessDenied(
            "only session participants may connect".into(),
        )));
    }
    Ok(ws
        .on_upgrade(move |socket| handle_socket(socket, app_state, session_id, user_id))
        .into_response())
}

async fn handle_socket(
    socket: WebSocket,
    app_state: Arc<AppState>,
    session_id: Uuid,
    user_id: Uuid,
) {
    info!(
        "WebSocket connected: user {} on session {}",
        user_id, session_id
    );
    app_state.presence.joined(session_id, user_id).await;

    let (mut sender, mut receiver) = socket.split();
    let mut events = app_state.events.subscribe();

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(event) if event.session_id() == session_id => {
                        let json = match serde_json::to_string(&event) {
                            Ok(json) => json,
                            Err(e) => {
                                warn!("Failed to serialize session event: {}", e);
                                continue;
                            }
                        };
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Ok(_) => {} // another session's event
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Socket for session {} lagged, skipped {} events", session_id, skipped);
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
            inbound = receiver.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        // Inbound text frames are chat messages; the manager
                        // validates and broadcasts them back to everyone,
                        // including this socket.
                        if let Err(e) = app_state
                            .sessions
                            .add_chat_message(user_id, session_id, text.to_string())
                            .await
                        {
                            let frame = ErrorFrame {
                                r#type: "error",
                                message: e.to_string(),
                            };
                            let json = serde_json::to_string(&frame)
                                .unwrap_or_else(|_| "{\"type\":\"error\"}".to_string());
                            if sender.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // ping/pong handled by axum, binary ignored
                    Some(Err(e)) => {
                        debug!("WebSocket receive error: {}", e);
                        break;
                    }
                }
            }
        }
    }

    app_state.presence.left(session_id, user_id).await;
    info!(
        "WebSocket disconnected: user {} on session {}",
        user_id, session_id
    );
}
