use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use vantage_core::collaboration::{ClientMessage, Participant};
use vantage_events::CollabSession;

use crate::access::ProjectAccess;
use crate::state::AppState;

/// GET /api/v1/collab
///
/// Upgrades to a WebSocket that speaks the collaboration protocol.
pub async fn collab_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Run one collaboration connection to completion.
///
/// A writer task forwards room events and control frames to the socket while
/// the current task applies inbound frames to the session. Teardown leaves
/// the room (announcing `userLeft`) and unregisters the connection.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, "Collaboration socket connected");

    let mut control_rx = state.ws_manager.add(&conn_id).await;
    let (mut session, mut events_rx) = CollabSession::open(Arc::clone(&state.rooms), &conn_id);

    let (mut sink, mut stream) = socket.split();

    let writer_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                Some(msg) = control_rx.recv() => msg,
                Some(event) = events_rx.recv() => Message::Text(event.to_json().into()),
                else => break,
            };
            let closing = matches!(msg, Message::Close(_));
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %writer_conn_id, "WebSocket sink closed");
                break;
            }
            if closing {
                break;
            }
        }
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                apply_frame(&mut session, state.access.as_ref(), text.as_str()).await;
            }
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    session.disconnect().await;
    state.ws_manager.remove(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, "Collaboration socket disconnected");
}

/// Apply one inbound text frame.
///
/// Joins are checked against the access directory using the identity the
/// client announces; denied joins are dropped like malformed input.
pub(crate) async fn apply_frame(
    session: &mut CollabSession,
    access: &dyn ProjectAccess,
    raw: &str,
) {
    let Some(msg) = ClientMessage::parse(raw) else {
        tracing::trace!(conn_id = %session.conn_id(), "Dropped malformed collaboration message");
        return;
    };

    let ClientMessage::Join {
        project_id,
        user_id,
        user_name,
    } = msg
    else {
        session.handle(msg).await;
        return;
    };

    let Some(project_id) = project_id.filter(|p| !p.is_empty()) else {
        return;
    };
    let participant = Participant::from_join(user_id, user_name);

    match access.can_access(&project_id, &participant.user_id).await {
        Ok(true) => session.join(&project_id, participant).await,
        Ok(false) => {
            tracing::debug!(
                conn_id = %session.conn_id(),
                project_id = %project_id,
                user_id = %participant.user_id,
                "Room join denied",
            );
        }
        Err(e) => {
            tracing::warn!(
                conn_id = %session.conn_id(),
                project_id = %project_id,
                error = %e,
                "Access check failed, join dropped",
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
