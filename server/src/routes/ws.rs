//! WebSocket handler — one-way board change feed.
//!
//! DESIGN
//! ======
//! The socket carries no board data. After upgrade the server registers a
//! feed subscriber for the event and forwards each `ChangeNotice` as a JSON
//! text frame; clients react by refetching the board over HTTP. Inbound
//! frames other than close and ping are ignored.
//!
//! LIFECYCLE
//! =========
//! 1. `GET .../board/ws?token=` → session validated, event checked, upgrade
//! 2. Subscribe to the event feed
//! 3. Forward notices until the client closes or a send fails
//! 4. Unsubscribe

use std::collections::HashMap;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use board::doc::{ChangeNotice, EventId, Viewer};
use tracing::{error, info, warn};

use crate::routes::auth::{session_token, viewer_for_token};
use crate::services::{feed, post};
use crate::state::AppState;

// =============================================================================
// UPGRADE
// =============================================================================

/// Token from the `token` query parameter, else from the usual headers.
fn ws_token(params: &HashMap<String, String>, headers: &axum::http::HeaderMap) -> Option<String> {
    params
        .get("token")
        .filter(|t| !t.is_empty())
        .cloned()
        .or_else(|| session_token(headers))
}

pub async fn handle_board_ws(
    State(state): State<AppState>,
    Path(event_id): Path<EventId>,
    Query(params): Query<HashMap<String, String>>,
    headers: axum::http::HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(token) = ws_token(&params, &headers) else {
        return (StatusCode::UNAUTHORIZED, "token required").into_response();
    };
    let viewer = match viewer_for_token(&state, &token).await {
        Ok(viewer) => viewer,
        Err(status) => return (status, "invalid or expired session").into_response(),
    };

    match post::event_exists(&state.pool, event_id).await {
        Ok(true) => {}
        Ok(false) => return (StatusCode::NOT_FOUND, "event not found").into_response(),
        Err(e) => {
            error!(error = %e, %event_id, "ws: event lookup failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "event lookup failed").into_response();
        }
    }

    ws.on_upgrade(move |socket| run_ws(socket, state, event_id, viewer))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState, event_id: EventId, viewer: Viewer) {
    let (subscriber_id, mut notices) = feed::subscribe(&state, event_id).await;
    info!(%event_id, %subscriber_id, user_id = %viewer.id, "ws: board feed connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    Message::Close(_) => break,
                    Message::Ping(payload) => {
                        if socket.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    _ => {}
                }
            }
            Some(notice) = notices.recv() => {
                if let Err(e) = send_notice(&mut socket, notice).await {
                    warn!(%event_id, %subscriber_id, error = %e, "ws: send failed");
                    break;
                }
            }
        }
    }

    feed::unsubscribe(&state, event_id, subscriber_id).await;
    info!(%event_id, %subscriber_id, "ws: board feed disconnected");
}

async fn send_notice(socket: &mut WebSocket, notice: ChangeNotice) -> Result<(), axum::Error> {
    let text = serde_json::to_string(&notice).map_err(axum::Error::new)?;
    socket.send(Message::Text(text.into())).await
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
