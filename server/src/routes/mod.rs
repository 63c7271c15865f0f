//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Binds the event board REST endpoints and the per-event websocket feed
//! under one Axum router. The marketplace frontend calls these from the
//! browser, so CORS is open; requests are traced via `tower-http`.

pub mod auth;
pub mod posts;
pub mod ws;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{delete, get, patch, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the full application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/auth/me", get(auth::me))
        .route("/api/events/{event_id}/board", get(posts::get_board))
        .route("/api/events/{event_id}/board/posts", post(posts::create_post))
        .route("/api/events/{event_id}/board/ws", get(ws::handle_board_ws))
        .route("/api/board/posts/{id}/position", patch(posts::update_position))
        .route("/api/board/posts/{id}", delete(posts::delete_post))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
