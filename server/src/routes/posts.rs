//! Event board routes — read the board and mutate its posts.
//!
//! Every successful mutation signals the event's change feed so connected
//! boards refetch. Errors leave as `{ "error": <code>, "message": <text> }`
//! with the status chosen by [`post_error_to_status`].

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use board::doc::{BoardPost, EventBoard, EventId, NewPost, PositionUpdate, PostId};
use serde::Deserialize;
use tracing::{error, warn};

use crate::routes::auth::AuthUser;
use crate::services::post::{self, PostError};
use crate::services::feed;
use crate::state::AppState;

// =============================================================================
// ERRORS
// =============================================================================

pub(crate) fn post_error_to_status(err: &PostError) -> StatusCode {
    match err {
        PostError::EventNotFound(_) | PostError::PostNotFound(_) => StatusCode::NOT_FOUND,
        PostError::Forbidden(_) => StatusCode::FORBIDDEN,
        PostError::Validation(_) => StatusCode::BAD_REQUEST,
        PostError::UnknownKind(_) | PostError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// JSON error response.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl From<PostError> for ApiError {
    fn from(err: PostError) -> Self {
        let status = post_error_to_status(&err);
        if status.is_server_error() {
            error!(error = %err, "board request failed");
        }
        Self { status, code: err.error_code(), message: err.to_string() }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self { status: StatusCode::BAD_REQUEST, code: "E_VALIDATION", message: rejection.body_text() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.code, "message": self.message });
        (self.status, Json(body)).into_response()
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `GET /api/events/{event_id}/board` — the event and all of its posts.
pub async fn get_board(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(event_id): Path<EventId>,
) -> Result<Json<EventBoard>, ApiError> {
    Ok(Json(post::load_board(&state.pool, event_id).await?))
}

/// `POST /api/events/{event_id}/board/posts` — pin a new post.
pub async fn create_post(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(event_id): Path<EventId>,
    body: Result<Json<NewPost>, JsonRejection>,
) -> Result<(StatusCode, Json<BoardPost>), ApiError> {
    let Json(new_post) = body?;
    if new_post.event_id != event_id {
        warn!(%event_id, body_event_id = %new_post.event_id, "create_post: event mismatch");
        return Err(PostError::Validation("event_id does not match the route".into()).into());
    }

    let created = post::create_post(&state.pool, &auth.viewer, new_post).await?;
    feed::notify(&state, event_id).await;
    Ok((StatusCode::CREATED, Json(created)))
}

#[derive(Debug, Deserialize)]
pub struct PositionBody {
    pub x: f64,
    pub y: f64,
    pub z_index: i64,
}

/// `PATCH /api/board/posts/{id}/position` — persist a drag release.
pub async fn update_position(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<PostId>,
    body: Result<Json<PositionBody>, JsonRejection>,
) -> Result<Json<BoardPost>, ApiError> {
    let Json(PositionBody { x, y, z_index }) = body?;
    let updated = post::update_position(&state.pool, PositionUpdate { id, x, y, z_index }).await?;
    feed::notify(&state, updated.event_id).await;
    Ok(Json(updated))
}

/// `DELETE /api/board/posts/{id}` — author-only removal.
pub async fn delete_post(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<PostId>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let event_id = post::delete_post(&state.pool, id, auth.viewer.id).await?;
    feed::notify(&state, event_id).await;
    Ok(Json(serde_json::json!({ "ok": true })))
}

#[cfg(test)]
#[path = "posts_test.rs"]
mod tests;
