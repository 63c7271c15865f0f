//! Auth extraction — resolves the session behind a board request.
//!
//! Clients send the marketplace session token either as
//! `Authorization: Bearer <token>` (CLI, remote store) or as the
//! `session_token` cookie (browser). The header wins when both are present.

use axum::extract::FromRef;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar};
use board::doc::Viewer;
use tracing::error;

use crate::services::session;
use crate::state::AppState;

const COOKIE_NAME: &str = "session_token";

/// Pull the session token out of request headers.
pub(crate) fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_owned());
    }

    let jar = CookieJar::from_headers(headers);
    jar.get(COOKIE_NAME)
        .map(Cookie::value)
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
}

/// Resolve a raw token to its viewer.
pub(crate) async fn viewer_for_token(state: &AppState, token: &str) -> Result<Viewer, StatusCode> {
    session::validate_session(&state.pool, token)
        .await
        .map_err(|e| {
            error!(error = %e, "session validation failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::UNAUTHORIZED)
}

// =============================================================================
// AUTH EXTRACTOR
// =============================================================================

/// Authenticated viewer. Use as a handler parameter to require a session.
pub struct AuthUser {
    pub viewer: Viewer,
}

impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut axum::http::request::Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers).ok_or(StatusCode::UNAUTHORIZED)?;
        let app_state = AppState::from_ref(state);
        let viewer = viewer_for_token(&app_state, &token).await?;
        Ok(Self { viewer })
    }
}

/// `GET /api/auth/me` — the viewer behind the current session.
pub async fn me(auth: AuthUser) -> Json<Viewer> {
    Json(auth.viewer)
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
