//! HTTP + websocket implementation of the board's remote store.
//!
//! `HttpStore` talks to the PartyGeng board API from the outside: REST calls
//! for the initial load and the three mutations, and one websocket per
//! subscription for the change feed. Every request carries the viewer's
//! session token as a bearer header; the websocket passes it as the `token`
//! query parameter.


use async_trait::async_trait;
use board::doc::{BoardPost, ChangeNotice, EventBoard, EventId, NewPost, PositionUpdate, PostId, Viewer};
use board::store::{RemoteStore, StoreError, Subscription};
use futures_util::StreamExt;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// Queue depth between the websocket reader task and the subscription.
const NOTICE_QUEUE: usize = 16;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {message}")]
    Status { status: u16, code: Option<String>, message: String },
    #[error("websocket connect failed: {0}")]
    WsConnect(Box<tokio_tungstenite::tungstenite::Error>),
}

impl RemoteError {
    /// Translate to the board's store error. `not_found` is used for 404s so
    /// the caller can say which id was missing.
    #[must_use]
    pub fn into_store_error(self, not_found: StoreError) -> StoreError {
        match self {
            Self::Status { status: 401, .. } => StoreError::Unauthorized,
            Self::Status { status: 403, message, .. } => StoreError::Forbidden(message),
            Self::Status { status: 404, .. } => not_found,
            Self::Status { status: 400 | 422, message, .. } => StoreError::Validation(message),
            other => StoreError::Network(other.to_string()),
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

// =============================================================================
// URLS
// =============================================================================

/// Websocket URL of an event's change feed.
///
/// # Errors
///
/// Returns [`RemoteError::InvalidBaseUrl`] unless `base_url` is http(s).
pub fn ws_url(base_url: &str, event_id: EventId, token: &str) -> Result<String, RemoteError> {
    let trimmed = base_url.trim_end_matches('/');
    let path = format!("/api/events/{event_id}/board/ws?token={token}");

    if let Some(rest) = trimmed.strip_prefix("http://") {
        return Ok(format!("ws://{rest}{path}"));
    }
    if let Some(rest) = trimmed.strip_prefix("https://") {
        return Ok(format!("wss://{rest}{path}"));
    }

    Err(RemoteError::InvalidBaseUrl(base_url.to_owned()))
}

// =============================================================================
// STORE
// =============================================================================

/// Remote store bound to one viewer's session token.
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpStore {
    /// Build a store for `base_url` (e.g. `http://127.0.0.1:3000`).
    ///
    /// # Errors
    ///
    /// Fails on a non-http(s) base URL or a token that is not a valid header.
    pub fn new(base_url: &str, token: &str) -> Result<Self, RemoteError> {
        let base_url = base_url.trim_end_matches('/').to_owned();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(RemoteError::InvalidBaseUrl(base_url));
        }

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}"))?);
        let client = reqwest::Client::builder().default_headers(headers).build()?;

        Ok(Self { client, base_url, token: token.to_owned() })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The viewer behind this store's session.
    ///
    /// # Errors
    ///
    /// Transport failures and non-2xx responses.
    pub async fn whoami(&self) -> Result<Viewer, RemoteError> {
        self.send(self.client.get(self.url("/api/auth/me"))).await
    }

    /// The event and its posts.
    ///
    /// # Errors
    ///
    /// Transport failures and non-2xx responses.
    pub async fn board(&self, event_id: EventId) -> Result<EventBoard, RemoteError> {
        self.send(self.client.get(self.url(&format!("/api/events/{event_id}/board"))))
            .await
    }

    /// Check the server answers its health check.
    ///
    /// # Errors
    ///
    /// Transport failures and non-2xx responses.
    pub async fn ping(&self) -> Result<(), RemoteError> {
        let response = self.client.get(self.url("/healthz")).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(RemoteError::Status {
                status: response.status().as_u16(),
                code: None,
                message: "health check failed".to_owned(),
            })
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T, RemoteError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let text = response.text().await.unwrap_or_default();
        let (code, message) = match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => (body.error, body.message.unwrap_or(text)),
            Err(_) => (None, text),
        };
        Err(RemoteError::Status { status: status.as_u16(), code, message })
    }
}

#[async_trait]
impl RemoteStore for HttpStore {
    async fn load(&self, event_id: EventId) -> Result<Vec<BoardPost>, StoreError> {
        self.board(event_id)
            .await
            .map(|board| board.posts)
            .map_err(|e| e.into_store_error(StoreError::EventNotFound(event_id)))
    }

    async fn subscribe(&self, event_id: EventId) -> Result<Subscription, StoreError> {
        let url = ws_url(&self.base_url, event_id, &self.token)
            .map_err(|e| StoreError::Network(e.to_string()))?;
        let (mut stream, _) = connect_async(url)
            .await
            .map_err(|e| RemoteError::WsConnect(Box::new(e)).into_store_error(StoreError::EventNotFound(event_id)))?;
        info!(%event_id, "remote: change feed connected");

        let (tx, rx) = mpsc::channel(NOTICE_QUEUE);
        let reader = tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                let text = match frame {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        warn!(%event_id, error = %e, "remote: change feed error");
                        break;
                    }
                };
                let notice = match serde_json::from_str::<ChangeNotice>(text.as_str()) {
                    Ok(notice) => notice,
                    Err(e) => {
                        debug!(%event_id, error = %e, "remote: ignoring unknown feed frame");
                        continue;
                    }
                };
                if let Err(TrySendError::Closed(_)) = tx.try_send(notice) {
                    break;
                }
            }
            info!(%event_id, "remote: change feed closed");
        });

        Ok(Subscription::new(rx).with_release(move || reader.abort()))
    }

    async fn create_post(&self, post: NewPost) -> Result<BoardPost, StoreError> {
        let event_id = post.event_id;
        let request = self
            .client
            .post(self.url(&format!("/api/events/{event_id}/board/posts")))
            .json(&post);
        self.send(request)
            .await
            .map_err(|e| e.into_store_error(StoreError::EventNotFound(event_id)))
    }

    async fn update_position(&self, update: PositionUpdate) -> Result<(), StoreError> {
        let request = self
            .client
            .patch(self.url(&format!("/api/board/posts/{}/position", update.id)))
            .json(&update);
        self.send::<BoardPost>(request)
            .await
            .map(|_| ())
            .map_err(|e| e.into_store_error(StoreError::PostNotFound(update.id)))
    }

    async fn delete_post(&self, id: PostId) -> Result<(), StoreError> {
        let request = self.client.delete(self.url(&format!("/api/board/posts/{id}")));
        self.send::<serde_json::Value>(request)
            .await
            .map(|_| ())
            .map_err(|e| e.into_store_error(StoreError::PostNotFound(id)))
    }
}
