//! Remote store port.
//!
//! DESIGN
//! ======
//! The board never talks to a concrete backend. A `RemoteStore` supplies the
//! initial load, a coarse change feed, and the three mutations. The change
//! feed carries no diff: every signal just means "refetch". A
//! `Subscription` is a scoped resource; dropping it releases whatever the
//! store holds open for it (a channel slot, a websocket task).

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::doc::{BoardPost, ChangeNotice, EventId, NewPost, PositionUpdate, PostId};

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("network error: {0}")]
    Network(String),
    #[error("not authenticated")]
    Unauthorized,
    #[error("not allowed: {0}")]
    Forbidden(String),
    #[error("post not found: {0}")]
    PostNotFound(PostId),
    #[error("event not found: {0}")]
    EventNotFound(EventId),
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("store closed")]
    Closed,
}

impl StoreError {
    /// Stable machine-readable code, shared with the API server's error bodies.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Network(_) => "E_NETWORK",
            Self::Unauthorized => "E_UNAUTHORIZED",
            Self::Forbidden(_) => "E_FORBIDDEN",
            Self::PostNotFound(_) => "E_POST_NOT_FOUND",
            Self::EventNotFound(_) => "E_EVENT_NOT_FOUND",
            Self::Validation(_) => "E_VALIDATION",
            Self::Closed => "E_CLOSED",
        }
    }
}

// =============================================================================
// SUBSCRIPTION
// =============================================================================

type ReleaseFn = Box<dyn FnOnce() + Send>;

/// Live change feed for one event's board.
pub struct Subscription {
    rx: mpsc::Receiver<ChangeNotice>,
    release: Option<ReleaseFn>,
}

impl Subscription {
    #[must_use]
    pub fn new(rx: mpsc::Receiver<ChangeNotice>) -> Self {
        Self { rx, release: None }
    }

    /// Run `release` when the subscription is dropped.
    #[must_use]
    pub fn with_release(mut self, release: impl FnOnce() + Send + 'static) -> Self {
        self.release = Some(Box::new(release));
        self
    }

    /// Wait for the next change. Signals already queued behind it are
    /// drained, since one refetch answers all of them.
    ///
    /// Returns `None` once the feed has closed.
    pub async fn changed(&mut self) -> Option<ChangeNotice> {
        let notice = self.rx.recv().await?;
        while self.rx.try_recv().is_ok() {}
        Some(notice)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.rx.close();
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("closed", &self.rx.is_closed())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// PORT
// =============================================================================

/// Backend contract consumed by a board session.
///
/// Implementations act on behalf of one authenticated viewer.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch every post on the event's board.
    async fn load(&self, event_id: EventId) -> Result<Vec<BoardPost>, StoreError>;

    /// Open the change feed for the event's board.
    async fn subscribe(&self, event_id: EventId) -> Result<Subscription, StoreError>;

    /// Create a post; the server assigns id, author, and timestamp.
    async fn create_post(&self, post: NewPost) -> Result<BoardPost, StoreError>;

    /// Persist a post's position and stacking order.
    async fn update_position(&self, update: PositionUpdate) -> Result<(), StoreError>;

    /// Delete a post. Only its author may do this.
    async fn delete_post(&self, id: PostId) -> Result<(), StoreError>;
}
