//! In-process board backend.
//!
//! DESIGN
//! ======
//! `MemoryBackend` plays the role of the API server inside one process: it
//! owns events, posts, and per-event subscriber channels. Each viewer gets a
//! `MemoryStore` handle bound to their identity, which is what a board
//! session consumes. Authorization mirrors the server: every mutation needs
//! a viewer, and only a post's author may delete it.
//!
//! Subscribers are fed best-effort with `try_send`. A full queue already
//! holds an unread invalidation, so dropping another one loses nothing.

#[cfg(test)]
#[path = "memory_test.rs"]
mod memory_test;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;
use uuid::Uuid;

use crate::doc::{BoardPost, ChangeNotice, EventBoard, EventId, EventSummary, NewPost, PositionUpdate, PostId, Viewer};
use crate::store::{RemoteStore, StoreError, Subscription};

const SUBSCRIBER_QUEUE: usize = 16;

#[derive(Default)]
struct Inner {
    events: HashMap<EventId, String>,
    posts: Vec<BoardPost>,
    subscribers: HashMap<EventId, HashMap<u64, mpsc::Sender<ChangeNotice>>>,
    next_subscriber: u64,
}

impl Inner {
    fn notify(&mut self, event_id: EventId) {
        let Some(subs) = self.subscribers.get_mut(&event_id) else {
            return;
        };
        subs.retain(|_, tx| !matches!(tx.try_send(ChangeNotice { event_id }), Err(TrySendError::Closed(_))));
    }
}

/// Shared in-memory backend. Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register an event and return its id.
    pub fn create_event(&self, name: impl Into<String>) -> EventId {
        let id = Uuid::new_v4();
        self.lock().events.insert(id, name.into());
        id
    }

    /// A store handle acting as `viewer`.
    #[must_use]
    pub fn connect(&self, viewer: Viewer) -> MemoryStore {
        MemoryStore { backend: self.clone(), viewer: Some(viewer) }
    }

    /// A store handle with no identity; every mutation is rejected.
    #[must_use]
    pub fn anonymous(&self) -> MemoryStore {
        MemoryStore { backend: self.clone(), viewer: None }
    }

    /// The read-path payload for an event, if it exists.
    #[must_use]
    pub fn board(&self, event_id: EventId) -> Option<EventBoard> {
        let inner = self.lock();
        let name = inner.events.get(&event_id)?.clone();
        let posts = inner
            .posts
            .iter()
            .filter(|p| p.event_id == event_id)
            .cloned()
            .collect();
        Some(EventBoard { event: EventSummary { id: event_id, name }, posts })
    }

    /// Number of open subscriptions on an event's board.
    #[must_use]
    pub fn subscriber_count(&self, event_id: EventId) -> usize {
        self.lock().subscribers.get(&event_id).map_or(0, HashMap::len)
    }
}

/// Per-viewer handle onto a [`MemoryBackend`].
#[derive(Clone)]
pub struct MemoryStore {
    backend: MemoryBackend,
    viewer: Option<Viewer>,
}

impl MemoryStore {
    #[must_use]
    pub fn backend(&self) -> &MemoryBackend {
        &self.backend
    }

    fn viewer(&self) -> Result<&Viewer, StoreError> {
        self.viewer.as_ref().ok_or(StoreError::Unauthorized)
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn load(&self, event_id: EventId) -> Result<Vec<BoardPost>, StoreError> {
        self.backend
            .board(event_id)
            .map(|board| board.posts)
            .ok_or(StoreError::EventNotFound(event_id))
    }

    async fn subscribe(&self, event_id: EventId) -> Result<Subscription, StoreError> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE);
        let key = {
            let mut inner = self.backend.lock();
            if !inner.events.contains_key(&event_id) {
                return Err(StoreError::EventNotFound(event_id));
            }
            let key = inner.next_subscriber;
            inner.next_subscriber += 1;
            inner.subscribers.entry(event_id).or_default().insert(key, tx);
            key
        };
        debug!(%event_id, key, "memory store: subscribed");

        let backend = self.backend.clone();
        Ok(Subscription::new(rx).with_release(move || {
            let mut inner = backend.lock();
            if let Some(subs) = inner.subscribers.get_mut(&event_id) {
                subs.remove(&key);
                if subs.is_empty() {
                    inner.subscribers.remove(&event_id);
                }
            }
        }))
    }

    async fn create_post(&self, post: NewPost) -> Result<BoardPost, StoreError> {
        let viewer = self.viewer()?;
        post.validate().map_err(StoreError::Validation)?;

        let mut inner = self.backend.lock();
        if !inner.events.contains_key(&post.event_id) {
            return Err(StoreError::EventNotFound(post.event_id));
        }
        let created = BoardPost {
            id: Uuid::new_v4(),
            event_id: post.event_id,
            kind: post.kind,
            content: post.content.trim().to_owned(),
            color_index: post.color_index,
            x: post.x,
            y: post.y,
            z_index: post.z_index,
            rotation: post.rotation,
            author_id: viewer.id,
            author_name: viewer.name.clone(),
            created_at: now_ms(),
        };
        inner.posts.push(created.clone());
        inner.notify(created.event_id);
        Ok(created)
    }

    async fn update_position(&self, update: PositionUpdate) -> Result<(), StoreError> {
        self.viewer()?;
        update.validate().map_err(StoreError::Validation)?;

        let mut inner = self.backend.lock();
        let post = inner
            .posts
            .iter_mut()
            .find(|p| p.id == update.id)
            .ok_or(StoreError::PostNotFound(update.id))?;
        post.x = update.x;
        post.y = update.y;
        post.z_index = update.z_index;
        let event_id = post.event_id;
        inner.notify(event_id);
        Ok(())
    }

    async fn delete_post(&self, id: PostId) -> Result<(), StoreError> {
        let viewer = self.viewer()?;

        let mut inner = self.backend.lock();
        let index = inner
            .posts
            .iter()
            .position(|p| p.id == id)
            .ok_or(StoreError::PostNotFound(id))?;
        if inner.posts[index].author_id != viewer.id {
            return Err(StoreError::Forbidden("only the author may delete a post".into()));
        }
        let removed = inner.posts.remove(index);
        inner.notify(removed.event_id);
        Ok(())
    }
}
