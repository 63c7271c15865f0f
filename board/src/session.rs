//! Board session — one viewer's open board, from open to close.
//!
//! DESIGN
//! ======
//! A `BoardSession` owns every piece of per-viewer board state: the
//! optimistic coordinator (and with it the local post list), the focus map,
//! one drag controller per post, the set of images that failed to load, the
//! realtime subscription, and the queue of toast notices. A single owner
//! drives it; the only suspension points are store calls.
//!
//! Mutations are split so the optimistic effect is observable before the
//! network settles:
//!
//! - `begin_*` applies the change locally and returns a [`PendingMutation`].
//! - [`BoardSession::dispatch`] performs the store call. The returned future
//!   does not borrow the session, so several mutations can be in flight at
//!   once and the host keeps rendering meanwhile.
//! - [`BoardSession::complete`] commits (and refetches) or rolls back and
//!   queues a notice.
//!
//! `add_post`, `delete_post`, and `release` chain the three for callers that
//! do not need the split. `close` consumes the session, so a result that
//! arrives afterwards has nothing to be applied to.
//!
//! A new post lives under a temporary id until its create returns. The
//! dispatch future records the server id as soon as it has one; the next
//! `refresh` or `complete` moves drag, focus, and image state over to it.
//! Hosts may keep using the temporary id for pointer events of a gesture
//! that started before the swap. A drag released before the server id is
//! known is held and sent once the create commits.
//!
//! SYSTEM CONTEXT
//! ==============
//! The change feed only says "something changed". `next_change` waits for
//! that signal and refetches; if the feed drops, the session keeps working
//! without live updates.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::compose::PostDraft;
use crate::doc::{BoardPost, EventId, NewPost, PositionUpdate, PostId, PostKind, PostStore, Viewer};
use crate::drag::{Button, DragController, DragEffect, Point};
use crate::focus::FocusMap;
use crate::optimistic::{Coordinator, Mutation, Transaction};
use crate::render::{RenderInput, Scene, render_scene};
use crate::store::{RemoteStore, StoreError, Subscription};

// =============================================================================
// TYPES
// =============================================================================

/// Initial load state of the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Loading,
    Ready,
    /// The initial load failed; the canvas stays empty and shows this message.
    Failed(String),
}

/// Local refusal: the mutation was never sent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MutationError {
    #[error("post not on this board: {0}")]
    UnknownPost(PostId),
    #[error("only the author may delete post {0}")]
    NotAuthor(PostId),
}

/// How a mutation ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The store accepted it.
    Committed,
    /// The store rejected it and the local view was restored.
    RolledBack(StoreError),
    /// Refused locally without contacting the store.
    Refused(MutationError),
}

/// A non-fatal, user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub code: &'static str,
    pub message: String,
}

/// A mutation applied locally and not yet sent.
#[derive(Debug)]
#[must_use = "a pending mutation must be dispatched and completed"]
pub struct PendingMutation {
    tx: Transaction,
}

impl PendingMutation {
    #[must_use]
    pub fn post_id(&self) -> PostId {
        self.tx.mutation().post_id()
    }
}

/// A mutation whose store call has returned.
#[derive(Debug)]
#[must_use = "a settled mutation must be completed"]
pub struct SettledMutation {
    tx: Transaction,
    result: Result<(), StoreError>,
}

// =============================================================================
// SESSION
// =============================================================================

/// One viewer's open board.
pub struct BoardSession<S: RemoteStore> {
    store: Arc<S>,
    event_id: EventId,
    viewer: Viewer,
    coordinator: Coordinator,
    focus: FocusMap,
    drags: HashMap<PostId, DragController>,
    broken_images: HashSet<PostId>,
    subscription: Option<Subscription>,
    status: LoadStatus,
    notices: Vec<Notice>,
    /// `(temp, real)` pairs written by create dispatches, not yet adopted.
    server_ids: Arc<Mutex<Vec<(PostId, PostId)>>>,
    /// Temporary id -> server id, for gestures that began before the swap.
    aliases: HashMap<PostId, PostId>,
    /// Drag releases waiting for their create to commit.
    deferred: HashMap<PostId, PositionUpdate>,
}

impl<S: RemoteStore + 'static> BoardSession<S> {
    /// Load the board and subscribe to its change feed.
    ///
    /// Neither failure is fatal: a failed load leaves an empty board with
    /// [`LoadStatus::Failed`], and a failed subscribe disables live updates.
    pub async fn open(store: Arc<S>, event_id: EventId, viewer: Viewer) -> Self {
        let mut session = Self {
            store,
            event_id,
            viewer,
            coordinator: Coordinator::new(),
            focus: FocusMap::new(),
            drags: HashMap::new(),
            broken_images: HashSet::new(),
            subscription: None,
            status: LoadStatus::Loading,
            notices: Vec::new(),
            server_ids: Arc::new(Mutex::new(Vec::new())),
            aliases: HashMap::new(),
            deferred: HashMap::new(),
        };

        let ticket = session.coordinator.issue_refetch();
        match session.store.load(event_id).await {
            Ok(posts) => {
                info!(%event_id, count = posts.len(), "board loaded");
                session.coordinator.reconcile(ticket, posts);
                session.after_view_change();
                session.status = LoadStatus::Ready;
            }
            Err(e) => {
                warn!(%event_id, error = %e, "board load failed");
                session.status = LoadStatus::Failed(e.to_string());
            }
        }

        match session.store.subscribe(event_id).await {
            Ok(subscription) => session.subscription = Some(subscription),
            Err(e) => warn!(%event_id, error = %e, "live updates unavailable"),
        }
        session
    }

    // --- Accessors ---

    #[must_use]
    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    #[must_use]
    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    #[must_use]
    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    /// The local post list, optimistic effects included.
    #[must_use]
    pub fn view(&self) -> &PostStore {
        self.coordinator.view()
    }

    #[must_use]
    pub fn focus(&self) -> &FocusMap {
        &self.focus
    }

    #[must_use]
    pub fn drag(&self, id: &PostId) -> Option<&DragController> {
        self.drags.get(&self.resolve_id(*id))
    }

    /// The id a post is known by now: the server id for a temporary id that
    /// has been swapped, otherwise `id` itself.
    #[must_use]
    pub fn resolve_id(&self, id: PostId) -> PostId {
        self.aliases.get(&id).copied().unwrap_or(id)
    }

    /// Whether the change feed is still connected.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.subscription.is_some()
    }

    /// Mutations begun and not yet settled.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.coordinator.in_flight()
    }

    // --- Canonical state ---

    /// Refetch the board and reconcile it with in-flight mutations.
    ///
    /// Returns false if the refetch failed (the current view is kept) or was
    /// overtaken by a newer one.
    pub async fn refresh(&mut self) -> bool {
        self.adopt_server_ids();
        let ticket = self.coordinator.issue_refetch();
        match self.store.load(self.event_id).await {
            Ok(posts) => {
                let applied = self.coordinator.reconcile(ticket, posts);
                if applied {
                    self.after_view_change();
                    self.status = LoadStatus::Ready;
                }
                applied
            }
            Err(e) => {
                warn!(event_id = %self.event_id, error = %e, "board refetch failed; keeping current view");
                false
            }
        }
    }

    /// Wait for the next change signal and refetch.
    ///
    /// Returns false once the change feed is gone; the session then carries
    /// on without live updates.
    pub async fn next_change(&mut self) -> bool {
        let Some(subscription) = self.subscription.as_mut() else {
            return false;
        };
        if subscription.changed().await.is_none() {
            warn!(event_id = %self.event_id, "change feed dropped; live updates disabled");
            self.subscription = None;
            return false;
        }
        debug!(event_id = %self.event_id, "change signal");
        self.refresh().await;
        true
    }

    // --- Drag input ---

    /// Pointer pressed on a post.
    pub fn pointer_down(&mut self, id: PostId, pointer: Point, button: Button) -> Vec<DragEffect> {
        let id = self.resolve_id(id);
        match self.drags.get_mut(&id) {
            Some(drag) => drag.pointer_down(pointer, button, &mut self.focus),
            None => Vec::new(),
        }
    }

    /// Pointer moved while a post may be grabbed.
    pub fn pointer_move(&mut self, id: PostId, pointer: Point) -> Vec<DragEffect> {
        let id = self.resolve_id(id);
        match self.drags.get_mut(&id) {
            Some(drag) => drag.pointer_move(pointer),
            None => Vec::new(),
        }
    }

    /// Pointer released. A finished drag begins the reposition transaction.
    ///
    /// If the post's create is still waiting for a server id, the new
    /// position is applied locally and no mutation is returned; the
    /// reposition goes out when that create completes.
    pub fn pointer_up(&mut self, id: PostId) -> (Vec<DragEffect>, Option<PendingMutation>) {
        let id = self.resolve_id(id);
        let Some(drag) = self.drags.get_mut(&id) else {
            return (Vec::new(), None);
        };
        let effects = drag.pointer_up(&self.focus);
        let released = effects.iter().find_map(|effect| match effect {
            DragEffect::Released(update) => Some(*update),
            _ => None,
        });

        let pending = match released {
            Some(update) if self.coordinator.awaits_server_id(&id) => {
                debug!(post_id = %id, "holding release until create commits");
                self.coordinator.amend_create(update);
                self.deferred.insert(id, update);
                self.after_view_change();
                None
            }
            Some(update) if self.view().get(&id).is_some() => {
                Some(self.begin(Mutation::Reposition(update)))
            }
            Some(_) => {
                // Deleted by someone else mid-drag.
                debug!(post_id = %id, "released post no longer on board");
                self.drags.remove(&id);
                None
            }
            None => None,
        };
        (effects, pending)
    }

    /// `pointer_up` plus dispatch and completion of the reposition.
    pub async fn release(&mut self, id: PostId) -> (Vec<DragEffect>, Option<Outcome>) {
        let (effects, pending) = self.pointer_up(id);
        let outcome = match pending {
            Some(pending) => Some(self.execute(pending).await),
            None => None,
        };
        (effects, outcome)
    }

    // --- Mutations ---

    /// Insert a composed post optimistically under a temporary id.
    ///
    /// The post takes the next focus z-index so it lands on top.
    pub fn begin_create(&mut self, draft: PostDraft) -> PendingMutation {
        let z_index = self.focus.next_z();
        self.focus.observe(z_index);
        let post = BoardPost {
            id: Uuid::new_v4(),
            event_id: self.event_id,
            kind: draft.kind,
            content: draft.content,
            color_index: draft.color_index,
            x: draft.x,
            y: draft.y,
            z_index,
            rotation: draft.rotation,
            author_id: self.viewer.id,
            author_name: self.viewer.name.clone(),
            created_at: now_ms(),
        };
        self.begin(Mutation::Create(post))
    }

    /// Remove a post optimistically.
    ///
    /// # Errors
    ///
    /// Refuses unknown posts and posts the viewer did not write; nothing is
    /// sent in either case.
    pub fn begin_delete(&mut self, id: PostId) -> Result<PendingMutation, MutationError> {
        let post = self.view().get(&id).ok_or(MutationError::UnknownPost(id))?;
        if !self.viewer.is_author_of(post) {
            return Err(MutationError::NotAuthor(id));
        }
        Ok(self.begin(Mutation::Delete(id)))
    }

    pub async fn add_post(&mut self, draft: PostDraft) -> Outcome {
        let pending = self.begin_create(draft);
        self.execute(pending).await
    }

    pub async fn delete_post(&mut self, id: PostId) -> Outcome {
        match self.begin_delete(id) {
            Ok(pending) => self.execute(pending).await,
            Err(e) => {
                warn!(post_id = %id, error = %e, "delete refused");
                Outcome::Refused(e)
            }
        }
    }

    /// Perform the store call for a pending mutation.
    ///
    /// The future owns everything it needs, so it may outlive any borrow of
    /// the session and run alongside other dispatches.
    pub fn dispatch(&self, pending: PendingMutation) -> impl Future<Output = SettledMutation> + Send + use<S> {
        let store = Arc::clone(&self.store);
        let server_ids = Arc::clone(&self.server_ids);
        async move {
            let mutation = pending.tx.mutation().clone();
            let result = match mutation {
                Mutation::Create(post) => store.create_post(NewPost::from_post(&post)).await.map(|created| {
                    server_ids.lock().unwrap_or_else(PoisonError::into_inner).push((post.id, created.id));
                }),
                Mutation::Reposition(update) => store.update_position(update).await,
                Mutation::Delete(id) => store.delete_post(id).await,
            };
            SettledMutation { tx: pending.tx, result }
        }
    }

    /// Commit and refetch, or roll back and queue a notice.
    ///
    /// A committed create also sends any drag release held for it.
    pub async fn complete(&mut self, settled: SettledMutation) -> Outcome {
        self.adopt_server_ids();
        let follow_up = match (settled.tx.mutation(), &settled.result) {
            (Mutation::Create(post), Ok(())) => {
                let real = self.resolve_id(post.id);
                self.deferred.remove(&real).map(|update| self.begin(Mutation::Reposition(update)))
            }
            (Mutation::Create(post), Err(_)) => {
                self.deferred.remove(&post.id);
                None
            }
            _ => None,
        };

        let outcome = self.settle(settled).await;
        if let Some(pending) = follow_up {
            let settled = self.dispatch(pending).await;
            self.settle(settled).await;
        }
        outcome
    }

    async fn settle(&mut self, settled: SettledMutation) -> Outcome {
        let SettledMutation { tx, result } = settled;
        match result {
            Ok(()) => {
                self.coordinator.commit(tx);
                self.refresh().await;
                Outcome::Committed
            }
            Err(e) => {
                let kind = tx.mutation().label();
                warn!(post_id = %tx.mutation().post_id(), kind, error = %e, "mutation rejected; rolling back");
                self.coordinator.rollback(tx);
                self.after_view_change();
                self.notices.push(Notice { code: e.error_code(), message: format!("Could not {kind} post: {e}") });
                Outcome::RolledBack(e)
            }
        }
    }

    /// Dispatch and complete in one step.
    pub async fn execute(&mut self, pending: PendingMutation) -> Outcome {
        let settled = self.dispatch(pending).await;
        self.complete(settled).await
    }

    // --- Rendering ---

    /// Record that an image post failed to load. Returns false for posts
    /// that are not images on this board.
    pub fn image_failed(&mut self, id: PostId) -> bool {
        let is_image = self.view().get(&id).is_some_and(|post| post.kind == PostKind::Image);
        is_image && self.broken_images.insert(id)
    }

    #[must_use]
    pub fn scene(&self) -> Scene {
        render_scene(RenderInput {
            view: self.coordinator.view(),
            focus: &self.focus,
            drags: &self.drags,
            viewer: &self.viewer,
            broken_images: &self.broken_images,
        })
    }

    /// Drain queued notices, oldest first.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Tear the session down and release the change feed.
    pub fn close(self) {
        info!(event_id = %self.event_id, in_flight = self.coordinator.in_flight(), "board session closed");
        drop(self.subscription);
    }

    // --- Internals ---

    fn begin(&mut self, mutation: Mutation) -> PendingMutation {
        let tx = self.coordinator.begin(mutation);
        self.after_view_change();
        PendingMutation { tx }
    }

    /// Move state keyed by temporary ids onto the server ids recorded by
    /// create dispatches.
    fn adopt_server_ids(&mut self) {
        let adopted = std::mem::take(&mut *self.server_ids.lock().unwrap_or_else(PoisonError::into_inner));
        if adopted.is_empty() {
            return;
        }
        for (temp, real) in adopted {
            self.coordinator.resolve_create(temp, real);
            if let Some(mut drag) = self.drags.remove(&temp) {
                drag.rekey(real);
                if drag.is_dragging() || !self.drags.contains_key(&real) {
                    self.drags.insert(real, drag);
                }
            }
            self.focus.rekey(&temp, real);
            if self.broken_images.remove(&temp) {
                self.broken_images.insert(real);
            }
            if let Some(update) = self.deferred.remove(&temp) {
                self.deferred.insert(real, PositionUpdate { id: real, ..update });
            }
            self.aliases.insert(temp, real);
            debug!(%temp, %real, "adopted server id");
        }
        self.after_view_change();
    }

    /// Bring focus, drag controllers, and the broken-image set in line with
    /// the current view.
    fn after_view_change(&mut self) {
        let view = self.coordinator.view();
        if let Some(max_z) = view.max_z() {
            self.focus.observe(max_z);
        }

        let mut seen = HashSet::with_capacity(view.len());
        for post in view.posts() {
            seen.insert(post.id);
            let canonical = Point::new(post.x, post.y);
            self.drags
                .entry(post.id)
                .and_modify(|drag| {
                    drag.sync_canonical(canonical);
                })
                .or_insert_with(|| DragController::new(post.id, canonical));
        }

        let focus = &mut self.focus;
        self.drags.retain(|id, drag| {
            let keep = seen.contains(id) || drag.is_dragging();
            if !keep {
                focus.forget(id);
            }
            keep
        });
        self.broken_images.retain(|id| seen.contains(id));
        let drags = &self.drags;
        self.aliases.retain(|_, real| seen.contains(real) || drags.contains_key(real));
    }
}

impl<S: RemoteStore> std::fmt::Debug for BoardSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoardSession")
            .field("event_id", &self.event_id)
            .field("viewer", &self.viewer)
            .field("status", &self.status)
            .field("posts", &self.coordinator.view().len())
            .field("live", &self.subscription.is_some())
            .finish_non_exhaustive()
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}
