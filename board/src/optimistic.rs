//! Optimistic mutation coordinator.
//!
//! DESIGN
//! ======
//! Every board mutation runs as an explicit three-phase transaction:
//!
//! 1. `begin` snapshots the local view, applies the mutation to it, and
//!    records the mutation as an in-flight overlay. The view changes before
//!    any network call starts.
//! 2. `commit` marks the overlay as acknowledged. The view keeps the
//!    optimistic value until the next `reconcile` swaps in server truth
//!    (temp ids become real ids, positions absorb server normalization).
//! 3. `rollback` drops the overlay and puts the view back.
//!
//! RACES
//! =====
//! A refetch can land while mutations are still in flight. `reconcile`
//! rebuilds the view from the fresh canonical list and re-applies every
//! unacknowledged overlay on top, so optimistic effects survive until their
//! own transaction settles. Refetch results carry a ticket; a result older
//! than one already applied is discarded (latest refetch wins).
//!
//! `rollback` restores the exact snapshot when nothing has touched the view
//! since the transaction began. Otherwise restoring it would also undo later
//! work, so the view is rebuilt from canonical + remaining overlays instead.
//!
//! TEMPORARY IDS
//! =============
//! A create is inserted under a client-generated id. Once the store answers,
//! `resolve_create` moves the overlay (and anything else that names the temp
//! id) to the server id. A resolved create whose post is already in the
//! canonical list is not inserted again on rebuild; only its local position
//! is laid over the server copy, so an echo refetch never shows the post
//! twice.

#[cfg(test)]
#[path = "optimistic_test.rs"]
mod optimistic_test;

use tracing::debug;

use crate::doc::{BoardPost, PositionUpdate, PostId, PostStore};

/// Identifier of one transaction within a coordinator.
pub type TxId = u64;

/// Ticket handed out per refetch so stale results can be dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RefetchTicket(u64);

/// A local change awaiting server confirmation.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Insert a post under a temporary id.
    Create(BoardPost),
    /// Move a post and restack it.
    Reposition(PositionUpdate),
    /// Remove a post.
    Delete(PostId),
}

impl Mutation {
    /// The post this mutation touches.
    #[must_use]
    pub fn post_id(&self) -> PostId {
        match self {
            Self::Create(post) => post.id,
            Self::Reposition(update) => update.id,
            Self::Delete(id) => *id,
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Create(_) => "create",
            Self::Reposition(_) => "reposition",
            Self::Delete(_) => "delete",
        }
    }

    /// Apply the optimistic effect to a view.
    pub fn apply(&self, view: &mut PostStore) {
        match self {
            Self::Create(post) => view.insert_pending(post.clone()),
            Self::Reposition(update) => {
                view.set_position(&update.id, update.x, update.y, update.z_index);
            }
            Self::Delete(id) => {
                view.remove(id);
            }
        }
    }
}

/// An open optimistic transaction. Hand it back to the coordinator through
/// `commit` or `rollback`.
#[derive(Debug)]
#[must_use = "a transaction must be committed or rolled back"]
pub struct Transaction {
    id: TxId,
    mutation: Mutation,
    snapshot: PostStore,
    /// View revision right after this transaction applied.
    applied_revision: u64,
}

impl Transaction {
    #[must_use]
    pub fn id(&self) -> TxId {
        self.id
    }

    #[must_use]
    pub fn mutation(&self) -> &Mutation {
        &self.mutation
    }

    /// The view as it was immediately before this transaction applied.
    #[must_use]
    pub fn snapshot(&self) -> &PostStore {
        &self.snapshot
    }
}

#[derive(Debug, Clone)]
struct Overlay {
    tx: TxId,
    mutation: Mutation,
    acknowledged: bool,
    /// For creates: the server id is known and `mutation` carries it.
    resolved: bool,
}

/// Owns the local view and every in-flight overlay for one board.
#[derive(Debug, Default)]
pub struct Coordinator {
    view: PostStore,
    canonical: Vec<BoardPost>,
    overlays: Vec<Overlay>,
    /// Bumped on every change to `view`.
    revision: u64,
    next_tx: TxId,
    issued_refetch: u64,
    applied_refetch: Option<u64>,
}

impl Coordinator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The view the renderer should draw.
    #[must_use]
    pub fn view(&self) -> &PostStore {
        &self.view
    }

    /// The last server snapshot applied.
    #[must_use]
    pub fn canonical(&self) -> &[BoardPost] {
        &self.canonical
    }

    /// Transactions begun but not yet committed or rolled back.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.overlays.iter().filter(|o| !o.acknowledged).count()
    }

    /// Phase 1: snapshot, apply, and track the mutation.
    pub fn begin(&mut self, mutation: Mutation) -> Transaction {
        let snapshot = self.view.clone();
        mutation.apply(&mut self.view);
        self.revision += 1;

        let id = self.next_tx;
        self.next_tx += 1;
        self.overlays.push(Overlay { tx: id, mutation: mutation.clone(), acknowledged: false, resolved: false });
        debug!(tx = id, kind = mutation.label(), post_id = %mutation.post_id(), "optimistic apply");

        Transaction { id, mutation, snapshot, applied_revision: self.revision }
    }

    /// Phase 2: the server accepted the mutation. The caller refetches next.
    pub fn commit(&mut self, tx: Transaction) {
        if let Some(overlay) = self.overlays.iter_mut().find(|o| o.tx == tx.id) {
            overlay.acknowledged = true;
        }
        debug!(tx = tx.id, kind = tx.mutation.label(), "optimistic commit");
    }

    /// Phase 3: the server rejected the mutation. Undo it locally.
    pub fn rollback(&mut self, tx: Transaction) {
        self.overlays.retain(|o| o.tx != tx.id);
        if tx.applied_revision == self.revision {
            self.view = tx.snapshot;
        } else {
            self.rebuild();
        }
        self.revision += 1;
        debug!(tx = tx.id, kind = tx.mutation.label(), "optimistic rollback");
    }

    /// Whether `id` is an in-flight create the server has not assigned an id
    /// to yet. Mutations naming such a post cannot be sent.
    #[must_use]
    pub fn awaits_server_id(&self, id: &PostId) -> bool {
        self.overlays.iter().any(|o| {
            !o.acknowledged && !o.resolved && matches!(&o.mutation, Mutation::Create(post) if post.id == *id)
        })
    }

    /// The store created the post behind temp id `temp` as `real`. Rewrites
    /// every overlay and the view to the server id. Returns false if no
    /// create overlay carried `temp`.
    pub fn resolve_create(&mut self, temp: PostId, real: PostId) -> bool {
        let mut found = false;
        for overlay in &mut self.overlays {
            match &mut overlay.mutation {
                Mutation::Create(post) if post.id == temp => {
                    post.id = real;
                    overlay.resolved = true;
                    found = true;
                }
                Mutation::Reposition(update) if update.id == temp => update.id = real,
                Mutation::Delete(id) if *id == temp => *id = real,
                _ => {}
            }
        }
        if self.view.rekey(&temp, real) {
            self.revision += 1;
        }
        debug!(%temp, %real, found, "temp id resolved");
        found
    }

    /// Move a not-yet-confirmed create to a new position, for a drag that
    /// ended before the server answered. Returns false if `update.id` is not
    /// such a create.
    pub fn amend_create(&mut self, update: PositionUpdate) -> bool {
        let Some(overlay) = self.overlays.iter_mut().find(|o| {
            !o.acknowledged && matches!(&o.mutation, Mutation::Create(post) if post.id == update.id)
        }) else {
            return false;
        };
        if let Mutation::Create(post) = &mut overlay.mutation {
            post.x = update.x;
            post.y = update.y;
            post.z_index = update.z_index;
        }
        self.view.set_position(&update.id, update.x, update.y, update.z_index);
        self.revision += 1;
        true
    }

    /// Reserve a ticket before starting a refetch.
    pub fn issue_refetch(&mut self) -> RefetchTicket {
        self.issued_refetch += 1;
        RefetchTicket(self.issued_refetch)
    }

    /// Apply a refetch result. Returns false if a newer result was already
    /// applied and this one was discarded.
    pub fn reconcile(&mut self, ticket: RefetchTicket, posts: Vec<BoardPost>) -> bool {
        if self.applied_refetch.is_some_and(|applied| ticket.0 < applied) {
            debug!(ticket = ticket.0, "discarding stale refetch");
            return false;
        }
        self.applied_refetch = Some(ticket.0);
        self.canonical = posts;
        // Server truth now covers every acknowledged mutation.
        self.overlays.retain(|o| !o.acknowledged);
        self.rebuild();
        self.revision += 1;
        true
    }

    fn rebuild(&mut self) {
        self.view.load_snapshot(self.canonical.clone());
        for overlay in &self.overlays {
            if let Mutation::Create(post) = &overlay.mutation
                && self.canonical.iter().any(|p| p.id == post.id)
            {
                self.view.set_position(&post.id, post.x, post.y, post.z_index);
                continue;
            }
            overlay.mutation.apply(&mut self.view);
        }
    }
}
