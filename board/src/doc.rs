//! Document model: board posts, wire payloads, and the local post list.
//!
//! `BoardPost` is the single domain entity of the board. The payload types
//! (`NewPost`, `PositionUpdate`, `EventBoard`, `ChangeNotice`) are what travels
//! between the session, the remote store, and the API server. `PostStore` is
//! the viewer's local projection of one event's posts; the optimistic
//! coordinator snapshots it whole, so it is `Clone + PartialEq`.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a board post.
pub type PostId = Uuid;

/// Identifier of the event that owns a board.
pub type EventId = Uuid;

/// Identifier of a PartyGeng user.
pub type UserId = Uuid;

/// Variant tag of a board post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PostKind {
    /// Sticky note with free text on a palette color.
    Note,
    /// Pinned image; `content` holds the URL.
    Image,
}

impl PostKind {
    /// Wire and database spelling of the tag.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Note => "NOTE",
            Self::Image => "IMAGE",
        }
    }

    /// Parse the wire spelling. Returns `None` for unknown tags.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "NOTE" => Some(Self::Note),
            "IMAGE" => Some(Self::Image),
            _ => None,
        }
    }
}

/// One pinned item on an event board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardPost {
    /// Server-assigned id, or a temporary id while the create is pending.
    pub id: PostId,
    /// Event that owns this post.
    pub event_id: EventId,
    /// Note or image.
    #[serde(rename = "type")]
    pub kind: PostKind,
    /// Note body or image URL.
    pub content: String,
    /// Palette index; only meaningful for notes.
    #[serde(default)]
    pub color_index: i32,
    /// Left edge in canvas pixels.
    pub x: f64,
    /// Top edge in canvas pixels.
    pub y: f64,
    /// Stacking order; higher draws above lower.
    pub z_index: i64,
    /// Decorative tilt in degrees, fixed at creation.
    #[serde(default)]
    pub rotation: f64,
    /// Author identity, denormalized for display.
    pub author_id: UserId,
    pub author_name: String,
    /// Milliseconds since the Unix epoch, server-assigned.
    #[serde(default)]
    pub created_at: i64,
}

/// Request body for creating a post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPost {
    pub event_id: EventId,
    #[serde(rename = "type")]
    pub kind: PostKind,
    pub content: String,
    #[serde(default)]
    pub color_index: i32,
    pub x: f64,
    pub y: f64,
    pub z_index: i64,
    #[serde(default)]
    pub rotation: f64,
}

impl NewPost {
    /// Build the create request for an optimistic post.
    #[must_use]
    pub fn from_post(post: &BoardPost) -> Self {
        Self {
            event_id: post.event_id,
            kind: post.kind,
            content: post.content.clone(),
            color_index: post.color_index,
            x: post.x,
            y: post.y,
            z_index: post.z_index,
            rotation: post.rotation,
        }
    }

    /// Check the request is acceptable to store.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason when the content is blank or any
    /// coordinate is not finite.
    pub fn validate(&self) -> Result<(), String> {
        if self.content.trim().is_empty() {
            return Err("content must not be empty".into());
        }
        if !(self.x.is_finite() && self.y.is_finite() && self.rotation.is_finite()) {
            return Err("position and rotation must be finite".into());
        }
        Ok(())
    }
}

/// Request body for moving a post after a drag release.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub id: PostId,
    pub x: f64,
    pub y: f64,
    pub z_index: i64,
}

impl PositionUpdate {
    /// Check the coordinates are storable.
    ///
    /// # Errors
    ///
    /// Returns a reason when `x` or `y` is NaN or infinite.
    pub fn validate(&self) -> Result<(), String> {
        if self.x.is_finite() && self.y.is_finite() {
            Ok(())
        } else {
            Err("position must be finite".into())
        }
    }
}

/// Minimal view of the event that owns a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSummary {
    pub id: EventId,
    pub name: String,
}

/// Read-path payload: the event plus every post on its board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventBoard {
    pub event: EventSummary,
    pub posts: Vec<BoardPost>,
}

/// Realtime invalidation signal: "something on this board changed, refetch".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeNotice {
    pub event_id: EventId,
}

/// The authenticated person looking at a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewer {
    pub id: UserId,
    pub name: String,
}

impl Viewer {
    #[must_use]
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self { id, name: name.into() }
    }

    /// Whether this viewer wrote `post` and may therefore delete it.
    #[must_use]
    pub fn is_author_of(&self, post: &BoardPost) -> bool {
        post.author_id == self.id
    }
}

/// Local list of posts for one event.
///
/// Insertion order is kept so that posts sharing a z-index stack in the order
/// they arrived. Posts inserted optimistically carry a pending flag until the
/// next full reload replaces them with server truth.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostStore {
    posts: Vec<BoardPost>,
    pending: HashSet<PostId>,
}

impl PostStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every post with a server snapshot and clear pending flags.
    pub fn load_snapshot(&mut self, posts: Vec<BoardPost>) {
        self.posts = posts;
        self.pending.clear();
    }

    /// Insert or replace a post. A replacement keeps its original slot.
    pub fn insert(&mut self, post: BoardPost) {
        if let Some(existing) = self.posts.iter_mut().find(|p| p.id == post.id) {
            *existing = post;
        } else {
            self.posts.push(post);
        }
    }

    /// Insert a post that the server has not acknowledged yet.
    pub fn insert_pending(&mut self, post: BoardPost) {
        self.pending.insert(post.id);
        self.insert(post);
    }

    /// Patch position fields in place. Returns false if the post is unknown.
    pub fn set_position(&mut self, id: &PostId, x: f64, y: f64, z_index: i64) -> bool {
        let Some(post) = self.posts.iter_mut().find(|p| p.id == *id) else {
            return false;
        };
        post.x = x;
        post.y = y;
        post.z_index = z_index;
        true
    }

    /// Move a post from a temporary id to its server id, keeping its slot and
    /// pending flag. If `to` is already present the `from` entry is dropped.
    /// Returns false if `from` is unknown.
    pub fn rekey(&mut self, from: &PostId, to: PostId) -> bool {
        if self.get(&to).is_some() {
            return self.remove(from).is_some();
        }
        let Some(post) = self.posts.iter_mut().find(|p| p.id == *from) else {
            return false;
        };
        post.id = to;
        if self.pending.remove(from) {
            self.pending.insert(to);
        }
        true
    }

    /// Remove a post by id, returning it if it was present.
    pub fn remove(&mut self, id: &PostId) -> Option<BoardPost> {
        let index = self.posts.iter().position(|p| p.id == *id)?;
        self.pending.remove(id);
        Some(self.posts.remove(index))
    }

    #[must_use]
    pub fn get(&self, id: &PostId) -> Option<&BoardPost> {
        self.posts.iter().find(|p| p.id == *id)
    }

    /// Whether the post is an unacknowledged optimistic insert.
    #[must_use]
    pub fn is_pending(&self, id: &PostId) -> bool {
        self.pending.contains(id)
    }

    /// Posts in insertion order.
    #[must_use]
    pub fn posts(&self) -> &[BoardPost] {
        &self.posts
    }

    /// Highest stored z-index, if any post exists.
    #[must_use]
    pub fn max_z(&self) -> Option<i64> {
        self.posts.iter().map(|p| p.z_index).max()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.posts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}
