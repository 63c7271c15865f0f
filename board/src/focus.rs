//! Focus / z-order manager.
//!
//! Each board session owns one `FocusMap`. Bringing a post to front hands it a
//! z-index strictly above every value handed out earlier in the session, so
//! the most recently grabbed post always draws on top locally. Values are
//! never reused or compacted. Nothing here is persisted; the z-index only
//! reaches the server with the next drag release.

#[cfg(test)]
#[path = "focus_test.rs"]
mod focus_test;

use std::collections::HashMap;

use crate::consts::FOCUS_FLOOR;
use crate::doc::PostId;

/// Session-scoped mapping from post id to assigned z-index.
#[derive(Debug, Clone)]
pub struct FocusMap {
    assigned: HashMap<PostId, i64>,
    /// Fallback z for posts with no known stacking order.
    floor: i64,
    /// Highest value ever assigned or observed from the server.
    high_water: i64,
}

impl Default for FocusMap {
    fn default() -> Self {
        Self::with_floor(FOCUS_FLOOR)
    }
}

impl FocusMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_floor(floor: i64) -> Self {
        Self { assigned: HashMap::new(), floor, high_water: floor }
    }

    /// Current top of the stack: `max(assigned values, floor)`.
    #[must_use]
    pub fn top(&self) -> i64 {
        self.assigned
            .values()
            .copied()
            .fold(self.high_water.max(self.floor), i64::max)
    }

    /// The value the next `bring_to_front` would assign.
    #[must_use]
    pub fn next_z(&self) -> i64 {
        self.top() + 1
    }

    /// Raise `id` above everything focused so far and return its new z-index.
    pub fn bring_to_front(&mut self, id: PostId) -> i64 {
        let z = self.next_z();
        self.assigned.insert(id, z);
        self.high_water = z;
        z
    }

    /// Record a z-index persisted by the server so later focus lands above it.
    pub fn observe(&mut self, server_z: i64) {
        if server_z > self.high_water {
            self.high_water = server_z;
        }
    }

    /// Focus value assigned to `id` this session, if any.
    #[must_use]
    pub fn get(&self, id: &PostId) -> Option<i64> {
        self.assigned.get(id).copied()
    }

    /// Rendered z-index: focus value, else the server value, else the floor.
    #[must_use]
    pub fn resolve(&self, id: &PostId, server_z: Option<i64>) -> i64 {
        self.get(id).or(server_z).unwrap_or(self.floor)
    }

    /// Drop the entry for a post that no longer exists.
    ///
    /// The high-water mark is untouched, so later values stay monotonic.
    pub fn forget(&mut self, id: &PostId) {
        self.assigned.remove(id);
    }

    /// Carry a focus value over from a temporary id to the server id.
    pub fn rekey(&mut self, from: &PostId, to: PostId) {
        if let Some(z) = self.assigned.remove(from) {
            self.assigned.insert(to, z);
        }
    }

    #[must_use]
    pub fn floor(&self) -> i64 {
        self.floor
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.assigned.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assigned.is_empty()
    }
}
