//! Pointer-drag state machine for a single board post.
//!
//! One `DragController` exists per post. Pointer-down on the primary button
//! grabs the post, brings it to front, and asks the host to attach
//! document-level move/up listeners. Moves only touch the local position;
//! the network is involved exactly once, when the pointer is released and the
//! controller emits a [`DragEffect::Released`] position update.

#[cfg(test)]
#[path = "drag_test.rs"]
mod drag_test;

use crate::doc::{PositionUpdate, PostId};
use crate::focus::FocusMap;

/// A point in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Offset from the post's top-left corner to the pointer at grab time.
#[must_use]
pub fn compute_grab_offset(pointer: Point, item_top_left: Point) -> Point {
    Point { x: pointer.x - item_top_left.x, y: pointer.y - item_top_left.y }
}

/// Clamp a position so neither coordinate is negative. There is no upper
/// bound; the canvas grows to fit.
#[must_use]
pub fn clamp_to_canvas(position: Point) -> Point {
    Point { x: position.x.max(0.0), y: position.y.max(0.0) }
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    /// Left mouse button (or single-finger touch).
    Primary,
    /// Middle mouse button.
    Middle,
    /// Right mouse button.
    Secondary,
}

/// Gesture state of one post.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        /// Pointer offset captured at grab time.
        grab_offset: Point,
    },
}

/// Side effects the host must carry out after feeding an event in.
#[derive(Debug, Clone, PartialEq)]
pub enum DragEffect {
    /// Start listening for pointer move/up on the whole document.
    AttachListeners,
    /// Stop listening for document-level pointer move/up.
    DetachListeners,
    /// The post was raised to this z-index.
    BroughtToFront { z_index: i64 },
    /// The post's local position changed.
    Moved(Point),
    /// The drag ended; persist this position.
    Released(PositionUpdate),
}

/// Drag state and local position of one post.
#[derive(Debug, Clone)]
pub struct DragController {
    id: PostId,
    state: DragState,
    /// Position currently rendered.
    position: Point,
    /// Last position confirmed by the post list.
    canonical: Point,
}

impl DragController {
    #[must_use]
    pub fn new(id: PostId, canonical: Point) -> Self {
        Self { id, state: DragState::Idle, position: canonical, canonical }
    }

    #[must_use]
    pub fn id(&self) -> PostId {
        self.id
    }

    /// Follow the post to its server-assigned id. Gesture state is kept.
    pub fn rekey(&mut self, id: PostId) {
        self.id = id;
    }

    #[must_use]
    pub fn state(&self) -> DragState {
        self.state
    }

    #[must_use]
    pub fn position(&self) -> Point {
        self.position
    }

    #[must_use]
    pub fn canonical(&self) -> Point {
        self.canonical
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    /// Document-level listeners are live exactly while dragging.
    #[must_use]
    pub fn listeners_attached(&self) -> bool {
        self.is_dragging()
    }

    /// Grab the post. Ignored for non-primary buttons or when already dragging.
    pub fn pointer_down(&mut self, pointer: Point, button: Button, focus: &mut FocusMap) -> Vec<DragEffect> {
        if button != Button::Primary || self.is_dragging() {
            return Vec::new();
        }
        let grab_offset = compute_grab_offset(pointer, self.position);
        self.state = DragState::Dragging { grab_offset };
        let z_index = focus.bring_to_front(self.id);
        vec![DragEffect::BroughtToFront { z_index }, DragEffect::AttachListeners]
    }

    /// Follow the pointer. No-op while idle.
    pub fn pointer_move(&mut self, pointer: Point) -> Vec<DragEffect> {
        let DragState::Dragging { grab_offset } = self.state else {
            return Vec::new();
        };
        let next = clamp_to_canvas(Point { x: pointer.x - grab_offset.x, y: pointer.y - grab_offset.y });
        if next == self.position {
            return Vec::new();
        }
        self.position = next;
        vec![DragEffect::Moved(next)]
    }

    /// Drop the post and emit the single position update for this drag.
    pub fn pointer_up(&mut self, focus: &FocusMap) -> Vec<DragEffect> {
        if !self.is_dragging() {
            return Vec::new();
        }
        self.state = DragState::Idle;
        let update = PositionUpdate {
            id: self.id,
            x: self.position.x,
            y: self.position.y,
            z_index: focus.resolve(&self.id, None),
        };
        vec![DragEffect::DetachListeners, DragEffect::Released(update)]
    }

    /// Track a new canonical position. The rendered position follows only
    /// while idle, so a remote move never yanks a post out of a local drag.
    /// Returns true when the rendered position changed.
    pub fn sync_canonical(&mut self, canonical: Point) -> bool {
        self.canonical = canonical;
        if self.is_dragging() || self.position == canonical {
            return false;
        }
        self.position = canonical;
        true
    }
}
