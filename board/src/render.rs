//! Rendering: turns the local board state into card view models.
//!
//! This module never draws pixels. It receives read-only views of the post
//! list, the focus map, and the drag controllers, and produces a [`Scene`]:
//! the canvas size plus one [`Card`] per post in draw order (bottom first).
//! The host maps each card onto whatever surface it paints with.
//!
//! CANVAS SIZE
//! ===========
//! An empty board fills its container. Otherwise the canvas extends
//! [`CANVAS_MARGIN_PX`] past the furthest post on each axis, so there is
//! always room to drag a post further right or down.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use std::collections::{HashMap, HashSet};

use crate::consts::{CANVAS_MARGIN_PX, PALETTE, PLACEHOLDER_IMAGE_URL};
use crate::doc::{BoardPost, PostId, PostKind, PostStore, Viewer};
use crate::drag::{DragController, Point};
use crate::focus::FocusMap;

/// Note text color, dark enough for every palette entry.
const NOTE_TEXT_COLOR: &str = "#1F2937";

/// Background color for a stored palette index. Negative and out-of-range
/// indices wrap.
#[must_use]
pub fn palette_color(color_index: i32) -> &'static str {
    let len = i32::try_from(PALETTE.len()).unwrap_or(i32::MAX);
    let slot = usize::try_from(color_index.rem_euclid(len)).unwrap_or(0);
    PALETTE.get(slot).copied().unwrap_or(PALETTE[0])
}

/// Size of the scrollable canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CanvasSize {
    /// No posts: fill the container at 100% by 100%.
    Fill,
    /// Explicit size in pixels.
    Fixed { width: f64, height: f64 },
}

/// Canvas bounds for posts at the given top-left positions.
#[must_use]
pub fn canvas_size(positions: impl IntoIterator<Item = Point>) -> CanvasSize {
    let mut extent: Option<Point> = None;
    for p in positions {
        extent = Some(match extent {
            None => p,
            Some(e) => Point::new(e.x.max(p.x), e.y.max(p.y)),
        });
    }
    match extent {
        None => CanvasSize::Fill,
        Some(e) => CanvasSize::Fixed { width: e.x + CANVAS_MARGIN_PX, height: e.y + CANVAS_MARGIN_PX },
    }
}

/// What a card shows inside its frame.
#[derive(Debug, Clone, PartialEq)]
pub enum CardBody {
    Note {
        background: &'static str,
        text_color: &'static str,
        text: String,
    },
    Image {
        src: String,
        /// True when `src` is the placeholder standing in for a broken URL.
        fallback: bool,
    },
}

/// View model for one post.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub id: PostId,
    pub body: CardBody,
    pub author_name: String,
    /// Delete control is offered only to the author.
    pub can_delete: bool,
    /// Notes carry a pin decoration.
    pub show_pin: bool,
    pub x: f64,
    pub y: f64,
    pub z_index: i64,
    pub rotation: f64,
    /// Optimistic insert not yet confirmed by the server.
    pub pending: bool,
    pub dragging: bool,
}

/// Everything the host needs to paint the board.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub size: CanvasSize,
    /// Cards in draw order: ascending z-index, ties in insertion order.
    pub cards: Vec<Card>,
}

impl Scene {
    #[must_use]
    pub fn card(&self, id: &PostId) -> Option<&Card> {
        self.cards.iter().find(|c| c.id == *id)
    }
}

/// Read-only inputs for [`render_scene`].
#[derive(Debug, Clone, Copy)]
pub struct RenderInput<'a> {
    pub view: &'a PostStore,
    pub focus: &'a FocusMap,
    pub drags: &'a HashMap<PostId, DragController>,
    pub viewer: &'a Viewer,
    pub broken_images: &'a HashSet<PostId>,
}

/// Build the scene for the current board state.
#[must_use]
pub fn render_scene(input: RenderInput<'_>) -> Scene {
    let mut cards: Vec<Card> = input.view.posts().iter().map(|post| card_for(post, &input)).collect();
    // Stable sort keeps insertion order among equal z-indexes.
    cards.sort_by_key(|c| c.z_index);
    let size = canvas_size(cards.iter().map(|c| Point::new(c.x, c.y)));
    Scene { size, cards }
}

fn card_for(post: &BoardPost, input: &RenderInput<'_>) -> Card {
    let drag = input.drags.get(&post.id);
    let position = drag.map_or(Point::new(post.x, post.y), DragController::position);

    let body = match post.kind {
        PostKind::Note => CardBody::Note {
            background: palette_color(post.color_index),
            text_color: NOTE_TEXT_COLOR,
            text: post.content.clone(),
        },
        PostKind::Image if input.broken_images.contains(&post.id) => {
            CardBody::Image { src: PLACEHOLDER_IMAGE_URL.to_owned(), fallback: true }
        }
        PostKind::Image => CardBody::Image { src: post.content.clone(), fallback: false },
    };

    Card {
        id: post.id,
        body,
        author_name: post.author_name.clone(),
        can_delete: input.viewer.is_author_of(post),
        show_pin: post.kind == PostKind::Note,
        x: position.x,
        y: position.y,
        z_index: input.focus.resolve(&post.id, Some(post.z_index)),
        rotation: post.rotation,
        pending: input.view.is_pending(&post.id),
        dragging: drag.is_some_and(DragController::is_dragging),
    }
}
