//! Input station: the "Add Pin" compose form.
//!
//! The station is a small form state machine. Collapsed it shows a single
//! "Add Pin" button; expanded it shows either a note editor (text plus a
//! color swatch) or an image URL field. `submit` validates the form, draws a
//! random spawn position and tilt, and hands back a [`PostDraft`] for the
//! board session to create optimistically.

#[cfg(test)]
#[path = "compose_test.rs"]
mod compose_test;

use rand::Rng;

use crate::consts::{PALETTE, ROTATION_MAX_DEG, SPAWN_X_MAX, SPAWN_X_MIN, SPAWN_Y_MAX, SPAWN_Y_MIN};
use crate::doc::PostKind;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComposeError {
    #[error("nothing to pin: content is empty")]
    EmptyContent,
    #[error("the input station is collapsed")]
    Collapsed,
}

/// A validated post ready for optimistic creation.
#[derive(Debug, Clone, PartialEq)]
pub struct PostDraft {
    pub kind: PostKind,
    /// Trimmed note text or image URL.
    pub content: String,
    pub color_index: i32,
    pub x: f64,
    pub y: f64,
    pub rotation: f64,
}

/// Compose form state.
#[derive(Debug, Clone, PartialEq)]
pub struct InputStation {
    expanded: bool,
    mode: PostKind,
    note_text: String,
    image_url: String,
    color_index: i32,
}

impl Default for InputStation {
    fn default() -> Self {
        Self {
            expanded: false,
            mode: PostKind::Note,
            note_text: String::new(),
            image_url: String::new(),
            color_index: 0,
        }
    }
}

impl InputStation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    #[must_use]
    pub fn mode(&self) -> PostKind {
        self.mode
    }

    #[must_use]
    pub fn note_text(&self) -> &str {
        &self.note_text
    }

    #[must_use]
    pub fn image_url(&self) -> &str {
        &self.image_url
    }

    /// Palette index the next note will use.
    #[must_use]
    pub fn color_index(&self) -> i32 {
        self.color_index
    }

    pub fn expand(&mut self) {
        self.expanded = true;
    }

    /// Hide the form. Typed input is kept.
    pub fn collapse(&mut self) {
        self.expanded = false;
    }

    pub fn set_mode(&mut self, mode: PostKind) {
        self.mode = mode;
    }

    pub fn set_note_text(&mut self, text: impl Into<String>) {
        self.note_text = text.into();
    }

    pub fn set_image_url(&mut self, url: impl Into<String>) {
        self.image_url = url.into();
    }

    /// Pick a swatch. Out-of-range indices wrap onto the palette.
    pub fn select_color(&mut self, color_index: i32) {
        self.color_index = wrap_color(color_index);
    }

    /// Validate the form and draw a placement for the new pin.
    ///
    /// On success the form is cleared and collapsed, and after a note the
    /// swatch advances to the next palette color. On failure nothing changes.
    ///
    /// # Errors
    ///
    /// [`ComposeError::Collapsed`] if the form is not open, and
    /// [`ComposeError::EmptyContent`] if the active field is blank.
    pub fn submit<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<PostDraft, ComposeError> {
        if !self.expanded {
            return Err(ComposeError::Collapsed);
        }
        let raw = match self.mode {
            PostKind::Note => &self.note_text,
            PostKind::Image => &self.image_url,
        };
        let content = raw.trim();
        if content.is_empty() {
            return Err(ComposeError::EmptyContent);
        }

        let draft = PostDraft {
            kind: self.mode,
            content: content.to_owned(),
            color_index: match self.mode {
                PostKind::Note => self.color_index,
                PostKind::Image => 0,
            },
            x: rng.random_range(SPAWN_X_MIN..SPAWN_X_MAX),
            y: rng.random_range(SPAWN_Y_MIN..SPAWN_Y_MAX),
            rotation: rng.random_range(-ROTATION_MAX_DEG..ROTATION_MAX_DEG),
        };

        match self.mode {
            PostKind::Note => {
                self.note_text.clear();
                self.color_index = wrap_color(self.color_index + 1);
            }
            PostKind::Image => self.image_url.clear(),
        }
        self.expanded = false;
        Ok(draft)
    }
}

fn wrap_color(color_index: i32) -> i32 {
    let len = i32::try_from(PALETTE.len()).unwrap_or(i32::MAX);
    color_index.rem_euclid(len)
}
