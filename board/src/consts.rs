//! Shared constants for the board crate.

// ── Palette ─────────────────────────────────────────────────────

/// Sticky-note background colors, indexed by `color_index mod 5`.
pub const PALETTE: [&str; 5] = ["#FEF08A", "#FBCFE8", "#BFDBFE", "#BBF7D0", "#DDD6FE"];

// ── Stacking ────────────────────────────────────────────────────

/// Lowest z-index the focus manager hands out, and the fallback for posts
/// with no known stacking order.
pub const FOCUS_FLOOR: i64 = 10;

// ── Layout ──────────────────────────────────────────────────────

/// Space kept between the furthest post and the canvas edge, in pixels.
pub const CANVAS_MARGIN_PX: f64 = 300.0;

/// Shown in place of an image post whose URL fails to load.
pub const PLACEHOLDER_IMAGE_URL: &str = "https://placehold.co/240x180?text=Image+unavailable";

// ── New pins ────────────────────────────────────────────────────

/// Horizontal spawn range `[min, max)` for freshly composed pins.
pub const SPAWN_X_MIN: f64 = 100.0;
pub const SPAWN_X_MAX: f64 = 500.0;

/// Vertical spawn range `[min, max)` for freshly composed pins.
pub const SPAWN_Y_MIN: f64 = 200.0;
pub const SPAWN_Y_MAX: f64 = 500.0;

/// Decorative tilt range in degrees, `[-max, max)`.
pub const ROTATION_MAX_DEG: f64 = 3.0;
