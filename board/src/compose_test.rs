use rand::SeedableRng;
use rand::rngs::StdRng;

use super::*;

fn rng() -> StdRng {
    StdRng::seed_from_u64(7)
}

fn note_station(text: &str, color: i32) -> InputStation {
    let mut station = InputStation::new();
    station.expand();
    station.set_note_text(text);
    station.select_color(color);
    station
}

#[test]
fn starts_collapsed_in_note_mode() {
    let station = InputStation::new();
    assert!(!station.is_expanded());
    assert_eq!(station.mode(), PostKind::Note);
    assert_eq!(station.color_index(), 0);
}

#[test]
fn submit_while_collapsed_is_refused() {
    let mut station = InputStation::new();
    station.set_note_text("hi");
    assert_eq!(station.submit(&mut rng()), Err(ComposeError::Collapsed));
}

#[test]
fn blank_content_is_refused_and_form_kept() {
    let mut station = note_station("   ", 1);
    assert_eq!(station.submit(&mut rng()), Err(ComposeError::EmptyContent));
    assert!(station.is_expanded());
    assert_eq!(station.color_index(), 1);
}

#[test]
fn note_submit_draws_spawn_ranges_and_advances_color() {
    let mut station = note_station("  Bring extra chairs  ", 2);
    let draft = station.submit(&mut rng()).unwrap();

    assert_eq!(draft.kind, PostKind::Note);
    assert_eq!(draft.content, "Bring extra chairs");
    assert_eq!(draft.color_index, 2);
    assert!((SPAWN_X_MIN..SPAWN_X_MAX).contains(&draft.x));
    assert!((SPAWN_Y_MIN..SPAWN_Y_MAX).contains(&draft.y));
    assert!((-ROTATION_MAX_DEG..ROTATION_MAX_DEG).contains(&draft.rotation));

    assert!(!station.is_expanded());
    assert!(station.note_text().is_empty());
    assert_eq!(station.color_index(), 3);
}

#[test]
fn color_advance_wraps_after_last_swatch() {
    let mut station = note_station("x", 4);
    station.submit(&mut rng()).unwrap();
    assert_eq!(station.color_index(), 0);
}

#[test]
fn select_color_wraps() {
    let mut station = InputStation::new();
    station.select_color(-1);
    assert_eq!(station.color_index(), 4);
    station.select_color(12);
    assert_eq!(station.color_index(), 2);
}

#[test]
fn image_submit_keeps_color_and_clears_url() {
    let mut station = InputStation::new();
    station.expand();
    station.select_color(3);
    station.set_mode(PostKind::Image);
    station.set_image_url(" https://cdn.example.com/cake.png ");
    station.set_note_text("draft note survives");

    let draft = station.submit(&mut rng()).unwrap();
    assert_eq!(draft.kind, PostKind::Image);
    assert_eq!(draft.content, "https://cdn.example.com/cake.png");
    assert_eq!(draft.color_index, 0);
    assert_eq!(station.color_index(), 3);
    assert!(station.image_url().is_empty());
    assert_eq!(station.note_text(), "draft note survives");
}

#[test]
fn spawn_stays_in_range_across_many_draws() {
    let mut rng = StdRng::seed_from_u64(99);
    for i in 0..200 {
        let mut station = note_station(&format!("pin {i}"), i);
        let draft = station.submit(&mut rng).unwrap();
        assert!(draft.x >= SPAWN_X_MIN && draft.x < SPAWN_X_MAX);
        assert!(draft.y >= SPAWN_Y_MIN && draft.y < SPAWN_Y_MAX);
        assert!(draft.rotation >= -ROTATION_MAX_DEG && draft.rotation < ROTATION_MAX_DEG);
    }
}
