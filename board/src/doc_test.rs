#![allow(clippy::float_cmp)]

use serde_json::json;
use uuid::Uuid;

use super::*;

fn make_post(kind: PostKind, z: i64) -> BoardPost {
    BoardPost {
        id: Uuid::new_v4(),
        event_id: Uuid::nil(),
        kind,
        content: "Bring extra chairs".into(),
        color_index: 0,
        x: 150.0,
        y: 250.0,
        z_index: z,
        rotation: 1.5,
        author_id: Uuid::nil(),
        author_name: "Ada".into(),
        created_at: 0,
    }
}

// =============================================================
// PostKind
// =============================================================

#[test]
fn kind_serializes_uppercase() {
    assert_eq!(serde_json::to_string(&PostKind::Note).unwrap(), "\"NOTE\"");
    assert_eq!(serde_json::to_string(&PostKind::Image).unwrap(), "\"IMAGE\"");
}

#[test]
fn kind_rejects_lowercase_tag() {
    assert!(serde_json::from_str::<PostKind>("\"note\"").is_err());
}

#[test]
fn kind_parse_matches_as_str() {
    for kind in [PostKind::Note, PostKind::Image] {
        assert_eq!(PostKind::parse(kind.as_str()), Some(kind));
    }
    assert_eq!(PostKind::parse("VIDEO"), None);
}

// =============================================================
// BoardPost wire shape
// =============================================================

#[test]
fn post_uses_type_field_for_kind() {
    let post = make_post(PostKind::Image, 3);
    let value = serde_json::to_value(&post).unwrap();
    assert_eq!(value["type"], "IMAGE");
    assert!(value.get("kind").is_none());
    assert_eq!(value["z_index"], 3);
}

#[test]
fn post_defaults_optional_fields() {
    let raw = json!({
        "id": Uuid::nil(),
        "event_id": Uuid::nil(),
        "type": "NOTE",
        "content": "hi",
        "x": 1.0,
        "y": 2.0,
        "z_index": 0,
        "author_id": Uuid::nil(),
        "author_name": "Ada"
    });
    let post: BoardPost = serde_json::from_value(raw).unwrap();
    assert_eq!(post.color_index, 0);
    assert_eq!(post.rotation, 0.0);
    assert_eq!(post.created_at, 0);
}

// =============================================================
// Validation
// =============================================================

#[test]
fn new_post_rejects_blank_content() {
    let mut req = NewPost::from_post(&make_post(PostKind::Note, 0));
    req.content = "   ".into();
    assert!(req.validate().is_err());
}

#[test]
fn new_post_rejects_nan_position() {
    let mut req = NewPost::from_post(&make_post(PostKind::Note, 0));
    req.x = f64::NAN;
    assert!(req.validate().is_err());
}

#[test]
fn new_post_from_post_copies_fields() {
    let post = make_post(PostKind::Note, 7);
    let req = NewPost::from_post(&post);
    assert_eq!(req.content, post.content);
    assert_eq!(req.z_index, 7);
    assert_eq!(req.rotation, 1.5);
    assert!(req.validate().is_ok());
}

#[test]
fn position_update_rejects_infinite() {
    let update = PositionUpdate { id: Uuid::nil(), x: f64::INFINITY, y: 0.0, z_index: 0 };
    assert!(update.validate().is_err());
}

// =============================================================
// Viewer
// =============================================================

#[test]
fn viewer_is_author_only_of_own_posts() {
    let me = Viewer::new(Uuid::new_v4(), "Me");
    let mut post = make_post(PostKind::Note, 0);
    assert!(!me.is_author_of(&post));
    post.author_id = me.id;
    assert!(me.is_author_of(&post));
}

// =============================================================
// PostStore
// =============================================================

#[test]
fn store_insert_replaces_in_place() {
    let mut store = PostStore::new();
    let a = make_post(PostKind::Note, 0);
    let b = make_post(PostKind::Note, 0);
    store.insert(a.clone());
    store.insert(b.clone());

    let mut moved = a.clone();
    moved.x = 999.0;
    store.insert(moved);

    assert_eq!(store.len(), 2);
    assert_eq!(store.posts()[0].id, a.id);
    assert_eq!(store.posts()[0].x, 999.0);
    assert_eq!(store.posts()[1].id, b.id);
}

#[test]
fn store_pending_flag_cleared_by_snapshot() {
    let mut store = PostStore::new();
    let temp = make_post(PostKind::Note, 0);
    store.insert_pending(temp.clone());
    assert!(store.is_pending(&temp.id));

    store.load_snapshot(vec![make_post(PostKind::Image, 1)]);
    assert!(!store.is_pending(&temp.id));
    assert!(store.get(&temp.id).is_none());
    assert_eq!(store.len(), 1);
}

#[test]
fn store_set_position_unknown_returns_false() {
    let mut store = PostStore::new();
    assert!(!store.set_position(&Uuid::new_v4(), 1.0, 2.0, 3));
}

#[test]
fn store_set_position_patches_fields() {
    let mut store = PostStore::new();
    let post = make_post(PostKind::Note, 0);
    store.insert(post.clone());
    assert!(store.set_position(&post.id, 400.0, 600.0, 12));
    let patched = store.get(&post.id).unwrap();
    assert_eq!((patched.x, patched.y, patched.z_index), (400.0, 600.0, 12));
}

#[test]
fn store_remove_clears_pending() {
    let mut store = PostStore::new();
    let post = make_post(PostKind::Note, 0);
    store.insert_pending(post.clone());
    assert_eq!(store.remove(&post.id).map(|p| p.id), Some(post.id));
    assert!(!store.is_pending(&post.id));
    assert!(store.is_empty());
    assert!(store.remove(&post.id).is_none());
}

#[test]
fn store_rekey_keeps_slot_and_pending_flag() {
    let mut store = PostStore::new();
    let first = make_post(PostKind::Note, 0);
    let temp = make_post(PostKind::Image, 1);
    store.insert(first.clone());
    store.insert_pending(temp.clone());
    let real = Uuid::new_v4();

    assert!(store.rekey(&temp.id, real));
    assert_eq!(store.posts()[1].id, real);
    assert!(store.is_pending(&real));
    assert!(!store.is_pending(&temp.id));
    assert!(!store.rekey(&temp.id, real));
}

#[test]
fn store_rekey_onto_present_id_drops_the_temp_copy() {
    let mut store = PostStore::new();
    let temp = make_post(PostKind::Note, 0);
    let server = BoardPost { id: Uuid::new_v4(), ..temp.clone() };
    store.insert(server.clone());
    store.insert_pending(temp.clone());

    assert!(store.rekey(&temp.id, server.id));
    assert_eq!(store.posts(), std::slice::from_ref(&server));
}

#[test]
fn store_clone_compares_equal() {
    let mut store = PostStore::new();
    store.insert_pending(make_post(PostKind::Note, 4));
    let snapshot = store.clone();
    assert_eq!(snapshot, store);
    store.insert(make_post(PostKind::Image, 5));
    assert_ne!(snapshot, store);
}

#[test]
fn store_max_z() {
    let mut store = PostStore::new();
    assert_eq!(store.max_z(), None);
    store.insert(make_post(PostKind::Note, 4));
    store.insert(make_post(PostKind::Note, 17));
    store.insert(make_post(PostKind::Note, 2));
    assert_eq!(store.max_z(), Some(17));
}
