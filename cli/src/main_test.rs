use super::*;
use uuid::Uuid;

fn note_card(pending: bool, can_delete: bool) -> Card {
    Card {
        id: Uuid::nil(),
        body: CardBody::Note { background: "#FEF3C7", text_color: "#1F2937", text: "Bring snacks".to_owned() },
        author_name: "Sofia".to_owned(),
        can_delete,
        show_pin: true,
        x: 100.0,
        y: 250.0,
        z_index: 3,
        rotation: -2.5,
        pending,
        dragging: false,
    }
}

#[test]
fn format_card_shows_note_and_flags() {
    let line = format_card(&note_card(true, true));
    assert!(line.starts_with("00000000-0000-0000-0000-000000000000 z=3 (100,250) -2.5deg by Sofia"));
    assert!(line.contains("note #FEF3C7 \"Bring snacks\""));
    assert!(line.ends_with(" [mine] [pending]"));

    let line = format_card(&note_card(false, false));
    assert!(!line.contains("[mine]"));
    assert!(!line.contains("[pending]"));
}

#[test]
fn format_card_marks_broken_images() {
    let mut card = note_card(false, false);
    card.body = CardBody::Image { src: "placeholder.svg".to_owned(), fallback: true };
    assert!(format_card(&card).contains("image placeholder.svg (broken)"));
}

#[test]
fn format_scene_handles_empty_and_fixed_canvas() {
    let empty = Scene { size: CanvasSize::Fill, cards: Vec::new() };
    assert_eq!(format_scene(&empty), "canvas: fill\n(no posts yet)\n");

    let scene = Scene { size: CanvasSize::Fixed { width: 400.0, height: 550.0 }, cards: vec![note_card(false, true)] };
    let out = format_scene(&scene);
    assert!(out.starts_with("canvas: 400x550\n"));
    assert_eq!(out.lines().count(), 2);
}

#[test]
fn cli_parses_add_note() {
    let cli = Cli::try_parse_from([
        "partygeng",
        "--token",
        "tok",
        "add",
        "00000000-0000-0000-0000-000000000000",
        "--note",
        "hi",
        "--color",
        "7",
    ])
    .unwrap();
    let Command::Add(args) = cli.command else { panic!("expected add") };
    assert_eq!(args.note.as_deref(), Some("hi"));
    assert_eq!(args.color, 7);
    assert_eq!(cli.token.as_deref(), Some("tok"));
}

#[test]
fn cli_rejects_note_and_image_together() {
    let parsed = Cli::try_parse_from([
        "partygeng",
        "add",
        "00000000-0000-0000-0000-000000000000",
        "--note",
        "hi",
        "--image",
        "https://x/y.png",
    ]);
    assert!(parsed.is_err());
}
