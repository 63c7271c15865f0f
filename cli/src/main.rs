//! `partygeng` — drive an event board from the terminal.
//!
//! Every command opens a real board session over HTTP, so adds, moves and
//! deletes go through the same optimistic path as the browser client:
//! local apply first, then the API call, then rollback with a notice if the
//! server refuses.

#[cfg(test)]
#[path = "main_test.rs"]
mod main_test;

use std::sync::Arc;

use board::compose::{ComposeError, InputStation};
use board::doc::{EventId, PostId, PostKind};
use board::drag::{Button, Point};
use board::render::{CanvasSize, Card, CardBody, Scene};
use board::session::{BoardSession, LoadStatus, Outcome};
use clap::{Args, Parser, Subcommand};
use remote::{HttpStore, RemoteError};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("missing session token; pass --token or set PARTYGENG_TOKEN")]
    MissingToken,
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("could not load board: {0}")]
    LoadFailed(String),
    #[error("post {0} is not on this board")]
    UnknownPost(PostId),
    #[error(transparent)]
    Compose(#[from] ComposeError),
    #[error("{0}")]
    Rejected(String),
    #[error("change feed unavailable")]
    NoFeed,
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "partygeng", about = "PartyGeng event board CLI")]
struct Cli {
    #[arg(long, env = "PARTYGENG_BASE_URL", default_value = "http://127.0.0.1:3000")]
    base_url: String,

    #[arg(long, env = "PARTYGENG_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check the server is up.
    Ping,
    /// Print the signed-in user.
    Whoami,
    /// Print an event's board.
    Show {
        event_id: EventId,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Pin a note or an image.
    Add(AddArgs),
    /// Drag a post to a new position.
    Move {
        event_id: EventId,
        post_id: PostId,
        #[arg(long)]
        x: f64,
        #[arg(long)]
        y: f64,
    },
    /// Remove one of your posts.
    Delete { event_id: EventId, post_id: PostId },
    /// Reprint the board every time it changes.
    Watch { event_id: EventId },
}

#[derive(Args, Debug)]
struct AddArgs {
    event_id: EventId,

    #[arg(long, conflicts_with = "image", required_unless_present = "image")]
    note: Option<String>,

    #[arg(long)]
    image: Option<String>,

    #[arg(long, default_value_t = 0, help = "Palette slot for notes (wraps)")]
    color: i32,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let token = cli.token.ok_or(CliError::MissingToken)?;
    let store = Arc::new(HttpStore::new(&cli.base_url, &token)?);

    match cli.command {
        Command::Ping => {
            store.ping().await?;
            println!("ok");
            Ok(())
        }
        Command::Whoami => {
            let viewer = store.whoami().await?;
            println!("{} ({})", viewer.name, viewer.id);
            Ok(())
        }
        Command::Show { event_id, json } => run_show(store, event_id, json).await,
        Command::Add(args) => run_add(store, args).await,
        Command::Move { event_id, post_id, x, y } => run_move(store, event_id, post_id, Point::new(x, y)).await,
        Command::Delete { event_id, post_id } => run_delete(store, event_id, post_id).await,
        Command::Watch { event_id } => run_watch(store, event_id).await,
    }
}

// =============================================================================
// COMMANDS
// =============================================================================

async fn open(store: Arc<HttpStore>, event_id: EventId) -> Result<BoardSession<HttpStore>, CliError> {
    let viewer = store.whoami().await?;
    let session = BoardSession::open(store, event_id, viewer).await;
    if let LoadStatus::Failed(message) = session.status() {
        return Err(CliError::LoadFailed(message.clone()));
    }
    Ok(session)
}

async fn run_show(store: Arc<HttpStore>, event_id: EventId, json: bool) -> Result<(), CliError> {
    if json {
        let board = store.board(event_id).await?;
        println!("{}", serde_json::to_string_pretty(&board)?);
        return Ok(());
    }

    let session = open(store, event_id).await?;
    print!("{}", format_scene(&session.scene()));
    session.close();
    Ok(())
}

async fn run_add(store: Arc<HttpStore>, args: AddArgs) -> Result<(), CliError> {
    let mut station = InputStation::new();
    station.expand();
    match (args.note, args.image) {
        (_, Some(url)) => {
            station.set_mode(PostKind::Image);
            station.set_image_url(url);
        }
        (Some(text), None) => {
            station.set_mode(PostKind::Note);
            station.set_note_text(text);
            station.select_color(args.color);
        }
        (None, None) => return Err(CliError::Compose(ComposeError::EmptyContent)),
    }
    let draft = station.submit(&mut rand::rng())?;

    let mut session = open(store, args.event_id).await?;
    let outcome = session.add_post(draft).await;
    finish(session, outcome, "pinned")
}

async fn run_move(store: Arc<HttpStore>, event_id: EventId, post_id: PostId, to: Point) -> Result<(), CliError> {
    let mut session = open(store, event_id).await?;
    let Some(post) = session.view().get(&post_id) else {
        return Err(CliError::UnknownPost(post_id));
    };

    // Grab at the top-left corner so the card lands exactly on `to`.
    let from = Point::new(post.x, post.y);
    session.pointer_down(post_id, from, Button::Primary);
    session.pointer_move(post_id, to);
    let (_, outcome) = session.release(post_id).await;
    match outcome {
        Some(outcome) => finish(session, outcome, "moved"),
        None => {
            session.close();
            Err(CliError::UnknownPost(post_id))
        }
    }
}

async fn run_delete(store: Arc<HttpStore>, event_id: EventId, post_id: PostId) -> Result<(), CliError> {
    let mut session = open(store, event_id).await?;
    let outcome = session.delete_post(post_id).await;
    finish(session, outcome, "deleted")
}

async fn run_watch(store: Arc<HttpStore>, event_id: EventId) -> Result<(), CliError> {
    let mut session = open(store, event_id).await?;
    if !session.is_live() {
        session.close();
        return Err(CliError::NoFeed);
    }

    print!("{}", format_scene(&session.scene()));
    while session.next_change().await {
        println!("--");
        print!("{}", format_scene(&session.scene()));
    }

    info!(%event_id, "watch: change feed ended");
    session.close();
    Ok(())
}

fn finish(mut session: BoardSession<HttpStore>, outcome: Outcome, verb: &str) -> Result<(), CliError> {
    for notice in session.take_notices() {
        eprintln!("{}: {}", notice.code, notice.message);
    }
    session.close();
    match outcome {
        Outcome::Committed => {
            println!("{verb}");
            Ok(())
        }
        Outcome::RolledBack(e) => Err(CliError::Rejected(format!("{} ({})", e, e.error_code()))),
        Outcome::Refused(e) => Err(CliError::Rejected(e.to_string())),
    }
}

// =============================================================================
// OUTPUT
// =============================================================================

fn format_scene(scene: &Scene) -> String {
    let mut out = match scene.size {
        CanvasSize::Fill => String::from("canvas: fill\n"),
        CanvasSize::Fixed { width, height } => format!("canvas: {width}x{height}\n"),
    };
    if scene.cards.is_empty() {
        out.push_str("(no posts yet)\n");
    }
    for card in &scene.cards {
        out.push_str(&format_card(card));
        out.push('\n');
    }
    out
}

fn format_card(card: &Card) -> String {
    let body = match &card.body {
        CardBody::Note { background, text, .. } => format!("note {background} {text:?}"),
        CardBody::Image { src, fallback: false } => format!("image {src}"),
        CardBody::Image { src, fallback: true } => format!("image {src} (broken)"),
    };
    let mut flags = String::new();
    if card.can_delete {
        flags.push_str(" [mine]");
    }
    if card.pending {
        flags.push_str(" [pending]");
    }
    format!(
        "{} z={} ({:.0},{:.0}) {:+.1}deg by {}: {body}{flags}",
        card.id, card.z_index, card.x, card.y, card.rotation, card.author_name
    )
}
