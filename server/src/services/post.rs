//! Board post service — reads and the three post mutations.
//!
//! DESIGN
//! ======
//! Every operation is a short SQL round trip; the board has no server-side
//! cache. Route handlers call [`crate::services::feed::notify`] after each
//! successful mutation, so this module stays free of realtime concerns.
//!
//! Author names are denormalized at read time by joining `users`, and
//! `created_at` is returned as milliseconds since the Unix epoch.

use board::doc::{BoardPost, EventBoard, EventId, EventSummary, NewPost, PositionUpdate, PostId, PostKind, Viewer};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PostError {
    #[error("event not found: {0}")]
    EventNotFound(EventId),
    #[error("post not found: {0}")]
    PostNotFound(PostId),
    #[error("only the author may delete post {0}")]
    Forbidden(PostId),
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("stored post has unknown kind: {0}")]
    UnknownKind(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl PostError {
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::EventNotFound(_) => "E_EVENT_NOT_FOUND",
            Self::PostNotFound(_) => "E_POST_NOT_FOUND",
            Self::Forbidden(_) => "E_FORBIDDEN",
            Self::Validation(_) => "E_VALIDATION",
            Self::UnknownKind(_) => "E_UNKNOWN_KIND",
            Self::Database(_) => "E_DATABASE",
        }
    }
}

const POST_COLUMNS: &str = r"p.id, p.event_id, p.kind, p.content, p.color_index, p.x, p.y, p.z_index,
    p.rotation, p.author_id, u.name AS author_name,
    (EXTRACT(EPOCH FROM p.created_at) * 1000)::BIGINT AS created_at_ms";

fn post_from_row(row: &PgRow) -> Result<BoardPost, PostError> {
    let kind: String = row.try_get("kind")?;
    let kind = PostKind::parse(&kind).ok_or(PostError::UnknownKind(kind))?;
    Ok(BoardPost {
        id: row.try_get("id")?,
        event_id: row.try_get("event_id")?,
        kind,
        content: row.try_get("content")?,
        color_index: row.try_get("color_index")?,
        x: row.try_get("x")?,
        y: row.try_get("y")?,
        z_index: row.try_get("z_index")?,
        rotation: row.try_get("rotation")?,
        author_id: row.try_get("author_id")?,
        author_name: row.try_get("author_name")?,
        created_at: row.try_get("created_at_ms")?,
    })
}

// =============================================================================
// READ
// =============================================================================

/// Load an event and every post on its board, oldest first.
///
/// # Errors
///
/// [`PostError::EventNotFound`] for unknown events, otherwise database errors.
pub async fn load_board(pool: &PgPool, event_id: EventId) -> Result<EventBoard, PostError> {
    let event = sqlx::query("SELECT id, name FROM events WHERE id = $1")
        .bind(event_id)
        .fetch_optional(pool)
        .await?
        .ok_or(PostError::EventNotFound(event_id))?;

    let sql = format!(
        "SELECT {POST_COLUMNS} FROM board_posts p JOIN users u ON u.id = p.author_id
         WHERE p.event_id = $1 ORDER BY p.created_at, p.id"
    );
    let rows = sqlx::query(&sql).bind(event_id).fetch_all(pool).await?;
    let posts = rows.iter().map(post_from_row).collect::<Result<Vec<_>, _>>()?;

    Ok(EventBoard { event: EventSummary { id: event.try_get("id")?, name: event.try_get("name")? }, posts })
}

/// Whether an event exists.
///
/// # Errors
///
/// Returns the database error if the lookup fails.
pub async fn event_exists(pool: &PgPool, event_id: EventId) -> Result<bool, PostError> {
    let row = sqlx::query("SELECT 1 FROM events WHERE id = $1")
        .bind(event_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}

// =============================================================================
// MUTATIONS
// =============================================================================

/// Create a post authored by `author`. Content is stored trimmed.
///
/// # Errors
///
/// Validation failures, unknown events, and database errors.
pub async fn create_post(pool: &PgPool, author: &Viewer, post: NewPost) -> Result<BoardPost, PostError> {
    post.validate().map_err(PostError::Validation)?;
    if !event_exists(pool, post.event_id).await? {
        return Err(PostError::EventNotFound(post.event_id));
    }

    let id = Uuid::new_v4();
    let content = post.content.trim().to_owned();
    let row = sqlx::query(
        r"INSERT INTO board_posts (id, event_id, kind, content, color_index, x, y, z_index, rotation, author_id)
          VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
          RETURNING (EXTRACT(EPOCH FROM created_at) * 1000)::BIGINT AS created_at_ms",
    )
    .bind(id)
    .bind(post.event_id)
    .bind(post.kind.as_str())
    .bind(&content)
    .bind(post.color_index)
    .bind(post.x)
    .bind(post.y)
    .bind(post.z_index)
    .bind(post.rotation)
    .bind(author.id)
    .fetch_one(pool)
    .await?;

    info!(post_id = %id, event_id = %post.event_id, author_id = %author.id, kind = post.kind.as_str(), "post created");
    Ok(BoardPost {
        id,
        event_id: post.event_id,
        kind: post.kind,
        content,
        color_index: post.color_index,
        x: post.x,
        y: post.y,
        z_index: post.z_index,
        rotation: post.rotation,
        author_id: author.id,
        author_name: author.name.clone(),
        created_at: row.try_get("created_at_ms")?,
    })
}

/// Persist a post's position and stacking order.
///
/// # Errors
///
/// Validation failures, unknown posts, and database errors.
pub async fn update_position(pool: &PgPool, update: PositionUpdate) -> Result<BoardPost, PostError> {
    update.validate().map_err(PostError::Validation)?;

    let sql = format!(
        "WITH p AS (
             UPDATE board_posts SET x = $2, y = $3, z_index = $4 WHERE id = $1 RETURNING *
         )
         SELECT {POST_COLUMNS} FROM p JOIN users u ON u.id = p.author_id"
    );
    let row = sqlx::query(&sql)
        .bind(update.id)
        .bind(update.x)
        .bind(update.y)
        .bind(update.z_index)
        .fetch_optional(pool)
        .await?
        .ok_or(PostError::PostNotFound(update.id))?;
    post_from_row(&row)
}

/// Delete a post on behalf of `user_id`. Returns the post's event so the
/// caller can notify its feed.
///
/// # Errors
///
/// [`PostError::PostNotFound`] for unknown ids, [`PostError::Forbidden`] when
/// the caller is not the author, otherwise database errors.
pub async fn delete_post(pool: &PgPool, id: PostId, user_id: Uuid) -> Result<EventId, PostError> {
    let row = sqlx::query("SELECT event_id, author_id FROM board_posts WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(PostError::PostNotFound(id))?;
    let event_id: EventId = row.try_get("event_id")?;
    let author_id: Uuid = row.try_get("author_id")?;
    if author_id != user_id {
        return Err(PostError::Forbidden(id));
    }

    let result = sqlx::query("DELETE FROM board_posts WHERE id = $1 AND author_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(PostError::PostNotFound(id));
    }
    info!(post_id = %id, %event_id, "post deleted");
    Ok(event_id)
}

#[cfg(test)]
#[path = "post_test.rs"]
mod tests;
