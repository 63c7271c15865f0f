//! Session token management.
//!
//! ARCHITECTURE
//! ============
//! Sessions are issued by the marketplace login flow and shared with the
//! board through the `sessions` table. The board only validates tokens;
//! `create_session` exists for seeding and integration tests.

use board::doc::Viewer;
use rand::Rng;
use sqlx::{PgPool, Row};
use uuid::Uuid;

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Generate a cryptographically random 32-byte hex token.
#[must_use]
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes_to_hex(&bytes)
}

/// Create a session for the given user, returning the token.
///
/// # Errors
///
/// Returns the database error if the insert fails.
pub async fn create_session(pool: &PgPool, user_id: Uuid) -> Result<String, sqlx::Error> {
    let token = generate_token();
    sqlx::query("INSERT INTO sessions (token, user_id) VALUES ($1, $2)")
        .bind(&token)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(token)
}

/// Validate a session token and return the user behind it.
///
/// # Errors
///
/// Returns the database error if the lookup fails.
pub async fn validate_session(pool: &PgPool, token: &str) -> Result<Option<Viewer>, sqlx::Error> {
    let row = sqlx::query(
        r"SELECT u.id, u.name
          FROM sessions s
          JOIN users u ON u.id = s.user_id
          WHERE s.token = $1 AND s.expires_at > now()",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| Viewer { id: r.get("id"), name: r.get("name") }))
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
