//! Server configuration parsed from environment variables.
//!
//! `.env` is loaded by `main` before this runs, so values may come from either
//! the process environment or the file. Only `DATABASE_URL` is required.

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_BOARD_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required env var: {0}")]
    MissingEnv(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub database_url: String,
    pub port: u16,
    pub db_max_connections: u32,
    /// Per-subscriber queue depth for board change notices.
    pub channel_capacity: usize,
}

impl ServerConfig {
    /// Build typed config from environment variables.
    ///
    /// Required: `DATABASE_URL`.
    /// Optional: `PORT`, `DB_MAX_CONNECTIONS`, `BOARD_CHANNEL_CAPACITY`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnv`] if `DATABASE_URL` is unset or blank.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingEnv("DATABASE_URL"))?;

        Ok(Self {
            database_url,
            port: env_parse("PORT", DEFAULT_PORT),
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
            channel_capacity: env_parse("BOARD_CHANNEL_CAPACITY", DEFAULT_BOARD_CHANNEL_CAPACITY).max(1),
        })
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
