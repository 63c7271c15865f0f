use super::*;

// Every test below that touches env vars uses its own keys, except the
// `from_env` test which owns DATABASE_URL and friends.

#[test]
fn env_parse_missing_returns_default() {
    let val: usize = env_parse("__PG_TEST_MISSING__", 42);
    assert_eq!(val, 42);
}

#[test]
fn env_parse_present_valid() {
    unsafe { std::env::set_var("__PG_TEST_VALID__", "99") };
    let val: u16 = env_parse("__PG_TEST_VALID__", 0);
    assert_eq!(val, 99);
    unsafe { std::env::remove_var("__PG_TEST_VALID__") };
}

#[test]
fn env_parse_invalid_returns_default() {
    unsafe { std::env::set_var("__PG_TEST_INVALID__", "lots") };
    let val: u32 = env_parse("__PG_TEST_INVALID__", 7);
    assert_eq!(val, 7);
    unsafe { std::env::remove_var("__PG_TEST_INVALID__") };
}

#[test]
fn from_env_requires_database_url_and_applies_defaults() {
    unsafe {
        std::env::remove_var("DATABASE_URL");
        std::env::remove_var("PORT");
        std::env::remove_var("DB_MAX_CONNECTIONS");
        std::env::set_var("BOARD_CHANNEL_CAPACITY", "0");
    }
    assert_eq!(ServerConfig::from_env(), Err(ConfigError::MissingEnv("DATABASE_URL")));

    unsafe { std::env::set_var("DATABASE_URL", "postgres://localhost/partygeng") };
    let config = ServerConfig::from_env().unwrap();
    assert_eq!(config.database_url, "postgres://localhost/partygeng");
    assert_eq!(config.port, DEFAULT_PORT);
    assert_eq!(config.db_max_connections, DEFAULT_DB_MAX_CONNECTIONS);
    assert_eq!(config.channel_capacity, 1, "capacity is clamped to at least one");

    unsafe {
        std::env::remove_var("DATABASE_URL");
        std::env::remove_var("BOARD_CHANNEL_CAPACITY");
    }
}
