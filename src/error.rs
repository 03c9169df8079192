//! Per-concern error types. Kept separate rather than one crate-wide enum
//! because a cache error is never sensibly a config error.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value:?} ({reason})")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("connect error: {0}")]
    Connect(String),

    #[error("read error: {0}")]
    Read(String),
}

#[derive(Debug, Error)]
pub enum ModeError {
    #[error("invalid mode: {0}")]
    InvalidMode(String),
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Backend(#[from] redis::RedisError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("no stats found for {exchange}:{pair}")]
    NotFound { exchange: String, pair: String },
}
