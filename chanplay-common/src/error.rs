//! Common error types for chanplay

use thiserror::Error;

/// Common result type for chanplay operations
pub type Result<T> = std::result::Result<T, Error>;

/// Storage and bootstrap failures shared by the chanplay crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Bootstrap TOML that exists but cannot be parsed
    #[error("Configuration error: {0}")]
    Config(String),
}
