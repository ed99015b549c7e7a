//! Error types for chanplay-po
//!
//! Viewer-facing resolution never surfaces these; it degrades to STANDBY.
//! Editing operations (reschedule, drafts, publish) return them to callers.

use crate::schedule::chain::ChainError;
use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

/// Main error type for chanplay-po
#[derive(Error, Debug)]
pub enum Error {
    /// Errors bubbled up from the common crate (config, I/O, bootstrap)
    #[error(transparent)]
    Common(#[from] chanplay_common::Error),

    /// Database connection or query errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Start-time chaining could not be computed
    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("Channel not found: {0}")]
    ChannelNotFound(Uuid),

    /// Publish requested for a key that has never been drafted
    #[error("No draft for channel {channel_id} on {day}")]
    NoDraft { channel_id: Uuid, day: NaiveDate },

    /// Publish transaction failed; the live schedule is unchanged
    #[error("Publish failed for channel {channel_id} on {day}: {reason}")]
    Publish {
        channel_id: Uuid,
        day: NaiveDate,
        reason: String,
    },

    /// Invalid request
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Stored data could not be decoded
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),
}

/// Convenience Result type using chanplay-po Error
pub type Result<T> = std::result::Result<T, Error>;
