//! Repository interfaces consumed by the engine
//!
//! The engine never talks to storage directly; it goes through these traits.
//! [`sqlite::SqliteStore`] implements all three over one pool.

pub mod sqlite;

use crate::Result;
use async_trait::async_trait;
use chanplay_common::db::{Channel, DraftProgram, DraftSnapshot, Program, PublishRecord};
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

pub use sqlite::SqliteStore;

/// New start instant and running-order position for one program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartUpdate {
    pub program_id: Uuid,
    pub start_instant: DateTime<Utc>,
    pub sort_index: i64,
}

/// Everything needed to swap one (channel, day) of live programs
#[derive(Debug, Clone)]
pub struct DayReplacement {
    pub channel_id: Uuid,
    pub day: NaiveDate,
    pub draft_version: i64,
    pub rows: Vec<Program>,
    pub published_at: DateTime<Utc>,
}

/// A draft version about to be stored
#[derive(Debug, Clone)]
pub struct NewDraft {
    pub channel_id: Uuid,
    pub day: NaiveDate,
    pub base_instant: DateTime<Utc>,
    pub saved_at: DateTime<Utc>,
    pub rows: Vec<DraftProgram>,
}

#[async_trait]
pub trait ProgramRepository: Send + Sync {
    /// Programs whose start lies in `[from, to)`, ascending
    async fn programs_starting_between(
        &self,
        channel_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Program>>;

    /// Programs whose window intersects `(from, to)`, ascending
    async fn programs_overlapping(
        &self,
        channel_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Program>>;

    /// Earliest program starting at or after `from`, with no upper bound
    async fn first_starting_from(&self, channel_id: Uuid, from: DateTime<Utc>) -> Result<Option<Program>>;

    async fn get(&self, program_id: Uuid) -> Result<Option<Program>>;

    async fn insert(&self, program: &Program) -> Result<()>;

    /// Bulk start rewrite in one transaction; returns rows updated
    async fn update_starts(&self, updates: &[StartUpdate]) -> Result<u64>;

    /// Atomically replace a day's live rows; returns rows inserted
    ///
    /// Deletes the channel's programs starting inside the day plus any of
    /// the channel's live programs carrying an id in `rows`, inserts `rows`, and records the
    /// publish. Either all of it commits or none of it does.
    async fn replace_day(&self, replacement: &DayReplacement) -> Result<u64>;
}

#[async_trait]
pub trait ChannelRepository: Send + Sync {
    async fn get(&self, channel_id: Uuid) -> Result<Option<Channel>>;

    /// All channels ordered by name
    async fn list(&self) -> Result<Vec<Channel>>;

    async fn insert(&self, channel: &Channel) -> Result<()>;

    /// Insert channels and programs together; nothing is kept on failure
    async fn insert_batch(&self, channels: &[Channel], programs: &[Program]) -> Result<()>;

    /// Returns false when the channel does not exist
    async fn set_override_active(&self, channel_id: Uuid, active: bool) -> Result<bool>;
}

#[async_trait]
pub trait DraftRepository: Send + Sync {
    /// Highest stored version for the key
    async fn current(&self, channel_id: Uuid, day: NaiveDate) -> Result<Option<DraftSnapshot>>;

    /// Store a new version; returns its version number
    async fn save(&self, draft: &NewDraft) -> Result<i64>;

    async fn version_count(&self, channel_id: Uuid, day: NaiveDate) -> Result<i64>;

    async fn publish_history(&self, channel_id: Uuid, day: NaiveDate) -> Result<Vec<PublishRecord>>;
}
