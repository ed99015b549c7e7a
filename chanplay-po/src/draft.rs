//! Draft -> publish workflow
//!
//! Each (channel, day) key has one current draft: the highest stored
//! snapshot version. Every load or save writes a new version; older versions
//! stay behind for audit. Publishing swaps the day's live rows for the
//! current draft in a single transaction.
//!
//! All operations on a key run under that key's lock, so a publish never
//! interleaves with a save or another publish of the same key. Different
//! keys proceed concurrently.

use crate::error::{Error, Result};
use crate::repository::{ChannelRepository, DayReplacement, DraftRepository, NewDraft, ProgramRepository};
use crate::schedule::{chain, schedule_order};
use chanplay_common::db::{DraftProgram, DraftSnapshot, Program};
use chanplay_common::time::{day_start, day_window, normalize_instant};
use chanplay_common::DurationInput;
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

type DraftKey = (Uuid, NaiveDate);

/// One row of a draft as submitted by an editor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftRowInput {
    /// Existing program this row edits; a fresh id is assigned when absent
    #[serde(default)]
    pub program_id: Option<Uuid>,
    pub title: String,
    pub media_reference: String,
    pub duration: DurationInput,
    #[serde(default)]
    pub sort_index: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PublishOutcome {
    pub version: i64,
    pub published: u64,
}

pub struct DraftWorkflow {
    programs: Arc<dyn ProgramRepository>,
    channels: Arc<dyn ChannelRepository>,
    drafts: Arc<dyn DraftRepository>,
    locks: DashMap<DraftKey, Arc<Mutex<()>>>,
}

impl DraftWorkflow {
    pub fn new(
        programs: Arc<dyn ProgramRepository>,
        channels: Arc<dyn ChannelRepository>,
        drafts: Arc<dyn DraftRepository>,
    ) -> Self {
        Self {
            programs,
            channels,
            drafts,
            locks: DashMap::new(),
        }
    }

    fn key_lock(&self, key: DraftKey) -> Arc<Mutex<()>> {
        self.locks.entry(key).or_default().clone()
    }

    /// Drop the key's lock once nobody else holds or waits on it
    fn release(&self, key: DraftKey, lock: Arc<Mutex<()>>) {
        drop(lock);
        self.locks.remove_if(&key, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Number of (channel, day) keys with a live lock entry
    pub fn held_locks(&self) -> usize {
        self.locks.len()
    }

    /// Replace the draft with a copy of the day's live programs
    pub async fn load_from_published(
        &self,
        channel_id: Uuid,
        day: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<DraftSnapshot> {
        self.require_channel(channel_id).await?;
        let key = (channel_id, day);
        let lock = self.key_lock(key);
        let result = {
            let _guard = lock.lock().await;
            self.load_from_published_locked(channel_id, day, now).await
        };
        self.release(key, lock);
        result
    }

    /// Current draft, materialized from the live day if none exists yet
    pub async fn load_draft(&self, channel_id: Uuid, day: NaiveDate, now: DateTime<Utc>) -> Result<DraftSnapshot> {
        self.require_channel(channel_id).await?;
        let key = (channel_id, day);
        let lock = self.key_lock(key);
        let result = {
            let _guard = lock.lock().await;
            match self.drafts.current(channel_id, day).await {
                Ok(Some(snapshot)) => Ok(snapshot),
                Ok(None) => self.load_from_published_locked(channel_id, day, now).await,
                Err(e) => Err(e),
            }
        };
        self.release(key, lock);
        result
    }

    /// Chain `rows` from `base` and store them as the new current draft
    ///
    /// Rows are ordered by `sort_index`; rows without one follow the indexed
    /// rows in submitted order. Stored positions are renumbered `0..n`.
    /// `base` must fall inside `day`, and a row may only reuse the id of a
    /// program that belongs to this channel.
    pub async fn save_draft(
        &self,
        channel_id: Uuid,
        day: NaiveDate,
        base: DateTime<Utc>,
        rows: Vec<DraftRowInput>,
        now: DateTime<Utc>,
    ) -> Result<DraftSnapshot> {
        self.require_channel(channel_id).await?;
        let base = normalize_instant(base);
        let rows = build_rows(channel_id, day, base, rows)?;
        self.require_owned(channel_id, &rows).await?;

        let key = (channel_id, day);
        let lock = self.key_lock(key);
        let result = {
            let _guard = lock.lock().await;
            self.store(channel_id, day, base, rows, now).await
        };
        self.release(key, lock);
        result
    }

    /// Make the current draft the live schedule for its day
    ///
    /// On any failure the live table is left exactly as it was.
    pub async fn publish(&self, channel_id: Uuid, day: NaiveDate, now: DateTime<Utc>) -> Result<PublishOutcome> {
        self.require_channel(channel_id).await?;
        let key = (channel_id, day);
        let lock = self.key_lock(key);
        let result = {
            let _guard = lock.lock().await;
            self.publish_locked(channel_id, day, now).await
        };
        self.release(key, lock);
        result
    }

    async fn publish_locked(&self, channel_id: Uuid, day: NaiveDate, now: DateTime<Utc>) -> Result<PublishOutcome> {
        let Some(snapshot) = self.drafts.current(channel_id, day).await? else {
            return Err(Error::NoDraft { channel_id, day });
        };

        let replacement = DayReplacement {
            channel_id,
            day,
            draft_version: snapshot.version,
            rows: snapshot.rows.iter().map(DraftProgram::to_program).collect(),
            published_at: normalize_instant(now),
        };

        let published = self.programs.replace_day(&replacement).await.map_err(|e| {
            warn!("Publish of channel {} on {} rolled back: {}", channel_id, day, e);
            Error::Publish {
                channel_id,
                day,
                reason: e.to_string(),
            }
        })?;

        info!(
            "Published draft v{} for channel {} on {} ({} programs)",
            snapshot.version, channel_id, day, published
        );
        Ok(PublishOutcome {
            version: snapshot.version,
            published,
        })
    }

    async fn load_from_published_locked(
        &self,
        channel_id: Uuid,
        day: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<DraftSnapshot> {
        let (from, to) = day_window(day);
        let mut live: Vec<Program> = self
            .programs
            .programs_starting_between(channel_id, from, to)
            .await?;
        live.sort_by(schedule_order);

        let base = live.first().map_or_else(|| day_start(day), |p| p.start_instant);
        let rows = live
            .iter()
            .enumerate()
            .map(|(position, program)| DraftProgram::from_program(program, day, position as i64))
            .collect();

        self.store(channel_id, day, base, rows, now).await
    }

    async fn store(
        &self,
        channel_id: Uuid,
        day: NaiveDate,
        base: DateTime<Utc>,
        rows: Vec<DraftProgram>,
        now: DateTime<Utc>,
    ) -> Result<DraftSnapshot> {
        let draft = NewDraft {
            channel_id,
            day,
            base_instant: base,
            saved_at: normalize_instant(now),
            rows,
        };
        let version = self.drafts.save(&draft).await?;

        Ok(DraftSnapshot {
            channel_id,
            day,
            version,
            base_instant: draft.base_instant,
            saved_at: draft.saved_at,
            rows: draft.rows,
        })
    }

    /// Rows reusing an id must not take a program from another channel
    async fn require_owned(&self, channel_id: Uuid, rows: &[DraftProgram]) -> Result<()> {
        for row in rows {
            if let Some(live) = self.programs.get(row.program_id).await? {
                if live.channel_id != channel_id {
                    return Err(Error::InvalidInput(format!(
                        "program {} belongs to channel {}",
                        row.program_id, live.channel_id
                    )));
                }
            }
        }
        Ok(())
    }

    async fn require_channel(&self, channel_id: Uuid) -> Result<()> {
        match self.channels.get(channel_id).await? {
            Some(_) => Ok(()),
            None => Err(Error::ChannelNotFound(channel_id)),
        }
    }
}

/// Order, validate and chain submitted rows
fn build_rows(
    channel_id: Uuid,
    day: NaiveDate,
    base: DateTime<Utc>,
    mut rows: Vec<DraftRowInput>,
) -> Result<Vec<DraftProgram>> {
    let (from, to) = day_window(day);
    if base < from || base >= to {
        return Err(Error::InvalidInput(format!("base {base} is outside {day}")));
    }

    // Stable: unindexed rows keep their submitted order
    rows.sort_by_key(|row| (row.sort_index.is_none(), row.sort_index));

    let mut seen = HashSet::new();
    let mut drafts = Vec::with_capacity(rows.len());
    for (position, row) in rows.into_iter().enumerate() {
        if row.title.trim().is_empty() {
            return Err(Error::InvalidInput(format!("draft row {position} has no title")));
        }
        let program_id = row.program_id.unwrap_or_else(Uuid::new_v4);
        if !seen.insert(program_id) {
            return Err(Error::InvalidInput(format!(
                "program {program_id} appears more than once in the draft"
            )));
        }

        drafts.push(DraftProgram {
            program_id,
            channel_id,
            day,
            title: row.title,
            media_reference: row.media_reference,
            start_instant: base,
            duration_seconds: row.duration.resolve(),
            sort_index: position as i64,
        });
    }

    Ok(chain(base, drafts)?)
}
