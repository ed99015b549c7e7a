//! SQLite-backed repositories
//!
//! Guids are stored as TEXT, instants as UNIX epoch seconds, days as
//! `YYYY-MM-DD` text.

use super::{
    ChannelRepository, DayReplacement, DraftRepository, NewDraft, ProgramRepository, StartUpdate,
};
use crate::error::{Error, Result};
use async_trait::async_trait;
use chanplay_common::db::{Channel, DraftProgram, DraftSnapshot, Program, PublishRecord};
use chanplay_common::time::day_window;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::debug;
use uuid::Uuid;

const PROGRAM_COLUMNS: &str =
    "guid, channel_guid, title, media_reference, start_epoch, duration_seconds, sort_index";

const PROGRAM_ORDER: &str = "ORDER BY start_epoch, sort_index IS NULL, sort_index, guid";

/// One pool, all three repositories
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn parse_guid(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| Error::CorruptRecord(format!("bad guid {raw:?}: {e}")))
}

fn parse_epoch(secs: i64) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .ok_or_else(|| Error::CorruptRecord(format!("epoch {secs} out of range")))
}

fn parse_stored_day(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| Error::CorruptRecord(format!("bad day {raw:?}: {e}")))
}

fn program_from_row(row: &SqliteRow) -> Result<Program> {
    Ok(Program {
        id: parse_guid(&row.get::<String, _>("guid"))?,
        channel_id: parse_guid(&row.get::<String, _>("channel_guid"))?,
        title: row.get("title"),
        media_reference: row.get("media_reference"),
        start_instant: parse_epoch(row.get("start_epoch"))?,
        duration_seconds: row.get("duration_seconds"),
        sort_index: row.get("sort_index"),
    })
}

fn channel_from_row(row: &SqliteRow) -> Result<Channel> {
    Ok(Channel {
        id: parse_guid(&row.get::<String, _>("guid"))?,
        name: row.get("name"),
        standby_media_reference: row.get("standby_media_reference"),
        is_special_override: row.get::<i64, _>("is_special_override") != 0,
        override_active: row.get::<i64, _>("override_active") != 0,
    })
}

async fn insert_program_row(conn: &mut SqliteConnection, program: &Program) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO programs (guid, channel_guid, title, media_reference, start_epoch, duration_seconds, sort_index)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(program.id.to_string())
    .bind(program.channel_id.to_string())
    .bind(&program.title)
    .bind(&program.media_reference)
    .bind(program.start_instant.timestamp())
    .bind(program.duration_seconds.max(0))
    .bind(program.sort_index)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn insert_channel_row(conn: &mut SqliteConnection, channel: &Channel) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO channels (guid, name, standby_media_reference, is_special_override, override_active)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(channel.id.to_string())
    .bind(&channel.name)
    .bind(&channel.standby_media_reference)
    .bind(channel.is_special_override as i64)
    .bind(channel.override_active as i64)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

#[async_trait]
impl ProgramRepository for SqliteStore {
    async fn programs_starting_between(
        &self,
        channel_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Program>> {
        let sql = format!(
            "SELECT {PROGRAM_COLUMNS} FROM programs
             WHERE channel_guid = ? AND start_epoch >= ? AND start_epoch < ?
             {PROGRAM_ORDER}"
        );
        let rows = sqlx::query(&sql)
            .bind(channel_id.to_string())
            .bind(from.timestamp())
            .bind(to.timestamp())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(program_from_row).collect()
    }

    async fn programs_overlapping(
        &self,
        channel_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Program>> {
        let sql = format!(
            "SELECT {PROGRAM_COLUMNS} FROM programs
             WHERE channel_guid = ? AND start_epoch < ? AND start_epoch + duration_seconds > ?
             {PROGRAM_ORDER}"
        );
        let rows = sqlx::query(&sql)
            .bind(channel_id.to_string())
            .bind(to.timestamp())
            .bind(from.timestamp())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(program_from_row).collect()
    }

    async fn get(&self, program_id: Uuid) -> Result<Option<Program>> {
        let sql = format!("SELECT {PROGRAM_COLUMNS} FROM programs WHERE guid = ?");
        let row = sqlx::query(&sql)
            .bind(program_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(program_from_row).transpose()
    }

    async fn first_starting_from(&self, channel_id: Uuid, from: DateTime<Utc>) -> Result<Option<Program>> {
        let sql = format!(
            "SELECT {PROGRAM_COLUMNS} FROM programs
             WHERE channel_guid = ? AND start_epoch >= ?
             {PROGRAM_ORDER} LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(channel_id.to_string())
            .bind(from.timestamp())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(program_from_row).transpose()
    }

    async fn insert(&self, program: &Program) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        insert_program_row(&mut *conn, program).await
    }

    async fn update_starts(&self, updates: &[StartUpdate]) -> Result<u64> {
        if updates.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut affected = 0;
        for update in updates {
            let result = sqlx::query(
                "UPDATE programs SET start_epoch = ?, sort_index = ?, updated_at = CURRENT_TIMESTAMP WHERE guid = ?",
            )
            .bind(update.start_instant.timestamp())
            .bind(update.sort_index)
            .bind(update.program_id.to_string())
            .execute(&mut *tx)
            .await?;
            affected += result.rows_affected();
        }
        tx.commit().await?;

        debug!("Updated start of {} programs", affected);
        Ok(affected)
    }

    async fn replace_day(&self, replacement: &DayReplacement) -> Result<u64> {
        let (from, to) = day_window(replacement.day);
        let channel_guid = replacement.channel_id.to_string();

        // Dropping `tx` without commit rolls everything back
        let mut tx = self.pool.begin().await?;

        let cleared = sqlx::query(
            "DELETE FROM programs WHERE channel_guid = ? AND start_epoch >= ? AND start_epoch < ?",
        )
        .bind(&channel_guid)
        .bind(from.timestamp())
        .bind(to.timestamp())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        for row in &replacement.rows {
            sqlx::query("DELETE FROM programs WHERE guid = ? AND channel_guid = ?")
                .bind(row.id.to_string())
                .bind(&channel_guid)
                .execute(&mut *tx)
                .await?;
        }

        let mut inserted = 0;
        for row in &replacement.rows {
            inserted += sqlx::query(
                r#"
                INSERT INTO programs (guid, channel_guid, title, media_reference, start_epoch, duration_seconds, sort_index)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(row.id.to_string())
            .bind(&channel_guid)
            .bind(&row.title)
            .bind(&row.media_reference)
            .bind(row.start_instant.timestamp())
            .bind(row.duration_seconds.max(0))
            .bind(row.sort_index)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        sqlx::query(
            r#"
            INSERT INTO publish_log (channel_guid, day, draft_version, published_count, published_epoch)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&channel_guid)
        .bind(replacement.day.to_string())
        .bind(replacement.draft_version)
        .bind(inserted as i64)
        .bind(replacement.published_at.timestamp())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(
            "Replaced {} live rows with {} for channel {} on {}",
            cleared, inserted, replacement.channel_id, replacement.day
        );
        Ok(inserted)
    }
}

#[async_trait]
impl ChannelRepository for SqliteStore {
    async fn get(&self, channel_id: Uuid) -> Result<Option<Channel>> {
        let row = sqlx::query(
            "SELECT guid, name, standby_media_reference, is_special_override, override_active
             FROM channels WHERE guid = ?",
        )
        .bind(channel_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(channel_from_row).transpose()
    }

    async fn list(&self) -> Result<Vec<Channel>> {
        let rows = sqlx::query(
            "SELECT guid, name, standby_media_reference, is_special_override, override_active
             FROM channels ORDER BY name, guid",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(channel_from_row).collect()
    }

    async fn insert(&self, channel: &Channel) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        insert_channel_row(&mut *conn, channel).await
    }

    async fn insert_batch(&self, channels: &[Channel], programs: &[Program]) -> Result<()> {
        // Dropping `tx` without commit rolls everything back
        let mut tx = self.pool.begin().await?;
        for channel in channels {
            insert_channel_row(&mut *tx, channel).await?;
        }
        for program in programs {
            insert_program_row(&mut *tx, program).await?;
        }
        tx.commit().await?;

        debug!("Inserted {} channels and {} programs", channels.len(), programs.len());
        Ok(())
    }

    async fn set_override_active(&self, channel_id: Uuid, active: bool) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE channels SET override_active = ?, updated_at = CURRENT_TIMESTAMP WHERE guid = ?",
        )
        .bind(active as i64)
        .bind(channel_id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl DraftRepository for SqliteStore {
    async fn current(&self, channel_id: Uuid, day: NaiveDate) -> Result<Option<DraftSnapshot>> {
        let head = sqlx::query(
            r#"
            SELECT id, version, base_epoch, saved_epoch FROM draft_snapshots
            WHERE channel_guid = ? AND day = ?
            ORDER BY version DESC LIMIT 1
            "#,
        )
        .bind(channel_id.to_string())
        .bind(day.to_string())
        .fetch_optional(&self.pool)
        .await?;

        let Some(head) = head else {
            return Ok(None);
        };

        let snapshot_id: i64 = head.get("id");
        let rows = sqlx::query(
            r#"
            SELECT position, program_guid, title, media_reference, start_epoch, duration_seconds
            FROM draft_programs WHERE snapshot_id = ? ORDER BY position
            "#,
        )
        .bind(snapshot_id)
        .fetch_all(&self.pool)
        .await?;

        let rows = rows
            .iter()
            .map(|row| {
                Ok(DraftProgram {
                    program_id: parse_guid(&row.get::<String, _>("program_guid"))?,
                    channel_id,
                    day,
                    title: row.get("title"),
                    media_reference: row.get("media_reference"),
                    start_instant: parse_epoch(row.get("start_epoch"))?,
                    duration_seconds: row.get("duration_seconds"),
                    sort_index: row.get("position"),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(DraftSnapshot {
            channel_id,
            day,
            version: head.get("version"),
            base_instant: parse_epoch(head.get("base_epoch"))?,
            saved_at: parse_epoch(head.get("saved_epoch"))?,
            rows,
        }))
    }

    async fn save(&self, draft: &NewDraft) -> Result<i64> {
        let channel_guid = draft.channel_id.to_string();
        let day = draft.day.to_string();

        let mut tx = self.pool.begin().await?;

        let version: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(version), 0) + 1 FROM draft_snapshots WHERE channel_guid = ? AND day = ?",
        )
        .bind(&channel_guid)
        .bind(&day)
        .fetch_one(&mut *tx)
        .await?;

        let snapshot_id = sqlx::query(
            r#"
            INSERT INTO draft_snapshots (channel_guid, day, version, base_epoch, saved_epoch)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&channel_guid)
        .bind(&day)
        .bind(version)
        .bind(draft.base_instant.timestamp())
        .bind(draft.saved_at.timestamp())
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        for (position, row) in draft.rows.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO draft_programs (snapshot_id, position, program_guid, title, media_reference, start_epoch, duration_seconds)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(snapshot_id)
            .bind(position as i64)
            .bind(row.program_id.to_string())
            .bind(&row.title)
            .bind(&row.media_reference)
            .bind(row.start_instant.timestamp())
            .bind(row.duration_seconds.max(0))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(version)
    }

    async fn version_count(&self, channel_id: Uuid, day: NaiveDate) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM draft_snapshots WHERE channel_guid = ? AND day = ?",
        )
        .bind(channel_id.to_string())
        .bind(day.to_string())
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn publish_history(&self, channel_id: Uuid, day: NaiveDate) -> Result<Vec<PublishRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT day, draft_version, published_count, published_epoch FROM publish_log
            WHERE channel_guid = ? AND day = ? ORDER BY id
            "#,
        )
        .bind(channel_id.to_string())
        .bind(day.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(PublishRecord {
                    channel_id,
                    day: parse_stored_day(&row.get::<String, _>("day"))?,
                    draft_version: row.get("draft_version"),
                    published_count: row.get::<i64, _>("published_count").max(0) as u64,
                    published_at: parse_epoch(row.get("published_epoch"))?,
                })
            })
            .collect()
    }
}
