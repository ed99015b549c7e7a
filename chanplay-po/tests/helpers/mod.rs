//! Shared fixtures for chanplay-po integration tests
//!
//! Every harness owns a fresh SQLite file in a temp directory and a
//! `FixedClock`, so tests never depend on wall-clock time.

#![allow(dead_code)]

use chanplay_common::config::PlayoutConfig;
use chanplay_common::db::{init_database, Channel, Program};
use chanplay_po::clock::FixedClock;
use chanplay_po::PlayoutService;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

pub struct TestHarness {
    pub service: Arc<PlayoutService>,
    pub clock: Arc<FixedClock>,
    pub pool: SqlitePool,
    _dir: TempDir,
}

impl TestHarness {
    pub async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("chanplay.db")).await.unwrap();
        let clock = Arc::new(FixedClock::new(at(0, 0, 0)));
        let service = Arc::new(PlayoutService::sqlite(
            pool.clone(),
            clock.clone(),
            &PlayoutConfig::default(),
        ));
        Self {
            service,
            clock,
            pool,
            _dir: dir,
        }
    }

    pub async fn channel(&self, name: &str) -> Channel {
        let channel = Channel::new(name, format!("standby/{name}.m3u8"));
        self.service.create_channel(&channel).await.unwrap();
        channel
    }

    pub async fn override_channel(&self, name: &str) -> Channel {
        let mut channel = Channel::new(name, format!("standby/{name}.m3u8"));
        channel.is_special_override = true;
        self.service.create_channel(&channel).await.unwrap();
        channel
    }

    pub async fn program(&self, channel_id: Uuid, title: &str, start: DateTime<Utc>, duration_seconds: i64) -> Program {
        let program = Program {
            id: Uuid::new_v4(),
            channel_id,
            title: title.to_string(),
            media_reference: format!("media/{title}.mp4"),
            start_instant: start,
            duration_seconds,
            sort_index: None,
        };
        self.service.add_program(&program).await.unwrap();
        program
    }

    /// Live rows of a channel, ordered by start
    pub async fn live_rows(&self, channel_id: Uuid) -> Vec<(String, i64, i64)> {
        sqlx::query_as::<_, (String, i64, i64)>(
            "SELECT title, start_epoch, duration_seconds FROM programs
             WHERE channel_guid = ? ORDER BY start_epoch, sort_index IS NULL, sort_index, guid",
        )
        .bind(channel_id.to_string())
        .fetch_all(&self.pool)
        .await
        .unwrap()
    }
}

/// The test day
pub fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 6).unwrap()
}

/// Instant on the test day
pub fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 6, h, m, s).unwrap()
}
