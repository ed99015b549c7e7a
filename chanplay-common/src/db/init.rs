//! Database initialization
//!
//! Creates the database on first run and brings the schema up to date.
//! Every statement is idempotent, so opening an existing database runs the
//! same path.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Current schema version recorded in `schema_version`
pub const SCHEMA_VERSION: i64 = 1;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL lets viewers keep reading the last committed schedule while a
    // publish transaction is open
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables and indexes (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_channels_table(pool).await?;
    create_programs_table(pool).await?;
    create_draft_tables(pool).await?;
    create_publish_log_table(pool).await?;

    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(SCHEMA_VERSION)
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_channels_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS channels (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            standby_media_reference TEXT NOT NULL DEFAULT '',
            is_special_override INTEGER NOT NULL DEFAULT 0,
            override_active INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Live programs; start times are UNIX epoch seconds
async fn create_programs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS programs (
            guid TEXT PRIMARY KEY,
            channel_guid TEXT NOT NULL REFERENCES channels(guid) ON DELETE CASCADE,
            title TEXT NOT NULL,
            media_reference TEXT NOT NULL,
            start_epoch INTEGER NOT NULL,
            duration_seconds INTEGER NOT NULL DEFAULT 0 CHECK (duration_seconds >= 0),
            sort_index INTEGER,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_programs_channel_start ON programs(channel_guid, start_epoch)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Versioned draft snapshots; the highest version of a key is current
async fn create_draft_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS draft_snapshots (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            channel_guid TEXT NOT NULL REFERENCES channels(guid) ON DELETE CASCADE,
            day TEXT NOT NULL,
            version INTEGER NOT NULL,
            base_epoch INTEGER NOT NULL,
            saved_epoch INTEGER NOT NULL,
            UNIQUE (channel_guid, day, version)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS draft_programs (
            snapshot_id INTEGER NOT NULL REFERENCES draft_snapshots(id) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            program_guid TEXT NOT NULL,
            title TEXT NOT NULL,
            media_reference TEXT NOT NULL,
            start_epoch INTEGER NOT NULL,
            duration_seconds INTEGER NOT NULL DEFAULT 0 CHECK (duration_seconds >= 0),
            PRIMARY KEY (snapshot_id, position)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_publish_log_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS publish_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            channel_guid TEXT NOT NULL,
            day TEXT NOT NULL,
            draft_version INTEGER NOT NULL,
            published_count INTEGER NOT NULL,
            published_epoch INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
