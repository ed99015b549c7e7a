//! Bulk import of channels and programs from JSON
//!
//! Programs name their channel by id or by name. Starts and durations are
//! raw collaborator data and go through the normalization boundary; programs
//! whose start cannot be normalized are skipped and counted. Everything that
//! survives is written in one transaction: a failed import leaves the
//! database untouched.

use crate::error::{Error, Result};
use crate::schedule::{ProgramInput, RejectedProgram, ScheduleIndex};
use crate::service::PlayoutService;
use chanplay_common::db::Channel;
use chanplay_common::{DurationInput, TimestampInput};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportFile {
    #[serde(default)]
    pub channels: Vec<ChannelRecord>,
    #[serde(default)]
    pub programs: Vec<ProgramRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelRecord {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub name: String,
    pub standby_media_reference: String,
    #[serde(default)]
    pub is_special_override: bool,
    #[serde(default)]
    pub override_active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProgramRecord {
    #[serde(default)]
    pub id: Option<Uuid>,
    /// Channel id or channel name
    pub channel: String,
    pub title: String,
    pub media_reference: String,
    pub start: TimestampInput,
    pub duration: DurationInput,
    #[serde(default)]
    pub sort_index: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub channels_created: usize,
    pub programs_imported: usize,
    pub rejected: Vec<RejectedProgram>,
    /// Programs naming a channel that does not exist
    pub unknown_channel: Vec<String>,
    /// Overlapping program pairs, by title
    pub overlaps: Vec<(String, String)>,
}

impl ImportFile {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::InvalidInput(format!("import file: {e}")))
    }

    pub async fn read(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(chanplay_common::Error::from)?;
        Self::from_json(&text)
    }
}

/// Create channels and programs through `service`
pub async fn import(service: &PlayoutService, file: ImportFile) -> Result<ImportReport> {
    let mut report = ImportReport::default();

    let channels: Vec<Channel> = file
        .channels
        .into_iter()
        .map(|record| {
            let mut channel = Channel::new(record.name, record.standby_media_reference);
            if let Some(id) = record.id {
                channel.id = id;
            }
            channel.is_special_override = record.is_special_override;
            channel.override_active = record.override_active;
            channel
        })
        .collect();

    let mut by_name: HashMap<String, Uuid> = HashMap::new();
    for channel in service.list_channels().await?.iter().chain(&channels) {
        by_name.insert(channel.name.clone(), channel.id);
    }

    let mut inputs = Vec::with_capacity(file.programs.len());
    for record in file.programs {
        let channel_id = match Uuid::parse_str(&record.channel) {
            Ok(id) if by_name.values().any(|known| *known == id) => id,
            _ => match by_name.get(&record.channel) {
                Some(id) => *id,
                None => {
                    warn!("Skipping '{}': unknown channel '{}'", record.title, record.channel);
                    report.unknown_channel.push(record.title);
                    continue;
                }
            },
        };

        inputs.push(ProgramInput {
            id: record.id,
            channel_id,
            title: record.title,
            media_reference: record.media_reference,
            start: record.start,
            duration: record.duration,
            sort_index: record.sort_index,
        });
    }

    let (index, rejected) = ScheduleIndex::from_inputs(inputs);
    for reject in &rejected {
        warn!("Skipping '{}': {}", reject.title, reject.reason);
    }
    report.rejected = rejected;

    let mut programs = Vec::new();
    for schedule in index.channels() {
        for (a, b) in schedule.overlaps() {
            warn!(
                "Channel {}: '{}' overlaps '{}'",
                schedule.channel_id(),
                a.title,
                b.title
            );
            report.overlaps.push((a.title.clone(), b.title.clone()));
        }
        programs.extend(schedule.programs().iter().cloned());
    }

    service.import_batch(&channels, &programs).await?;
    report.channels_created = channels.len();
    report.programs_imported = programs.len();

    info!(
        "Imported {} channels and {} programs ({} rejected, {} with unknown channel)",
        report.channels_created,
        report.programs_imported,
        report.rejected.len(),
        report.unknown_channel.len()
    );
    Ok(report)
}
