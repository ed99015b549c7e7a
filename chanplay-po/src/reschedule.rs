//! Reschedule: chain a day's live programs from a base instant
//!
//! A day's programs are those whose current start lies in
//! `[day 00:00:00Z, day+1 00:00:00Z)`, taken in canonical schedule order.
//! Applying writes the chained starts and pins the running order by
//! rewriting `sort_index` to each program's position, so a second apply over
//! the same day reproduces the same starts.

use crate::error::{Error, Result};
use crate::repository::{ChannelRepository, ProgramRepository, StartUpdate};
use crate::schedule::{chain_starts, schedule_order, ChainError};
use chanplay_common::db::Program;
use chanplay_common::time::{base_instant, day_window};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Which channels an apply touches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RescheduleTarget {
    Channel(Uuid),
    All,
}

/// One program's old and would-be start
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RescheduleRow {
    pub program: Program,
    pub old_start: DateTime<Utc>,
    pub new_start: DateTime<Utc>,
    pub changed: bool,
}

/// Per-channel result of an apply
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelOutcome {
    pub channel_id: Uuid,
    pub affected: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RescheduleReport {
    pub day: NaiveDate,
    pub base_instant: DateTime<Utc>,
    /// Programs whose start changed, summed over channels
    pub affected: u64,
    pub channels: Vec<ChannelOutcome>,
}

impl RescheduleReport {
    pub fn failed(&self) -> impl Iterator<Item = &ChannelOutcome> {
        self.channels.iter().filter(|c| c.error.is_some())
    }
}

/// Chained starts for `programs` from `base`, in schedule order
pub fn plan(mut programs: Vec<Program>, base: DateTime<Utc>) -> std::result::Result<Vec<RescheduleRow>, ChainError> {
    programs.sort_by(schedule_order);
    let starts = chain_starts(base, programs.iter().map(|p| p.duration_seconds))?;

    Ok(programs
        .into_iter()
        .zip(starts)
        .map(|(program, new_start)| RescheduleRow {
            old_start: program.start_instant,
            changed: program.start_instant != new_start,
            new_start,
            program,
        })
        .collect())
}

/// Preview/apply over the program and channel repositories
#[derive(Clone)]
pub struct Rescheduler {
    programs: Arc<dyn ProgramRepository>,
    channels: Arc<dyn ChannelRepository>,
}

impl Rescheduler {
    pub fn new(programs: Arc<dyn ProgramRepository>, channels: Arc<dyn ChannelRepository>) -> Self {
        Self { programs, channels }
    }

    /// Would-be starts for one channel's day; nothing is written
    pub async fn preview(
        &self,
        channel_id: Uuid,
        day: NaiveDate,
        time_of_day: Option<NaiveTime>,
    ) -> Result<Vec<RescheduleRow>> {
        self.require_channel(channel_id).await?;
        self.plan_day(channel_id, day, base_instant(day, time_of_day))
            .await
    }

    /// Persist the chain for one channel or every channel
    ///
    /// A single-channel apply returns its error. For [`RescheduleTarget::All`]
    /// each channel is processed on its own and failures are reported in the
    /// outcome list without stopping the rest.
    pub async fn apply(
        &self,
        target: RescheduleTarget,
        day: NaiveDate,
        time_of_day: Option<NaiveTime>,
    ) -> Result<RescheduleReport> {
        let base = base_instant(day, time_of_day);

        let channels = match target {
            RescheduleTarget::Channel(channel_id) => {
                self.require_channel(channel_id).await?;
                let affected = self.apply_channel(channel_id, day, base).await?;
                vec![ChannelOutcome {
                    channel_id,
                    affected,
                    error: None,
                }]
            }
            RescheduleTarget::All => {
                let mut outcomes = Vec::new();
                for channel in self.channels.list().await? {
                    let outcome = match self.apply_channel(channel.id, day, base).await {
                        Ok(affected) => ChannelOutcome {
                            channel_id: channel.id,
                            affected,
                            error: None,
                        },
                        Err(e) => {
                            warn!(
                                "Reschedule of channel {} ({}) on {} failed: {}",
                                channel.name, channel.id, day, e
                            );
                            ChannelOutcome {
                                channel_id: channel.id,
                                affected: 0,
                                error: Some(e.to_string()),
                            }
                        }
                    };
                    outcomes.push(outcome);
                }
                outcomes
            }
        };

        let affected = channels.iter().map(|c| c.affected).sum();
        info!(
            "Rescheduled {} programs on {} from {} across {} channels",
            affected,
            day,
            base,
            channels.len()
        );

        Ok(RescheduleReport {
            day,
            base_instant: base,
            affected,
            channels,
        })
    }

    async fn apply_channel(&self, channel_id: Uuid, day: NaiveDate, base: DateTime<Utc>) -> Result<u64> {
        let rows = self.plan_day(channel_id, day, base).await?;

        let updates: Vec<StartUpdate> = rows
            .iter()
            .enumerate()
            .filter(|(position, row)| row.changed || row.program.sort_index != Some(*position as i64))
            .map(|(position, row)| StartUpdate {
                program_id: row.program.id,
                start_instant: row.new_start,
                sort_index: position as i64,
            })
            .collect();

        self.programs.update_starts(&updates).await?;
        Ok(rows.iter().filter(|row| row.changed).count() as u64)
    }

    async fn plan_day(&self, channel_id: Uuid, day: NaiveDate, base: DateTime<Utc>) -> Result<Vec<RescheduleRow>> {
        let (from, to) = day_window(day);
        let programs = self
            .programs
            .programs_starting_between(channel_id, from, to)
            .await?;
        Ok(plan(programs, base)?)
    }

    async fn require_channel(&self, channel_id: Uuid) -> Result<()> {
        match self.channels.get(channel_id).await? {
            Some(_) => Ok(()),
            None => Err(Error::ChannelNotFound(channel_id)),
        }
    }
}
