//! Per-channel, time-ordered schedule view
//!
//! Raw program inputs are normalized here (timestamps through the time
//! normalizer, durations through the duration resolver) before anything is
//! ordered or compared. Inputs whose start cannot be normalized are rejected,
//! never guessed.

use super::resolver::{resolve_active, ActiveWindow, ScheduleWindow};
use chanplay_common::db::Program;
use chanplay_common::time::day_window;
use chanplay_common::{DurationInput, TimestampInput};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Canonical schedule order: start, then sort_index (missing last), then id
pub fn schedule_order(a: &Program, b: &Program) -> Ordering {
    a.start_instant
        .cmp(&b.start_instant)
        .then_with(|| match (a.sort_index, b.sort_index) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.id.cmp(&b.id))
}

/// A program as supplied by an external collaborator, before normalization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramInput {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub channel_id: Uuid,
    pub title: String,
    pub media_reference: String,
    pub start: TimestampInput,
    pub duration: DurationInput,
    #[serde(default)]
    pub sort_index: Option<i64>,
}

/// An input that could not become a program
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedProgram {
    pub title: String,
    pub channel_id: Uuid,
    pub reason: String,
}

impl ProgramInput {
    pub fn normalize(self) -> Result<Program, RejectedProgram> {
        let Some(start_instant) = self.start.normalize().instant() else {
            return Err(RejectedProgram {
                reason: format!("unparseable start {:?}", self.start),
                title: self.title,
                channel_id: self.channel_id,
            });
        };

        Ok(Program {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            channel_id: self.channel_id,
            title: self.title,
            media_reference: self.media_reference,
            start_instant,
            duration_seconds: self.duration.resolve(),
            sort_index: self.sort_index,
        })
    }
}

/// One channel's programs in canonical order
#[derive(Debug, Clone, Default)]
pub struct ChannelSchedule {
    channel_id: Uuid,
    programs: Vec<Program>,
}

impl ChannelSchedule {
    /// Build from programs of `channel_id`; programs of other channels are dropped
    pub fn new(channel_id: Uuid, programs: Vec<Program>) -> Self {
        let mut programs: Vec<Program> = programs
            .into_iter()
            .filter(|p| p.channel_id == channel_id)
            .collect();
        programs.sort_by(schedule_order);
        Self {
            channel_id,
            programs,
        }
    }

    pub fn channel_id(&self) -> Uuid {
        self.channel_id
    }

    pub fn programs(&self) -> &[Program] {
        &self.programs
    }

    pub fn into_programs(self) -> Vec<Program> {
        self.programs
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Programs whose start lies in `[from, to)`
    pub fn starting_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> &[Program] {
        let lo = self.programs.partition_point(|p| p.start_instant < from);
        let hi = self.programs.partition_point(|p| p.start_instant < to);
        &self.programs[lo..hi.max(lo)]
    }

    /// Programs starting on a UTC calendar day
    pub fn on_day(&self, day: NaiveDate) -> &[Program] {
        let (from, to) = day_window(day);
        self.starting_between(from, to)
    }

    /// Active and next program at `now`
    pub fn resolve(&self, now: DateTime<Utc>) -> ActiveWindow<'_> {
        resolve_active(&self.programs, now)
    }

    /// Pairs of programs whose plain (un-widened) windows overlap
    pub fn overlaps(&self) -> Vec<(&Program, &Program)> {
        let mut pairs = Vec::new();
        for (i, a) in self.programs.iter().enumerate() {
            let wa = ScheduleWindow::of(a);
            for b in &self.programs[i + 1..] {
                if b.start_instant >= wa.end {
                    break;
                }
                if wa.overlaps(&ScheduleWindow::of(b)) {
                    pairs.push((a, b));
                }
            }
        }
        pairs
    }
}

/// Schedules of many channels
#[derive(Debug, Clone, Default)]
pub struct ScheduleIndex {
    channels: BTreeMap<Uuid, ChannelSchedule>,
}

impl ScheduleIndex {
    pub fn from_programs(programs: impl IntoIterator<Item = Program>) -> Self {
        let mut grouped: BTreeMap<Uuid, Vec<Program>> = BTreeMap::new();
        for program in programs {
            grouped.entry(program.channel_id).or_default().push(program);
        }
        let channels = grouped
            .into_iter()
            .map(|(channel_id, programs)| (channel_id, ChannelSchedule::new(channel_id, programs)))
            .collect();
        Self { channels }
    }

    /// Normalize raw inputs; unparseable ones are returned separately
    pub fn from_inputs(inputs: impl IntoIterator<Item = ProgramInput>) -> (Self, Vec<RejectedProgram>) {
        let mut accepted = Vec::new();
        let mut rejected = Vec::new();
        for input in inputs {
            match input.normalize() {
                Ok(program) => accepted.push(program),
                Err(reject) => rejected.push(reject),
            }
        }
        (Self::from_programs(accepted), rejected)
    }

    pub fn channel(&self, channel_id: Uuid) -> Option<&ChannelSchedule> {
        self.channels.get(&channel_id)
    }

    pub fn channels(&self) -> impl Iterator<Item = &ChannelSchedule> {
        self.channels.values()
    }

    pub fn program_count(&self) -> usize {
        self.channels.values().map(ChannelSchedule::len).sum()
    }
}
