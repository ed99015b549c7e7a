//! Database models

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A channel and its fallback configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: Uuid,
    pub name: String,
    /// Loop played when nothing is scheduled
    pub standby_media_reference: String,
    /// Channel may be taken over by a live feed
    pub is_special_override: bool,
    /// Live feed is currently broadcasting
    pub override_active: bool,
}

impl Channel {
    pub fn new(name: impl Into<String>, standby_media_reference: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            standby_media_reference: standby_media_reference.into(),
            is_special_override: false,
            override_active: false,
        }
    }

    /// Live override takes the air only when both flags are set
    pub fn live_override_engaged(&self) -> bool {
        self.is_special_override && self.override_active
    }
}

/// A live, viewer-visible scheduled program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub id: Uuid,
    pub channel_id: Uuid,
    pub title: String,
    /// Opaque media locator
    pub media_reference: String,
    pub start_instant: DateTime<Utc>,
    pub duration_seconds: i64,
    pub sort_index: Option<i64>,
}

impl Program {
    /// Exclusive end of the program's window
    pub fn end_instant(&self) -> DateTime<Utc> {
        offset_instant(self.start_instant, self.duration_seconds)
    }

    /// Only programs with a positive duration can fill air time
    pub fn is_schedulable(&self) -> bool {
        self.duration_seconds > 0
    }
}

/// A staged program, keyed by (channel, day), invisible until published
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftProgram {
    /// Id the row will carry once published
    pub program_id: Uuid,
    pub channel_id: Uuid,
    pub day: NaiveDate,
    pub title: String,
    pub media_reference: String,
    pub start_instant: DateTime<Utc>,
    pub duration_seconds: i64,
    /// Position in the intended running order
    pub sort_index: i64,
}

impl DraftProgram {
    /// Copy a live program into a draft of `day`
    pub fn from_program(program: &Program, day: NaiveDate, sort_index: i64) -> Self {
        Self {
            program_id: program.id,
            channel_id: program.channel_id,
            day,
            title: program.title.clone(),
            media_reference: program.media_reference.clone(),
            start_instant: program.start_instant,
            duration_seconds: program.duration_seconds,
            sort_index,
        }
    }

    /// Materialize as a live program row
    pub fn to_program(&self) -> Program {
        Program {
            id: self.program_id,
            channel_id: self.channel_id,
            title: self.title.clone(),
            media_reference: self.media_reference.clone(),
            start_instant: self.start_instant,
            duration_seconds: self.duration_seconds,
            sort_index: Some(self.sort_index),
        }
    }
}

/// One stored version of a (channel, day) draft
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftSnapshot {
    pub channel_id: Uuid,
    pub day: NaiveDate,
    pub version: i64,
    pub base_instant: DateTime<Utc>,
    pub saved_at: DateTime<Utc>,
    pub rows: Vec<DraftProgram>,
}

/// Audit record of a publish
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishRecord {
    pub channel_id: Uuid,
    pub day: NaiveDate,
    pub draft_version: i64,
    pub published_count: u64,
    pub published_at: DateTime<Utc>,
}

/// `instant + seconds`, saturating at the end of representable time
pub fn offset_instant(instant: DateTime<Utc>, seconds: i64) -> DateTime<Utc> {
    TimeDelta::try_seconds(seconds)
        .and_then(|delta| instant.checked_add_signed(delta))
        .unwrap_or(if seconds < 0 {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn program(duration_seconds: i64) -> Program {
        Program {
            id: Uuid::new_v4(),
            channel_id: Uuid::new_v4(),
            title: "News".to_string(),
            media_reference: "media/news.m3u8".to_string(),
            start_instant: Utc.with_ymd_and_hms(2025, 1, 6, 10, 0, 0).unwrap(),
            duration_seconds,
            sort_index: None,
        }
    }

    #[test]
    fn test_end_instant() {
        let p = program(600);
        assert_eq!(p.end_instant(), Utc.with_ymd_and_hms(2025, 1, 6, 10, 10, 0).unwrap());
        assert!(p.is_schedulable());
    }

    #[test]
    fn test_zero_duration_is_tolerated() {
        let p = program(0);
        assert_eq!(p.end_instant(), p.start_instant);
        assert!(!p.is_schedulable());
    }

    #[test]
    fn test_huge_duration_saturates() {
        let p = program(i64::MAX);
        assert_eq!(p.end_instant(), DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn test_draft_roundtrip_keeps_identity() {
        let p = program(1800);
        let day = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        let draft = DraftProgram::from_program(&p, day, 3);
        let back = draft.to_program();
        assert_eq!(back.id, p.id);
        assert_eq!(back.start_instant, p.start_instant);
        assert_eq!(back.sort_index, Some(3));
    }

    #[test]
    fn test_override_requires_both_flags() {
        let mut c = Channel::new("Live", "standby/loop.mp4");
        c.override_active = true;
        assert!(!c.live_override_engaged());
        c.is_special_override = true;
        assert!(c.live_override_engaged());
    }
}
