//! Timestamp normalization
//!
//! Every timestamp that enters the engine passes through [`normalize_timestamp`]
//! before it is compared with anything. Schedules arrive from several admin
//! tools, each with its own idea of what a timestamp looks like:
//!
//! - RFC 3339 / ISO-8601 with a zone suffix (`2025-01-06T00:00:00Z`)
//! - ISO-8601 without a zone (`2025-01-06T00:00:00`, read as UTC)
//! - space separated `date time` with optional fraction (`2025-01-06 00:00:00.250`, read as UTC)
//! - explicit numeric offsets (`2025-01-06 02:00:00+02:00`, `+0200`, `+02`)
//! - UNIX epoch seconds (`1736121600`)
//!
//! The result is a tagged [`NormalizedTime`]. Parsing never fails loudly;
//! callers treat [`NormalizedTime::Invalid`] as "no active window".
//!
//! Canonical instants carry whole seconds only. The canonical text form is
//! RFC 3339 with a `Z` suffix, and normalizing it yields the same instant.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Formats carrying an explicit numeric offset
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%#z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%#z",
    "%Y-%m-%d %H:%M:%S%.f %:z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%d %H:%M:%S%.f %#z",
];

/// Zone-less formats, interpreted as UTC
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Suffixes meaning "this is UTC" on otherwise zone-less text
const UTC_SUFFIXES: &[&str] = &[" UTC", "UTC", "Z", "z"];

/// Outcome of timestamp normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NormalizedTime {
    /// Canonical UTC instant (whole seconds)
    Valid(DateTime<Utc>),
    /// Input could not be interpreted as a timestamp
    Invalid,
}

impl NormalizedTime {
    /// The instant, if valid
    pub fn instant(self) -> Option<DateTime<Utc>> {
        match self {
            NormalizedTime::Valid(instant) => Some(instant),
            NormalizedTime::Invalid => None,
        }
    }

    pub fn is_valid(self) -> bool {
        matches!(self, NormalizedTime::Valid(_))
    }
}

impl From<Option<DateTime<Utc>>> for NormalizedTime {
    fn from(value: Option<DateTime<Utc>>) -> Self {
        match value {
            Some(instant) => NormalizedTime::Valid(normalize_instant(instant)),
            None => NormalizedTime::Invalid,
        }
    }
}

impl From<DateTime<Utc>> for NormalizedTime {
    fn from(instant: DateTime<Utc>) -> Self {
        NormalizedTime::Valid(normalize_instant(instant))
    }
}

/// A timestamp as it arrives over JSON: epoch seconds or text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimestampInput {
    /// UNIX epoch seconds
    Epoch(i64),
    /// Any supported text encoding
    Text(String),
}

impl TimestampInput {
    pub fn normalize(&self) -> NormalizedTime {
        match self {
            TimestampInput::Epoch(secs) => normalize_epoch(*secs),
            TimestampInput::Text(raw) => normalize_timestamp(raw),
        }
    }
}

impl From<DateTime<Utc>> for TimestampInput {
    fn from(instant: DateTime<Utc>) -> Self {
        TimestampInput::Text(canonical(instant))
    }
}

/// Normalize a timestamp string into a canonical UTC instant
///
/// # Examples
///
/// ```
/// use chanplay_common::time::{canonical, normalize_timestamp};
///
/// let a = normalize_timestamp("2025-01-06 02:00:00+02:00").instant().unwrap();
/// let b = normalize_timestamp("2025-01-06T00:00:00Z").instant().unwrap();
/// assert_eq!(a, b);
/// assert_eq!(canonical(a), "2025-01-06T00:00:00Z");
/// assert!(!normalize_timestamp("next tuesday").is_valid());
/// ```
pub fn normalize_timestamp(raw: &str) -> NormalizedTime {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return NormalizedTime::Invalid;
    }

    if is_epoch_text(trimmed) {
        return match trimmed.parse::<i64>() {
            Ok(secs) => normalize_epoch(secs),
            Err(_) => NormalizedTime::Invalid,
        };
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return NormalizedTime::from(Some(parsed.with_timezone(&Utc)));
    }

    for format in OFFSET_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(trimmed, format) {
            return NormalizedTime::from(Some(parsed.with_timezone(&Utc)));
        }
    }

    let zoneless = strip_utc_suffix(trimmed);
    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(zoneless, format) {
            return NormalizedTime::from(Some(parsed.and_utc()));
        }
    }

    NormalizedTime::Invalid
}

/// Normalize UNIX epoch seconds
pub fn normalize_epoch(secs: i64) -> NormalizedTime {
    DateTime::<Utc>::from_timestamp(secs, 0).into()
}

/// Drop sub-second precision so the instant is canonical
pub fn normalize_instant(instant: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(instant.timestamp(), 0).unwrap_or(instant)
}

/// Canonical text form of an instant
pub fn canonical(instant: DateTime<Utc>) -> String {
    normalize_instant(instant).to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a UTC calendar day (`YYYY-MM-DD`)
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// Parse a UTC time of day (`HH:MM` or `HH:MM:SS`)
pub fn parse_time_of_day(raw: &str) -> Option<NaiveTime> {
    let trimmed = raw.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M"))
        .ok()
}

/// Start of a UTC calendar day
pub fn day_start(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

/// Half-open window `[day 00:00:00Z, next day 00:00:00Z)`
pub fn day_window(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = day_start(day);
    (start, start + TimeDelta::days(1))
}

/// Chaining base for a day: midnight UTC unless a time of day is supplied
pub fn base_instant(day: NaiveDate, time_of_day: Option<NaiveTime>) -> DateTime<Utc> {
    let base = day.and_time(time_of_day.unwrap_or(NaiveTime::MIN)).and_utc();
    normalize_instant(base)
}

fn is_epoch_text(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn strip_utc_suffix(text: &str) -> &str {
    for suffix in UTC_SUFFIXES {
        if let Some(stripped) = text.strip_suffix(suffix) {
            return stripped.trim_end();
        }
    }
    text
}
