//! Duration resolution
//!
//! Program durations come in as integer or float seconds, clock text
//! (`HH:MM:SS`, `MM:SS`) or free text with a number in it (`"1800 sec"`).
//! Everything resolves to non-negative whole seconds; anything unparseable or
//! negative resolves to 0.
//!
//! A 0-second program can never be the active match on duration alone. It can
//! still resolve as active near its start through the resolver's grace period,
//! and that is intended.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static CLOCK_HMS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+):(\d{1,2}):(\d{1,2})(?:\.\d+)?$").expect("valid regex"));
static CLOCK_MS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+):(\d{1,2})(?:\.\d+)?$").expect("valid regex"));
static EMBEDDED_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("valid regex"));

/// A duration as it arrives over JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DurationInput {
    Seconds(i64),
    Fractional(f64),
    Text(String),
}

impl DurationInput {
    /// Resolve to whole, non-negative seconds
    pub fn resolve(&self) -> i64 {
        match self {
            DurationInput::Seconds(secs) => (*secs).max(0),
            DurationInput::Fractional(secs) => resolve_fractional(*secs),
            DurationInput::Text(raw) => resolve_duration_text(raw),
        }
    }
}

impl From<i64> for DurationInput {
    fn from(secs: i64) -> Self {
        DurationInput::Seconds(secs)
    }
}

impl From<&str> for DurationInput {
    fn from(raw: &str) -> Self {
        DurationInput::Text(raw.to_string())
    }
}

/// Float seconds, truncated toward zero
pub fn resolve_fractional(secs: f64) -> i64 {
    if !secs.is_finite() || secs <= 0.0 {
        return 0;
    }
    // `as` saturates at i64::MAX
    secs.trunc() as i64
}

/// Resolve a textual duration
///
/// ```
/// use chanplay_common::duration::resolve_duration_text;
///
/// assert_eq!(resolve_duration_text("01:30:00"), 5400);
/// assert_eq!(resolve_duration_text("12:05"), 725);
/// assert_eq!(resolve_duration_text("about 90 seconds"), 90);
/// assert_eq!(resolve_duration_text("n/a"), 0);
/// ```
pub fn resolve_duration_text(raw: &str) -> i64 {
    let text = raw.trim();
    if text.is_empty() {
        return 0;
    }

    if let Some(caps) = CLOCK_HMS.captures(text) {
        return clock_seconds(&[&caps[1], &caps[2], &caps[3]]);
    }
    if let Some(caps) = CLOCK_MS.captures(text) {
        return clock_seconds(&[&caps[1], &caps[2]]);
    }

    match EMBEDDED_NUMBER.find(text) {
        Some(found) => found
            .as_str()
            .parse::<f64>()
            .map(resolve_fractional)
            .unwrap_or(0),
        None => 0,
    }
}

/// Render seconds as `H:MM:SS`
pub fn format_clock(seconds: i64) -> String {
    let secs = seconds.max(0);
    format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

fn clock_seconds(parts: &[&str]) -> i64 {
    let mut total: i64 = 0;
    for part in parts {
        let Ok(value) = part.parse::<i64>() else {
            return 0;
        };
        total = total.saturating_mul(60).saturating_add(value);
    }
    total
}
