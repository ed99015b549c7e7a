//! Active / next program resolution
//!
//! A program's window is the half-open interval `[start, start + duration)`.
//! For matching "now" it is widened by [`GRACE_PERIOD_SECS`] on both edges,
//! so a player polling slightly early or late still lands on the intended
//! program.
//!
//! When windows overlap (possible after manual edits) the earliest-starting
//! qualifying window wins. There is no secondary tie-break.

use chanplay_common::db::{offset_instant, Program};
use chrono::{DateTime, Utc};

/// Tolerance applied to both window edges
pub const GRACE_PERIOD_SECS: i64 = 120;

/// Half-open `[start, end)` interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ScheduleWindow {
    pub fn of(program: &Program) -> Self {
        Self {
            start: program.start_instant,
            end: program.end_instant(),
        }
    }

    /// Widen both edges by `seconds`
    pub fn extended(self, seconds: i64) -> Self {
        Self {
            start: offset_instant(self.start, -seconds),
            end: offset_instant(self.end, seconds),
        }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    pub fn overlaps(&self, other: &ScheduleWindow) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Resolution result for one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActiveWindow<'a> {
    pub active: Option<&'a Program>,
    pub next: Option<&'a Program>,
}

/// Resolve with the standard grace period
///
/// `programs` must be in ascending schedule order.
pub fn resolve_active(programs: &[Program], now: DateTime<Utc>) -> ActiveWindow<'_> {
    resolve_with_grace(programs, now, GRACE_PERIOD_SECS)
}

/// Resolve with an explicit grace period
pub fn resolve_with_grace(
    programs: &[Program],
    now: DateTime<Utc>,
    grace_seconds: i64,
) -> ActiveWindow<'_> {
    let active = programs
        .iter()
        .find(|program| ScheduleWindow::of(program).extended(grace_seconds).contains(now));

    let next = programs.iter().find(|program| {
        program.start_instant > now && !active.is_some_and(|a| std::ptr::eq(a, *program))
    });

    ActiveWindow { active, next }
}
