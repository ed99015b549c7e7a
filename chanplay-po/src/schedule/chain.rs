//! Sequential start-time assignment
//!
//! `start[0] = base`, `start[i] = start[i-1] + duration[i-1]`.
//!
//! Pure: no clock, no I/O. The same base and durations always produce the
//! same starts, which is what makes reschedules repeatable and auditable.

use chanplay_common::db::{DraftProgram, Program};
use chrono::{DateTime, TimeDelta, Utc};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("start of item {index} falls outside the representable time range")]
    Overflow { index: usize },
}

/// Anything that can be laid end to end on a timeline
pub trait Chainable {
    fn duration_seconds(&self) -> i64;
    fn set_start_instant(&mut self, start: DateTime<Utc>);
}

impl Chainable for Program {
    fn duration_seconds(&self) -> i64 {
        self.duration_seconds
    }

    fn set_start_instant(&mut self, start: DateTime<Utc>) {
        self.start_instant = start;
    }
}

impl Chainable for DraftProgram {
    fn duration_seconds(&self) -> i64 {
        self.duration_seconds
    }

    fn set_start_instant(&mut self, start: DateTime<Utc>) {
        self.start_instant = start;
    }
}

/// Chained start instants for a list of durations
///
/// Negative durations count as zero.
pub fn chain_starts<I>(base: DateTime<Utc>, durations: I) -> Result<Vec<DateTime<Utc>>, ChainError>
where
    I: IntoIterator<Item = i64>,
{
    let mut starts = Vec::new();
    let mut cursor = Some(base);

    for (index, duration) in durations.into_iter().enumerate() {
        let start = cursor.ok_or(ChainError::Overflow { index })?;
        starts.push(start);
        cursor = TimeDelta::try_seconds(duration.max(0))
            .and_then(|delta| start.checked_add_signed(delta));
    }

    Ok(starts)
}

/// Assign chained starts to `items`, preserving their order
pub fn chain<T: Chainable>(base: DateTime<Utc>, mut items: Vec<T>) -> Result<Vec<T>, ChainError> {
    let starts = chain_starts(base, items.iter().map(Chainable::duration_seconds))?;
    for (item, start) in items.iter_mut().zip(starts) {
        item.set_start_instant(start);
    }
    Ok(items)
}
