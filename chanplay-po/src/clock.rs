//! Authoritative UTC time source
//!
//! Schedule logic never reads the wall clock; "now" is taken from a [`Clock`]
//! at the edge (HTTP handler, ticker, CLI) and passed down explicitly.

use chanplay_common::time::normalize_instant;
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Current instant, whole seconds
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        normalize_instant(Utc::now())
    }
}

/// Manually driven clock for tests and replays
#[derive(Debug)]
pub struct FixedClock {
    epoch_secs: AtomicI64,
}

impl FixedClock {
    pub fn new(instant: DateTime<Utc>) -> Self {
        Self {
            epoch_secs: AtomicI64::new(instant.timestamp()),
        }
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        self.epoch_secs.store(instant.timestamp(), Ordering::SeqCst);
    }

    pub fn advance(&self, delta: TimeDelta) {
        self.epoch_secs.fetch_add(delta.num_seconds(), Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        let secs = self.epoch_secs.load(Ordering::SeqCst);
        DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }
}
