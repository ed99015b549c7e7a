//! Event types for the chanplay event system

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// What a channel is putting on air
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayoutState {
    /// Live feed overrides the schedule
    LiveOverride,
    /// A scheduled program is on air
    ProgramActive,
    /// Standby loop
    Standby,
}

impl PlayoutState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayoutState::LiveOverride => "LIVE_OVERRIDE",
            PlayoutState::ProgramActive => "PROGRAM_ACTIVE",
            PlayoutState::Standby => "STANDBY",
        }
    }
}

impl std::fmt::Display for PlayoutState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Playout events broadcast to SSE listeners
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlayoutEvent {
    /// A channel's resolved state or program changed
    PlayoutStateChanged {
        channel_id: Uuid,
        state: PlayoutState,
        program_id: Option<Uuid>,
        media_reference: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// Live override flag toggled
    OverrideChanged {
        channel_id: Uuid,
        active: bool,
        timestamp: DateTime<Utc>,
    },

    /// A viewer-side player reported that a program failed to play
    PlaybackFailed {
        channel_id: Uuid,
        program_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// Live start times were rewritten for a channel/day
    ScheduleRescheduled {
        channel_id: Uuid,
        day: NaiveDate,
        affected: u64,
        timestamp: DateTime<Utc>,
    },

    /// A new draft snapshot was stored
    DraftSaved {
        channel_id: Uuid,
        day: NaiveDate,
        version: i64,
        rows: usize,
        timestamp: DateTime<Utc>,
    },

    /// A draft became the live schedule
    DraftPublished {
        channel_id: Uuid,
        day: NaiveDate,
        version: i64,
        published: u64,
        timestamp: DateTime<Utc>,
    },
}

impl PlayoutEvent {
    /// Event name used for the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            PlayoutEvent::PlayoutStateChanged { .. } => "PlayoutStateChanged",
            PlayoutEvent::OverrideChanged { .. } => "OverrideChanged",
            PlayoutEvent::PlaybackFailed { .. } => "PlaybackFailed",
            PlayoutEvent::ScheduleRescheduled { .. } => "ScheduleRescheduled",
            PlayoutEvent::DraftSaved { .. } => "DraftSaved",
            PlayoutEvent::DraftPublished { .. } => "DraftPublished",
        }
    }

    pub fn channel_id(&self) -> Uuid {
        match self {
            PlayoutEvent::PlayoutStateChanged { channel_id, .. }
            | PlayoutEvent::OverrideChanged { channel_id, .. }
            | PlayoutEvent::PlaybackFailed { channel_id, .. }
            | PlayoutEvent::ScheduleRescheduled { channel_id, .. }
            | PlayoutEvent::DraftSaved { channel_id, .. }
            | PlayoutEvent::DraftPublished { channel_id, .. } => *channel_id,
        }
    }
}

/// Broadcast bus for playout events
///
/// Lossy by nature: events emitted while nobody listens are dropped, and slow
/// subscribers skip ahead once `capacity` events are buffered.
#[derive(Debug)]
pub struct EventBus {
    tx: broadcast::Sender<PlayoutEvent>,
    capacity: usize,
}

impl EventBus {
    /// A zero `capacity` is raised to one
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<PlayoutEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: PlayoutEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
