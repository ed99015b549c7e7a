//! Playback fallback policy
//!
//! Priority, highest first:
//! 1. live override engaged on a special-override channel -> LIVE_OVERRIDE
//! 2. an active program that has not failed -> PROGRAM_ACTIVE
//! 3. otherwise STANDBY, looping the channel's standby media
//!
//! A program reported as failed stays suppressed until a different program
//! becomes active on that channel.

use chanplay_common::db::{Channel, Program};
use chanplay_common::events::PlayoutState;
use dashmap::DashMap;
use tracing::{debug, info};
use uuid::Uuid;

/// What a channel should put on air
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayoutDecision {
    pub state: PlayoutState,
    /// Program on air, only for PROGRAM_ACTIVE
    pub program: Option<Program>,
    /// Media to play; none during a live override
    pub media_reference: Option<String>,
}

/// Pure decision for one channel
pub fn decide(channel: &Channel, active: Option<&Program>, suppressed: bool) -> PlayoutDecision {
    if channel.live_override_engaged() {
        return PlayoutDecision {
            state: PlayoutState::LiveOverride,
            program: None,
            media_reference: None,
        };
    }

    match active {
        Some(program) if !suppressed => PlayoutDecision {
            state: PlayoutState::ProgramActive,
            program: Some(program.clone()),
            media_reference: Some(program.media_reference.clone()),
        },
        _ => standby(channel),
    }
}

/// STANDBY looping the channel's standby media
pub fn standby(channel: &Channel) -> PlayoutDecision {
    PlayoutDecision {
        state: PlayoutState::Standby,
        program: None,
        media_reference: Some(channel.standby_media_reference.clone()),
    }
}

/// Failed programs, at most one per channel
#[derive(Debug, Default)]
pub struct FailureLedger {
    failed: DashMap<Uuid, Uuid>,
}

impl FailureLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_failed(&self, channel_id: Uuid, program_id: Uuid) {
        info!("Program {} failed on channel {}; holding STANDBY", program_id, channel_id);
        self.failed.insert(channel_id, program_id);
    }

    /// Whether `active` is suppressed; a different active program clears the mark
    pub fn check(&self, channel_id: Uuid, active: Option<&Program>) -> bool {
        let Some(failed) = self.failed.get(&channel_id).map(|entry| *entry) else {
            return false;
        };

        match active {
            Some(program) if program.id == failed => true,
            Some(program) => {
                debug!(
                    "Channel {} advanced from failed program {} to {}",
                    channel_id, failed, program.id
                );
                self.failed.remove(&channel_id);
                false
            }
            // Still inside the gap or the failed program's window; keep the mark
            None => false,
        }
    }

    pub fn failed_program(&self, channel_id: Uuid) -> Option<Uuid> {
        self.failed.get(&channel_id).map(|entry| *entry)
    }
}

/// Fallback decisions with failure memory
#[derive(Debug, Default)]
pub struct FallbackPolicy {
    failures: FailureLedger,
}

impl FallbackPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn evaluate(&self, channel: &Channel, active: Option<&Program>) -> PlayoutDecision {
        let suppressed = self.failures.check(channel.id, active);
        decide(channel, active, suppressed)
    }

    pub fn report_failure(&self, channel_id: Uuid, program_id: Uuid) {
        self.failures.mark_failed(channel_id, program_id);
    }

    pub fn failures(&self) -> &FailureLedger {
        &self.failures
    }
}
