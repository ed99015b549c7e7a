//! PlayoutService: the engine's public face
//!
//! Wires the repositories, clock, fallback policy, rescheduler and draft
//! workflow together. Editing operations return errors; viewer-facing
//! resolution ([`PlayoutService::resolve_now`], [`PlayoutService::guide`])
//! never does and degrades to STANDBY instead.

use crate::clock::Clock;
use crate::draft::{DraftRowInput, DraftWorkflow, PublishOutcome};
use crate::error::{Error, Result};
use crate::fallback::{FallbackPolicy, PlayoutDecision};
use crate::repository::{ChannelRepository, DraftRepository, ProgramRepository, SqliteStore};
use crate::reschedule::{RescheduleReport, RescheduleRow, RescheduleTarget, Rescheduler};
use crate::schedule::{ChannelSchedule, GRACE_PERIOD_SECS};
use chanplay_common::config::PlayoutConfig;
use chanplay_common::db::{offset_instant, Channel, DraftSnapshot, Program, PublishRecord};
use chanplay_common::events::{EventBus, PlayoutEvent, PlayoutState};
use chanplay_common::NormalizedTime;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Resolved on-air state of one channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub channel_id: Uuid,
    pub state: PlayoutState,
    pub program: Option<Program>,
    pub next: Option<Program>,
    pub media_reference: Option<String>,
    /// Instant the resolution was computed for; absent when "now" was invalid
    pub evaluated_at: Option<DateTime<Utc>>,
    /// Set when storage could not be read and the result is a fallback
    pub degraded: bool,
}

impl Resolution {
    fn from_decision(
        channel_id: Uuid,
        decision: PlayoutDecision,
        next: Option<Program>,
        evaluated_at: Option<DateTime<Utc>>,
        degraded: bool,
    ) -> Self {
        Self {
            channel_id,
            state: decision.state,
            program: decision.program,
            next,
            media_reference: decision.media_reference,
            evaluated_at,
            degraded,
        }
    }

    fn unknown_channel(channel_id: Uuid, evaluated_at: Option<DateTime<Utc>>, degraded: bool) -> Self {
        Self {
            channel_id,
            state: PlayoutState::Standby,
            program: None,
            next: None,
            media_reference: None,
            evaluated_at,
            degraded,
        }
    }
}

/// Live and draft audit trail of one (channel, day)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DraftHistory {
    pub channel_id: Uuid,
    pub day: NaiveDate,
    pub versions: i64,
    pub publishes: Vec<PublishRecord>,
}

pub struct PlayoutService {
    programs: Arc<dyn ProgramRepository>,
    channels: Arc<dyn ChannelRepository>,
    drafts: Arc<dyn DraftRepository>,
    clock: Arc<dyn Clock>,
    events: Arc<EventBus>,
    fallback: FallbackPolicy,
    rescheduler: Rescheduler,
    workflow: DraftWorkflow,
    lookahead_secs: i64,
}

impl PlayoutService {
    pub fn new(
        programs: Arc<dyn ProgramRepository>,
        channels: Arc<dyn ChannelRepository>,
        drafts: Arc<dyn DraftRepository>,
        clock: Arc<dyn Clock>,
        events: Arc<EventBus>,
        config: &PlayoutConfig,
    ) -> Self {
        Self {
            rescheduler: Rescheduler::new(programs.clone(), channels.clone()),
            workflow: DraftWorkflow::new(programs.clone(), channels.clone(), drafts.clone()),
            programs,
            channels,
            drafts,
            clock,
            events,
            fallback: FallbackPolicy::new(),
            lookahead_secs: config.lookahead_hours.saturating_mul(3600).max(0),
        }
    }

    /// Service over a single SQLite store
    pub fn sqlite(pool: SqlitePool, clock: Arc<dyn Clock>, config: &PlayoutConfig) -> Self {
        let store = Arc::new(SqliteStore::new(pool));
        let events = Arc::new(EventBus::new(config.event_capacity));
        Self::new(store.clone(), store.clone(), store, clock, events, config)
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    // ========================================
    // Resolution
    // ========================================

    /// On-air state of a channel at `now`
    ///
    /// Never fails: an unknown channel, unreadable storage or an invalid
    /// `now` all resolve to STANDBY.
    pub async fn resolve_now(&self, channel_id: Uuid, now: NormalizedTime) -> Resolution {
        match self.channels.get(channel_id).await {
            Ok(Some(channel)) => self.resolve_for(&channel, now).await,
            Ok(None) => {
                debug!("Resolve requested for unknown channel {}", channel_id);
                Resolution::unknown_channel(channel_id, now.instant(), false)
            }
            Err(e) => {
                warn!("Channel {} unreadable, resolving STANDBY: {}", channel_id, e);
                Resolution::unknown_channel(channel_id, now.instant(), true)
            }
        }
    }

    /// Like [`Self::resolve_now`] but reports unknown channels;
    /// `at` defaults to the clock
    pub async fn resolve_channel(&self, channel_id: Uuid, at: Option<NormalizedTime>) -> Result<Resolution> {
        let channel = self.channel(channel_id).await?;
        let now = at.unwrap_or_else(|| self.clock.now().into());
        Ok(self.resolve_for(&channel, now).await)
    }

    /// Every channel resolved at `now`, in channel name order
    pub async fn guide(&self, now: NormalizedTime) -> Vec<Resolution> {
        let channels = match self.channels.list().await {
            Ok(channels) => channels,
            Err(e) => {
                warn!("Channel list unreadable, guide is empty: {}", e);
                return Vec::new();
            }
        };

        join_all(channels.iter().map(|channel| self.resolve_for(channel, now))).await
    }

    async fn resolve_for(&self, channel: &Channel, now: NormalizedTime) -> Resolution {
        let Some(instant) = now.instant() else {
            let decision = self.fallback.evaluate(channel, None);
            return Resolution::from_decision(channel.id, decision, None, None, false);
        };

        let to = self.window_end(instant);
        let programs = match self
            .programs
            .programs_overlapping(channel.id, offset_instant(instant, -GRACE_PERIOD_SECS), to)
            .await
        {
            Ok(programs) => programs,
            Err(e) => {
                warn!("Programs of channel {} unreadable, resolving STANDBY: {}", channel.id, e);
                let decision = self.fallback.evaluate(channel, None);
                return Resolution::from_decision(channel.id, decision, None, Some(instant), true);
            }
        };

        let schedule = ChannelSchedule::new(channel.id, programs);
        let window = schedule.resolve(instant);
        let decision = self.fallback.evaluate(channel, window.active);
        debug!(
            "Channel {} at {}: {} ({:?})",
            channel.id,
            instant,
            decision.state,
            window.active.map(|p| p.id)
        );

        // Nothing starts inside the window; look further out
        let (next, degraded) = match window.next {
            Some(next) => (Some(next.clone()), false),
            None => match self.programs.first_starting_from(channel.id, to).await {
                Ok(next) => (next, false),
                Err(e) => {
                    warn!("Next program of channel {} unreadable: {}", channel.id, e);
                    (None, true)
                }
            },
        };
        Resolution::from_decision(channel.id, decision, next, Some(instant), degraded)
    }

    /// End of the bounded resolution window; every start in `(instant, end)` is read
    fn window_end(&self, instant: DateTime<Utc>) -> DateTime<Utc> {
        offset_instant(instant, self.lookahead_secs.max(GRACE_PERIOD_SECS + 1))
    }

    /// Program on air at `instant`, ignoring overrides and failure marks
    async fn active_program(&self, channel_id: Uuid, instant: DateTime<Utc>) -> Result<Option<Program>> {
        let programs = self
            .programs
            .programs_overlapping(channel_id, offset_instant(instant, -GRACE_PERIOD_SECS), self.window_end(instant))
            .await?;
        let schedule = ChannelSchedule::new(channel_id, programs);
        Ok(schedule.resolve(instant).active.cloned())
    }

    // ========================================
    // Channels and live signals
    // ========================================

    pub async fn list_channels(&self) -> Result<Vec<Channel>> {
        self.channels.list().await
    }

    pub async fn channel(&self, channel_id: Uuid) -> Result<Channel> {
        self.channels
            .get(channel_id)
            .await?
            .ok_or(Error::ChannelNotFound(channel_id))
    }

    pub async fn create_channel(&self, channel: &Channel) -> Result<()> {
        self.channels.insert(channel).await
    }

    pub async fn add_program(&self, program: &Program) -> Result<()> {
        self.channel(program.channel_id).await?;
        self.programs.insert(program).await
    }

    /// Insert channels and programs in one transaction
    pub async fn import_batch(&self, channels: &[Channel], programs: &[Program]) -> Result<()> {
        self.channels.insert_batch(channels, programs).await
    }

    pub async fn set_override_active(&self, channel_id: Uuid, active: bool) -> Result<()> {
        if !self.channels.set_override_active(channel_id, active).await? {
            return Err(Error::ChannelNotFound(channel_id));
        }

        self.events.emit_lossy(PlayoutEvent::OverrideChanged {
            channel_id,
            active,
            timestamp: self.clock.now(),
        });
        Ok(())
    }

    /// Hold STANDBY until the channel moves past `program_id`
    ///
    /// Only the program currently on air can be reported.
    pub async fn report_playback_failure(&self, channel_id: Uuid, program_id: Uuid) -> Result<()> {
        self.channel(channel_id).await?;
        let now = self.clock.now();
        match self.active_program(channel_id, now).await? {
            Some(active) if active.id == program_id => {}
            _ => {
                return Err(Error::InvalidInput(format!(
                    "program {program_id} is not on air on channel {channel_id} at {now}"
                )))
            }
        }

        self.fallback.report_failure(channel_id, program_id);
        self.events.emit_lossy(PlayoutEvent::PlaybackFailed {
            channel_id,
            program_id,
            timestamp: self.clock.now(),
        });
        Ok(())
    }

    // ========================================
    // Reschedule
    // ========================================

    pub async fn preview_reschedule(
        &self,
        channel_id: Uuid,
        day: NaiveDate,
        base: Option<NaiveTime>,
    ) -> Result<Vec<RescheduleRow>> {
        self.rescheduler.preview(channel_id, day, base).await
    }

    pub async fn apply_reschedule(
        &self,
        target: RescheduleTarget,
        day: NaiveDate,
        base: Option<NaiveTime>,
    ) -> Result<RescheduleReport> {
        let report = self.rescheduler.apply(target, day, base).await?;

        let timestamp = self.clock.now();
        for outcome in report.channels.iter().filter(|c| c.error.is_none()) {
            self.events.emit_lossy(PlayoutEvent::ScheduleRescheduled {
                channel_id: outcome.channel_id,
                day,
                affected: outcome.affected,
                timestamp,
            });
        }
        Ok(report)
    }

    // ========================================
    // Drafts
    // ========================================

    pub async fn load_draft(&self, channel_id: Uuid, day: NaiveDate) -> Result<DraftSnapshot> {
        self.workflow.load_draft(channel_id, day, self.clock.now()).await
    }

    pub async fn load_from_published(&self, channel_id: Uuid, day: NaiveDate) -> Result<DraftSnapshot> {
        let snapshot = self
            .workflow
            .load_from_published(channel_id, day, self.clock.now())
            .await?;
        self.emit_draft_saved(&snapshot);
        Ok(snapshot)
    }

    pub async fn save_draft(
        &self,
        channel_id: Uuid,
        day: NaiveDate,
        base: DateTime<Utc>,
        rows: Vec<DraftRowInput>,
    ) -> Result<DraftSnapshot> {
        let snapshot = self
            .workflow
            .save_draft(channel_id, day, base, rows, self.clock.now())
            .await?;
        self.emit_draft_saved(&snapshot);
        Ok(snapshot)
    }

    pub async fn publish_draft(&self, channel_id: Uuid, day: NaiveDate) -> Result<PublishOutcome> {
        let now = self.clock.now();
        let outcome = self.workflow.publish(channel_id, day, now).await?;

        self.events.emit_lossy(PlayoutEvent::DraftPublished {
            channel_id,
            day,
            version: outcome.version,
            published: outcome.published,
            timestamp: now,
        });
        Ok(outcome)
    }

    pub async fn draft_history(&self, channel_id: Uuid, day: NaiveDate) -> Result<DraftHistory> {
        self.channel(channel_id).await?;
        Ok(DraftHistory {
            channel_id,
            day,
            versions: self.drafts.version_count(channel_id, day).await?,
            publishes: self.drafts.publish_history(channel_id, day).await?,
        })
    }

    fn emit_draft_saved(&self, snapshot: &DraftSnapshot) {
        self.events.emit_lossy(PlayoutEvent::DraftSaved {
            channel_id: snapshot.channel_id,
            day: snapshot.day,
            version: snapshot.version,
            rows: snapshot.rows.len(),
            timestamp: snapshot.saved_at,
        });
    }
}
