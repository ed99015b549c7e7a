//! Playout ticker
//!
//! Re-resolves every channel on a fixed cadence and emits a
//! `PlayoutStateChanged` event whenever a channel's state or on-air program
//! differs from the previous tick.

use crate::service::{PlayoutService, Resolution};
use chanplay_common::events::{PlayoutEvent, PlayoutState};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info};
use uuid::Uuid;

type OnAir = (PlayoutState, Option<Uuid>);

const MIN_PERIOD: Duration = Duration::from_millis(100);

pub struct PlayoutTicker {
    service: Arc<PlayoutService>,
    period: Duration,
    last: Mutex<HashMap<Uuid, OnAir>>,
}

impl PlayoutTicker {
    pub fn new(service: Arc<PlayoutService>, period: Duration) -> Self {
        Self {
            service,
            period: period.max(MIN_PERIOD),
            last: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve all channels once; returns the events emitted
    pub async fn tick(&self) -> Vec<PlayoutEvent> {
        let now = self.service.now();
        let guide = self.service.guide(now.into()).await;

        let mut last = self.last.lock().await;
        let mut events = Vec::new();
        for resolution in &guide {
            let on_air = on_air(resolution);
            if last.get(&resolution.channel_id) == Some(&on_air) {
                continue;
            }
            last.insert(resolution.channel_id, on_air);

            events.push(PlayoutEvent::PlayoutStateChanged {
                channel_id: resolution.channel_id,
                state: resolution.state,
                program_id: on_air.1,
                media_reference: resolution.media_reference.clone(),
                timestamp: now,
            });
        }

        // Channels that disappeared are forgotten
        last.retain(|channel_id, _| guide.iter().any(|r| r.channel_id == *channel_id));
        drop(last);

        for event in &events {
            self.service.events().emit_lossy(event.clone());
        }
        debug!("Tick at {}: {} channels, {} changes", now, guide.len(), events.len());
        events
    }

    /// Spawn the ticker loop
    pub fn run(self: Arc<Self>) -> JoinHandle<()> {
        info!("Starting playout ticker (interval: {}ms)", self.period.as_millis());

        tokio::spawn(async move {
            let mut timer = interval(self.period);
            timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                timer.tick().await;
                self.tick().await;
            }
        })
    }
}

fn on_air(resolution: &Resolution) -> OnAir {
    (resolution.state, resolution.program.as_ref().map(|p| p.id))
}
