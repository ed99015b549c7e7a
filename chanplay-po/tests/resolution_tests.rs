//! Integration tests for playout resolution
//!
//! Tests cover:
//! - Active/next lookup against the SQLite store
//! - Grace period at window edges
//! - Live override priority over scheduled programs
//! - STANDBY degradation after a playback failure
//! - Unknown channels and invalid instants resolving to STANDBY
//! - Guide over all channels
//! - Next program beyond the lookahead window

mod helpers;

use chanplay_common::config::PlayoutConfig;
use chanplay_common::events::PlayoutState;
use chanplay_common::time::normalize_timestamp;
use chanplay_common::NormalizedTime;
use chanplay_po::{Error, PlayoutService};
use chrono::{TimeDelta, Utc};
use helpers::{at, TestHarness};
use uuid::Uuid;

#[tokio::test]
async fn test_active_and_next_from_store() {
    let h = TestHarness::new().await;
    let ch = h.channel("main").await;
    h.program(ch.id, "A", at(0, 0, 0), 1800).await;
    h.program(ch.id, "B", at(0, 30, 0), 1800).await;

    let r = h.service.resolve_now(ch.id, at(0, 15, 0).into()).await;
    assert_eq!(r.state, PlayoutState::ProgramActive);
    assert_eq!(r.program.as_ref().unwrap().title, "A");
    assert_eq!(r.next.as_ref().unwrap().title, "B");
    assert_eq!(r.media_reference.as_deref(), Some("media/A.mp4"));
    assert!(!r.degraded);

    let r = h.service.resolve_now(ch.id, at(0, 45, 0).into()).await;
    assert_eq!(r.program.as_ref().unwrap().title, "B");
    assert!(r.next.is_none());
}

#[tokio::test]
async fn test_grace_period_edges() {
    let h = TestHarness::new().await;
    let ch = h.channel("main").await;
    h.program(ch.id, "News", at(10, 0, 0), 600).await;

    let early = h.service.resolve_now(ch.id, at(9, 58, 30).into()).await;
    assert_eq!(early.state, PlayoutState::ProgramActive);

    let too_early = h.service.resolve_now(ch.id, at(9, 57, 59).into()).await;
    assert_eq!(too_early.state, PlayoutState::Standby);
    assert_eq!(too_early.next.unwrap().title, "News");
    assert_eq!(too_early.media_reference.as_deref(), Some("standby/main.m3u8"));

    let late = h.service.resolve_now(ch.id, at(10, 11, 59).into()).await;
    assert_eq!(late.state, PlayoutState::ProgramActive);

    let after = h.service.resolve_now(ch.id, at(10, 12, 0).into()).await;
    assert_eq!(after.state, PlayoutState::Standby);
}

#[tokio::test]
async fn test_next_found_beyond_grace() {
    let h = TestHarness::new().await;
    let ch = h.channel("main").await;
    h.program(ch.id, "Evening", at(20, 0, 0), 3600).await;

    let r = h.service.resolve_now(ch.id, at(8, 0, 0).into()).await;
    assert_eq!(r.state, PlayoutState::Standby);
    assert_eq!(r.next.unwrap().title, "Evening");
}

#[tokio::test]
async fn test_next_found_beyond_lookahead() {
    let h = TestHarness::new().await;
    let ch = h.channel("main").await;
    h.program(ch.id, "Far", at(0, 0, 0) + TimeDelta::hours(25), 600).await;

    let r = h.service.resolve_now(ch.id, at(0, 0, 0).into()).await;
    assert_eq!(r.state, PlayoutState::Standby);
    assert_eq!(r.next.unwrap().title, "Far");
    assert!(!r.degraded);
}

#[tokio::test]
async fn test_next_with_zero_lookahead_skips_active_program() {
    let h = TestHarness::new().await;
    let ch = h.channel("main").await;
    h.program(ch.id, "Soon", at(10, 0, 0), 600).await;
    h.program(ch.id, "Evening", at(20, 0, 0), 3600).await;

    let config = PlayoutConfig {
        lookahead_hours: 0,
        ..PlayoutConfig::default()
    };
    let service = PlayoutService::sqlite(h.pool.clone(), h.clock.clone(), &config);

    let r = service.resolve_now(ch.id, at(8, 0, 0).into()).await;
    assert_eq!(r.next.unwrap().title, "Soon");

    // Inside the leading grace: Soon is on air, Evening is next
    let r = service.resolve_now(ch.id, at(9, 58, 30).into()).await;
    assert_eq!(r.program.unwrap().title, "Soon");
    assert_eq!(r.next.unwrap().title, "Evening");
}

#[tokio::test]
async fn test_live_override_wins_over_active_program() {
    let h = TestHarness::new().await;
    let ch = h.override_channel("live").await;
    h.program(ch.id, "Show", at(12, 0, 0), 3600).await;

    let r = h.service.resolve_now(ch.id, at(12, 30, 0).into()).await;
    assert_eq!(r.state, PlayoutState::ProgramActive);

    h.service.set_override_active(ch.id, true).await.unwrap();
    let r = h.service.resolve_now(ch.id, at(12, 30, 0).into()).await;
    assert_eq!(r.state, PlayoutState::LiveOverride);
    assert!(r.program.is_none());

    h.service.set_override_active(ch.id, false).await.unwrap();
    let r = h.service.resolve_now(ch.id, at(12, 30, 0).into()).await;
    assert_eq!(r.state, PlayoutState::ProgramActive);
}

#[tokio::test]
async fn test_override_flag_ignored_on_regular_channel() {
    let h = TestHarness::new().await;
    let ch = h.channel("regular").await;
    h.program(ch.id, "Show", at(12, 0, 0), 3600).await;

    h.service.set_override_active(ch.id, true).await.unwrap();
    let r = h.service.resolve_now(ch.id, at(12, 30, 0).into()).await;
    assert_eq!(r.state, PlayoutState::ProgramActive);
}

#[tokio::test]
async fn test_playback_failure_holds_standby_until_next_program() {
    let h = TestHarness::new().await;
    let ch = h.channel("main").await;
    let a = h.program(ch.id, "A", at(0, 0, 0), 1800).await;
    h.program(ch.id, "B", at(0, 30, 0), 1800).await;

    h.service.report_playback_failure(ch.id, a.id).await.unwrap();

    let r = h.service.resolve_now(ch.id, at(0, 10, 0).into()).await;
    assert_eq!(r.state, PlayoutState::Standby);
    assert_eq!(r.media_reference.as_deref(), Some("standby/main.m3u8"));
    assert_eq!(r.next.unwrap().title, "B");

    // Trailing grace of A still resolves to A, which stays suppressed
    let r = h.service.resolve_now(ch.id, at(0, 31, 0).into()).await;
    assert_eq!(r.state, PlayoutState::Standby);

    let r = h.service.resolve_now(ch.id, at(0, 40, 0).into()).await;
    assert_eq!(r.state, PlayoutState::ProgramActive);
    assert_eq!(r.program.unwrap().title, "B");
}

#[tokio::test]
async fn test_playback_failure_only_for_program_on_air() {
    let h = TestHarness::new().await;
    let ch = h.channel("main").await;
    let a = h.program(ch.id, "A", at(0, 0, 0), 1800).await;
    let b = h.program(ch.id, "B", at(0, 30, 0), 1800).await;
    h.clock.set(at(0, 10, 0));

    let err = h.service.report_playback_failure(ch.id, b.id).await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));

    // A is still on air, and B plays once it starts
    let r = h.service.resolve_now(ch.id, at(0, 10, 0).into()).await;
    assert_eq!(r.program.unwrap().id, a.id);
    let r = h.service.resolve_now(ch.id, at(0, 40, 0).into()).await;
    assert_eq!(r.state, PlayoutState::ProgramActive);
    assert_eq!(r.program.unwrap().id, b.id);

    h.clock.set(at(2, 0, 0));
    let err = h.service.report_playback_failure(ch.id, a.id).await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[tokio::test]
async fn test_playback_failure_rejects_foreign_program() {
    let h = TestHarness::new().await;
    let a = h.channel("a").await;
    let b = h.channel("b").await;
    let on_b = h.program(b.id, "B-show", at(0, 0, 0), 600).await;

    let err = h.service.report_playback_failure(a.id, on_b.id).await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));

    let err = h
        .service
        .report_playback_failure(Uuid::new_v4(), on_b.id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ChannelNotFound(_)));
}

#[tokio::test]
async fn test_unknown_channel_and_invalid_now_resolve_standby() {
    let h = TestHarness::new().await;
    let ch = h.channel("main").await;
    h.program(ch.id, "A", at(0, 0, 0), 1800).await;

    let unknown = h.service.resolve_now(Uuid::new_v4(), at(0, 10, 0).into()).await;
    assert_eq!(unknown.state, PlayoutState::Standby);
    assert!(unknown.media_reference.is_none());

    let invalid = normalize_timestamp("not a time");
    assert_eq!(invalid, NormalizedTime::Invalid);
    let r = h.service.resolve_now(ch.id, invalid).await;
    assert_eq!(r.state, PlayoutState::Standby);
    assert!(r.evaluated_at.is_none());

    let err = h.service.resolve_channel(Uuid::new_v4(), None).await.unwrap_err();
    assert!(matches!(err, Error::ChannelNotFound(_)));
}

#[tokio::test]
async fn test_offset_timestamp_resolves_same_as_utc() {
    let h = TestHarness::new().await;
    let ch = h.channel("main").await;
    h.program(ch.id, "A", at(0, 0, 0), 1800).await;

    let zoned = normalize_timestamp("2025-01-06T02:15:00+02:00");
    let r = h.service.resolve_now(ch.id, zoned).await;
    assert_eq!(r.program.unwrap().title, "A");
    assert_eq!(r.evaluated_at, Some(at(0, 15, 0)));
}

#[tokio::test]
async fn test_resolve_channel_defaults_to_clock() {
    let h = TestHarness::new().await;
    let ch = h.channel("main").await;
    h.program(ch.id, "A", at(6, 0, 0), 1800).await;

    h.clock.set(at(6, 10, 0));
    let r = h.service.resolve_channel(ch.id, None).await.unwrap();
    assert_eq!(r.state, PlayoutState::ProgramActive);

    h.clock.advance(TimeDelta::hours(1));
    let r = h.service.resolve_channel(ch.id, None).await.unwrap();
    assert_eq!(r.state, PlayoutState::Standby);
}

#[tokio::test]
async fn test_guide_resolves_every_channel() {
    let h = TestHarness::new().await;
    let a = h.channel("alpha").await;
    let b = h.channel("bravo").await;
    let c = h.override_channel("charlie").await;
    h.program(a.id, "A", at(0, 0, 0), 1800).await;
    h.service.set_override_active(c.id, true).await.unwrap();

    let guide = h.service.guide(at(0, 10, 0).into()).await;
    assert_eq!(guide.len(), 3);
    assert_eq!(guide[0].channel_id, a.id);
    assert_eq!(guide[0].state, PlayoutState::ProgramActive);
    assert_eq!(guide[1].channel_id, b.id);
    assert_eq!(guide[1].state, PlayoutState::Standby);
    assert_eq!(guide[2].state, PlayoutState::LiveOverride);
}

#[tokio::test]
async fn test_resolution_is_stable_for_fixed_now() {
    let h = TestHarness::new().await;
    let ch = h.channel("main").await;
    h.program(ch.id, "A", at(0, 0, 0), 1800).await;

    let now = at(0, 5, 0);
    let first = h.service.resolve_now(ch.id, now.into()).await;
    h.clock.set(Utc::now());
    let second = h.service.resolve_now(ch.id, now.into()).await;
    assert_eq!(first, second);
}
