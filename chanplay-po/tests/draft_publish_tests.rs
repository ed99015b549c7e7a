//! Integration tests for the draft -> publish workflow
//!
//! Tests cover:
//! - Loading a draft from the published day
//! - Saving chains rows from the base and creates a new version
//! - Drafts stay invisible until published
//! - Publish replaces exactly the (channel, day) window
//! - Publishing without a draft fails and leaves live rows alone
//! - A failure injected mid-publish rolls back completely
//! - Concurrent publishes of one key serialize
//! - Drafts cannot take programs from another channel or leave their day

mod helpers;

use chanplay_common::events::PlayoutState;
use chanplay_common::DurationInput;
use chanplay_po::draft::DraftRowInput;
use chanplay_po::repository::{DayReplacement, ProgramRepository, SqliteStore};
use chanplay_po::Error;
use chrono::{NaiveDate, TimeDelta};
use helpers::{at, day, TestHarness};
use uuid::Uuid;

fn row(title: &str, duration: DurationInput) -> DraftRowInput {
    DraftRowInput {
        program_id: None,
        title: title.to_string(),
        media_reference: format!("media/{title}.mp4"),
        duration,
        sort_index: None,
    }
}

#[tokio::test]
async fn test_load_draft_materializes_published_day() {
    let h = TestHarness::new().await;
    let ch = h.channel("main").await;
    let b = h.program(ch.id, "B", at(2, 0, 0), 600).await;
    let a = h.program(ch.id, "A", at(1, 0, 0), 1800).await;
    h.program(ch.id, "Tomorrow", at(0, 0, 0) + TimeDelta::days(1), 600).await;

    let draft = h.service.load_draft(ch.id, day()).await.unwrap();
    assert_eq!(draft.version, 1);
    assert_eq!(draft.base_instant, at(1, 0, 0));
    let ids: Vec<Uuid> = draft.rows.iter().map(|r| r.program_id).collect();
    assert_eq!(ids, vec![a.id, b.id]);
    assert_eq!(draft.rows[1].start_instant, at(2, 0, 0));

    // Existing draft is returned as is
    let again = h.service.load_draft(ch.id, day()).await.unwrap();
    assert_eq!(again.version, 1);
}

#[tokio::test]
async fn test_save_draft_chains_and_versions() {
    let h = TestHarness::new().await;
    let ch = h.channel("main").await;

    let first = h
        .service
        .save_draft(
            ch.id,
            day(),
            at(6, 0, 0),
            vec![
                row("Intro", DurationInput::Text("00:05:00".into())),
                row("Feature", DurationInput::Seconds(3600)),
                row("Outro", DurationInput::Fractional(59.9)),
            ],
        )
        .await
        .unwrap();
    assert_eq!(first.version, 1);
    let starts: Vec<_> = first.rows.iter().map(|r| r.start_instant).collect();
    assert_eq!(starts, vec![at(6, 0, 0), at(6, 5, 0), at(7, 5, 0)]);
    assert_eq!(first.rows[2].duration_seconds, 59);

    let second = h
        .service
        .save_draft(ch.id, day(), at(7, 0, 0), vec![row("Only", DurationInput::Seconds(60))])
        .await
        .unwrap();
    assert_eq!(second.version, 2);

    let current = h.service.load_draft(ch.id, day()).await.unwrap();
    assert_eq!(current, second);

    let history = h.service.draft_history(ch.id, day()).await.unwrap();
    assert_eq!(history.versions, 2);
    assert!(history.publishes.is_empty());
}

#[tokio::test]
async fn test_draft_invisible_until_published() {
    let h = TestHarness::new().await;
    let ch = h.channel("main").await;
    h.program(ch.id, "Old", at(0, 0, 0), 3600).await;

    h.service
        .save_draft(ch.id, day(), at(0, 0, 0), vec![row("New", DurationInput::Seconds(3600))])
        .await
        .unwrap();

    let r = h.service.resolve_now(ch.id, at(0, 10, 0).into()).await;
    assert_eq!(r.program.unwrap().title, "Old");

    let outcome = h.service.publish_draft(ch.id, day()).await.unwrap();
    assert_eq!(outcome.published, 1);
    assert_eq!(outcome.version, 1);

    let r = h.service.resolve_now(ch.id, at(0, 10, 0).into()).await;
    assert_eq!(r.state, PlayoutState::ProgramActive);
    assert_eq!(r.program.unwrap().title, "New");
}

#[tokio::test]
async fn test_publish_replaces_only_its_window() {
    let h = TestHarness::new().await;
    let ch = h.channel("main").await;
    let other = h.channel("other").await;
    h.program(ch.id, "Yesterday", at(0, 0, 0) - TimeDelta::minutes(30), 600).await;
    h.program(ch.id, "Today-1", at(1, 0, 0), 600).await;
    h.program(ch.id, "Today-2", at(2, 0, 0), 600).await;
    h.program(ch.id, "Tomorrow", at(0, 0, 0) + TimeDelta::days(1), 600).await;
    h.program(other.id, "Other", at(1, 0, 0), 600).await;

    let draft = h.service.load_draft(ch.id, day()).await.unwrap();
    let mut rows: Vec<DraftRowInput> = draft
        .rows
        .iter()
        .map(|r| DraftRowInput {
            program_id: Some(r.program_id),
            title: r.title.clone(),
            media_reference: r.media_reference.clone(),
            duration: DurationInput::Seconds(r.duration_seconds),
            sort_index: None,
        })
        .collect();
    rows.reverse();
    rows.push(row("Added", DurationInput::Seconds(300)));

    h.service
        .save_draft(ch.id, day(), at(8, 0, 0), rows)
        .await
        .unwrap();
    let outcome = h.service.publish_draft(ch.id, day()).await.unwrap();
    assert_eq!(outcome.published, 3);

    let titles: Vec<String> = h.live_rows(ch.id).await.into_iter().map(|r| r.0).collect();
    assert_eq!(titles, vec!["Yesterday", "Today-2", "Today-1", "Added", "Tomorrow"]);
    assert_eq!(h.live_rows(other.id).await.len(), 1);

    let history = h.service.draft_history(ch.id, day()).await.unwrap();
    assert_eq!(history.publishes.len(), 1);
    assert_eq!(history.publishes[0].published_count, 3);
    assert_eq!(history.publishes[0].draft_version, 2);
}

#[tokio::test]
async fn test_publish_without_draft_fails_cleanly() {
    let h = TestHarness::new().await;
    let ch = h.channel("main").await;
    h.program(ch.id, "Live", at(1, 0, 0), 600).await;
    let before = h.live_rows(ch.id).await;

    let err = h.service.publish_draft(ch.id, day()).await.unwrap_err();
    assert!(matches!(err, Error::NoDraft { .. }));
    assert_eq!(h.live_rows(ch.id).await, before);

    let err = h.service.publish_draft(Uuid::new_v4(), day()).await.unwrap_err();
    assert!(matches!(err, Error::ChannelNotFound(_)));
}

#[tokio::test]
async fn test_publish_failure_rolls_back_live_table() {
    let h = TestHarness::new().await;
    let ch = h.channel("main").await;
    h.program(ch.id, "Keep-1", at(1, 0, 0), 600).await;
    h.program(ch.id, "Keep-2", at(2, 0, 0), 600).await;
    let before = h.live_rows(ch.id).await;

    h.service
        .save_draft(
            ch.id,
            day(),
            at(0, 0, 0),
            vec![
                row("Fine", DurationInput::Seconds(600)),
                row("Poison", DurationInput::Seconds(600)),
            ],
        )
        .await
        .unwrap();

    // Abort the insert of the second row, after the delete has run
    sqlx::query(
        "CREATE TRIGGER poison BEFORE INSERT ON programs
         WHEN NEW.title = 'Poison'
         BEGIN SELECT RAISE(ABORT, 'injected failure'); END",
    )
    .execute(&h.pool)
    .await
    .unwrap();

    let err = h.service.publish_draft(ch.id, day()).await.unwrap_err();
    match err {
        Error::Publish { channel_id, day: failed_day, reason } => {
            assert_eq!(channel_id, ch.id);
            assert_eq!(failed_day, day());
            assert!(reason.contains("injected failure"), "{reason}");
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(h.live_rows(ch.id).await, before);
    let history = h.service.draft_history(ch.id, day()).await.unwrap();
    assert!(history.publishes.is_empty());
}

#[tokio::test]
async fn test_concurrent_publishes_serialize() {
    let h = TestHarness::new().await;
    let ch = h.channel("main").await;
    h.program(ch.id, "Old", at(1, 0, 0), 600).await;

    h.service
        .save_draft(
            ch.id,
            day(),
            at(0, 0, 0),
            vec![
                row("N1", DurationInput::Seconds(600)),
                row("N2", DurationInput::Seconds(600)),
            ],
        )
        .await
        .unwrap();

    let other_day = NaiveDate::from_ymd_opt(2025, 1, 7).unwrap();
    h.service
        .save_draft(ch.id, other_day, at(0, 0, 0) + TimeDelta::days(1), vec![row("D2", DurationInput::Seconds(60))])
        .await
        .unwrap();

    let mut tasks = Vec::new();
    for i in 0..6 {
        let service = h.service.clone();
        let key_day = if i % 3 == 0 { other_day } else { day() };
        tasks.push(tokio::spawn(async move { service.publish_draft(ch.id, key_day).await }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let titles: Vec<String> = h.live_rows(ch.id).await.into_iter().map(|r| r.0).collect();
    assert_eq!(titles, vec!["N1", "N2", "D2"]);
}

#[tokio::test]
async fn test_load_from_published_replaces_prior_draft() {
    let h = TestHarness::new().await;
    let ch = h.channel("main").await;
    h.program(ch.id, "Live", at(1, 0, 0), 600).await;

    h.service
        .save_draft(ch.id, day(), at(0, 0, 0), vec![row("Scratch", DurationInput::Seconds(60))])
        .await
        .unwrap();

    let reloaded = h.service.load_from_published(ch.id, day()).await.unwrap();
    assert_eq!(reloaded.version, 2);
    assert_eq!(reloaded.rows.len(), 1);
    assert_eq!(reloaded.rows[0].title, "Live");
}

#[tokio::test]
async fn test_save_draft_rejects_unknown_channel() {
    let h = TestHarness::new().await;
    let err = h
        .service
        .save_draft(Uuid::new_v4(), day(), at(0, 0, 0), vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ChannelNotFound(_)));
}

#[tokio::test]
async fn test_draft_cannot_claim_another_channels_program() {
    let h = TestHarness::new().await;
    let a = h.channel("a").await;
    let b = h.channel("b").await;
    let b_show = h.program(b.id, "B-show", at(3, 0, 0), 600).await;
    let before = h.live_rows(b.id).await;

    let mut claimed = row("hijack", DurationInput::Seconds(600));
    claimed.program_id = Some(b_show.id);
    let err = h
        .service
        .save_draft(a.id, day(), at(0, 0, 0), vec![claimed])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));

    let err = h.service.publish_draft(a.id, day()).await.unwrap_err();
    assert!(matches!(err, Error::NoDraft { .. }));
    assert_eq!(h.live_rows(b.id).await, before);
    assert!(h.live_rows(a.id).await.is_empty());
}

#[tokio::test]
async fn test_replace_day_never_deletes_other_channels_rows() {
    let h = TestHarness::new().await;
    let a = h.channel("a").await;
    let b = h.channel("b").await;
    let b_show = h.program(b.id, "B-show", at(3, 0, 0), 600).await;
    let before = h.live_rows(b.id).await;

    let mut stolen = b_show.clone();
    stolen.channel_id = a.id;
    let store = SqliteStore::new(h.pool.clone());
    let result = store
        .replace_day(&DayReplacement {
            channel_id: a.id,
            day: day(),
            draft_version: 1,
            rows: vec![stolen],
            published_at: at(0, 0, 0),
        })
        .await;

    // The guid is still taken by channel b, so the insert fails and rolls back
    assert!(result.is_err());
    assert_eq!(h.live_rows(b.id).await, before);
    assert!(h.live_rows(a.id).await.is_empty());
}

#[tokio::test]
async fn test_save_draft_rejects_base_outside_day() {
    let h = TestHarness::new().await;
    let ch = h.channel("main").await;
    h.program(ch.id, "Jan6", at(1, 0, 0), 600).await;
    h.program(ch.id, "Jan9", at(1, 0, 0) + TimeDelta::days(3), 600).await;
    let before = h.live_rows(ch.id).await;

    let err = h
        .service
        .save_draft(
            ch.id,
            day(),
            at(1, 0, 0) + TimeDelta::days(3),
            vec![row("draft", DurationInput::Seconds(600))],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));

    let err = h
        .service
        .save_draft(ch.id, day(), at(0, 0, 0) - TimeDelta::seconds(1), vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));

    assert!(h.service.publish_draft(ch.id, day()).await.is_err());
    assert_eq!(h.live_rows(ch.id).await, before);
}
