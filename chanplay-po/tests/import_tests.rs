//! Integration tests for JSON import
//!
//! Tests cover:
//! - Channels referenced by name and by id
//! - Mixed timestamp and duration encodings
//! - Invalid starts skipped and counted
//! - Unknown channels skipped
//! - Overlaps reported
//! - A failing import writes nothing

mod helpers;

use chanplay_common::events::PlayoutState;
use chanplay_po::import::{import, ImportFile};
use helpers::{at, TestHarness};

#[tokio::test]
async fn test_import_mixed_encodings() {
    let h = TestHarness::new().await;
    let existing = h.channel("existing").await;

    let json = format!(
        r#"{{
            "channels": [
                {{ "name": "news", "standby_media_reference": "standby/news.m3u8" }}
            ],
            "programs": [
                {{ "channel": "news", "title": "Morning", "media_reference": "m/morning",
                   "start": "2025-01-06T06:00:00Z", "duration": "01:00:00" }},
                {{ "channel": "news", "title": "Zoned", "media_reference": "m/zoned",
                   "start": "2025-01-06T09:00:00+0200", "duration": 1800.75 }},
                {{ "channel": "news", "title": "Spaced", "media_reference": "m/spaced",
                   "start": "2025-01-06 08:00:00.250", "duration": "30 min" }},
                {{ "channel": "{}", "title": "ById", "media_reference": "m/by-id",
                   "start": 1736150400, "duration": 600 }},
                {{ "channel": "news", "title": "Broken", "media_reference": "m/broken",
                   "start": "tomorrow-ish", "duration": 60 }},
                {{ "channel": "nowhere", "title": "Lost", "media_reference": "m/lost",
                   "start": "2025-01-06T06:00:00Z", "duration": 60 }}
            ]
        }}"#,
        existing.id
    );

    let file = ImportFile::from_json(&json).unwrap();
    let report = import(&h.service, file).await.unwrap();

    assert_eq!(report.channels_created, 1);
    assert_eq!(report.programs_imported, 4);
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.rejected[0].title, "Broken");
    assert_eq!(report.unknown_channel, vec!["Lost".to_string()]);

    // Morning ends exactly when Zoned starts
    assert!(report.overlaps.is_empty());

    let news = h
        .service
        .list_channels()
        .await
        .unwrap()
        .into_iter()
        .find(|c| c.name == "news")
        .unwrap();
    let titles: Vec<(String, i64, i64)> = h.live_rows(news.id).await;
    assert_eq!(
        titles,
        vec![
            ("Morning".to_string(), at(6, 0, 0).timestamp(), 3600),
            ("Zoned".to_string(), at(7, 0, 0).timestamp(), 1800),
            ("Spaced".to_string(), at(8, 0, 0).timestamp(), 30),
        ]
    );

    let r = h.service.resolve_now(existing.id, at(8, 5, 0).into()).await;
    assert_eq!(r.state, PlayoutState::ProgramActive);
    assert_eq!(r.program.unwrap().title, "ById");
}

#[tokio::test]
async fn test_import_reports_overlaps() {
    let h = TestHarness::new().await;
    let json = r#"{
        "channels": [ { "name": "main", "standby_media_reference": "s" } ],
        "programs": [
            { "channel": "main", "title": "Long", "media_reference": "m/1",
              "start": "2025-01-06T00:00:00", "duration": 7200 },
            { "channel": "main", "title": "Inside", "media_reference": "m/2",
              "start": "2025-01-06T01:00:00", "duration": 600 }
        ]
    }"#;

    let report = import(&h.service, ImportFile::from_json(json).unwrap()).await.unwrap();
    assert_eq!(report.overlaps, vec![("Long".to_string(), "Inside".to_string())]);
    assert_eq!(report.programs_imported, 2);
}

#[tokio::test]
async fn test_import_rejects_malformed_json() {
    assert!(ImportFile::from_json("{ not json").is_err());
    let empty = ImportFile::from_json("{}").unwrap();
    assert!(empty.channels.is_empty() && empty.programs.is_empty());
}

#[tokio::test]
async fn test_failed_import_leaves_database_untouched() {
    let h = TestHarness::new().await;
    let existing = h.channel("existing").await;
    let taken = h.program(existing.id, "Taken", at(1, 0, 0), 600).await;

    let json = format!(
        r#"{{
            "channels": [ {{ "name": "fresh", "standby_media_reference": "s" }} ],
            "programs": [
                {{ "channel": "fresh", "title": "Fine", "media_reference": "m/1",
                   "start": "2025-01-06T00:00:00Z", "duration": 600 }},
                {{ "id": "{}", "channel": "fresh", "title": "Clash", "media_reference": "m/2",
                   "start": "2025-01-06T02:00:00Z", "duration": 600 }}
            ]
        }}"#,
        taken.id
    );

    assert!(import(&h.service, ImportFile::from_json(&json).unwrap()).await.is_err());

    let names: Vec<String> = h
        .service
        .list_channels()
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["existing".to_string()]);
    assert_eq!(h.live_rows(existing.id).await.len(), 1);
}
