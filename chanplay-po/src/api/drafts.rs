//! Draft and publish endpoints

use super::error::{parse_channel_id, parse_day_param, ApiError};
use super::AppState;
use crate::draft::{DraftRowInput, PublishOutcome};
use crate::service::DraftHistory;
use axum::{
    extract::{Path, State},
    Json,
};
use chanplay_common::db::DraftSnapshot;
use chanplay_common::time::{base_instant, normalize_timestamp, parse_time_of_day};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct SaveDraftRequest {
    /// Time of day (`HH:MM:SS`) or full timestamp; midnight of the day when absent
    #[serde(default)]
    pub base: Option<String>,
    pub rows: Vec<DraftRowInput>,
}

/// Chaining base of a draft save
fn resolve_base(day: NaiveDate, raw: Option<&str>) -> Result<DateTime<Utc>, ApiError> {
    let Some(raw) = raw else {
        return Ok(base_instant(day, None));
    };
    if let Some(time) = parse_time_of_day(raw) {
        return Ok(base_instant(day, Some(time)));
    }
    normalize_timestamp(raw)
        .instant()
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid base: {raw}")))
}

fn parse_key(id: &str, day: &str) -> Result<(Uuid, NaiveDate), ApiError> {
    Ok((parse_channel_id(id)?, parse_day_param(day)?))
}

/// GET /channels/:id/drafts/:day
pub async fn load_draft(
    State(state): State<AppState>,
    Path((id, day)): Path<(String, String)>,
) -> Result<Json<DraftSnapshot>, ApiError> {
    let (channel_id, day) = parse_key(&id, &day)?;
    Ok(Json(state.service.load_draft(channel_id, day).await?))
}

/// POST /channels/:id/drafts/:day/load
pub async fn load_from_published(
    State(state): State<AppState>,
    Path((id, day)): Path<(String, String)>,
) -> Result<Json<DraftSnapshot>, ApiError> {
    let (channel_id, day) = parse_key(&id, &day)?;
    Ok(Json(state.service.load_from_published(channel_id, day).await?))
}

/// PUT /channels/:id/drafts/:day
pub async fn save_draft(
    State(state): State<AppState>,
    Path((id, day)): Path<(String, String)>,
    Json(req): Json<SaveDraftRequest>,
) -> Result<Json<DraftSnapshot>, ApiError> {
    let (channel_id, day) = parse_key(&id, &day)?;
    let base = resolve_base(day, req.base.as_deref())?;
    Ok(Json(state.service.save_draft(channel_id, day, base, req.rows).await?))
}

/// POST /channels/:id/drafts/:day/publish
pub async fn publish(
    State(state): State<AppState>,
    Path((id, day)): Path<(String, String)>,
) -> Result<Json<PublishOutcome>, ApiError> {
    let (channel_id, day) = parse_key(&id, &day)?;
    Ok(Json(state.service.publish_draft(channel_id, day).await?))
}

/// GET /channels/:id/drafts/:day/history
pub async fn history(
    State(state): State<AppState>,
    Path((id, day)): Path<(String, String)>,
) -> Result<Json<DraftHistory>, ApiError> {
    let (channel_id, day) = parse_key(&id, &day)?;
    Ok(Json(state.service.draft_history(channel_id, day).await?))
}
