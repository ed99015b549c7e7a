//! Reschedule preview/apply endpoints

use super::error::{parse_base_param, parse_channel_id, parse_day_param, ApiError};
use super::AppState;
use crate::reschedule::{RescheduleReport, RescheduleRow, RescheduleTarget};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use chanplay_common::time::base_instant;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct BaseParam {
    /// UTC time of day to chain from; midnight when absent
    pub base: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub channel_id: Uuid,
    pub day: NaiveDate,
    pub base_instant: DateTime<Utc>,
    pub rows: Vec<RescheduleRow>,
}

/// GET /channels/:id/reschedule/:day?base=
pub async fn preview(
    State(state): State<AppState>,
    Path((id, day)): Path<(String, String)>,
    Query(query): Query<BaseParam>,
) -> Result<Json<PreviewResponse>, ApiError> {
    let channel_id = parse_channel_id(&id)?;
    let day = parse_day_param(&day)?;
    let base = parse_base_param(query.base.as_deref())?;

    let rows = state.service.preview_reschedule(channel_id, day, base).await?;
    Ok(Json(PreviewResponse {
        channel_id,
        day,
        base_instant: base_instant(day, base),
        rows,
    }))
}

/// POST /channels/:id/reschedule/:day
pub async fn apply_channel(
    State(state): State<AppState>,
    Path((id, day)): Path<(String, String)>,
    body: Option<Json<BaseParam>>,
) -> Result<Json<RescheduleReport>, ApiError> {
    let channel_id = parse_channel_id(&id)?;
    let day = parse_day_param(&day)?;
    let Json(req) = body.unwrap_or_default();
    let base = parse_base_param(req.base.as_deref())?;

    let report = state
        .service
        .apply_reschedule(RescheduleTarget::Channel(channel_id), day, base)
        .await?;
    Ok(Json(report))
}

/// POST /reschedule/:day
pub async fn apply_all(
    State(state): State<AppState>,
    Path(day): Path<String>,
    body: Option<Json<BaseParam>>,
) -> Result<Json<RescheduleReport>, ApiError> {
    let day = parse_day_param(&day)?;
    let Json(req) = body.unwrap_or_default();
    let base = parse_base_param(req.base.as_deref())?;

    let report = state
        .service
        .apply_reschedule(RescheduleTarget::All, day, base)
        .await?;
    Ok(Json(report))
}
