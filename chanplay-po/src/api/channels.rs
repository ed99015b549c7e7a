//! Channel resolution and live signal endpoints

use super::error::{parse_channel_id, ApiError};
use super::AppState;
use crate::service::Resolution;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use chanplay_common::db::Channel;
use chanplay_common::time::normalize_timestamp;
use chanplay_common::NormalizedTime;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct AtQuery {
    /// Any supported timestamp encoding; defaults to the service clock
    pub at: Option<String>,
}

impl AtQuery {
    /// An unparseable `at` resolves as an invalid instant, not an error
    fn instant(&self) -> Option<NormalizedTime> {
        self.at.as_deref().map(normalize_timestamp)
    }
}

#[derive(Debug, Deserialize)]
pub struct OverrideRequest {
    pub active: bool,
}

#[derive(Debug, Deserialize)]
pub struct PlaybackFailureRequest {
    pub program_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

/// GET /channels
pub async fn list_channels(State(state): State<AppState>) -> Result<Json<Vec<Channel>>, ApiError> {
    Ok(Json(state.service.list_channels().await?))
}

/// GET /channels/:id/now?at=
pub async fn resolve_now(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<AtQuery>,
) -> Result<Json<Resolution>, ApiError> {
    let channel_id = parse_channel_id(&id)?;
    let resolution = state
        .service
        .resolve_channel(channel_id, query.instant())
        .await?;
    Ok(Json(resolution))
}

/// GET /guide?at=
pub async fn guide(State(state): State<AppState>, Query(query): Query<AtQuery>) -> Json<Vec<Resolution>> {
    let now = query
        .instant()
        .unwrap_or_else(|| state.service.now().into());
    Json(state.service.guide(now).await)
}

/// POST /channels/:id/override
pub async fn set_override(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<OverrideRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let channel_id = parse_channel_id(&id)?;
    state.service.set_override_active(channel_id, req.active).await?;
    info!("Override on channel {} set to {}", channel_id, req.active);
    Ok(Json(StatusResponse {
        status: "ok".to_string(),
    }))
}

/// POST /channels/:id/playback-failure
pub async fn playback_failure(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<PlaybackFailureRequest>,
) -> Result<Json<Resolution>, ApiError> {
    let channel_id = parse_channel_id(&id)?;
    state
        .service
        .report_playback_failure(channel_id, req.program_id)
        .await?;
    Ok(Json(state.service.resolve_channel(channel_id, None).await?))
}
