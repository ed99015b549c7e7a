//! Error responses
//!
//! Every failure is returned as `{ "error": "..." }`.

use crate::error::Error;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chanplay_common::time::{parse_day, parse_time_of_day};
use chrono::{NaiveDate, NaiveTime};
use serde_json::json;
use tracing::error;
use uuid::Uuid;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Service(Error),
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError::Service(e)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Service(e) => match e {
                Error::ChannelNotFound(_) => StatusCode::NOT_FOUND,
                Error::InvalidInput(_) | Error::Chain(_) => StatusCode::BAD_REQUEST,
                Error::NoDraft { .. } | Error::Publish { .. } => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::BadRequest(message) => message,
            ApiError::Service(e) => {
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    error!("Request failed: {}", e);
                }
                e.to_string()
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub fn parse_channel_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("Invalid channel id: {raw}")))
}

pub fn parse_day_param(raw: &str) -> Result<NaiveDate, ApiError> {
    parse_day(raw).ok_or_else(|| ApiError::BadRequest(format!("Invalid day (expected YYYY-MM-DD): {raw}")))
}

pub fn parse_base_param(raw: Option<&str>) -> Result<Option<NaiveTime>, ApiError> {
    raw.map(|raw| {
        parse_time_of_day(raw)
            .ok_or_else(|| ApiError::BadRequest(format!("Invalid base (expected HH:MM:SS): {raw}")))
    })
    .transpose()
}
