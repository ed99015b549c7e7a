//! Server-Sent Events for playout state

use super::AppState;
use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;

/// GET /events
///
/// Streams `PlayoutStateChanged`, `OverrideChanged`, `PlaybackFailed`,
/// `ScheduleRescheduled`, `DraftSaved` and `DraftPublished` events.
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    chanplay_common::sse::playout_event_stream("chanplay-po", state.service.events().subscribe())
}
