//! HTTP API for chanplay-po
//!
//! JSON over axum, plus an SSE stream of playout events at `/events`.

pub mod channels;
pub mod drafts;
pub mod error;
pub mod health;
pub mod reschedule;
pub mod sse;

use crate::service::PlayoutService;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use health::health_routes;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PlayoutService>,
}

impl AppState {
    pub fn new(service: Arc<PlayoutService>) -> Self {
        Self { service }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Resolution
        .route("/channels", get(channels::list_channels))
        .route("/channels/:id/now", get(channels::resolve_now))
        .route("/guide", get(channels::guide))
        // Live signals
        .route("/channels/:id/override", post(channels::set_override))
        .route("/channels/:id/playback-failure", post(channels::playback_failure))
        // Reschedule
        .route(
            "/channels/:id/reschedule/:day",
            get(reschedule::preview).post(reschedule::apply_channel),
        )
        .route("/reschedule/:day", post(reschedule::apply_all))
        // Drafts
        .route(
            "/channels/:id/drafts/:day",
            get(drafts::load_draft).put(drafts::save_draft),
        )
        .route("/channels/:id/drafts/:day/load", post(drafts::load_from_published))
        .route("/channels/:id/drafts/:day/publish", post(drafts::publish))
        .route("/channels/:id/drafts/:day/history", get(drafts::history))
        // SSE event stream
        .route("/events", get(sse::event_stream))
        .merge(health_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
