//! Server-Sent Events (SSE) utilities

use crate::events::PlayoutEvent;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Heartbeat / keep-alive interval for SSE connections
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Stream playout events from a bus receiver as SSE
///
/// Each event is sent with its `event_type()` as the SSE event name and its
/// JSON form as data. A lagging client is told how many events it missed and
/// keeps streaming.
pub fn playout_event_stream(
    service_name: &'static str,
    mut rx: broadcast::Receiver<PlayoutEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New SSE client connected to {} events", service_name);

    let stream = async_stream::stream! {
        yield Ok(Event::default()
            .event("ConnectionStatus")
            .data("connected"));

        loop {
            match rx.recv().await {
                Ok(event) => {
                    let name = event.event_type();
                    match serde_json::to_string(&event) {
                        Ok(data) => {
                            debug!("SSE: sending {}", name);
                            yield Ok(Event::default().event(name).data(data));
                        }
                        Err(e) => warn!("SSE: failed to serialize {}: {}", name, e),
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("SSE: client lagged, skipped {} events", skipped);
                    yield Ok(Event::default()
                        .event("Lagged")
                        .data(skipped.to_string()));
                }
                Err(broadcast::error::RecvError::Closed) => {
                    info!("SSE: {} event bus closed", service_name);
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(HEARTBEAT_INTERVAL)
            .text("heartbeat"),
    )
}
