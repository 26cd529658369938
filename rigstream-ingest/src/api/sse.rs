//! Server-Sent Events (SSE) live feed
//!
//! Each connection is one registry subscriber. Closing the connection drops
//! the subscription, which removes it from the registry.

use crate::AppState;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;
use tracing::{debug, warn};

/// SSE event name for drilling events
pub const DRILLING_EVENT: &str = "drilling_event";

/// GET /events - live feed of enriched drilling events
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = state.registry.join();
    debug!(subscriber = %subscription.id(), "New SSE client connected");

    let stream = subscription.filter_map(|event| async move {
        match Event::default().event(DRILLING_EVENT).json_data(&*event) {
            Ok(sse_event) => Some(Ok(sse_event)),
            Err(e) => {
                warn!("Failed to serialize drilling event: {}", e);
                None
            }
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
