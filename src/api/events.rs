//! Server-sent equipment change feed

use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use tokio_stream::{
    wrappers::{errors::BroadcastStreamRecvError, BroadcastStream},
    Stream, StreamExt,
};

use crate::AppState;

/// Stream of equipment changes as they land in the database, whichever
/// client or process made them. Event name is `equipment`; the payload is
/// the change envelope with the full row image.
#[utoipa::path(
    get,
    path = "/events/equipment",
    tag = "events",
    responses(
        (status = 200, description = "SSE stream of equipment changes", content_type = "text/event-stream")
    )
)]
pub async fn equipment_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.services.realtime.subscribe();
    tracing::debug!(
        "sse subscriber connected ({} active)",
        state.services.realtime.subscriber_count()
    );

    let stream = BroadcastStream::new(rx).filter_map(|change| match change {
        Ok(change) => match Event::default().event("equipment").json_data(&change) {
            Ok(event) => Some(Ok(event)),
            Err(e) => {
                tracing::warn!("failed to encode change event: {}", e);
                None
            }
        },
        // A slow consumer misses changes rather than stalling the feed.
        Err(BroadcastStreamRecvError::Lagged(missed)) => {
            tracing::warn!("sse subscriber lagged, {} changes dropped", missed);
            None
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
