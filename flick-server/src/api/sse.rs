//! Server-Sent Events stream endpoint
//!
//! The single push channel shared by every connected client. Each
//! connection subscribes to the EventBus and re-emits every event as a
//! wire message. No server-side filtering by correlation id: one shared
//! channel bounds the connection count and clients filter locally.

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::state::AppContext;

/// GET /stream - shared SSE event stream
pub async fn event_stream(
    State(ctx): State<AppContext>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(
        clients = ctx.bus.subscriber_count() + 1,
        "new SSE client connected"
    );

    let rx = ctx.bus.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(event) => {
                let wire = event.to_wire();
                debug!(kind = wire.kind.as_str(), query_id = %wire.query_id, "forwarding event");

                match serde_json::to_string(&wire) {
                    Ok(json) => Some(Ok(Event::default()
                        .id(Uuid::new_v4().to_string())
                        .data(json))),
                    Err(e) => {
                        warn!("failed to serialize event: {e}");
                        None
                    }
                }
            }
            Err(e) => {
                // BroadcastStream wraps RecvError (lagged subscriber);
                // skip and keep the connection alive
                warn!("SSE stream error: {e:?}");
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
