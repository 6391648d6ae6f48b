use crate::models::events::EventType;
use crate::web::api::ApiContext;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use log::debug;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;

/// Bridge the in-process event bus onto the SSE broadcast channel: every
/// domain event is serialized once and fanned out to connected clients.
pub fn forward_bus_events(context: &ApiContext) {
    for event_type in EventType::ALL {
        let tx = context.event_tx.clone();
        context.core.event_bus.subscribe_sync(
            event_type,
            "api-sse-forwarder",
            -10,
            move |event| match serde_json::to_string(event.as_ref()) {
                Ok(payload) => {
                    // Send fails only when no client is connected.
                    let _ = tx.send(payload);
                }
                Err(e) => debug!("Event serialization for SSE failed: {}", e),
            },
        );
    }
}

/// SSE stream of domain events.
pub async fn event_stream(
    State(context): State<ApiContext>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let rx = context.event_tx.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|item| match item {
        Ok(payload) => Some(Ok(Event::default().data(payload))),
        // A lagged receiver just skips ahead.
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
