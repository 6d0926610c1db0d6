//! Server-Sent Events support

use crate::runtime::WorkspaceEvent;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Convert broadcast stream to SSE stream
pub fn sse_stream(
    init_event: WorkspaceEvent,
    broadcast_rx: tokio::sync::broadcast::Receiver<WorkspaceEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // Create stream that starts with init event then broadcasts
    let init = futures::stream::once(async move { Ok(to_sse_event(init_event)) });

    let broadcasts = BroadcastStream::new(broadcast_rx).filter_map(|result| match result {
        Ok(event) => Some(Ok(to_sse_event(event))),
        Err(_) => None, // Skip lagged messages
    });

    let combined = init.chain(broadcasts);

    Sse::new(combined).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn to_sse_event(event: WorkspaceEvent) -> Event {
    let (event_type, data) = event_payload(event);
    Event::default().event(event_type).data(data.to_string())
}

fn event_payload(event: WorkspaceEvent) -> (&'static str, serde_json::Value) {
    match event {
        WorkspaceEvent::Init {
            session,
            last_sequence_id,
        } => (
            "init",
            json!({
                "type": "init",
                "session": session,
                "last_sequence_id": last_sequence_id
            }),
        ),
        WorkspaceEvent::Message { message } => (
            "message",
            json!({
                "type": "message",
                "message": message
            }),
        ),
        WorkspaceEvent::StateChange { state } => (
            "state_change",
            json!({
                "type": "state_change",
                "state": state
            }),
        ),
        WorkspaceEvent::Preview { html } => (
            "preview",
            json!({
                "type": "preview",
                "html": html
            }),
        ),
        WorkspaceEvent::SessionReset => (
            "session_reset",
            json!({
                "type": "session_reset"
            }),
        ),
        WorkspaceEvent::Error { message } => (
            "error",
            json!({
                "type": "error",
                "message": message
            }),
        ),
    }
}
