//! Adapts a `broadcast::Receiver<PipelineEvent>` into the `Stream<Item =
//! Result<Event, Infallible>>` shape `axum::response::sse::Sse` wants,
//! the way the teacher's API crates hand-roll a stream with
//! `futures::stream::unfold`/`stream::once` rather than pull in a
//! dedicated broadcast-to-stream adapter crate.

use crate::event::PipelineEvent;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream};
use std::convert::Infallible;
use tokio::sync::broadcast;

pub fn event_stream(rx: broadcast::Receiver<PipelineEvent>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let body = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
                    let sse_event = Event::default().event(event.kind()).data(body);
                    return Some((Ok(sse_event), rx));
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "SSE subscriber lagged, dropping missed events");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
