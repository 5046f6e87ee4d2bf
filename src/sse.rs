//! Wire framing for the streaming endpoint (§4.3, §6).
//!
//! Builds on `axum::response::sse::{Event, Sse}`, the same type the host
//! platform's `records::subscribe` module streams through — its
//! `Event::default().json_data(...)` idiom already produces exactly the
//! `data: <json>\n\n` / `event: <name>\ndata: <json>\n\n` framing this
//! subsystem's contract promises, so this module only names the three frame
//! kinds rather than hand-rolling the wire format.

use axum::response::sse::Event as SseEvent;
use serde::Serialize;

use crate::event::{AuthResultEvent, Event};

/// The `connected` frame sent immediately after a subscriber registers.
#[derive(Debug, Serialize)]
struct ConnectedPayload<'a> {
  #[serde(rename = "clientId")]
  client_id: &'a str,
}

pub fn connected_frame(client_id: &str) -> Result<SseEvent, axum::Error> {
  return SseEvent::default()
    .event("connected")
    .json_data(ConnectedPayload { client_id });
}

/// A default-named data frame carrying one change event.
pub fn data_frame(event: &Event) -> Result<SseEvent, axum::Error> {
  return SseEvent::default().json_data(event);
}

/// The one-shot `oauth` frame carrying an auth-flow result.
pub fn oauth_frame(result: &AuthResultEvent) -> Result<SseEvent, axum::Error> {
  return SseEvent::default().event("oauth").json_data(result);
}

/// Renders a single SSE frame to its wire bytes, for tests that assert on
/// the exact `data:`/`event:` framing rather than the JSON payload alone.
/// Shared with `routes::realtime`'s stream-level tests.
#[cfg(test)]
pub(crate) async fn render(event: SseEvent) -> String {
  use axum::body::to_bytes;
  use axum::response::IntoResponse;
  use futures_util::stream;

  let stream = stream::iter(vec![Ok::<_, axum::Error>(event)]);
  let sse = axum::response::sse::Sse::new(stream);
  let resp = sse.into_response();
  let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  return String::from_utf8_lossy(&bytes).into_owned();
}
