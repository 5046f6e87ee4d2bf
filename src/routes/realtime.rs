//! The streaming endpoint (§4.2).
//!
//! Grounded on the host platform's `records::subscribe::add_subscription_sse_handler`
//! for the overall shape (extract → register with the hub → `Sse::new` over
//! a receiver-backed stream, unregistering via an RAII guard on drop), with
//! the per-event body replaced by the visibility probe this subsystem adds.
//! The generator itself uses `async_stream::stream!`, the idiom this
//! codebase's own async-runtime crates (`trailbase-apalis`) reach for when a
//! stream's body needs to `.await` between yields, which a hand-rolled
//! `Stream::poll_next` over `AutoCleanupEventStream` does not need to here.

use std::collections::HashSet;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, Version};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::IntoResponse;
use futures_util::Stream;
use serde::Deserialize;

use crate::app_state::AppState;
use crate::auth::Claims;
use crate::constants::HEADER_PROXY_BUFFERING;
use crate::error::ApiError;
use crate::hub::Hub;
use crate::sse;

#[derive(Debug, Default, Deserialize)]
pub struct RealtimeQuery {
  #[serde(default)]
  pub tables: Option<String>,
  #[serde(default)]
  pub token: Option<String>,
  #[serde(default)]
  pub auth: Option<bool>,
}

/// Unregisters the subscriber when the stream (and therefore the HTTP
/// response body) is dropped, which happens on client disconnect as well as
/// on normal completion (§4.2.1, §5).
struct UnsubscribeGuard {
  hub: Hub,
  id: String,
}

impl Drop for UnsubscribeGuard {
  fn drop(&mut self) {
    self.hub.unsubscribe(&self.id);
  }
}

type EventStream = Sse<std::pin::Pin<Box<dyn Stream<Item = Result<SseEvent, axum::Error>> + Send>>>;

/// Hints intermediate reverse proxies to flush each SSE frame immediately
/// rather than buffering the response body (§6).
const PROXY_BUFFERING_HEADERS: [(&str, &str); 1] = [(HEADER_PROXY_BUFFERING, "no")];

pub async fn realtime_handler(
  State(state): State<AppState>,
  Query(query): Query<RealtimeQuery>,
  headers: HeaderMap,
  version: Version,
) -> Result<impl IntoResponse, ApiError> {
  if !supports_incremental_flushing(version) {
    return Err(ApiError::StreamingUnsupported);
  }

  let stream = if query.auth.unwrap_or(false) {
    auth_subflow(state)
  } else {
    let claims = authenticate(&state, &headers, query.token.as_deref()).await?;
    let tables = resolve_tables(&state, query.tables.as_deref())?;
    table_subflow(state, claims, tables)
  };

  return Ok((PROXY_BUFFERING_HEADERS, stream));
}

fn supports_incremental_flushing(version: Version) -> bool {
  return version != Version::HTTP_09 && version != Version::HTTP_10;
}

async fn authenticate(
  state: &AppState,
  headers: &HeaderMap,
  token_query_param: Option<&str>,
) -> Result<Option<Claims>, ApiError> {
  let Some(validator) = state.validator() else {
    return Ok(None);
  };

  let token = extract_token(headers, token_query_param).ok_or(ApiError::Unauthorized("missing token"))?;

  let claims = validator
    .validate(token)
    .await
    .map_err(|_err| ApiError::Unauthorized("invalid or expired token"))?;

  return Ok(Some(claims));
}

fn extract_token<'a>(headers: &'a HeaderMap, token_query_param: Option<&'a str>) -> Option<&'a str> {
  let from_header = headers.get(axum::http::header::AUTHORIZATION).and_then(|value| {
    value.to_str().ok().and_then(|s| s.strip_prefix("Bearer "))
  });

  return from_header.or(token_query_param);
}

fn resolve_tables(state: &AppState, tables_param: Option<&str>) -> Result<HashSet<String>, ApiError> {
  let raw = tables_param.filter(|s| !s.is_empty()).ok_or(ApiError::BadRequest("missing tables"))?;

  let mut tables = HashSet::new();
  for name in raw.split(',') {
    let name = name.trim();
    if name.is_empty() {
      continue;
    }

    if state.schema().table_by_name(name).is_none() {
      return Err(ApiError::BadRequestOwned(format!("unknown table: {name}")));
    }
    tables.insert(name.to_string());
  }

  if tables.is_empty() {
    return Err(ApiError::BadRequest("no valid tables requested"));
  }

  return Ok(tables);
}

fn auth_stream(state: AppState) -> impl Stream<Item = Result<SseEvent, axum::Error>> {
  let subscriber = state.hub().subscribe_auth();
  let id = subscriber.id().to_string();
  let guard = UnsubscribeGuard {
    hub: state.hub().clone(),
    id: id.clone(),
  };

  return async_stream::stream! {
    let _guard = guard;
    yield sse::connected_frame(&id);

    if let Some(result) = subscriber.recv_auth().await {
      yield sse::oauth_frame(&result);
    }
  };
}

fn auth_subflow(state: AppState) -> EventStream {
  let boxed: std::pin::Pin<Box<dyn Stream<Item = Result<SseEvent, axum::Error>> + Send>> =
    Box::pin(auth_stream(state));
  return Sse::new(boxed).keep_alive(KeepAlive::default());
}

fn table_stream(
  state: AppState,
  claims: Option<Claims>,
  tables: HashSet<String>,
) -> impl Stream<Item = Result<SseEvent, axum::Error>> {
  let subscriber = state.hub().subscribe(tables);
  let id = subscriber.id().to_string();
  let guard = UnsubscribeGuard {
    hub: state.hub().clone(),
    id: id.clone(),
  };
  let prober = state.prober().clone();

  return async_stream::stream! {
    let _guard = guard;
    yield sse::connected_frame(&id);

    while let Some(event) = subscriber.recv().await {
      if !prober.check(claims.as_ref(), &event).await.is_visible() {
        continue;
      }
      yield sse::data_frame(&event);
    }
  };
}

fn table_subflow(state: AppState, claims: Option<Claims>, tables: HashSet<String>) -> EventStream {
  let boxed: std::pin::Pin<Box<dyn Stream<Item = Result<SseEvent, axum::Error>> + Send>> =
    Box::pin(table_stream(state, claims, tables));
  return Sse::new(boxed).keep_alive(KeepAlive::default());
}
