//! HTTP surface (§6, §10.5).

mod realtime;

pub use realtime::{realtime_handler, RealtimeQuery};

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;

use crate::app_state::AppState;
use crate::constants::{HEALTHCHECK_API_PATH, REALTIME_API_PATH};

pub fn router() -> Router<AppState> {
  return Router::new()
    .route(&format!("/{REALTIME_API_PATH}"), get(realtime_handler))
    .route(&format!("/{HEALTHCHECK_API_PATH}"), get(healthcheck));
}

async fn healthcheck() -> StatusCode {
  return StatusCode::OK;
}
