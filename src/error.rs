//! Crate-wide HTTP error type (§6, §7).
//!
//! Mirrors the host platform's `RecordError`/`AuthError` shape — a small,
//! deliberately opaque set of variants with an explicit status mapping —
//! but serializes as the JSON contract this subsystem's endpoint promises
//! (`{code, message, docUrl}`) instead of the host's plain-text body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::*;
use serde::Serialize;
use thiserror::Error;

use crate::constants::DOC_URL_BASE;

#[derive(Debug, Error)]
pub enum ApiError {
  #[error("bad request: {0}")]
  BadRequest(&'static str),
  #[error("bad request: {0}")]
  BadRequestOwned(String),
  #[error("unauthorized: {0}")]
  Unauthorized(&'static str),
  #[error("response does not support incremental flushing")]
  StreamingUnsupported,
  #[error("internal: {0}")]
  Internal(Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  fn status(&self) -> StatusCode {
    return match self {
      Self::BadRequest(_) | Self::BadRequestOwned(_) => StatusCode::BAD_REQUEST,
      Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
      Self::StreamingUnsupported => StatusCode::INTERNAL_SERVER_ERROR,
      Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
  }

  fn doc_slug(&self) -> &'static str {
    return match self {
      Self::BadRequest(_) | Self::BadRequestOwned(_) => "bad-request",
      Self::Unauthorized(_) => "unauthorized",
      Self::StreamingUnsupported => "streaming-unsupported",
      Self::Internal(_) => "internal",
    };
  }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
  code: u16,
  message: String,
  #[serde(rename = "docUrl")]
  doc_url: String,
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let doc_url = format!("{DOC_URL_BASE}/{}", self.doc_slug());

    let message = match &self {
      Self::BadRequest(msg) => msg.to_string(),
      Self::BadRequestOwned(msg) => msg.clone(),
      Self::Unauthorized(msg) => msg.to_string(),
      Self::StreamingUnsupported => self.to_string(),
      Self::Internal(err) => {
        error!("internal error: {err}");
        if cfg!(debug_assertions) {
          err.to_string()
        } else {
          "internal error".to_string()
        }
      }
    };

    let body = ErrorBody {
      code: status.as_u16(),
      message,
      doc_url,
    };

    return (status, Json(body)).into_response();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::body::to_bytes;

  #[tokio::test]
  async fn bad_request_yields_400_with_message() {
    let response = ApiError::BadRequest("unknown table: nope").into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["code"], 400);
    assert_eq!(json["message"], "unknown table: nope");
    assert!(json["docUrl"].as_str().unwrap().contains("bad-request"));
  }

  #[tokio::test]
  async fn unauthorized_yields_401() {
    let response = ApiError::Unauthorized("missing token").into_response();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn internal_hides_detail_in_release_profile_semantics() {
    let response = ApiError::Internal("db exploded".into()).into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
  }
}
