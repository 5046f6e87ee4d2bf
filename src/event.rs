//! Change-notification event types (§3).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The kind of row change an [`Event`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordAction {
  Create,
  Update,
  Delete,
}

impl RecordAction {
  pub fn is_delete(self) -> bool {
    matches!(self, Self::Delete)
  }
}

/// An immutable value describing a single row change (§3).
///
/// For create/update, `record` is the post-image. For delete, `record` must
/// at minimum contain all primary-key column values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
  pub action: RecordAction,
  /// Unqualified table name, matches the schema snapshot.
  pub table: String,
  pub record: Map<String, Value>,
}

impl Event {
  pub fn new(action: RecordAction, table: impl Into<String>, record: Map<String, Value>) -> Self {
    return Self {
      action,
      table: table.into(),
      record,
    };
  }
}

/// The payload of the one-shot auth side channel (§3).
///
/// Exactly one of {both tokens non-empty, error non-empty} is populated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthResultEvent {
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub token: String,
  #[serde(
    default,
    rename = "refreshToken",
    skip_serializing_if = "String::is_empty"
  )]
  pub refresh_token: String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub error: String,
}

impl AuthResultEvent {
  pub fn success(token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
    return Self {
      token: token.into(),
      refresh_token: refresh_token.into(),
      error: String::new(),
    };
  }

  pub fn failure(error: impl Into<String>) -> Self {
    return Self {
      token: String::new(),
      refresh_token: String::new(),
      error: error.into(),
    };
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn event_encodes_three_attributes() {
    let mut record = Map::new();
    record.insert("id".to_string(), Value::from(1));
    record.insert("title".to_string(), Value::from("Hello"));

    let event = Event::new(RecordAction::Create, "posts", record);
    let json = serde_json::to_value(&event).unwrap();

    assert_eq!(
      json,
      serde_json::json!({
        "action": "create",
        "table": "posts",
        "record": {"id": 1, "title": "Hello"},
      })
    );
  }

  #[test]
  fn auth_result_event_omits_empty_fields() {
    let success = AuthResultEvent::success("AT", "RT");
    assert_eq!(
      serde_json::to_value(&success).unwrap(),
      serde_json::json!({"token": "AT", "refreshToken": "RT"})
    );

    let failure = AuthResultEvent::failure("popup closed");
    assert_eq!(
      serde_json::to_value(&failure).unwrap(),
      serde_json::json!({"error": "popup closed"})
    );
  }

  #[test]
  fn delete_is_recognized() {
    assert!(RecordAction::Delete.is_delete());
    assert!(!RecordAction::Create.is_delete());
    assert!(!RecordAction::Update.is_delete());
  }
}
