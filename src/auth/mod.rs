//! Authorization validator contract (§6) and the claims record it produces
//! (§3).

mod error;
mod jwt;

pub use error::AuthError;
pub use jwt::{JwtClaims, JwtValidator};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The validated identity passed to the visibility prober and the endpoint.
///
/// Opaque to the Hub; the Hub never inspects a [`Claims`] value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
  pub subject: String,
  pub email: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub role: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub api_key_scope: Option<String>,
  /// Marks a partially-authenticated state (e.g. unverified email). The
  /// authorization-context routine may propagate this into the database
  /// transaction alongside the subject id.
  #[serde(default)]
  pub partial: bool,
}

impl Claims {
  pub fn new(subject: impl Into<String>, email: impl Into<String>) -> Self {
    return Self {
      subject: subject.into(),
      email: email.into(),
      role: None,
      api_key_scope: None,
      partial: false,
    };
  }

  pub fn with_role(mut self, role: impl Into<String>) -> Self {
    self.role = Some(role.into());
    return self;
  }
}

/// Validates a bearer token, returning the claims it asserts or an error.
///
/// Implementations MUST reject expired tokens and bad signatures.
#[async_trait]
pub trait Validator: Send + Sync {
  async fn validate(&self, token: &str) -> Result<Claims, AuthError>;
}
