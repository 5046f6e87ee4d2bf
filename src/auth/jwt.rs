//! Reference [`super::Validator`] implementation backed by HS256 JWTs.
//!
//! Mirrors the host platform's `auth::jwt`/`auth::tokens` wiring (decode a
//! bearer token into a typed claims struct, reject on signature/expiry
//! failure) without the cookie-based refresh flow, which this subsystem's
//! token-or-header auth model doesn't need.

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use super::{AuthError, Claims, Validator};

/// The on-wire shape of the JWT this validator decodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
  /// Subject (user id).
  pub sub: String,
  pub email: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub role: Option<String>,
  #[serde(default, rename = "scope", skip_serializing_if = "Option::is_none")]
  pub api_key_scope: Option<String>,
  #[serde(default)]
  pub partial: bool,
  /// Standard `exp` claim, enforced by `jsonwebtoken`'s validation.
  pub exp: i64,
}

impl From<JwtClaims> for Claims {
  fn from(value: JwtClaims) -> Self {
    return Claims {
      subject: value.sub,
      email: value.email,
      role: value.role,
      api_key_scope: value.api_key_scope,
      partial: value.partial,
    };
  }
}

/// Decodes and validates HS256-signed auth tokens.
pub struct JwtValidator {
  decoding_key: DecodingKey,
  validation: Validation,
}

impl JwtValidator {
  pub fn new(secret: &[u8]) -> Self {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    return Self {
      decoding_key: DecodingKey::from_secret(secret),
      validation,
    };
  }
}

#[async_trait]
impl Validator for JwtValidator {
  async fn validate(&self, token: &str) -> Result<Claims, AuthError> {
    let data = jsonwebtoken::decode::<JwtClaims>(token, &self.decoding_key, &self.validation)
      .map_err(|_err| AuthError::Invalid)?;

    return Ok(data.claims.into());
  }
}
