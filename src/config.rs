//! Runtime configuration (§6, ambient).
//!
//! The host platform loads a protobuf `Config` from a textproto file on
//! disk with a vault-backed secrets layer; this subsystem has a much
//! smaller surface (a database pool, a JWT secret, a bind address) so it
//! loads from environment variables instead, in the style of the simpler
//! example services in this codebase rather than the host's full config
//! machinery.

use std::env;
use std::net::SocketAddr;

use thiserror::Error;

use crate::constants::DEFAULT_EVENT_CHANNEL_CAPACITY;

const ENV_BIND_ADDRESS: &str = "REALTIME_BIND_ADDRESS";
const ENV_DATABASE_URL: &str = "REALTIME_DATABASE_URL";
const ENV_JWT_SECRET: &str = "REALTIME_JWT_SECRET";
const ENV_EVENT_CHANNEL_CAPACITY: &str = "REALTIME_EVENT_CHANNEL_CAPACITY";
const ENV_CORS_ALLOWED_ORIGINS: &str = "REALTIME_CORS_ALLOWED_ORIGINS";
const ENV_DEV_MODE: &str = "REALTIME_DEV_MODE";

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:4000";

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("invalid {0}: {1}")]
  InvalidValue(&'static str, String),
}

/// Runtime configuration for the realtime subsystem.
///
/// `database_url` and `jwt_secret` are both optional: absent, the server
/// runs with no visibility prober (probes fail open, §4.4) and no
/// authorization validator (all connections are treated as unauthenticated,
/// which is rejected unless the request is an auth-subflow request).
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
  pub bind_address: SocketAddr,
  pub database_url: Option<String>,
  pub jwt_secret: Option<String>,
  /// Per-subscriber event channel capacity (§4.1). The auth channel's
  /// capacity of 1 is fixed by spec and has no corresponding setting.
  pub event_channel_capacity: usize,
  /// `"*"` mirrors the request's own origin back; otherwise an explicit
  /// allow-list.
  pub cors_allowed_origins: Vec<String>,
  /// Relaxes origin/TLS assumptions the way the host platform's
  /// `ServerOptions::dev` does for local development. Unused by the core
  /// itself; surfaced for embedding binaries to branch on.
  pub dev_mode: bool,
}

impl RealtimeConfig {
  /// Loads configuration from environment variables, falling back to
  /// `0.0.0.0:4000` when `REALTIME_BIND_ADDRESS` is unset.
  pub fn from_env() -> Result<Self, ConfigError> {
    let bind_address_str =
      env::var(ENV_BIND_ADDRESS).unwrap_or_else(|_| DEFAULT_BIND_ADDRESS.to_string());
    let bind_address = bind_address_str
      .parse()
      .map_err(|_| ConfigError::InvalidValue(ENV_BIND_ADDRESS, bind_address_str))?;

    let event_channel_capacity = match env::var(ENV_EVENT_CHANNEL_CAPACITY) {
      Ok(raw) => raw
        .parse()
        .map_err(|_| ConfigError::InvalidValue(ENV_EVENT_CHANNEL_CAPACITY, raw))?,
      Err(_) => DEFAULT_EVENT_CHANNEL_CAPACITY,
    };

    let cors_allowed_origins = env::var(ENV_CORS_ALLOWED_ORIGINS)
      .ok()
      .map(|raw| raw.split(',').map(|s| s.trim().to_string()).collect())
      .unwrap_or_else(|| vec!["*".to_string()]);

    let dev_mode = env::var(ENV_DEV_MODE).is_ok_and(|raw| raw == "1" || raw == "true");

    return Ok(Self {
      bind_address,
      database_url: env::var(ENV_DATABASE_URL).ok(),
      jwt_secret: env::var(ENV_JWT_SECRET).ok(),
      event_channel_capacity,
      cors_allowed_origins,
      dev_mode,
    });
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  #[allow(unsafe_code)]
  fn defaults_to_known_bind_address_when_unset() {
    // SAFETY: test runs single-threaded w.r.t. this env var; no other test
    // in this crate touches REALTIME_BIND_ADDRESS.
    unsafe {
      env::remove_var(ENV_BIND_ADDRESS);
    }
    let config = RealtimeConfig::from_env().unwrap();
    assert_eq!(config.bind_address.to_string(), DEFAULT_BIND_ADDRESS);
  }

  #[test]
  #[allow(unsafe_code)]
  fn rejects_malformed_bind_address() {
    unsafe {
      env::set_var(ENV_BIND_ADDRESS, "not-an-address");
    }
    let result = RealtimeConfig::from_env();
    unsafe {
      env::remove_var(ENV_BIND_ADDRESS);
    }
    assert!(matches!(result, Err(ConfigError::InvalidValue(_, _))));
  }

  #[test]
  #[allow(unsafe_code)]
  fn defaults_event_channel_capacity_and_cors_origins_when_unset() {
    unsafe {
      env::remove_var(ENV_EVENT_CHANNEL_CAPACITY);
      env::remove_var(ENV_CORS_ALLOWED_ORIGINS);
      env::remove_var(ENV_DEV_MODE);
    }
    let config = RealtimeConfig::from_env().unwrap();
    assert_eq!(config.event_channel_capacity, DEFAULT_EVENT_CHANNEL_CAPACITY);
    assert_eq!(config.cors_allowed_origins, vec!["*".to_string()]);
    assert!(!config.dev_mode);
  }

  #[test]
  #[allow(unsafe_code)]
  fn parses_comma_separated_cors_origins() {
    unsafe {
      env::set_var(
        ENV_CORS_ALLOWED_ORIGINS,
        "https://a.example.com, https://b.example.com",
      );
    }
    let config = RealtimeConfig::from_env().unwrap();
    unsafe {
      env::remove_var(ENV_CORS_ALLOWED_ORIGINS);
    }
    assert_eq!(
      config.cors_allowed_origins,
      vec![
        "https://a.example.com".to_string(),
        "https://b.example.com".to_string(),
      ]
    );
  }
}
