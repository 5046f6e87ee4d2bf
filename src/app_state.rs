//! Shared, cheaply-cloneable application state (§2).
//!
//! Mirrors the host platform's `AppState`: an `Arc`-wrapped inner struct so
//! cloning the handle is cheap regardless of how large the internals grow.

use std::sync::Arc;

use crate::auth::Validator;
use crate::config::RealtimeConfig;
use crate::hub::Hub;
use crate::schema::SchemaSnapshot;
use crate::visibility::VisibilityProber;

pub struct AppStateArgs {
  pub schema: Arc<dyn SchemaSnapshot>,
  pub validator: Option<Arc<dyn Validator>>,
  pub prober: VisibilityProber,
  pub config: RealtimeConfig,
}

struct Inner {
  hub: Hub,
  schema: Arc<dyn SchemaSnapshot>,
  validator: Option<Arc<dyn Validator>>,
  prober: VisibilityProber,
  config: RealtimeConfig,
}

#[derive(Clone)]
pub struct AppState {
  inner: Arc<Inner>,
}

impl AppState {
  pub fn new(args: AppStateArgs) -> Self {
    return Self {
      inner: Arc::new(Inner {
        hub: Hub::with_capacity(args.config.event_channel_capacity),
        schema: args.schema,
        validator: args.validator,
        prober: args.prober,
        config: args.config,
      }),
    };
  }

  pub fn hub(&self) -> &Hub {
    return &self.inner.hub;
  }

  pub fn schema(&self) -> &Arc<dyn SchemaSnapshot> {
    return &self.inner.schema;
  }

  pub fn validator(&self) -> Option<&Arc<dyn Validator>> {
    return self.inner.validator.as_ref();
  }

  pub fn prober(&self) -> &VisibilityProber {
    return &self.inner.prober;
  }

  pub fn config(&self) -> &RealtimeConfig {
    return &self.inner.config;
  }
}

#[cfg(test)]
pub(crate) fn test_state(
  schema: Arc<dyn SchemaSnapshot>,
  validator: Option<Arc<dyn Validator>>,
) -> AppState {
  use crate::config::RealtimeConfig;

  return AppState::new(AppStateArgs {
    schema: schema.clone(),
    validator,
    prober: VisibilityProber::new(None, schema),
    config: RealtimeConfig {
      bind_address: "127.0.0.1:0".parse().unwrap(),
      database_url: None,
      jwt_secret: None,
      event_channel_capacity: crate::constants::DEFAULT_EVENT_CHANNEL_CAPACITY,
      cors_allowed_origins: vec!["*".to_string()],
      dev_mode: false,
    },
  });
}
