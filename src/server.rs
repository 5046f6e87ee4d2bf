//! Server assembly and lifecycle (ambient, §6).
//!
//! Trimmed from the host platform's `server::Server`: one router (no admin
//! UI, no static asset fallback, no independent admin listener), same
//! default-layer stack (CORS, `TraceLayer`, graceful shutdown on
//! Ctrl+C/SIGTERM).

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use tokio::signal;
use tower_http::cors;
use tower_http::trace::TraceLayer;

use crate::app_state::{AppState, AppStateArgs};
use crate::auth::{JwtValidator, Validator};
use crate::config::RealtimeConfig;
use crate::logging;
use crate::routes;
use crate::schema::SchemaSnapshot;
use crate::visibility::VisibilityProber;

/// Options controlling how [`Server::init`] wires the process. Changing any
/// of these requires a restart, making them a natural fit for CLI flags.
#[derive(Clone)]
pub struct ServerOptions {
  pub config: RealtimeConfig,
  pub schema: Arc<dyn SchemaSnapshot>,
}

pub struct Server {
  state: AppState,
  router: Router<()>,
}

impl Server {
  pub async fn init(opts: ServerOptions) -> Result<Self, sqlx::Error> {
    let pool = match &opts.config.database_url {
      Some(url) => Some(sqlx::postgres::PgPoolOptions::new().connect(url).await?),
      None => None,
    };

    let validator: Option<Arc<dyn Validator>> = opts
      .config
      .jwt_secret
      .as_ref()
      .map(|secret| Arc::new(JwtValidator::new(secret.as_bytes())) as Arc<dyn Validator>);

    let prober = VisibilityProber::new(pool, opts.schema.clone());
    let cors_allowed_origins = opts.config.cors_allowed_origins.clone();

    let state = AppState::new(AppStateArgs {
      schema: opts.schema,
      validator,
      prober,
      config: opts.config,
    });

    let router = Self::build_router(&state, &cors_allowed_origins);

    return Ok(Self { state, router });
  }

  pub fn state(&self) -> &AppState {
    return &self.state;
  }

  pub fn router(&self) -> &Router<()> {
    return &self.router;
  }

  pub async fn serve(&self) -> std::io::Result<()> {
    let addr = self.state.config().bind_address;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    log::info!("listening on http://{addr}");

    let result = axum::serve(listener, self.router.clone())
      .with_graceful_shutdown(shutdown_signal())
      .await;

    self.state.hub().close();

    return result;
  }

  fn build_router(state: &AppState, cors_allowed_origins: &[String]) -> Router<()> {
    return routes::router()
      .layer(build_cors(cors_allowed_origins))
      .layer(
        TraceLayer::new_for_http()
          .make_span_with(logging::make_span)
          .on_request(logging::on_request)
          .on_response(logging::on_response),
      )
      .with_state(state.clone());
  }
}

fn build_cors(allowed_origins: &[String]) -> cors::CorsLayer {
  if allowed_origins.iter().any(|o| o == "*") {
    return cors::CorsLayer::new()
      .allow_origin(cors::AllowOrigin::mirror_request())
      .allow_methods([axum::http::Method::GET])
      .allow_credentials(true);
  }

  let origins: Vec<HeaderValue> = allowed_origins
    .iter()
    .filter_map(|o| match HeaderValue::from_str(o) {
      Ok(value) => Some(value),
      Err(err) => {
        log::error!("invalid CORS origin {o}: {err}");
        None
      }
    })
    .collect();

  return cors::CorsLayer::new()
    .allow_origin(cors::AllowOrigin::list(origins))
    .allow_methods([axum::http::Method::GET])
    .allow_credentials(true);
}

async fn shutdown_signal() {
  let ctrl_c = async {
    signal::ctrl_c()
      .await
      .expect("failed to install Ctrl+C handler");
  };

  #[cfg(unix)]
  let terminate = async {
    signal::unix::signal(signal::unix::SignalKind::terminate())
      .expect("failed to install signal handler")
      .recv()
      .await;
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => {
      log::info!("received Ctrl+C, shutting down");
    },
    _ = terminate => {
      log::info!("received termination, shutting down");
    },
  }
}
