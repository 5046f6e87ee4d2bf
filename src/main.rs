//! Reference binary.
//!
//! A real deployment embeds [`realtime_core::Server`] behind its own schema
//! cache; this binary wires up a static, empty snapshot so the crate can be
//! run standalone for manual testing.

use std::sync::Arc;

use realtime_core::schema::StaticSchemaSnapshot;
use realtime_core::{Server, ServerOptions};

#[tokio::main]
async fn main() {
  realtime_core::logging::init();

  let config = match realtime_core::config::RealtimeConfig::from_env() {
    Ok(config) => config,
    Err(err) => {
      log::error!("invalid configuration: {err}");
      std::process::exit(1);
    }
  };

  let opts = ServerOptions {
    config,
    schema: Arc::new(StaticSchemaSnapshot::new()),
  };

  let server = match Server::init(opts).await {
    Ok(server) => server,
    Err(err) => {
      log::error!("failed to initialize server: {err}");
      std::process::exit(1);
    }
  };

  if let Err(err) = server.serve().await {
    log::error!("server error: {err}");
    std::process::exit(1);
  }
}
