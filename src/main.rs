//! Codejudge · coding-problem backend
//!
//! - Axum HTTP + WebSocket API
//! - Problems from a TOML bank, built-in seeds, and an optional directory of JSON documents
//! - Submissions evaluated in a sandboxed `node` child process
//! - Optional AI hints via an external HTTP endpoint
//! - Static front-end fallback (STATIC_DIR/index.html)
//!
//! Important env variables:
//!   PORT            : u16 (default 3000)
//!   APP_CONFIG_PATH : path to TOML config (runner limits, hints, problem bank)
//!   HINT_API_URL    : base URL of the hint endpoint; enables hints if present
//!   PROBLEMS_DIR    : directory of `<id>.json` problem documents
//!   STATIC_DIR      : front-end directory (default "./static")
//!   NODE_BINARY     : node executable used by the sandbox (default "node")
//!   LOG_LEVEL       : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT      : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod config;
mod seeds;
mod store;
mod sandbox;
mod runner;
mod hint;
mod state;
mod logic;
mod session;
mod protocol;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::load_app_config_from_env;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let config = load_app_config_from_env();
  let port = config.server.port;

  // Shared state: problem loader, sandboxed runner, optional hint client.
  let state = Arc::new(AppState::new(config));
  let app = build_router(state);

  let addr = SocketAddr::from(([0, 0, 0, 0], port));
  let listener = TcpListener::bind(addr).await?;
  info!(target: "codejudge_backend", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  info!(target: "codejudge_backend", "Server shutdown complete");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    warn!(target: "codejudge_backend", error = %e, "Failed to listen for Ctrl-C; running until killed");
    std::future::pending::<()>().await;
  }
  warn!(target: "codejudge_backend", "Received shutdown signal");
}
