//! Devil's Advocate · Debate Arena Backend
//!
//! - Axum HTTP + WebSocket API (one game session per socket)
//! - Optional OpenAI oracle (via environment variables)
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT                : u16 (default 3000)
//!   OPENAI_API_KEY      : enables the OpenAI oracle if present
//!   OPENAI_BASE_URL     : default "https://api.openai.com/v1"
//!   OPENAI_MODEL        : default "gpt-4o-mini"
//!   OPENAI_TIMEOUT_SECS : per-request timeout, default 30
//!   ARENA_CONFIG_PATH   : path to TOML config (prompts + game settings)
//!   LOG_LEVEL           : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT          : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod config;
mod effect;
mod fallback;
mod i18n;
mod oracle;
#[cfg(test)]
mod oracle_mock;
mod openai;
mod reveal;
mod quest;
mod classic;
mod hvh;
mod bias;
mod session;
mod state;
mod protocol;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Shared state: oracle, game settings, locale catalog cache.
  let state = Arc::new(AppState::new());

  let app = build_router(state.clone());

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "devils_advocate", %addr, oracle = state.oracle.name(), "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(async {
      let _ = tokio::signal::ctrl_c().await;
      info!(target: "devils_advocate", "Shutdown signal received");
    })
    .await?;
  Ok(())
}
