//! Telemetry initialization (tracing/tracing-subscriber).
//!
//! - LOG_LEVEL controls the filter (e.g. "debug" or detailed directives like
//!   "info,quest=debug,arena=debug,oracle=info,tower_http=info").
//! - LOG_FORMAT selects "pretty" (default) or "json" structured logs.
//!
//! Targets used across the crate: `quest` (level engine), `arena` (open
//! debates and bias quiz), `oracle` (provider calls), `devils_advocate`
//! (sessions, config, server).

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,quest=debug,arena=debug,oracle=info,devils_advocate=debug,tower_http=info";

pub fn init_tracing() {
  let filter = EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(true)
    .with_file(true)
    .with_line_number(true);

  match std::env::var("LOG_FORMAT").as_deref() {
    Ok("json") => builder.json().init(),
    _ => builder.init(),
  }
}
