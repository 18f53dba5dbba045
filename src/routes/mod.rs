//! Router assembly: HTTP endpoints, WebSocket upgrade, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{
  cors::{Any, CorsLayer},
  services::{ServeDir, ServeFile},
  trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket game sessions at `/ws`
/// - read-only API under `/api/v1/...`
/// - static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
  let static_service = ServeDir::new("./static")
    .append_index_html_on_directories(true)
    .not_found_service(ServeFile::new("./static/index.html"));

  Router::new()
    .route("/ws", get(ws::ws_upgrade))
    .route("/api/v1/health", get(http::http_health))
    .route("/api/v1/locales", get(http::http_locales))
    .route("/api/v1/i18n/:locale", get(http::http_get_catalog))
    .route("/api/v1/quest/levels", get(http::http_quest_levels))
    .route("/api/v1/topic", get(http::http_get_topic))
    .with_state(state)
    .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
    .layer(
      TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO)),
    )
    .fallback_service(static_service)
}

#[cfg(test)]
mod tests {
  use axum::body::{to_bytes, Body};
  use axum::http::{Request, StatusCode};
  use serde_json::Value;
  use tower::ServiceExt;

  use super::*;
  use crate::oracle::DisabledOracle;
  use crate::oracle_mock::ScriptedOracle;

  async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let res = app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap()).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
  }

  fn app(oracle: Arc<dyn crate::oracle::Oracle>) -> Router {
    build_router(Arc::new(AppState::for_tests(oracle)))
  }

  #[tokio::test]
  async fn health_names_the_oracle() {
    let (status, body) = get_json(app(Arc::new(DisabledOracle)), "/api/v1/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["oracle"], "disabled");
  }

  #[tokio::test]
  async fn locales_list_all_six_with_vi_default() {
    let (_, body) = get_json(app(Arc::new(DisabledOracle)), "/api/v1/locales").await;
    assert_eq!(body["default"], "vi");
    assert_eq!(body["locales"].as_array().map(Vec::len), Some(6));
    assert_eq!(body["locales"][5]["tag"], "zh-CN");
  }

  #[tokio::test]
  async fn quest_levels_come_from_the_catalog() {
    let (status, body) = get_json(app(Arc::new(DisabledOracle)), "/api/v1/quest/levels?locale=en").await;
    assert_eq!(status, StatusCode::OK);
    let levels = body.as_array().unwrap();
    assert_eq!(levels.len(), 10);
    assert_eq!(levels[0]["firstSpeaker"], "ai");
    assert_eq!(levels[1]["firstSpeaker"], "player");
    assert_ne!(levels[0]["title"], "topics.level1.title");
  }

  #[tokio::test]
  async fn unknown_locale_is_a_bad_request() {
    let (status, body) = get_json(app(Arc::new(DisabledOracle)), "/api/v1/i18n/xx").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("xx"));
  }

  #[tokio::test]
  async fn topic_endpoint_reports_oracle_failure() {
    let (status, _) = get_json(app(Arc::new(DisabledOracle)), "/api/v1/topic").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, body) = get_json(app(Arc::new(ScriptedOracle::new())), "/api/v1/topic?locale=de").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["topic"], "Topic in de");
  }
}
