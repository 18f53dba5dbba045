//! HTTP endpoint handlers. Thin wrappers over the shared state; the game
//! itself lives on the WebSocket.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
  extract::{Path, Query, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use tracing::{info, instrument, warn};

use crate::domain::{Locale, LEVEL_COUNT};
use crate::i18n::Translator;
use crate::protocol::*;
use crate::quest::LevelBrief;
use crate::state::AppState;

/// Error body shared by the API handlers.
pub struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    (self.0, Json(ErrorOut { error: self.1 })).into_response()
  }
}

fn locale_or_default(raw: Option<String>, state: &AppState) -> Result<Locale, ApiError> {
  match raw {
    None => Ok(state.game.default_locale),
    Some(s) => s.parse().map_err(|e: crate::domain::UnknownLocale| ApiError(StatusCode::BAD_REQUEST, e.to_string())),
  }
}

/// Translator for a stateless request. A missing catalog degrades to raw keys.
async fn translator_for(state: &AppState, locale: Locale) -> Translator {
  let mut tr = Translator::new(locale);
  match state.catalog(locale).await {
    Ok(c) => {
      tr.install(c);
    }
    Err(e) => warn!(target: "devils_advocate", %locale, error = %e, "Catalog unavailable; raw keys"),
  }
  tr
}

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, oracle: state.oracle.name().to_string() })
}

#[instrument(level = "info", skip(state))]
pub async fn http_locales(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(LocalesOut {
    default: state.game.default_locale,
    locales: Locale::ALL.iter().map(|&l| LocaleOut { tag: l, name: l.language_name() }).collect(),
  })
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_catalog(
  State(state): State<Arc<AppState>>,
  Path(locale): Path<String>,
) -> Result<Json<HashMap<String, String>>, ApiError> {
  let locale = locale_or_default(Some(locale), &state)?;
  let catalog = state
    .catalog(locale)
    .await
    .map_err(|e| ApiError(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
  info!(target: "devils_advocate", %locale, keys = catalog.len(), "Catalog served");
  Ok(Json(catalog.entries().clone()))
}

#[instrument(level = "info", skip(state, q))]
pub async fn http_quest_levels(
  State(state): State<Arc<AppState>>,
  Query(q): Query<LocaleQuery>,
) -> Result<Json<Vec<LevelOut>>, ApiError> {
  let locale = locale_or_default(q.locale, &state)?;
  let tr = translator_for(&state, locale).await;
  let levels = (0..LEVEL_COUNT)
    .map(|i| {
      let b = LevelBrief::resolve(i, &tr);
      LevelOut {
        number: b.number,
        title: b.title,
        description: b.description,
        player_role: b.player_role,
        ai_role: b.ai_role,
        first_speaker: b.first_speaker,
      }
    })
    .collect();
  Ok(Json(levels))
}

/// Stateless topic suggestion.
#[instrument(level = "info", skip(state, q))]
pub async fn http_get_topic(
  State(state): State<Arc<AppState>>,
  Query(q): Query<LocaleQuery>,
) -> Result<Json<TopicOut>, ApiError> {
  let locale = locale_or_default(q.locale, &state)?;
  match state.oracle.generate_topic(locale).await {
    Ok(topic) => {
      info!(target: "arena", %locale, "HTTP topic generated");
      Ok(Json(TopicOut { topic }))
    }
    Err(e) => {
      warn!(target: "arena", %locale, error = %e, "HTTP topic generation failed");
      Err(ApiError(StatusCode::SERVICE_UNAVAILABLE, e.to_string()))
    }
  }
}
