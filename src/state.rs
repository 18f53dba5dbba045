//! Application state shared by every connection: the oracle, game settings
//! and the process-wide locale catalog cache.

use std::{collections::HashMap, path::PathBuf, sync::Arc};

use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use crate::config::{load_arena_config_from_env, GameSettings};
use crate::domain::Locale;
use crate::i18n::{load_catalog, Catalog, CatalogError};
use crate::openai::OpenAI;
use crate::oracle::{DisabledOracle, Oracle};

pub struct AppState {
  pub oracle: Arc<dyn Oracle>,
  pub game: GameSettings,
  catalogs: RwLock<HashMap<Locale, Arc<Catalog>>>,
}

impl AppState {
  /// Build state from env: TOML config (prompts + game settings), then the
  /// OpenAI oracle if a key is present.
  #[instrument(level = "info", skip_all)]
  pub fn new() -> Self {
    let cfg = load_arena_config_from_env().unwrap_or_default();

    let oracle: Arc<dyn Oracle> = match OpenAI::from_env(cfg.prompts) {
      Some(oa) => {
        info!(target: "devils_advocate", base_url = %oa.base_url, model = %oa.model, "OpenAI enabled.");
        Arc::new(oa)
      }
      None => {
        warn!(target: "devils_advocate", "OpenAI disabled (no OPENAI_API_KEY). Every screen runs degraded.");
        Arc::new(DisabledOracle)
      }
    };

    info!(
      target: "devils_advocate",
      default_locale = %cfg.game.default_locale,
      locales_dir = %cfg.game.locales_dir,
      quest_turns = cfg.game.quest_turns,
      "Game settings loaded"
    );
    Self::with_oracle(oracle, cfg.game)
  }

  pub fn with_oracle(oracle: Arc<dyn Oracle>, game: GameSettings) -> Self {
    Self { oracle, game, catalogs: RwLock::new(HashMap::new()) }
  }

  /// The catalog for `locale`, read from disk on first use and cached.
  #[instrument(level = "debug", skip(self), fields(%locale))]
  pub async fn catalog(&self, locale: Locale) -> Result<Arc<Catalog>, CatalogError> {
    if let Some(c) = self.catalogs.read().await.get(&locale) {
      return Ok(c.clone());
    }
    let loaded = Arc::new(load_catalog(&PathBuf::from(&self.game.locales_dir), locale).await?);
    info!(target: "devils_advocate", %locale, keys = loaded.len(), "Locale catalog loaded");
    let mut cache = self.catalogs.write().await;
    Ok(cache.entry(locale).or_insert(loaded).clone())
  }
}

#[cfg(test)]
impl AppState {
  /// State over the scripted oracle, reading the crate's own `locales/`.
  pub fn for_tests(oracle: Arc<dyn Oracle>) -> Self {
    let game = GameSettings {
      locales_dir: concat!(env!("CARGO_MANIFEST_DIR"), "/locales").into(),
      ..GameSettings::default()
    };
    Self::with_oracle(oracle, game)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn catalogs_are_cached_per_locale() {
    let state = AppState::for_tests(Arc::new(DisabledOracle));
    let a = state.catalog(Locale::Fr).await.unwrap();
    let b = state.catalog(Locale::Fr).await.unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(a.locale, Locale::Fr);
  }
}
