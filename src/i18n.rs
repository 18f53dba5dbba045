//! Localization: per-locale key→string catalogs and the `Translator`
//! context object each session carries.
//!
//! A session starts with its locale set but no catalog; until the catalog
//! arrives every lookup renders the raw key. Unknown keys also render as
//! themselves, so `t` never fails.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::domain::Locale;
use crate::util::fill_template;

#[derive(Debug, Error)]
pub enum CatalogError {
  #[error("cannot read locale file {path}: {source}")]
  Io { path: String, #[source] source: std::io::Error },
  #[error("invalid locale file {path}: {source}")]
  Json { path: String, #[source] source: serde_json::Error },
}

/// Flat key→string table for one locale (keys are dotted, e.g. `quest.turn`).
#[derive(Debug, Clone)]
pub struct Catalog {
  pub locale: Locale,
  entries: HashMap<String, String>,
}

impl Catalog {
  pub fn new(locale: Locale, entries: HashMap<String, String>) -> Self {
    Self { locale, entries }
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self.entries.get(key).map(String::as_str)
  }

  pub fn entries(&self) -> &HashMap<String, String> { &self.entries }

  pub fn len(&self) -> usize { self.entries.len() }
}

/// Read `{dir}/{tag}.json`.
pub async fn load_catalog(dir: &Path, locale: Locale) -> Result<Catalog, CatalogError> {
  let path = dir.join(format!("{}.json", locale.tag()));
  let shown = path.display().to_string();
  let raw = tokio::fs::read_to_string(&path)
    .await
    .map_err(|source| CatalogError::Io { path: shown.clone(), source })?;
  let entries: HashMap<String, String> =
    serde_json::from_str(&raw).map_err(|source| CatalogError::Json { path: shown, source })?;
  Ok(Catalog::new(locale, entries))
}

#[derive(Debug, Clone)]
pub struct Translator {
  locale: Locale,
  catalog: Option<Arc<Catalog>>,
}

impl Translator {
  pub fn new(locale: Locale) -> Self {
    Self { locale, catalog: None }
  }

  pub fn locale(&self) -> Locale { self.locale }

  pub fn is_loaded(&self) -> bool { self.catalog.is_some() }

  /// Switch locale. The previous catalog is dropped; lookups show raw keys
  /// until `install` provides the new one.
  pub fn set_locale(&mut self, locale: Locale) {
    if locale != self.locale {
      self.locale = locale;
      self.catalog = None;
    }
  }

  /// Install a loaded catalog. Catalogs for another locale (a late answer to
  /// a superseded switch) are refused.
  pub fn install(&mut self, catalog: Arc<Catalog>) -> bool {
    if catalog.locale != self.locale {
      debug!(target: "devils_advocate", wanted = %self.locale, got = %catalog.locale, "Ignoring stale catalog");
      return false;
    }
    self.catalog = Some(catalog);
    true
  }

  pub fn t(&self, key: &str) -> String {
    self.t_with(key, &[])
  }

  /// Look up `key` and replace each `{name}` with its value.
  pub fn t_with(&self, key: &str, params: &[(&str, &str)]) -> String {
    let raw = self
      .catalog
      .as_ref()
      .and_then(|c| c.get(key))
      .unwrap_or(key);
    if params.is_empty() { raw.to_string() } else { fill_template(raw, params) }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn catalog(locale: Locale, pairs: &[(&str, &str)]) -> Arc<Catalog> {
    Arc::new(Catalog::new(
      locale,
      pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
    ))
  }

  #[test]
  fn raw_key_until_catalog_is_loaded() {
    let mut tr = Translator::new(Locale::En);
    assert_eq!(tr.t("quest.label"), "quest.label");
    assert!(tr.install(catalog(Locale::En, &[("quest.label", "Debate Quest")])));
    assert_eq!(tr.t("quest.label"), "Debate Quest");
    assert_eq!(tr.t("missing.key"), "missing.key");
  }

  #[test]
  fn params_replace_every_placeholder_literally() {
    let mut tr = Translator::new(Locale::En);
    tr.install(catalog(Locale::En, &[("quest.turn", "Turn {current}/{total} ({current})")]));
    assert_eq!(tr.t_with("quest.turn", &[("current", "3"), ("total", "8")]), "Turn 3/8 (3)");
    // Missing key: params still substituted into the key itself.
    assert_eq!(tr.t_with("x {n}", &[("n", "1")]), "x 1");
  }

  #[test]
  fn stale_catalog_is_refused_after_switch() {
    let mut tr = Translator::new(Locale::En);
    tr.install(catalog(Locale::En, &[("k", "english")]));
    tr.set_locale(Locale::Fr);
    assert!(!tr.is_loaded());
    assert_eq!(tr.t("k"), "k");
    assert!(!tr.install(catalog(Locale::En, &[("k", "english")])));
    assert!(tr.install(catalog(Locale::Fr, &[("k", "français")])));
    assert_eq!(tr.t("k"), "français");
  }

  #[tokio::test]
  async fn loads_shipped_locale_files() {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("locales");
    for locale in Locale::ALL {
      let c = load_catalog(&dir, locale).await.unwrap();
      assert_eq!(c.locale, locale);
      for level in 1..=crate::domain::LEVEL_COUNT {
        assert!(c.get(&format!("topics.level{level}.title")).is_some(), "{locale} level {level}");
        assert!(c.get(&format!("topics.level{level}.playerRole")).is_some(), "{locale} level {level}");
      }
    }
  }

  #[tokio::test]
  async fn missing_locale_dir_is_an_io_error() {
    let err = load_catalog(Path::new("/nonexistent-locales"), Locale::En).await.unwrap_err();
    assert!(matches!(err, CatalogError::Io { .. }));
  }
}
