//! The content oracle: the only boundary to the generative service.
//!
//! One method per call kind, each with a typed result. Implementations never
//! retry; callers catch every error and substitute degraded content.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::domain::{BiasQuestion, ChoiceBatch, LevelSummary, Locale, Topic, Turn};

#[derive(Debug, Error)]
pub enum OracleError {
  #[error("oracle disabled: no API key configured")]
  Disabled,
  #[error("transport error: {0}")]
  Transport(String),
  #[error("HTTP {status}: {message}")]
  Http { status: u16, message: String },
  #[error("response parse error: {0}")]
  Parse(String),
  #[error("response violates expected shape: {0}")]
  InvalidShape(String),
}

pub type OracleResult<T> = Result<T, OracleError>;

/// Everything the oracle needs to produce an AI argument or a choice batch
/// for one quest turn.
#[derive(Clone, Debug, Serialize)]
pub struct TurnContext {
  pub locale: Locale,
  pub topic: String,
  pub description: String,
  pub player_role: String,
  pub ai_role: String,
  pub level_index: usize,
  pub turn_index: usize,
  pub history: Vec<Turn>,
  pub hardcore: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct SummaryContext {
  pub locale: Locale,
  pub topic: String,
  pub description: String,
  pub player_role: String,
  pub ai_role: String,
  pub history: Vec<Turn>,
  pub hardcore: bool,
}

/// Human vs AI open debate context.
#[derive(Clone, Debug, Serialize)]
pub struct DebateContext {
  pub locale: Locale,
  pub topic: String,
  pub ai_side: String,
  pub user_side: String,
  pub transcript: Vec<Turn>,
}

/// Bias-quiz difficulty, derived from the running score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BiasDifficulty {
  Obvious,
  Moderate,
  Subtle,
}

impl BiasDifficulty {
  pub fn for_score(score: u32) -> Self {
    match score {
      0..=49 => BiasDifficulty::Obvious,
      50..=99 => BiasDifficulty::Moderate,
      _ => BiasDifficulty::Subtle,
    }
  }
}

#[async_trait]
pub trait Oracle: Send + Sync {
  fn name(&self) -> &str;

  /// Free text: a debatable topic.
  async fn generate_topic(&self, locale: Locale) -> OracleResult<String>;

  async fn generate_sides(&self, topic: &str, locale: Locale) -> OracleResult<Topic>;

  /// Free text: the AI's argument for a quest turn.
  async fn generate_ai_turn(&self, ctx: &TurnContext) -> OracleResult<String>;

  async fn generate_choices(&self, ctx: &TurnContext) -> OracleResult<ChoiceBatch>;

  async fn level_summary(&self, ctx: &SummaryContext) -> OracleResult<LevelSummary>;

  /// Free text: opening statement (empty transcript) or rebuttal.
  async fn classic_response(&self, ctx: &DebateContext) -> OracleResult<String>;

  /// Free text (markdown) evaluation of the user's debate.
  async fn evaluate_classic(&self, ctx: &DebateContext, timed_out: bool) -> OracleResult<String>;

  async fn evaluate_hvh(&self, topic: &str, transcript: &[Turn], locale: Locale) -> OracleResult<String>;

  async fn bias_question(&self, difficulty: BiasDifficulty, locale: Locale) -> OracleResult<BiasQuestion>;
}

/// Oracle used when no provider is configured: every call fails, so every
/// screen runs in its degraded mode.
pub struct DisabledOracle;

#[async_trait]
impl Oracle for DisabledOracle {
  fn name(&self) -> &str { "disabled" }

  async fn generate_topic(&self, _locale: Locale) -> OracleResult<String> { Err(OracleError::Disabled) }

  async fn generate_sides(&self, _topic: &str, _locale: Locale) -> OracleResult<Topic> { Err(OracleError::Disabled) }

  async fn generate_ai_turn(&self, _ctx: &TurnContext) -> OracleResult<String> { Err(OracleError::Disabled) }

  async fn generate_choices(&self, _ctx: &TurnContext) -> OracleResult<ChoiceBatch> { Err(OracleError::Disabled) }

  async fn level_summary(&self, _ctx: &SummaryContext) -> OracleResult<LevelSummary> { Err(OracleError::Disabled) }

  async fn classic_response(&self, _ctx: &DebateContext) -> OracleResult<String> { Err(OracleError::Disabled) }

  async fn evaluate_classic(&self, _ctx: &DebateContext, _timed_out: bool) -> OracleResult<String> {
    Err(OracleError::Disabled)
  }

  async fn evaluate_hvh(&self, _topic: &str, _transcript: &[Turn], _locale: Locale) -> OracleResult<String> {
    Err(OracleError::Disabled)
  }

  async fn bias_question(&self, _difficulty: BiasDifficulty, _locale: Locale) -> OracleResult<BiasQuestion> {
    Err(OracleError::Disabled)
  }
}

/// A usable batch has 2–4 choices with distinct, non-empty ids and exactly
/// one flagged correct.
pub fn validate_choice_batch(batch: ChoiceBatch) -> OracleResult<ChoiceBatch> {
  let n = batch.choices.len();
  if !(2..=4).contains(&n) {
    return Err(OracleError::InvalidShape(format!("expected 2-4 choices, got {n}")));
  }
  let mut ids = HashSet::new();
  for c in &batch.choices {
    if c.id.trim().is_empty() || !ids.insert(c.id.as_str()) {
      return Err(OracleError::InvalidShape(format!("missing or duplicate choice id {:?}", c.id)));
    }
  }
  let correct = batch.choices.iter().filter(|c| c.is_correct).count();
  if correct != 1 {
    return Err(OracleError::InvalidShape(format!("expected exactly one correct choice, got {correct}")));
  }
  Ok(batch)
}

pub fn validate_bias_question(q: BiasQuestion) -> OracleResult<BiasQuestion> {
  if q.options.len() != 4 {
    return Err(OracleError::InvalidShape(format!("expected 4 options, got {}", q.options.len())));
  }
  if q.correct_index >= q.options.len() {
    return Err(OracleError::InvalidShape(format!("correct index {} out of range", q.correct_index)));
  }
  if q.argument.trim().is_empty() {
    return Err(OracleError::InvalidShape("empty argument".into()));
  }
  Ok(q)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::Choice;

  fn choice(id: &str, ok: bool) -> Choice {
    Choice { id: id.into(), text: format!("text {id}"), rationale: "r".into(), is_correct: ok }
  }

  #[test]
  fn batch_needs_exactly_one_correct() {
    let two_correct = ChoiceBatch { choices: vec![choice("a", true), choice("b", true)], recommended: None };
    assert!(matches!(validate_choice_batch(two_correct), Err(OracleError::InvalidShape(_))));

    let none_correct = ChoiceBatch { choices: vec![choice("a", false), choice("b", false)], recommended: None };
    assert!(validate_choice_batch(none_correct).is_err());

    let ok = ChoiceBatch { choices: vec![choice("a", false), choice("b", true), choice("c", false)], recommended: Some(3) };
    assert_eq!(validate_choice_batch(ok).unwrap().choices.len(), 3);
  }

  #[test]
  fn batch_rejects_empty_and_duplicate_ids() {
    assert!(validate_choice_batch(ChoiceBatch::default()).is_err());
    let dup = ChoiceBatch { choices: vec![choice("a", true), choice("a", false)], recommended: None };
    assert!(validate_choice_batch(dup).is_err());
  }

  #[test]
  fn bias_question_index_must_be_in_range() {
    let q = BiasQuestion {
      argument: "Everyone does it, so it must be right.".into(),
      options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
      correct_index: 4,
      explanation_correct: String::new(),
      explanation_incorrect: String::new(),
    };
    assert!(validate_bias_question(q.clone()).is_err());
    assert!(validate_bias_question(BiasQuestion { correct_index: 3, ..q }).is_ok());
  }

  #[test]
  fn difficulty_tiers_follow_score() {
    assert_eq!(BiasDifficulty::for_score(0), BiasDifficulty::Obvious);
    assert_eq!(BiasDifficulty::for_score(49), BiasDifficulty::Obvious);
    assert_eq!(BiasDifficulty::for_score(50), BiasDifficulty::Moderate);
    assert_eq!(BiasDifficulty::for_score(100), BiasDifficulty::Subtle);
  }
}
