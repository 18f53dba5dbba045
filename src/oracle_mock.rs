//! Scripted in-memory oracle for tests: canned answers, per-kind call
//! counters, injectable failures and an optional artificial latency.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{BiasQuestion, Choice, ChoiceBatch, LevelSummary, Locale, Side, Topic, Turn};
use crate::oracle::{BiasDifficulty, DebateContext, Oracle, OracleError, OracleResult, SummaryContext, TurnContext};

#[derive(Default)]
pub struct ScriptedOracle {
  calls: Mutex<HashMap<&'static str, usize>>,
  failing: Mutex<HashSet<&'static str>>,
  latency: Option<Duration>,
}

impl ScriptedOracle {
  pub fn new() -> Self { Self::default() }

  pub fn with_latency(latency: Duration) -> Self {
    Self { latency: Some(latency), ..Self::default() }
  }

  /// Make every later call of `kind` fail.
  pub fn fail(&self, kind: &'static str) {
    if let Ok(mut f) = self.failing.lock() {
      f.insert(kind);
    }
  }

  pub fn count(&self, kind: &str) -> usize {
    self.calls.lock().ok().and_then(|c| c.get(kind).copied()).unwrap_or(0)
  }

  async fn enter(&self, kind: &'static str) -> OracleResult<()> {
    if let Ok(mut c) = self.calls.lock() {
      *c.entry(kind).or_default() += 1;
    }
    if let Some(d) = self.latency {
      tokio::time::sleep(d).await;
    }
    let failing = self.failing.lock().map(|f| f.contains(kind)).unwrap_or(false);
    if failing {
      Err(OracleError::Transport(format!("scripted failure: {kind}")))
    } else {
      Ok(())
    }
  }
}

pub fn scripted_batch() -> ChoiceBatch {
  ChoiceBatch {
    choices: vec![
      Choice { id: "c1".into(), text: "Cite the study.".into(), rationale: "Evidence first.".into(), is_correct: true },
      Choice { id: "c2".into(), text: "Call them naive.".into(), rationale: "Ad hominem.".into(), is_correct: false },
      Choice { id: "c3".into(), text: "Change the subject.".into(), rationale: "Red herring.".into(), is_correct: false },
    ],
    recommended: Some(3),
  }
}

#[async_trait]
impl Oracle for ScriptedOracle {
  fn name(&self) -> &str { "scripted" }

  async fn generate_topic(&self, locale: Locale) -> OracleResult<String> {
    self.enter("topic").await?;
    Ok(format!("Topic in {}", locale.tag()))
  }

  async fn generate_sides(&self, topic: &str, _locale: Locale) -> OracleResult<Topic> {
    self.enter("sides").await?;
    Ok(Topic {
      topic: topic.to_string(),
      description: format!("About {topic}"),
      side_a: Side { title: "Pro".into(), summary: "In favour".into() },
      side_b: Side { title: "Con".into(), summary: "Against".into() },
    })
  }

  async fn generate_ai_turn(&self, ctx: &TurnContext) -> OracleResult<String> {
    self.enter("ai_turn").await?;
    Ok(format!("AI argument {} ({})", ctx.turn_index + 1, ctx.locale.tag()))
  }

  async fn generate_choices(&self, _ctx: &TurnContext) -> OracleResult<ChoiceBatch> {
    self.enter("choices").await?;
    Ok(scripted_batch())
  }

  async fn level_summary(&self, ctx: &SummaryContext) -> OracleResult<LevelSummary> {
    self.enter("summary").await?;
    Ok(LevelSummary { score: 80, overall_tips: format!("{} turns reviewed", ctx.history.len()), per_turn_analysis: vec![] })
  }

  async fn classic_response(&self, ctx: &DebateContext) -> OracleResult<String> {
    self.enter("classic_response").await?;
    Ok(format!("Rebuttal {}", ctx.transcript.len()))
  }

  async fn evaluate_classic(&self, _ctx: &DebateContext, timed_out: bool) -> OracleResult<String> {
    self.enter("evaluate_classic").await?;
    Ok(if timed_out { "Timed out verdict".into() } else { "Verdict".into() })
  }

  async fn evaluate_hvh(&self, _topic: &str, transcript: &[Turn], _locale: Locale) -> OracleResult<String> {
    self.enter("evaluate_hvh").await?;
    Ok(format!("Judged {} turns", transcript.len()))
  }

  async fn bias_question(&self, _difficulty: BiasDifficulty, _locale: Locale) -> OracleResult<BiasQuestion> {
    self.enter("bias").await?;
    Ok(BiasQuestion {
      argument: "Nine out of ten people agree, so it's true.".into(),
      options: vec!["Bandwagon".into(), "Straw man".into(), "False dilemma".into(), "Anchoring".into()],
      correct_index: 0,
      explanation_correct: "Popularity is not proof.".into(),
      explanation_incorrect: "Look at the appeal to numbers.".into(),
    })
  }
}
