//! Bias scanner quiz: spot the cognitive bias or fallacy in an argument.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::{BiasQuestion, Locale};
use crate::effect::{Effect, Ticket};
use crate::i18n::Translator;
use crate::oracle::{validate_bias_question, BiasDifficulty, OracleResult};

pub const CORRECT_POINTS: u32 = 10;
pub const WRONG_PENALTY: u32 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RankTier {
  Beginner,
  Analyst,
  Strategist,
  Master,
}

impl RankTier {
  pub fn for_score(score: u32) -> Self {
    match score {
      0..=49 => Self::Beginner,
      50..=99 => Self::Analyst,
      100..=149 => Self::Strategist,
      _ => Self::Master,
    }
  }

  pub fn key(self) -> &'static str {
    match self {
      Self::Beginner => "bias.tier.beginner",
      Self::Analyst => "bias.tier.analyst",
      Self::Strategist => "bias.tier.strategist",
      Self::Master => "bias.tier.master",
    }
  }
}

#[derive(Debug)]
pub enum BiasCall {
  Question { difficulty: BiasDifficulty, locale: Locale },
}

#[derive(Debug)]
pub enum BiasEvent {
  Question { ticket: Ticket, result: OracleResult<BiasQuestion> },
}

pub type BiasEffects = Vec<Effect<BiasCall>>;

#[derive(Default)]
pub struct BiasQuiz {
  locale: Locale,
  score: u32,
  question: Option<BiasQuestion>,
  answered: Option<usize>,
  fault: bool,
  pending: Option<Ticket>,
}

impl BiasQuiz {
  pub fn new(locale: Locale) -> Self {
    Self { locale, ..Self::default() }
  }

  pub fn score(&self) -> u32 { self.score }
  pub fn question(&self) -> Option<&BiasQuestion> { self.question.as_ref() }
  pub fn is_faulted(&self) -> bool { self.fault }

  /// Drop the current question and ask for a new one at the difficulty the
  /// score has earned.
  pub fn next_question(&mut self) -> BiasEffects {
    let mut fx: BiasEffects = self.shutdown();
    self.question = None;
    self.answered = None;
    self.fault = false;
    let ticket = Ticket::next();
    self.pending = Some(ticket);
    let difficulty = BiasDifficulty::for_score(self.score);
    debug!(target: "arena", score = self.score, ?difficulty, %ticket, "Requesting bias question");
    fx.push(Effect::Call { ticket, call: BiasCall::Question { difficulty, locale: self.locale } });
    fx
  }

  /// A locale change always brings a fresh question.
  pub fn change_locale(&mut self, locale: Locale) -> BiasEffects {
    self.locale = locale;
    self.next_question()
  }

  /// Answer the current question once. Returns whether it was correct.
  pub fn answer(&mut self, index: usize) -> Option<bool> {
    if self.answered.is_some() {
      return None;
    }
    let q = self.question.as_ref()?;
    if index >= q.options.len() {
      return None;
    }
    let correct = index == q.correct_index;
    self.answered = Some(index);
    self.score = if correct { self.score + CORRECT_POINTS } else { self.score.saturating_sub(WRONG_PENALTY) };
    info!(target: "arena", correct, score = self.score, "Bias question answered");
    Some(correct)
  }

  pub fn shutdown(&mut self) -> BiasEffects {
    self.pending.take().map(Effect::Cancel).into_iter().collect()
  }

  pub fn on_event(&mut self, ev: BiasEvent) -> BiasEffects {
    let BiasEvent::Question { ticket, result } = ev;
    if self.pending != Some(ticket) {
      debug!(target: "arena", %ticket, "Dropping stale bias question");
      return Vec::new();
    }
    self.pending = None;
    match result.and_then(validate_bias_question) {
      Ok(q) => self.question = Some(q),
      Err(e) => {
        warn!(target: "arena", error = %e, "Bias question unavailable");
        self.fault = true;
      }
    }
    Vec::new()
  }

  pub fn view(&self, tr: &Translator) -> BiasView {
    let tier = RankTier::for_score(self.score);
    let revealed = self.answered.is_some();
    let q = self.question.as_ref();
    BiasView {
      score: self.score,
      tier,
      tier_label: tr.t(tier.key()),
      loading: self.pending.is_some(),
      fault: self.fault,
      argument: q.map(|q| q.argument.clone()),
      options: q.map(|q| q.options.clone()).unwrap_or_default(),
      selected: self.answered,
      correct_index: q.filter(|_| revealed).map(|q| q.correct_index),
      explanation_correct: q.filter(|_| revealed).map(|q| q.explanation_correct.clone()),
      explanation_incorrect: q.filter(|_| revealed).map(|q| q.explanation_incorrect.clone()),
    }
  }
}

/// The answer and both explanations stay hidden until the player answers.
#[derive(Clone, Debug, Serialize)]
pub struct BiasView {
  pub score: u32,
  pub tier: RankTier,
  pub tier_label: String,
  pub loading: bool,
  pub fault: bool,
  pub argument: Option<String>,
  pub options: Vec<String>,
  pub selected: Option<usize>,
  pub correct_index: Option<usize>,
  pub explanation_correct: Option<String>,
  pub explanation_incorrect: Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::oracle::OracleError;

  fn question(correct_index: usize) -> BiasQuestion {
    BiasQuestion {
      argument: "Everyone I know loves it, so it must be good.".into(),
      options: vec!["Bandwagon".into(), "Straw man".into(), "Ad hominem".into(), "Slippery slope".into()],
      correct_index,
      explanation_correct: "Popularity is not evidence.".into(),
      explanation_incorrect: "Look at who is being cited.".into(),
    }
  }

  fn load(quiz: &mut BiasQuiz, q: BiasQuestion) {
    let fx = quiz.next_question();
    let ticket = fx.iter().find_map(|e| match e {
      Effect::Call { ticket, .. } => Some(*ticket),
      _ => None,
    });
    quiz.on_event(BiasEvent::Question { ticket: ticket.unwrap(), result: Ok(q) });
  }

  #[test]
  fn scoring_is_plus_ten_minus_five_floored() {
    let mut quiz = BiasQuiz::new(Locale::En);
    load(&mut quiz, question(0));
    assert_eq!(quiz.answer(2), Some(false));
    assert_eq!(quiz.score(), 0);
    assert_eq!(quiz.answer(0), None, "only one answer per question");

    load(&mut quiz, question(0));
    assert_eq!(quiz.answer(0), Some(true));
    load(&mut quiz, question(1));
    assert_eq!(quiz.answer(1), Some(true));
    load(&mut quiz, question(1));
    assert_eq!(quiz.answer(3), Some(false));
    assert_eq!(quiz.score(), 15);
  }

  #[test]
  fn explanations_hidden_until_answered() {
    let tr = Translator::new(Locale::En);
    let mut quiz = BiasQuiz::new(Locale::En);
    load(&mut quiz, question(0));
    let v = quiz.view(&tr);
    assert_eq!(v.options.len(), 4);
    assert!(v.correct_index.is_none() && v.explanation_correct.is_none());
    quiz.answer(1);
    let v = quiz.view(&tr);
    assert_eq!(v.correct_index, Some(0));
    assert!(v.explanation_correct.is_some() && v.explanation_incorrect.is_some());
    assert_eq!(v.tier_label, "bias.tier.beginner");
  }

  #[test]
  fn difficulty_follows_score() {
    let mut quiz = BiasQuiz::new(Locale::En);
    for _ in 0..5 {
      load(&mut quiz, question(0));
      quiz.answer(0);
    }
    assert_eq!(quiz.score(), 50);
    let fx = quiz.next_question();
    assert!(fx.iter().any(|e| matches!(
      e,
      Effect::Call { call: BiasCall::Question { difficulty: BiasDifficulty::Moderate, .. }, .. }
    )));
  }

  #[test]
  fn failure_and_malformed_questions_raise_fault() {
    let mut quiz = BiasQuiz::new(Locale::En);
    let fx = quiz.next_question();
    let Effect::Call { ticket, .. } = &fx[0] else { panic!("expected call") };
    quiz.on_event(BiasEvent::Question { ticket: *ticket, result: Err(OracleError::Disabled) });
    assert!(quiz.is_faulted());
    assert_eq!(quiz.answer(0), None);

    load(&mut quiz, BiasQuestion { options: vec!["only".into()], ..question(0) });
    assert!(quiz.is_faulted());
  }

  #[test]
  fn locale_change_loads_a_fresh_question_and_drops_the_old_one() {
    let mut quiz = BiasQuiz::new(Locale::En);
    let old = quiz.next_question();
    let fx = quiz.change_locale(Locale::Vi);
    assert_eq!(fx.len(), 2);
    let Effect::Call { ticket: old_ticket, .. } = &old[0] else { panic!("expected call") };
    assert!(matches!(&fx[0], Effect::Cancel(t) if t == old_ticket));
    quiz.on_event(BiasEvent::Question { ticket: *old_ticket, result: Ok(question(0)) });
    assert!(quiz.question().is_none());
  }

  #[test]
  fn tiers() {
    assert_eq!(RankTier::for_score(0), RankTier::Beginner);
    assert_eq!(RankTier::for_score(50), RankTier::Analyst);
    assert_eq!(RankTier::for_score(149), RankTier::Strategist);
    assert_eq!(RankTier::for_score(150), RankTier::Master);
  }
}
