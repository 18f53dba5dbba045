//! Human vs human: two players on one screen, strictly alternating for a
//! fixed number of rounds, then a single evaluation of the whole exchange.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::{Locale, Side, Speaker, Topic, Turn};
use crate::effect::{Effect, Ticket};
use crate::fallback::HVH_EVAL_FALLBACK;
use crate::oracle::OracleResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HvhStep {
  Topic,
  Debate,
  Evaluation,
}

#[derive(Debug)]
pub enum HvhCall {
  Topic(Locale),
  Sides { topic: String, locale: Locale },
  Evaluate { topic: String, transcript: Vec<Turn>, locale: Locale },
}

#[derive(Debug)]
pub enum HvhEvent {
  Topic { ticket: Ticket, result: OracleResult<String> },
  Sides { ticket: Ticket, result: OracleResult<Topic> },
  Evaluation { ticket: Ticket, result: OracleResult<String> },
}

pub type HvhEffects = Vec<Effect<HvhCall>>;

pub struct HumanDebate {
  locale: Locale,
  rounds: u32,
  step: HvhStep,
  topic: String,
  description: String,
  sides: Option<(Side, Side)>,
  transcript: Vec<Turn>,
  current: u8,
  round: u32,
  evaluation: Option<String>,
  pending: Option<Ticket>,
}

impl HumanDebate {
  pub fn new(locale: Locale, rounds: u32) -> Self {
    Self {
      locale,
      rounds: rounds.max(1),
      step: HvhStep::Topic,
      topic: String::new(),
      description: String::new(),
      sides: None,
      transcript: Vec::new(),
      current: 1,
      round: 1,
      evaluation: None,
      pending: None,
    }
  }

  pub fn step(&self) -> HvhStep { self.step }
  pub fn current_player(&self) -> u8 { self.current }
  pub fn round(&self) -> u32 { self.round }
  pub fn transcript(&self) -> &[Turn] { &self.transcript }
  pub fn evaluation(&self) -> Option<&str> { self.evaluation.as_deref() }

  pub fn change_locale(&mut self, locale: Locale) { self.locale = locale; }

  pub fn set_topic(&mut self, text: &str) -> bool {
    if self.step != HvhStep::Topic || self.pending.is_some() {
      return false;
    }
    self.topic = text.to_string();
    true
  }

  pub fn auto_topic(&mut self) -> HvhEffects {
    if self.step != HvhStep::Topic || self.pending.is_some() {
      return Vec::new();
    }
    self.request(HvhCall::Topic(self.locale))
  }

  /// Frame the topic into two sides, then open the floor to player 1.
  pub fn start(&mut self) -> HvhEffects {
    if self.step != HvhStep::Topic || self.pending.is_some() || self.topic.trim().is_empty() {
      return Vec::new();
    }
    self.request(HvhCall::Sides { topic: self.topic.trim().to_string(), locale: self.locale })
  }

  pub fn submit(&mut self, text: &str) -> HvhEffects {
    let text = text.trim();
    if self.step != HvhStep::Debate || text.is_empty() {
      debug!(target: "arena", step = ?self.step, "Ignoring hvh submit");
      return Vec::new();
    }
    self.transcript.push(Turn::new(Speaker::Human(self.current), text));
    if self.current == 1 {
      self.current = 2;
      return Vec::new();
    }
    if self.round < self.rounds {
      self.round += 1;
      self.current = 1;
      return Vec::new();
    }
    self.step = HvhStep::Evaluation;
    info!(target: "arena", rounds = self.rounds, turns = self.transcript.len(), "Human debate finished; evaluating");
    self.request(HvhCall::Evaluate { topic: self.topic.clone(), transcript: self.transcript.clone(), locale: self.locale })
  }

  pub fn shutdown(&mut self) -> HvhEffects {
    self.pending.take().map(Effect::Cancel).into_iter().collect()
  }

  pub fn on_event(&mut self, ev: HvhEvent) -> HvhEffects {
    match ev {
      HvhEvent::Topic { ticket, result } if self.take_pending(ticket) => match result {
        Ok(t) if !t.trim().is_empty() => self.topic = t.trim().to_string(),
        Ok(_) => warn!(target: "arena", "Oracle returned an empty topic"),
        Err(e) => warn!(target: "arena", error = %e, "Topic generation failed"),
      },
      HvhEvent::Sides { ticket, result } if self.take_pending(ticket) => match result {
        Ok(t) => {
          self.topic = t.topic;
          self.description = t.description;
          self.sides = Some((t.side_a, t.side_b));
          self.step = HvhStep::Debate;
          self.current = 1;
          self.round = 1;
          self.transcript.clear();
        }
        Err(e) => warn!(target: "arena", error = %e, "Side generation failed; staying on topic"),
      },
      HvhEvent::Evaluation { ticket, result } if self.take_pending(ticket) => {
        self.evaluation = Some(result.unwrap_or_else(|e| {
          warn!(target: "arena", error = %e, "Human debate evaluation failed");
          HVH_EVAL_FALLBACK.to_string()
        }));
      }
      _ => {}
    }
    Vec::new()
  }

  fn request(&mut self, call: HvhCall) -> HvhEffects {
    let ticket = Ticket::next();
    self.pending = Some(ticket);
    vec![Effect::Call { ticket, call }]
  }

  fn take_pending(&mut self, ticket: Ticket) -> bool {
    if self.pending == Some(ticket) {
      self.pending = None;
      true
    } else {
      debug!(target: "arena", %ticket, "Dropping stale oracle answer");
      false
    }
  }

  pub fn view(&self) -> HvhView {
    HvhView {
      step: self.step,
      topic: self.topic.clone(),
      description: self.description.clone(),
      side_a: self.sides.as_ref().map(|(a, _)| a.clone()),
      side_b: self.sides.as_ref().map(|(_, b)| b.clone()),
      current_player: self.current,
      round: self.round,
      total_rounds: self.rounds,
      transcript: self.transcript.clone(),
      evaluation: self.evaluation.clone(),
      loading: self.pending.is_some(),
    }
  }
}

#[derive(Clone, Debug, Serialize)]
pub struct HvhView {
  pub step: HvhStep,
  pub topic: String,
  pub description: String,
  pub side_a: Option<Side>,
  pub side_b: Option<Side>,
  pub current_player: u8,
  pub round: u32,
  pub total_rounds: u32,
  pub transcript: Vec<Turn>,
  pub evaluation: Option<String>,
  pub loading: bool,
}
