//! Open debate against the AI, in `classic` or `hardcore` variant.
//!
//! Steps: topic -> sides -> init -> debate -> evaluation. Hardcore adds a
//! per-turn countdown; running out of time ends the debate and evaluates it
//! with the timeout flag set.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::GameSettings;
use crate::domain::{Locale, Side, SideChoice, Speaker, Topic, Turn};
use crate::effect::{Effect, Ticket};
use crate::fallback::{DEBATE_EVAL_FALLBACK, DEBATE_INIT_FALLBACK, DEBATE_TURN_FALLBACK, TIMEOUT_TURN};
use crate::i18n::Translator;
use crate::oracle::{DebateContext, OracleResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassicVariant {
  Classic,
  Hardcore,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DebateStep {
  Topic,
  Sides,
  Init,
  Debate,
  Evaluation,
}

/// Countdown milestones, keyed by seconds remaining.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CountdownWarning {
  Structure,
  CoreLogic,
  Final,
}

impl CountdownWarning {
  pub fn at(remaining: u32) -> Option<Self> {
    match remaining {
      90 => Some(Self::Structure),
      60 => Some(Self::CoreLogic),
      30 => Some(Self::Final),
      _ => None,
    }
  }

  pub fn key(self) -> &'static str {
    match self {
      Self::Structure => "classic.warning.structure",
      Self::CoreLogic => "classic.warning.coreLogic",
      Self::Final => "classic.warning.final",
    }
  }
}

#[derive(Debug)]
pub enum ClassicCall {
  Topic(Locale),
  Sides { topic: String, locale: Locale },
  Respond(DebateContext),
  Evaluate { ctx: DebateContext, timed_out: bool },
}

#[derive(Debug)]
pub enum ClassicEvent {
  Topic { ticket: Ticket, result: OracleResult<String> },
  Sides { ticket: Ticket, result: OracleResult<Topic> },
  Response { ticket: Ticket, result: OracleResult<String> },
  Evaluation { ticket: Ticket, result: OracleResult<String> },
  CountdownTick(Ticket),
}

pub type ClassicEffects = Vec<Effect<ClassicCall>>;

pub struct ClassicDebate {
  variant: ClassicVariant,
  locale: Locale,
  countdown_secs: u32,
  countdown_tick: Duration,

  step: DebateStep,
  topic: String,
  description: String,
  sides: Option<(Side, Side)>,
  selected: Option<SideChoice>,
  user_side: Option<Side>,
  ai_side: Option<Side>,
  transcript: Vec<Turn>,
  evaluation: Option<String>,

  pending: Option<Ticket>,
  remaining: u32,
  countdown: Option<Ticket>,
  warning: Option<CountdownWarning>,
}

impl ClassicDebate {
  pub fn new(variant: ClassicVariant, locale: Locale, g: &GameSettings) -> Self {
    Self {
      variant,
      locale,
      countdown_secs: g.countdown_secs,
      countdown_tick: g.countdown_tick(),
      step: DebateStep::Topic,
      topic: String::new(),
      description: String::new(),
      sides: None,
      selected: None,
      user_side: None,
      ai_side: None,
      transcript: Vec::new(),
      evaluation: None,
      pending: None,
      remaining: g.countdown_secs,
      countdown: None,
      warning: None,
    }
  }

  pub fn step(&self) -> DebateStep { self.step }
  pub fn topic(&self) -> &str { &self.topic }
  pub fn transcript(&self) -> &[Turn] { &self.transcript }
  pub fn evaluation(&self) -> Option<&str> { self.evaluation.as_deref() }
  pub fn remaining(&self) -> u32 { self.remaining }
  pub fn warning(&self) -> Option<CountdownWarning> { self.warning }
  pub fn user_side(&self) -> Option<&Side> { self.user_side.as_ref() }
  pub fn ai_side(&self) -> Option<&Side> { self.ai_side.as_ref() }
  pub fn is_loading(&self) -> bool { self.pending.is_some() }

  fn hardcore(&self) -> bool { self.variant == ClassicVariant::Hardcore }

  /// Later oracle calls use the new language; the transcript is kept.
  pub fn change_locale(&mut self, locale: Locale) { self.locale = locale; }

  pub fn set_topic(&mut self, text: &str) -> bool {
    if self.step != DebateStep::Topic || self.is_loading() {
      return false;
    }
    self.topic = text.to_string();
    true
  }

  pub fn auto_topic(&mut self) -> ClassicEffects {
    if self.step != DebateStep::Topic || self.is_loading() {
      return Vec::new();
    }
    self.request(ClassicCall::Topic(self.locale))
  }

  pub fn confirm_topic(&mut self) -> ClassicEffects {
    if self.step != DebateStep::Topic || self.is_loading() || self.topic.trim().is_empty() {
      return Vec::new();
    }
    self.step = DebateStep::Sides;
    self.sides = None;
    self.selected = None;
    self.request(ClassicCall::Sides { topic: self.topic.trim().to_string(), locale: self.locale })
  }

  pub fn select_side(&mut self, side: SideChoice) -> bool {
    if self.step != DebateStep::Sides || self.sides.is_none() {
      return false;
    }
    self.selected = Some(side);
    true
  }

  pub fn confirm_side(&mut self) -> bool {
    let (Some((a, b)), Some(choice)) = (&self.sides, self.selected) else {
      return false;
    };
    if self.step != DebateStep::Sides {
      return false;
    }
    let (user, ai) = match choice {
      SideChoice::A => (a.clone(), b.clone()),
      SideChoice::B => (b.clone(), a.clone()),
    };
    self.user_side = Some(user);
    self.ai_side = Some(ai);
    self.step = DebateStep::Init;
    true
  }

  /// Ask the AI for its opening statement.
  pub fn start(&mut self) -> ClassicEffects {
    if self.step != DebateStep::Init || self.is_loading() {
      return Vec::new();
    }
    let Some(ctx) = self.debate_context() else { return Vec::new() };
    self.step = DebateStep::Debate;
    self.transcript.clear();
    info!(target: "arena", variant = ?self.variant, topic = %self.topic, "Debate started");
    self.request(ClassicCall::Respond(ctx))
  }

  pub fn submit(&mut self, text: &str) -> ClassicEffects {
    let text = text.trim();
    if self.step != DebateStep::Debate || self.is_loading() || text.is_empty() {
      debug!(target: "arena", step = ?self.step, loading = self.is_loading(), "Ignoring submit");
      return Vec::new();
    }
    let mut fx = self.stop_countdown();
    self.transcript.push(Turn::new(Speaker::User, text));
    if let Some(ctx) = self.debate_context() {
      fx.extend(self.request(ClassicCall::Respond(ctx)));
    }
    fx
  }

  /// Finish without a timeout and ask for the evaluation.
  pub fn end_debate(&mut self) -> ClassicEffects {
    if self.step != DebateStep::Debate || self.is_loading() || self.transcript.is_empty() {
      return Vec::new();
    }
    self.evaluate(false)
  }

  /// Swap sides and start over from the init step with an empty transcript.
  pub fn switch_sides(&mut self) -> ClassicEffects {
    if !matches!(self.step, DebateStep::Debate | DebateStep::Evaluation) {
      return Vec::new();
    }
    let fx = self.shutdown();
    std::mem::swap(&mut self.user_side, &mut self.ai_side);
    self.selected = self.selected.map(|s| match s {
      SideChoice::A => SideChoice::B,
      SideChoice::B => SideChoice::A,
    });
    self.transcript.clear();
    self.evaluation = None;
    self.step = DebateStep::Init;
    fx
  }

  /// Back to the topic step. The last topic text is kept for editing.
  pub fn replay(&mut self) -> ClassicEffects {
    let fx = self.shutdown();
    self.step = DebateStep::Topic;
    self.description.clear();
    self.sides = None;
    self.selected = None;
    self.user_side = None;
    self.ai_side = None;
    self.transcript.clear();
    self.evaluation = None;
    fx
  }

  pub fn shutdown(&mut self) -> ClassicEffects {
    let mut fx = self.stop_countdown();
    if let Some(t) = self.pending.take() {
      fx.push(Effect::Cancel(t));
    }
    fx
  }

  pub fn on_event(&mut self, ev: ClassicEvent) -> ClassicEffects {
    match ev {
      ClassicEvent::Topic { ticket, result } => {
        if self.take_pending(ticket) {
          match result {
            Ok(t) if !t.trim().is_empty() => self.topic = t.trim().to_string(),
            Ok(_) => warn!(target: "arena", "Oracle returned an empty topic"),
            Err(e) => warn!(target: "arena", error = %e, "Topic generation failed"),
          }
        }
        Vec::new()
      }
      ClassicEvent::Sides { ticket, result } => {
        if self.take_pending(ticket) && self.step == DebateStep::Sides {
          match result {
            Ok(t) => {
              self.topic = t.topic;
              self.description = t.description;
              self.sides = Some((t.side_a, t.side_b));
            }
            Err(e) => {
              warn!(target: "arena", error = %e, "Side generation failed; back to topic");
              self.step = DebateStep::Topic;
            }
          }
        }
        Vec::new()
      }
      ClassicEvent::Response { ticket, result } => self.on_response(ticket, result),
      ClassicEvent::Evaluation { ticket, result } => {
        if self.take_pending(ticket) && self.step == DebateStep::Evaluation {
          self.evaluation = Some(result.unwrap_or_else(|e| {
            warn!(target: "arena", error = %e, "Evaluation failed");
            DEBATE_EVAL_FALLBACK.to_string()
          }));
        }
        Vec::new()
      }
      ClassicEvent::CountdownTick(ticket) => self.on_countdown_tick(ticket),
    }
  }

  fn on_response(&mut self, ticket: Ticket, result: OracleResult<String>) -> ClassicEffects {
    if !self.take_pending(ticket) || self.step != DebateStep::Debate {
      return Vec::new();
    }
    let opening = self.transcript.is_empty();
    let text = result.unwrap_or_else(|e| {
      warn!(target: "arena", error = %e, opening, "Debate response failed");
      let fallback = if opening { DEBATE_INIT_FALLBACK } else { DEBATE_TURN_FALLBACK };
      fallback.to_string()
    });
    self.transcript.push(Turn::new(Speaker::Ai, text));
    if self.hardcore() {
      self.start_countdown()
    } else {
      Vec::new()
    }
  }

  fn on_countdown_tick(&mut self, ticket: Ticket) -> ClassicEffects {
    if self.countdown != Some(ticket) {
      return Vec::new();
    }
    self.remaining = self.remaining.saturating_sub(1);
    if let Some(w) = CountdownWarning::at(self.remaining) {
      self.warning = Some(w);
    }
    if self.remaining > 0 {
      return Vec::new();
    }
    info!(target: "arena", turns = self.transcript.len(), "Countdown expired; evaluating");
    self.transcript.push(Turn::new(Speaker::User, TIMEOUT_TURN));
    self.evaluate(true)
  }

  fn evaluate(&mut self, timed_out: bool) -> ClassicEffects {
    let mut fx = self.stop_countdown();
    let Some(ctx) = self.debate_context() else { return fx };
    self.step = DebateStep::Evaluation;
    self.evaluation = None;
    fx.extend(self.request(ClassicCall::Evaluate { ctx, timed_out }));
    fx
  }

  fn start_countdown(&mut self) -> ClassicEffects {
    let mut fx = self.stop_countdown();
    self.remaining = self.countdown_secs;
    self.warning = None;
    let ticket = Ticket::next();
    self.countdown = Some(ticket);
    fx.push(Effect::Ticker { ticket, every: self.countdown_tick });
    fx
  }

  fn stop_countdown(&mut self) -> ClassicEffects {
    match self.countdown.take() {
      Some(t) => vec![Effect::Cancel(t)],
      None => Vec::new(),
    }
  }

  fn request(&mut self, call: ClassicCall) -> ClassicEffects {
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

  fn debate_context(&self) -> Option<DebateContext> {
    Some(DebateContext {
      locale: self.locale,
      topic: self.topic.clone(),
      ai_side: self.ai_side.as_ref()?.title.clone(),
      user_side: self.user_side.as_ref()?.title.clone(),
      transcript: self.transcript.clone(),
    })
  }

  pub fn view(&self, tr: &Translator) -> ClassicView {
    let running = self.countdown.is_some();
    ClassicView {
      variant: self.variant,
      step: self.step,
      topic: self.topic.clone(),
      description: self.description.clone(),
      side_a: self.sides.as_ref().map(|(a, _)| a.clone()),
      side_b: self.sides.as_ref().map(|(_, b)| b.clone()),
      selected: self.selected,
      user_side: self.user_side.clone(),
      ai_side: self.ai_side.clone(),
      transcript: self.transcript.clone(),
      evaluation: self.evaluation.clone(),
      loading: self.is_loading(),
      remaining_secs: (self.hardcore() && running).then_some(self.remaining),
      warning: self.warning.filter(|_| running).map(|w| tr.t(w.key())),
    }
  }
}

#[derive(Clone, Debug, Serialize)]
pub struct ClassicView {
  pub variant: ClassicVariant,
  pub step: DebateStep,
  pub topic: String,
  pub description: String,
  pub side_a: Option<Side>,
  pub side_b: Option<Side>,
  pub selected: Option<SideChoice>,
  pub user_side: Option<Side>,
  pub ai_side: Option<Side>,
  pub transcript: Vec<Turn>,
  pub evaluation: Option<String>,
  pub loading: bool,
  pub remaining_secs: Option<u32>,
  pub warning: Option<String>,
}
