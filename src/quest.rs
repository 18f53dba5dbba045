//! Quest mode: ten predefined levels, each a fixed run of alternating AI and
//! player turns.
//!
//! `QuestLevel` is the turn state machine for one level. It is sans-IO: every
//! transition returns the `Effect`s (oracle calls, reveal ticker, feedback
//! dwell timer) the session runtime must execute, and the results are fed
//! back through `on_event`. Answers carrying a superseded `Ticket` are
//! dropped, which is what makes locale changes and skips safe mid-flight.
//!
//! ```text
//! AI_GENERATING -> AI_DISPLAYING --advance--> next turn
//! PLAYER_CHOOSING -> PLAYER_TYPING -> EVALUATING -> SHOWING_FEEDBACK
//!     correct: dwell, then next turn        incorrect: retry -> PLAYER_CHOOSING
//! ... -> LEVEL_COMPLETE
//! ```

use std::time::Duration;

use rand::seq::SliceRandom;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::GameSettings;
use crate::domain::{
  speaker_for_turn, Choice, ChoiceBatch, LevelSummary, Locale, Speaker, Turn, LEVEL_COUNT, LEVEL_FIRST_SPEAKER,
};
use crate::effect::{Effect, Ticket};
use crate::fallback::{summary_fallback, AI_TURN_FALLBACK};
use crate::i18n::Translator;
use crate::oracle::{validate_choice_batch, OracleResult, SummaryContext, TurnContext};
use crate::reveal::Reveal;

/// Score deducted per wrong pick in hardcore mode.
pub const WRONG_PICK_PENALTY: i64 = 5;

/// Level texts. They come from the locale catalog, never from the oracle.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LevelBrief {
  pub index: usize,
  pub number: usize,
  pub title: String,
  pub description: String,
  pub player_role: String,
  pub ai_role: String,
  pub first_speaker: Speaker,
  /// False when resolved before the catalog arrived (texts are raw keys).
  #[serde(skip)]
  pub localized: bool,
}

impl LevelBrief {
  pub fn resolve(index: usize, tr: &Translator) -> Self {
    let index = index.min(LEVEL_COUNT - 1);
    let number = index + 1;
    Self {
      index,
      number,
      title: tr.t(&format!("topics.level{number}.title")),
      description: tr.t(&format!("topics.level{number}.description")),
      player_role: tr.t(&format!("topics.level{number}.playerRole")),
      ai_role: tr.t(&format!("topics.level{number}.aiRole")),
      first_speaker: LEVEL_FIRST_SPEAKER[index],
      localized: tr.is_loaded(),
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TurnState {
  AiGenerating,
  AiDisplaying,
  PlayerChoosing,
  PlayerTyping,
  Evaluating,
  ShowingFeedback,
  LevelComplete,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoicesStatus {
  Idle,
  Loading,
  Ready,
  /// The batch failed or was malformed; the player may reload it.
  Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
  Correct,
  Incorrect,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Feedback {
  pub kind: FeedbackKind,
  pub text: String,
}

/// Oracle requests a level issues.
#[derive(Debug)]
pub enum QuestCall {
  AiTurn(TurnContext),
  Choices(TurnContext),
  Summary(SummaryContext),
}

#[derive(Debug)]
pub enum QuestEvent {
  AiTurn { ticket: Ticket, result: OracleResult<String> },
  Choices { ticket: Ticket, result: OracleResult<ChoiceBatch> },
  Summary { ticket: Ticket, result: OracleResult<LevelSummary> },
  RevealTick(Ticket),
  FeedbackElapsed(Ticket),
}

pub type QuestEffects = Vec<Effect<QuestCall>>;

#[derive(Clone, Debug)]
pub struct QuestTiming {
  pub turns: usize,
  pub reveal_cadence: Duration,
  pub dwell: Duration,
}

impl QuestTiming {
  pub fn from_settings(g: &GameSettings, hardcore: bool) -> Self {
    Self { turns: g.quest_turns.max(1), reveal_cadence: g.reveal_cadence(), dwell: g.feedback_dwell(hardcore) }
  }
}

/// Final score after the hardcore penalty; never negative.
pub fn hardcore_score(raw: i64, attempts: u32, correct_picks: u32) -> i64 {
  let wrong = i64::from(attempts.saturating_sub(correct_picks));
  (raw - wrong * WRONG_PICK_PENALTY).max(0)
}

/// Feedback for a confirmed choice. The rationale was generated together
/// with the batch and is reused verbatim.
pub fn evaluate_choice(choice: &Choice) -> Feedback {
  Feedback {
    kind: if choice.is_correct { FeedbackKind::Correct } else { FeedbackKind::Incorrect },
    text: choice.rationale.clone(),
  }
}

pub fn export_filename(level_number: usize) -> String {
  format!("debate_quest_level_{level_number}.json")
}

pub struct QuestLevel {
  brief: LevelBrief,
  locale: Locale,
  hardcore: bool,
  timing: QuestTiming,
  reduced_motion: bool,

  turn_index: usize,
  state: TurnState,
  transcript: Vec<Turn>,

  choices: Vec<Choice>,
  choices_status: ChoicesStatus,
  selected: Option<String>,
  excluded: Vec<String>,
  feedback: Option<Feedback>,

  attempts: u32,
  correct_picks: u32,

  ai_reveal: Option<Reveal>,
  player_reveal: Option<Reveal>,

  pending: Option<Ticket>,
  reveal_ticket: Option<Ticket>,
  dwell_ticket: Option<Ticket>,

  summary: Option<LevelSummary>,
}

impl QuestLevel {
  /// Fresh level state. Nothing is requested until `start`.
  pub fn new(brief: LevelBrief, locale: Locale, hardcore: bool, timing: QuestTiming, reduced_motion: bool) -> Self {
    Self {
      brief,
      locale,
      hardcore,
      timing,
      reduced_motion,
      turn_index: 0,
      state: TurnState::AiGenerating,
      transcript: Vec::new(),
      choices: Vec::new(),
      choices_status: ChoicesStatus::Idle,
      selected: None,
      excluded: Vec::new(),
      feedback: None,
      attempts: 0,
      correct_picks: 0,
      ai_reveal: None,
      player_reveal: None,
      pending: None,
      reveal_ticket: None,
      dwell_ticket: None,
      summary: None,
    }
  }

  pub fn start(&mut self) -> QuestEffects {
    info!(target: "quest", level = self.brief.number, hardcore = self.hardcore, turns = self.timing.turns, "Level started");
    self.process_turn()
  }

  pub fn brief(&self) -> &LevelBrief { &self.brief }
  pub fn locale(&self) -> Locale { self.locale }
  pub fn state(&self) -> TurnState { self.state }
  pub fn turn_index(&self) -> usize { self.turn_index }
  pub fn transcript(&self) -> &[Turn] { &self.transcript }
  pub fn choices(&self) -> &[Choice] { &self.choices }
  pub fn choices_status(&self) -> ChoicesStatus { self.choices_status }
  pub fn selected(&self) -> Option<&str> { self.selected.as_deref() }
  pub fn excluded(&self) -> &[String] { &self.excluded }
  pub fn feedback(&self) -> Option<&Feedback> { self.feedback.as_ref() }
  pub fn attempts(&self) -> u32 { self.attempts }
  pub fn correct_picks(&self) -> u32 { self.correct_picks }
  pub fn summary(&self) -> Option<&LevelSummary> { self.summary.as_ref() }

  pub fn speaker(&self) -> Speaker {
    speaker_for_turn(self.brief.index, self.turn_index)
  }

  pub fn set_reduced_motion(&mut self, on: bool) { self.reduced_motion = on; }

  /// True while a reveal is still animating.
  pub fn is_typing(&self) -> bool {
    self.active_reveal().map(|r| !r.is_complete()).unwrap_or(false)
  }

  pub fn on_event(&mut self, ev: QuestEvent) -> QuestEffects {
    match ev {
      QuestEvent::AiTurn { ticket, result } => self.on_ai_turn(ticket, result),
      QuestEvent::Choices { ticket, result } => self.on_choices(ticket, result),
      QuestEvent::Summary { ticket, result } => self.on_summary(ticket, result),
      QuestEvent::RevealTick(ticket) => self.on_reveal_tick(ticket),
      QuestEvent::FeedbackElapsed(ticket) => self.on_feedback_elapsed(ticket),
    }
  }

  /// Skip the running reveal. No-op when nothing is animating.
  pub fn skip_reveal(&mut self) -> QuestEffects {
    let skipped = self.active_reveal_mut().map(|r| r.skip()).unwrap_or(false);
    if !skipped {
      return Vec::new();
    }
    let mut fx = Vec::new();
    if let Some(t) = self.reveal_ticket.take() {
      fx.push(Effect::Cancel(t));
    }
    fx.extend(self.on_reveal_complete());
    fx
  }

  /// Move past a fully revealed AI turn.
  pub fn advance(&mut self) -> QuestEffects {
    if self.state != TurnState::AiDisplaying {
      return Vec::new();
    }
    let text = match &self.ai_reveal {
      Some(r) if r.is_complete() => r.text().to_string(),
      _ => return Vec::new(),
    };
    self.transcript.push(Turn::new(Speaker::Ai, text));
    self.ai_reveal = None;
    self.next_turn()
  }

  /// Pick a choice by id. Refused outside `PLAYER_CHOOSING` or for choices
  /// excluded by an earlier wrong attempt.
  pub fn select(&mut self, id: &str) -> bool {
    if self.state != TurnState::PlayerChoosing
      || self.excluded.iter().any(|e| e == id)
      || !self.choices.iter().any(|c| c.id == id)
    {
      return false;
    }
    self.selected = Some(id.to_string());
    true
  }

  /// Hot-key selection, `1..=N` in display order.
  pub fn select_index(&mut self, number: usize) -> bool {
    let id = match number.checked_sub(1).and_then(|i| self.choices.get(i)) {
      Some(c) => c.id.clone(),
      None => return false,
    };
    self.select(&id)
  }

  pub fn confirm(&mut self) -> QuestEffects {
    if self.state != TurnState::PlayerChoosing {
      return Vec::new();
    }
    let text = match self.selected_choice() {
      Some(c) => c.text.clone(),
      None => return Vec::new(),
    };
    self.attempts += 1;
    self.state = TurnState::PlayerTyping;
    debug!(target: "quest", level = self.brief.number, turn = self.turn_index, attempts = self.attempts, "Choice confirmed");
    self.start_reveal(text)
  }

  /// Leave the incorrect-feedback overlay: exclude the failed choice and
  /// choose again. Turn index and transcript are untouched.
  pub fn retry(&mut self) -> bool {
    let incorrect = matches!(&self.feedback, Some(f) if f.kind == FeedbackKind::Incorrect);
    if self.state != TurnState::ShowingFeedback || !incorrect {
      return false;
    }
    if let Some(id) = self.selected.take() {
      self.excluded.push(id);
    }
    self.feedback = None;
    self.player_reveal = None;
    self.state = TurnState::PlayerChoosing;
    true
  }

  /// Ask again for a batch that failed. Never issued automatically.
  pub fn reload_choices(&mut self) -> QuestEffects {
    if self.state != TurnState::PlayerChoosing || self.choices_status != ChoicesStatus::Failed {
      return Vec::new();
    }
    info!(target: "quest", level = self.brief.number, turn = self.turn_index, "Reloading choices on player request");
    self.process_turn()
  }

  /// Regenerate the current turn's content in the new language. The
  /// transcript so far is kept as-is.
  pub fn change_locale(&mut self, locale: Locale, brief: LevelBrief) -> QuestEffects {
    self.locale = locale;
    self.brief = brief;
    match self.state {
      TurnState::AiGenerating | TurnState::AiDisplaying | TurnState::PlayerChoosing => {
        info!(target: "quest", level = self.brief.number, turn = self.turn_index, %locale, "Locale changed; regenerating current turn");
        self.process_turn()
      }
      _ => Vec::new(),
    }
  }

  /// Cancel everything outstanding (leaving the level).
  pub fn shutdown(&mut self) -> QuestEffects {
    let mut fx = Vec::new();
    self.abort_outstanding(&mut fx);
    fx
  }

  /// Pretty JSON of the finished level's summary, with its download name.
  pub fn export(&self) -> Option<(String, String)> {
    let summary = self.summary.as_ref()?;
    let content = serde_json::to_string_pretty(summary).ok()?;
    Some((export_filename(self.brief.number), content))
  }

  // --- transitions ---

  fn process_turn(&mut self) -> QuestEffects {
    let mut fx = Vec::new();
    self.abort_outstanding(&mut fx);
    self.ai_reveal = None;
    self.player_reveal = None;
    self.feedback = None;
    self.selected = None;
    self.excluded.clear();
    self.choices.clear();

    let ticket = Ticket::next();
    self.pending = Some(ticket);
    let ctx = self.turn_context();
    match self.speaker() {
      Speaker::Ai => {
        self.state = TurnState::AiGenerating;
        self.choices_status = ChoicesStatus::Idle;
        fx.push(Effect::Call { ticket, call: QuestCall::AiTurn(ctx) });
      }
      _ => {
        self.state = TurnState::PlayerChoosing;
        self.choices_status = ChoicesStatus::Loading;
        fx.push(Effect::Call { ticket, call: QuestCall::Choices(ctx) });
      }
    }
    debug!(target: "quest", level = self.brief.number, turn = self.turn_index, state = ?self.state, %ticket, "Turn requested");
    fx
  }

  fn next_turn(&mut self) -> QuestEffects {
    if self.turn_index + 1 >= self.timing.turns {
      self.finish_level()
    } else {
      self.turn_index += 1;
      self.process_turn()
    }
  }

  fn finish_level(&mut self) -> QuestEffects {
    let mut fx = Vec::new();
    self.abort_outstanding(&mut fx);
    self.state = TurnState::LevelComplete;
    self.choices.clear();
    self.choices_status = ChoicesStatus::Idle;

    let ticket = Ticket::next();
    self.pending = Some(ticket);
    fx.push(Effect::Call {
      ticket,
      call: QuestCall::Summary(SummaryContext {
        locale: self.locale,
        topic: self.brief.title.clone(),
        description: self.brief.description.clone(),
        player_role: self.brief.player_role.clone(),
        ai_role: self.brief.ai_role.clone(),
        history: self.transcript.clone(),
        hardcore: self.hardcore,
      }),
    });
    info!(
      target: "quest",
      level = self.brief.number,
      attempts = self.attempts,
      correct_picks = self.correct_picks,
      turns = self.transcript.len(),
      "Level complete; requesting summary"
    );
    fx
  }

  fn on_ai_turn(&mut self, ticket: Ticket, result: OracleResult<String>) -> QuestEffects {
    if !self.take_pending(ticket) || self.state != TurnState::AiGenerating {
      return Vec::new();
    }
    let text = match result {
      Ok(t) if !t.trim().is_empty() => t,
      Ok(_) => {
        warn!(target: "quest", level = self.brief.number, turn = self.turn_index, "Empty AI turn; showing fallback");
        AI_TURN_FALLBACK.to_string()
      }
      Err(e) => {
        warn!(target: "quest", level = self.brief.number, turn = self.turn_index, error = %e, "AI turn failed; showing fallback");
        AI_TURN_FALLBACK.to_string()
      }
    };
    self.state = TurnState::AiDisplaying;
    self.start_reveal(text)
  }

  fn on_choices(&mut self, ticket: Ticket, result: OracleResult<ChoiceBatch>) -> QuestEffects {
    if !self.take_pending(ticket) || self.state != TurnState::PlayerChoosing {
      return Vec::new();
    }
    match result.and_then(validate_choice_batch) {
      Ok(batch) => {
        let mut choices = batch.choices;
        choices.shuffle(&mut rand::thread_rng());
        self.choices = choices;
        self.choices_status = ChoicesStatus::Ready;
      }
      Err(e) => {
        warn!(target: "quest", level = self.brief.number, turn = self.turn_index, error = %e, "Choice batch unusable");
        self.choices.clear();
        self.choices_status = ChoicesStatus::Failed;
      }
    }
    Vec::new()
  }

  fn on_summary(&mut self, ticket: Ticket, result: OracleResult<LevelSummary>) -> QuestEffects {
    if !self.take_pending(ticket) || self.state != TurnState::LevelComplete {
      return Vec::new();
    }
    let mut summary = result.unwrap_or_else(|e| {
      warn!(target: "quest", level = self.brief.number, error = %e, "Summary failed; using fallback");
      summary_fallback()
    });
    if self.hardcore {
      summary.score = hardcore_score(summary.score, self.attempts, self.correct_picks);
    }
    info!(target: "quest", level = self.brief.number, score = summary.score, "Summary ready");
    self.summary = Some(summary);
    Vec::new()
  }

  fn start_reveal(&mut self, text: String) -> QuestEffects {
    let mut fx = Vec::new();
    if let Some(t) = self.reveal_ticket.take() {
      fx.push(Effect::Cancel(t));
    }
    let reveal = if self.reduced_motion { Reveal::instant(text) } else { Reveal::new(text) };
    let complete = reveal.is_complete();
    if self.state == TurnState::PlayerTyping {
      self.player_reveal = Some(reveal);
    } else {
      self.ai_reveal = Some(reveal);
    }
    if complete {
      fx.extend(self.on_reveal_complete());
    } else {
      let ticket = Ticket::next();
      self.reveal_ticket = Some(ticket);
      fx.push(Effect::Ticker { ticket, every: self.timing.reveal_cadence });
    }
    fx
  }

  fn on_reveal_tick(&mut self, ticket: Ticket) -> QuestEffects {
    if self.reveal_ticket != Some(ticket) {
      return Vec::new();
    }
    let done = self.active_reveal_mut().map(|r| r.tick()).unwrap_or(true);
    if !done {
      return Vec::new();
    }
    let mut fx = vec![Effect::Cancel(ticket)];
    self.reveal_ticket = None;
    fx.extend(self.on_reveal_complete());
    fx
  }

  fn on_reveal_complete(&mut self) -> QuestEffects {
    match self.state {
      TurnState::PlayerTyping => self.finish_player_typing(),
      _ => Vec::new(),
    }
  }

  fn finish_player_typing(&mut self) -> QuestEffects {
    self.state = TurnState::Evaluating;
    let choice = match self.selected_choice() {
      Some(c) => c.clone(),
      None => {
        warn!(target: "quest", level = self.brief.number, "Typed choice vanished; back to choosing");
        self.state = TurnState::PlayerChoosing;
        return Vec::new();
      }
    };
    let feedback = evaluate_choice(&choice);
    self.state = TurnState::ShowingFeedback;
    debug!(target: "quest", level = self.brief.number, turn = self.turn_index, kind = ?feedback.kind, "Choice evaluated");
    match feedback.kind {
      FeedbackKind::Correct => {
        self.correct_picks += 1;
        self.transcript.push(Turn::judged(Speaker::Player, choice.text, true, feedback.text.clone()));
        self.feedback = Some(feedback);
        let ticket = Ticket::next();
        self.dwell_ticket = Some(ticket);
        vec![Effect::Timer { ticket, after: self.timing.dwell }]
      }
      FeedbackKind::Incorrect => {
        self.feedback = Some(feedback);
        Vec::new()
      }
    }
  }

  fn on_feedback_elapsed(&mut self, ticket: Ticket) -> QuestEffects {
    if self.dwell_ticket != Some(ticket) {
      return Vec::new();
    }
    self.dwell_ticket = None;
    self.feedback = None;
    self.selected = None;
    self.excluded.clear();
    self.player_reveal = None;
    self.next_turn()
  }

  // --- helpers ---

  fn take_pending(&mut self, ticket: Ticket) -> bool {
    if self.pending == Some(ticket) {
      self.pending = None;
      true
    } else {
      debug!(target: "quest", %ticket, "Dropping stale oracle answer");
      false
    }
  }

  fn abort_outstanding(&mut self, fx: &mut QuestEffects) {
    for t in [self.pending.take(), self.reveal_ticket.take(), self.dwell_ticket.take()].into_iter().flatten() {
      fx.push(Effect::Cancel(t));
    }
  }

  fn selected_choice(&self) -> Option<&Choice> {
    let id = self.selected.as_deref()?;
    self.choices.iter().find(|c| c.id == id)
  }

  fn active_reveal(&self) -> Option<&Reveal> {
    match self.state {
      TurnState::AiDisplaying => self.ai_reveal.as_ref(),
      TurnState::PlayerTyping => self.player_reveal.as_ref(),
      _ => None,
    }
  }

  fn active_reveal_mut(&mut self) -> Option<&mut Reveal> {
    match self.state {
      TurnState::AiDisplaying => self.ai_reveal.as_mut(),
      TurnState::PlayerTyping => self.player_reveal.as_mut(),
      _ => None,
    }
  }

  fn turn_context(&self) -> TurnContext {
    TurnContext {
      locale: self.locale,
      topic: self.brief.title.clone(),
      description: self.brief.description.clone(),
      player_role: self.brief.player_role.clone(),
      ai_role: self.brief.ai_role.clone(),
      level_index: self.brief.index,
      turn_index: self.turn_index,
      history: self.transcript.clone(),
      hardcore: self.hardcore,
    }
  }

  // --- views ---

  pub fn view(&self) -> QuestView {
    let reveal = self.reveal_view();
    QuestView {
      brief: self.brief.clone(),
      hardcore: self.hardcore,
      turn: self.turn_index + 1,
      total_turns: self.timing.turns,
      speaker: self.speaker(),
      state: self.state,
      transcript: self.transcript.clone(),
      ai_text: reveal.ai_text,
      player_text: reveal.player_text,
      typing: reveal.typing,
      choices: self
        .choices
        .iter()
        .enumerate()
        .map(|(i, c)| ChoiceView {
          id: c.id.clone(),
          number: i + 1,
          text: c.text.clone(),
          selected: self.selected.as_deref() == Some(c.id.as_str()),
          disabled: self.excluded.contains(&c.id),
        })
        .collect(),
      choices_status: self.choices_status,
      can_confirm: self.state == TurnState::PlayerChoosing && self.selected.is_some(),
      can_advance: self.state == TurnState::AiDisplaying && !reveal.typing,
      feedback: self.feedback.clone(),
      attempts: self.attempts,
      correct_picks: self.correct_picks,
      summary: self.summary.clone(),
    }
  }

  /// Lightweight update sent on every reveal tick.
  pub fn reveal_view(&self) -> RevealView {
    RevealView {
      state: self.state,
      ai_text: self.ai_reveal.as_ref().map(Reveal::visible),
      player_text: self.player_reveal.as_ref().map(Reveal::visible),
      typing: self.is_typing(),
    }
  }
}

#[derive(Clone, Debug, Serialize)]
pub struct ChoiceView {
  pub id: String,
  pub number: usize,
  pub text: String,
  pub selected: bool,
  pub disabled: bool,
}

/// Snapshot pushed to the client. Correctness flags and rationales of the
/// pending batch are deliberately absent.
#[derive(Clone, Debug, Serialize)]
pub struct QuestView {
  pub brief: LevelBrief,
  pub hardcore: bool,
  pub turn: usize,
  pub total_turns: usize,
  pub speaker: Speaker,
  pub state: TurnState,
  pub transcript: Vec<Turn>,
  pub ai_text: Option<String>,
  pub player_text: Option<String>,
  pub typing: bool,
  pub choices: Vec<ChoiceView>,
  pub choices_status: ChoicesStatus,
  pub can_confirm: bool,
  pub can_advance: bool,
  pub feedback: Option<Feedback>,
  pub attempts: u32,
  pub correct_picks: u32,
  pub summary: Option<LevelSummary>,
}

#[derive(Clone, Debug, Serialize)]
pub struct RevealView {
  pub state: TurnState,
  pub ai_text: Option<String>,
  pub player_text: Option<String>,
  pub typing: bool,
}

// --- map / briefing ---

/// Which levels are open on the map, and the mode toggle.
#[derive(Clone, Debug, Default, Serialize)]
pub struct QuestProgress {
  pub unlocked: usize,
  pub selected: usize,
  pub hardcore: bool,
}

impl QuestProgress {
  pub fn open(&mut self, index: usize) -> bool {
    if index < LEVEL_COUNT && index <= self.unlocked {
      self.selected = index;
      true
    } else {
      false
    }
  }

  /// Finishing the frontier level unlocks the next one.
  pub fn complete(&mut self, index: usize) {
    if index == self.unlocked && self.unlocked + 1 < LEVEL_COUNT {
      self.unlocked += 1;
    }
  }
}

#[derive(Clone, Debug, Serialize)]
pub struct MapEntry {
  pub number: usize,
  pub title: String,
  pub unlocked: bool,
  pub current: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct QuestMapView {
  pub hardcore: bool,
  pub mode_label: String,
  pub levels: Vec<MapEntry>,
}

pub fn map_view(progress: &QuestProgress, tr: &Translator) -> QuestMapView {
  QuestMapView {
    hardcore: progress.hardcore,
    mode_label: tr.t(if progress.hardcore { "quest.hardcore" } else { "quest.standard" }),
    levels: (0..LEVEL_COUNT)
      .map(|i| MapEntry {
        number: i + 1,
        title: tr.t(&format!("topics.level{}.title", i + 1)),
        unlocked: i <= progress.unlocked,
        current: i == progress.selected,
      })
      .collect(),
  }
}

#[derive(Clone, Debug, Serialize)]
pub struct BriefingView {
  pub brief: LevelBrief,
  pub hardcore: bool,
  pub role_briefing: String,
  pub turns_info: String,
}

pub fn briefing_view(brief: LevelBrief, hardcore: bool, turns: usize, tr: &Translator) -> BriefingView {
  let turns = turns.to_string();
  BriefingView {
    role_briefing: tr.t_with(
      "quest.roleBriefing",
      &[("playerRole", &brief.player_role), ("aiRole", &brief.ai_role)],
    ),
    turns_info: tr.t_with("quest.turnsInfo", &[("turns", &turns)]),
    brief,
    hardcore,
  }
}
