//! One player's session: the active screen, the translator, quest progress,
//! and the Tokio tasks executing engine effects.
//!
//! A session is owned by its WebSocket task. Everything that happens to it
//! arrives as a `SessionEvent` (client messages, oracle answers, ticks) and
//! is handled sequentially; spawned tasks only ever talk back through the
//! channel.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::bias::{BiasCall, BiasEvent, BiasQuiz};
use crate::classic::{ClassicCall, ClassicDebate, ClassicEvent, ClassicVariant};
use crate::domain::Locale;
use crate::effect::{Effect, Ticket};
use crate::hvh::{HumanDebate, HvhCall, HvhEvent};
use crate::i18n::{Catalog, Translator};
use crate::oracle::Oracle;
use crate::protocol::{ClientWsMessage, ScreenName, ServerWsMessage};
use crate::quest::{
  briefing_view, map_view, LevelBrief, QuestCall, QuestEvent, QuestLevel, QuestProgress, QuestTiming,
};
use crate::state::AppState;
use crate::util::preview;

#[derive(Debug)]
pub enum SessionEvent {
  Client(ClientWsMessage),
  Quest(QuestEvent),
  Classic(ClassicEvent),
  Hvh(HvhEvent),
  Bias(BiasEvent),
  CatalogLoaded { locale: Locale, result: Result<Arc<Catalog>, String> },
}

/// An engine's oracle request, runnable on a spawned task.
#[async_trait]
pub trait OracleCall: Send + Sized + 'static {
  async fn perform(self, ticket: Ticket, oracle: Arc<dyn Oracle>) -> SessionEvent;

  /// Event for each firing of a `Ticker` effect.
  fn ticker_event(_ticket: Ticket) -> Option<SessionEvent> { None }

  /// Event for a `Timer` effect.
  fn timer_event(_ticket: Ticket) -> Option<SessionEvent> { None }
}

#[async_trait]
impl OracleCall for QuestCall {
  async fn perform(self, ticket: Ticket, oracle: Arc<dyn Oracle>) -> SessionEvent {
    SessionEvent::Quest(match self {
      QuestCall::AiTurn(ctx) => QuestEvent::AiTurn { ticket, result: oracle.generate_ai_turn(&ctx).await },
      QuestCall::Choices(ctx) => QuestEvent::Choices { ticket, result: oracle.generate_choices(&ctx).await },
      QuestCall::Summary(ctx) => QuestEvent::Summary { ticket, result: oracle.level_summary(&ctx).await },
    })
  }

  fn ticker_event(ticket: Ticket) -> Option<SessionEvent> {
    Some(SessionEvent::Quest(QuestEvent::RevealTick(ticket)))
  }

  fn timer_event(ticket: Ticket) -> Option<SessionEvent> {
    Some(SessionEvent::Quest(QuestEvent::FeedbackElapsed(ticket)))
  }
}

#[async_trait]
impl OracleCall for ClassicCall {
  async fn perform(self, ticket: Ticket, oracle: Arc<dyn Oracle>) -> SessionEvent {
    SessionEvent::Classic(match self {
      ClassicCall::Topic(locale) => ClassicEvent::Topic { ticket, result: oracle.generate_topic(locale).await },
      ClassicCall::Sides { topic, locale } => {
        ClassicEvent::Sides { ticket, result: oracle.generate_sides(&topic, locale).await }
      }
      ClassicCall::Respond(ctx) => ClassicEvent::Response { ticket, result: oracle.classic_response(&ctx).await },
      ClassicCall::Evaluate { ctx, timed_out } => {
        ClassicEvent::Evaluation { ticket, result: oracle.evaluate_classic(&ctx, timed_out).await }
      }
    })
  }

  fn ticker_event(ticket: Ticket) -> Option<SessionEvent> {
    Some(SessionEvent::Classic(ClassicEvent::CountdownTick(ticket)))
  }
}

#[async_trait]
impl OracleCall for HvhCall {
  async fn perform(self, ticket: Ticket, oracle: Arc<dyn Oracle>) -> SessionEvent {
    SessionEvent::Hvh(match self {
      HvhCall::Topic(locale) => HvhEvent::Topic { ticket, result: oracle.generate_topic(locale).await },
      HvhCall::Sides { topic, locale } => HvhEvent::Sides { ticket, result: oracle.generate_sides(&topic, locale).await },
      HvhCall::Evaluate { topic, transcript, locale } => {
        HvhEvent::Evaluation { ticket, result: oracle.evaluate_hvh(&topic, &transcript, locale).await }
      }
    })
  }
}

#[async_trait]
impl OracleCall for BiasCall {
  async fn perform(self, ticket: Ticket, oracle: Arc<dyn Oracle>) -> SessionEvent {
    let BiasCall::Question { difficulty, locale } = self;
    SessionEvent::Bias(BiasEvent::Question { ticket, result: oracle.bias_question(difficulty, locale).await })
  }
}

enum Screen {
  Menu,
  QuestMap,
  Briefing,
  Quest(Box<QuestLevel>),
  Classic(ClassicDebate),
  Hvh(HumanDebate),
  Bias(BiasQuiz),
}

pub struct Session {
  id: Uuid,
  state: Arc<AppState>,
  tx: UnboundedSender<SessionEvent>,
  translator: Translator,
  reduced_motion: bool,
  screen: Screen,
  progress: QuestProgress,
  tasks: HashMap<Ticket, JoinHandle<()>>,
  catalog_task: Option<JoinHandle<()>>,
}

impl Session {
  pub fn new(state: Arc<AppState>, tx: UnboundedSender<SessionEvent>) -> Self {
    let locale = state.game.default_locale;
    Self {
      id: Uuid::new_v4(),
      state,
      tx,
      translator: Translator::new(locale),
      reduced_motion: false,
      screen: Screen::Menu,
      progress: QuestProgress::default(),
      tasks: HashMap::new(),
      catalog_task: None,
    }
  }

  pub fn id(&self) -> Uuid { self.id }

  /// Number of live engine tasks (oracle calls and timers).
  pub fn active_tasks(&self) -> usize {
    self.tasks.values().filter(|h| !h.is_finished()).count()
  }

  /// Greeting for a fresh connection; starts loading the default catalog.
  pub fn open(&mut self) -> Vec<ServerWsMessage> {
    let locale = self.translator.locale();
    self.load_catalog(locale);
    vec![
      ServerWsMessage::Hello { session_id: self.id.to_string(), locale, locales: Locale::ALL.to_vec() },
      self.snapshot(),
    ]
  }

  pub fn handle(&mut self, ev: SessionEvent) -> Vec<ServerWsMessage> {
    match ev {
      SessionEvent::Client(msg) => self.on_client(msg),
      SessionEvent::Quest(ev) => self.on_quest_event(ev),
      SessionEvent::Classic(ev) => match &mut self.screen {
        Screen::Classic(d) => {
          let fx = d.on_event(ev);
          self.run(fx);
          vec![self.snapshot()]
        }
        _ => Vec::new(),
      },
      SessionEvent::Hvh(ev) => match &mut self.screen {
        Screen::Hvh(d) => {
          let fx = d.on_event(ev);
          self.run(fx);
          vec![self.snapshot()]
        }
        _ => Vec::new(),
      },
      SessionEvent::Bias(ev) => match &mut self.screen {
        Screen::Bias(q) => {
          let fx = q.on_event(ev);
          self.run(fx);
          vec![self.snapshot()]
        }
        _ => Vec::new(),
      },
      SessionEvent::CatalogLoaded { locale, result } => self.on_catalog(locale, result),
    }
  }

  fn on_client(&mut self, msg: ClientWsMessage) -> Vec<ServerWsMessage> {
    use ClientWsMessage as C;
    match msg {
      C::Ping => vec![ServerWsMessage::Pong],
      C::SetLocale { locale } => match locale.parse::<Locale>() {
        Ok(locale) => self.set_locale(locale),
        Err(e) => vec![ServerWsMessage::Error { message: e.to_string() }],
      },
      C::SetReducedMotion { enabled } => {
        self.reduced_motion = enabled;
        if let Screen::Quest(level) = &mut self.screen {
          level.set_reduced_motion(enabled);
          let fx = if enabled { level.skip_reveal() } else { Vec::new() };
          self.run(fx);
        }
        vec![self.snapshot()]
      }
      C::Navigate { screen } => self.navigate(screen),
      C::ExportSummary => match &self.screen {
        Screen::Quest(level) => match level.export() {
          Some((filename, content)) => vec![ServerWsMessage::Export { filename, content }],
          None => vec![ServerWsMessage::Error { message: "No summary to export yet.".into() }],
        },
        _ => self.ignored("export_summary"),
      },
      msg => self.on_screen_action(msg),
    }
  }

  /// Actions that only make sense on one screen. Anything else is ignored,
  /// the way a disabled control would be.
  fn on_screen_action(&mut self, msg: ClientWsMessage) -> Vec<ServerWsMessage> {
    use ClientWsMessage as C;
    match &mut self.screen {
      Screen::Menu => return self.ignored(&format!("{msg:?}")),
      Screen::QuestMap | Screen::Briefing => return self.on_map_action(msg),
      Screen::Quest(level) => {
        let fx = match msg {
          C::Skip => level.skip_reveal(),
          C::Advance => level.advance(),
          C::Select { id } => {
            level.select(&id);
            Vec::new()
          }
          C::SelectIndex { number } => {
            level.select_index(number);
            Vec::new()
          }
          C::Confirm => level.confirm(),
          C::Retry => {
            level.retry();
            Vec::new()
          }
          C::ReloadChoices => level.reload_choices(),
          C::BackToMap => {
            self.leave();
            self.screen = Screen::QuestMap;
            return vec![self.snapshot()];
          }
          other => return self.ignored(&format!("{other:?}")),
        };
        self.run(fx);
      }
      Screen::Classic(d) => {
        let fx = match msg {
          C::SetTopic { text } => {
            d.set_topic(&text);
            Vec::new()
          }
          C::AutoTopic => d.auto_topic(),
          C::ConfirmTopic => d.confirm_topic(),
          C::SelectSide { side } => {
            d.select_side(side);
            Vec::new()
          }
          C::ConfirmSide => {
            d.confirm_side();
            Vec::new()
          }
          C::StartDebate => d.start(),
          C::Submit { text } => d.submit(&text),
          C::EndDebate => d.end_debate(),
          C::SwitchSides => d.switch_sides(),
          C::Replay => d.replay(),
          other => return self.ignored(&format!("{other:?}")),
        };
        self.run(fx);
      }
      Screen::Hvh(d) => {
        let fx = match msg {
          C::SetTopic { text } => {
            d.set_topic(&text);
            Vec::new()
          }
          C::AutoTopic => d.auto_topic(),
          C::StartDebate => d.start(),
          C::Submit { text } => d.submit(&text),
          other => return self.ignored(&format!("{other:?}")),
        };
        self.run(fx);
      }
      Screen::Bias(q) => {
        let fx = match msg {
          C::NextQuestion => q.next_question(),
          C::Answer { index } => {
            q.answer(index);
            Vec::new()
          }
          other => return self.ignored(&format!("{other:?}")),
        };
        self.run(fx);
      }
    }
    vec![self.snapshot()]
  }

  fn on_map_action(&mut self, msg: ClientWsMessage) -> Vec<ServerWsMessage> {
    use ClientWsMessage as C;
    let on_map = matches!(self.screen, Screen::QuestMap);
    match msg {
      C::ToggleHardcore { enabled } => self.progress.hardcore = enabled,
      C::OpenLevel { level } if on_map => {
        if !level.checked_sub(1).is_some_and(|i| self.progress.open(i)) {
          return vec![ServerWsMessage::Error { message: format!("Level {level} is locked.") }];
        }
        self.screen = Screen::Briefing;
      }
      C::BeginLevel if !on_map => {
        let brief = LevelBrief::resolve(self.progress.selected, &self.translator);
        let hardcore = self.progress.hardcore;
        let timing = QuestTiming::from_settings(&self.state.game, hardcore);
        let mut level = QuestLevel::new(brief, self.translator.locale(), hardcore, timing, self.reduced_motion);
        let fx = level.start();
        self.screen = Screen::Quest(Box::new(level));
        self.run(fx);
      }
      C::BackToMap if !on_map => self.screen = Screen::QuestMap,
      other => return self.ignored(&format!("{other:?}")),
    }
    vec![self.snapshot()]
  }

  fn ignored(&self, what: &str) -> Vec<ServerWsMessage> {
    debug!(target: "devils_advocate", session = %self.id, action = %preview(what, 60), "Action not available on this screen");
    Vec::new()
  }

  fn navigate(&mut self, to: ScreenName) -> Vec<ServerWsMessage> {
    self.leave();
    let locale = self.translator.locale();
    self.screen = match to {
      ScreenName::Menu => Screen::Menu,
      ScreenName::Quest => Screen::QuestMap,
      ScreenName::Classic => Screen::Classic(ClassicDebate::new(ClassicVariant::Classic, locale, &self.state.game)),
      ScreenName::Hardcore => Screen::Classic(ClassicDebate::new(ClassicVariant::Hardcore, locale, &self.state.game)),
      ScreenName::Hvh => Screen::Hvh(HumanDebate::new(locale, self.state.game.hvh_rounds)),
      ScreenName::Bias => Screen::Bias(BiasQuiz::new(locale)),
    };
    if let Screen::Bias(q) = &mut self.screen {
      let fx = q.next_question();
      self.run(fx);
    }
    info!(target: "devils_advocate", session = %self.id, screen = ?to, "Screen changed");
    vec![self.snapshot()]
  }

  /// Shut the current screen's engine down, then abort whatever task is left.
  fn leave(&mut self) {
    match &mut self.screen {
      Screen::Quest(level) => {
        let fx = level.shutdown();
        self.run(fx);
      }
      Screen::Classic(d) => {
        let fx = d.shutdown();
        self.run(fx);
      }
      Screen::Hvh(d) => {
        let fx = d.shutdown();
        self.run(fx);
      }
      Screen::Bias(q) => {
        let fx = q.shutdown();
        self.run(fx);
      }
      Screen::Menu | Screen::QuestMap | Screen::Briefing => {}
    }
    let n = self.tasks.len();
    for (_, h) in self.tasks.drain() {
      h.abort();
    }
    if n > 0 {
      debug!(target: "devils_advocate", session = %self.id, aborted = n, "Screen tasks aborted");
    }
  }

  fn set_locale(&mut self, locale: Locale) -> Vec<ServerWsMessage> {
    if locale == self.translator.locale() {
      return vec![ServerWsMessage::Locale { locale, loaded: self.translator.is_loaded() }];
    }
    info!(target: "devils_advocate", session = %self.id, from = %self.translator.locale(), to = %locale, "Locale change");
    self.translator.set_locale(locale);
    self.load_catalog(locale);
    match &mut self.screen {
      Screen::Classic(d) => d.change_locale(locale),
      Screen::Hvh(d) => d.change_locale(locale),
      Screen::Bias(q) => {
        let fx = q.change_locale(locale);
        self.run(fx);
      }
      // The quest regenerates once the level texts are available in the
      // new language; see `on_catalog`.
      _ => {}
    }
    vec![ServerWsMessage::Locale { locale, loaded: false }, self.snapshot()]
  }

  fn on_catalog(&mut self, locale: Locale, result: Result<Arc<Catalog>, String>) -> Vec<ServerWsMessage> {
    if locale != self.translator.locale() {
      debug!(target: "devils_advocate", session = %self.id, %locale, "Catalog for a superseded locale");
      return Vec::new();
    }
    match result {
      Ok(catalog) => {
        self.translator.install(catalog);
      }
      Err(e) => warn!(target: "devils_advocate", session = %self.id, %locale, error = %e, "Catalog load failed; showing raw keys"),
    }
    if let Screen::Quest(level) = &mut self.screen {
      // A level begun before the catalog arrived holds raw keys in its brief.
      let raw_brief = !level.brief().localized && self.translator.is_loaded();
      if level.locale() != locale || raw_brief {
        let brief = LevelBrief::resolve(level.brief().index, &self.translator);
        let fx = level.change_locale(locale, brief);
        self.run(fx);
      }
    }
    vec![ServerWsMessage::Locale { locale, loaded: self.translator.is_loaded() }, self.snapshot()]
  }

  fn on_quest_event(&mut self, ev: QuestEvent) -> Vec<ServerWsMessage> {
    let Screen::Quest(level) = &mut self.screen else {
      return Vec::new();
    };
    let tick = matches!(ev, QuestEvent::RevealTick(_));
    let before = level.state();
    let fx = level.on_event(ev);
    let light = tick && fx.is_empty() && level.state() == before;
    if level.summary().is_some() {
      self.progress.complete(level.brief().index);
    }
    let reveal = level.reveal_view();
    self.run(fx);
    if light {
      vec![ServerWsMessage::Reveal(reveal)]
    } else {
      vec![self.snapshot()]
    }
  }

  fn snapshot(&self) -> ServerWsMessage {
    let tr = &self.translator;
    match &self.screen {
      Screen::Menu => ServerWsMessage::Menu,
      Screen::QuestMap => ServerWsMessage::QuestMap(map_view(&self.progress, tr)),
      Screen::Briefing => ServerWsMessage::Briefing(briefing_view(
        LevelBrief::resolve(self.progress.selected, tr),
        self.progress.hardcore,
        self.state.game.quest_turns,
        tr,
      )),
      Screen::Quest(level) => ServerWsMessage::Quest(level.view()),
      Screen::Classic(d) => ServerWsMessage::Classic(d.view(tr)),
      Screen::Hvh(d) => ServerWsMessage::Hvh(d.view()),
      Screen::Bias(q) => ServerWsMessage::Bias(q.view(tr)),
    }
  }

  fn load_catalog(&mut self, locale: Locale) {
    if let Some(h) = self.catalog_task.take() {
      h.abort();
    }
    let state = self.state.clone();
    let tx = self.tx.clone();
    self.catalog_task = Some(tokio::spawn(async move {
      let result = state.catalog(locale).await.map_err(|e| e.to_string());
      let _ = tx.send(SessionEvent::CatalogLoaded { locale, result });
    }));
  }

  /// Execute engine effects: spawn calls and timers, abort cancelled ones.
  fn run<C: OracleCall>(&mut self, fx: Vec<Effect<C>>) {
    self.tasks.retain(|_, h| !h.is_finished());
    for effect in fx {
      let ticket = effect.ticket();
      let tx = self.tx.clone();
      let handle = match effect {
        Effect::Cancel(_) => {
          if let Some(h) = self.tasks.remove(&ticket) {
            h.abort();
          }
          continue;
        }
        Effect::Call { call, .. } => {
          let oracle = self.state.oracle.clone();
          debug!(target: "devils_advocate", session = %self.id, %ticket, oracle = oracle.name(), "Oracle call");
          tokio::spawn(async move {
            let _ = tx.send(call.perform(ticket, oracle).await);
          })
        }
        Effect::Ticker { every, .. } => tokio::spawn(async move {
          let mut iv = interval_at(Instant::now() + every, every);
          iv.set_missed_tick_behavior(MissedTickBehavior::Delay);
          loop {
            iv.tick().await;
            let Some(ev) = C::ticker_event(ticket) else { break };
            if tx.send(ev).is_err() {
              break;
            }
          }
        }),
        Effect::Timer { after, .. } => tokio::spawn(async move {
          sleep(after).await;
          if let Some(ev) = C::timer_event(ticket) {
            let _ = tx.send(ev);
          }
        }),
      };
      self.tasks.insert(ticket, handle);
    }
  }
}

impl Drop for Session {
  fn drop(&mut self) {
    self.leave();
    if let Some(h) = self.catalog_task.take() {
      h.abort();
    }
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use tokio::sync::mpsc::{self, UnboundedReceiver};

  use super::*;
  use crate::classic::DebateStep;
  use crate::domain::SideChoice;
  use crate::fallback::AI_TURN_FALLBACK;
  use crate::oracle_mock::ScriptedOracle;
  use crate::quest::{ChoicesStatus, QuestView, TurnState};

  /// Session over the scripted oracle. Catalogs are read up front, before
  /// any timer exists, so paused time never races the file reads.
  async fn session(oracle: Arc<ScriptedOracle>) -> (Session, UnboundedReceiver<SessionEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let state = Arc::new(AppState::for_tests(oracle));
    for locale in Locale::ALL {
      state.catalog(locale).await.unwrap();
    }
    (Session::new(state, tx), rx)
  }

  async fn next(rx: &mut UnboundedReceiver<SessionEvent>) -> SessionEvent {
    tokio::time::timeout(Duration::from_secs(3600), rx.recv())
      .await
      .expect("session went quiet")
      .expect("channel closed")
  }

  fn client(s: &mut Session, msg: ClientWsMessage) -> Vec<ServerWsMessage> {
    s.handle(SessionEvent::Client(msg))
  }

  fn quest_view(out: &[ServerWsMessage]) -> Option<&QuestView> {
    out.iter().find_map(|m| match m {
      ServerWsMessage::Quest(v) => Some(v),
      _ => None,
    })
  }

  /// Open the map, pick a level and begin it.
  async fn begin_level(s: &mut Session, rx: &mut UnboundedReceiver<SessionEvent>, level: usize) {
    s.open();
    // Wait for the default catalog so level texts resolve.
    loop {
      let ev = next(rx).await;
      let loaded = matches!(ev, SessionEvent::CatalogLoaded { .. });
      s.handle(ev);
      if loaded {
        break;
      }
    }
    client(s, ClientWsMessage::Navigate { screen: ScreenName::Quest });
    client(s, ClientWsMessage::OpenLevel { level });
    client(s, ClientWsMessage::BeginLevel);
  }

  #[tokio::test(start_paused = true)]
  async fn quest_level_plays_through_and_unlocks_the_next() {
    let oracle = Arc::new(ScriptedOracle::new());
    let (mut s, mut rx) = session(oracle.clone()).await;
    client(&mut s, ClientWsMessage::SetReducedMotion { enabled: true });
    begin_level(&mut s, &mut rx, 1).await;

    let summary = loop {
      let out = s.handle(next(&mut rx).await);
      let Some(v) = quest_view(&out).cloned() else { continue };
      if let Some(summary) = v.summary {
        break summary;
      }
      match v.state {
        TurnState::AiDisplaying if v.can_advance => {
          client(&mut s, ClientWsMessage::Advance);
        }
        TurnState::PlayerChoosing if v.choices_status == ChoicesStatus::Ready => {
          assert!(v.choices.iter().all(|c| !c.selected));
          client(&mut s, ClientWsMessage::Select { id: "c1".into() });
          let out = client(&mut s, ClientWsMessage::Confirm);
          let fb = quest_view(&out).and_then(|v| v.feedback.clone()).expect("feedback");
          assert_eq!(fb.text, "Evidence first.");
        }
        _ => {}
      }
    };

    assert_eq!(summary.score, 80);
    assert_eq!(summary.overall_tips, "8 turns reviewed");
    assert_eq!(oracle.count("ai_turn"), 4);
    assert_eq!(oracle.count("choices"), 4);
    assert_eq!(oracle.count("summary"), 1);

    let out = client(&mut s, ClientWsMessage::ExportSummary);
    assert!(matches!(&out[0], ServerWsMessage::Export { filename, .. } if filename == "debate_quest_level_1.json"));

    let out = client(&mut s, ClientWsMessage::BackToMap);
    match &out[0] {
      ServerWsMessage::QuestMap(map) => {
        assert!(map.levels[1].unlocked);
        assert!(!map.levels[2].unlocked);
      }
      other => panic!("unexpected {other:?}"),
    }
  }

  #[tokio::test(start_paused = true)]
  async fn locale_change_regenerates_the_pending_ai_turn_once() {
    let oracle = Arc::new(ScriptedOracle::with_latency(Duration::from_millis(500)));
    let (mut s, mut rx) = session(oracle.clone()).await;
    client(&mut s, ClientWsMessage::SetReducedMotion { enabled: true });
    begin_level(&mut s, &mut rx, 1).await;
    tokio::task::yield_now().await;
    assert_eq!(oracle.count("ai_turn"), 1);

    client(&mut s, ClientWsMessage::SetLocale { locale: "fr".into() });
    let text = loop {
      let out = s.handle(next(&mut rx).await);
      if let Some(v) = quest_view(&out) {
        if v.state == TurnState::AiDisplaying {
          break v.ai_text.clone().unwrap_or_default();
        }
      }
    };
    assert_eq!(oracle.count("ai_turn"), 2);
    assert!(text.ends_with("(fr)"), "{text}");
  }

  #[tokio::test(start_paused = true)]
  async fn leaving_the_level_aborts_its_tasks() {
    let oracle = Arc::new(ScriptedOracle::with_latency(Duration::from_secs(10)));
    let (mut s, mut rx) = session(oracle).await;
    begin_level(&mut s, &mut rx, 1).await;
    assert_eq!(s.active_tasks(), 1);
    client(&mut s, ClientWsMessage::Navigate { screen: ScreenName::Menu });
    assert_eq!(s.active_tasks(), 0);
  }

  #[tokio::test(start_paused = true)]
  async fn back_to_map_stops_the_level() {
    let oracle = Arc::new(ScriptedOracle::with_latency(Duration::from_secs(10)));
    let (mut s, mut rx) = session(oracle).await;
    begin_level(&mut s, &mut rx, 1).await;
    assert_eq!(s.active_tasks(), 1);
    let out = client(&mut s, ClientWsMessage::BackToMap);
    assert!(matches!(&out[0], ServerWsMessage::QuestMap(_)));
    assert_eq!(s.active_tasks(), 0);
  }

  #[tokio::test(start_paused = true)]
  async fn level_begun_before_the_catalog_picks_up_its_texts() {
    let (mut s, mut rx) = session(Arc::new(ScriptedOracle::new())).await;
    s.open();
    client(&mut s, ClientWsMessage::Navigate { screen: ScreenName::Quest });
    client(&mut s, ClientWsMessage::OpenLevel { level: 1 });
    let out = client(&mut s, ClientWsMessage::BeginLevel);
    assert_eq!(quest_view(&out).map(|v| v.brief.title.as_str()), Some("topics.level1.title"));

    let out = loop {
      let ev = next(&mut rx).await;
      let loaded = matches!(ev, SessionEvent::CatalogLoaded { .. });
      let out = s.handle(ev);
      if loaded {
        break out;
      }
    };
    let v = quest_view(&out).expect("quest snapshot");
    assert_eq!(v.brief.title, "Mạng xã hội và thanh thiếu niên");
    assert_eq!(v.brief.ai_role, "nhà hoạt động quyền kỹ thuật số");
    assert_eq!(v.state, TurnState::AiGenerating);
  }

  #[tokio::test(start_paused = true)]
  async fn failed_ai_turn_shows_the_fallback_and_play_goes_on() {
    let oracle = Arc::new(ScriptedOracle::new());
    oracle.fail("ai_turn");
    let (mut s, mut rx) = session(oracle.clone()).await;
    client(&mut s, ClientWsMessage::SetReducedMotion { enabled: true });
    begin_level(&mut s, &mut rx, 1).await;

    let v = loop {
      let out = s.handle(next(&mut rx).await);
      if let Some(v) = quest_view(&out) {
        if v.state == TurnState::AiDisplaying && v.can_advance {
          break v.clone();
        }
      }
    };
    assert_eq!(v.ai_text.as_deref(), Some(AI_TURN_FALLBACK));
    assert_eq!(oracle.count("ai_turn"), 1);

    let out = client(&mut s, ClientWsMessage::Advance);
    let v = quest_view(&out).expect("quest snapshot");
    assert_eq!(v.state, TurnState::PlayerChoosing);
    assert_eq!(v.turn, 2);
    assert_eq!(v.transcript.last().map(|t| t.text.as_str()), Some(AI_TURN_FALLBACK));
  }

  #[tokio::test(start_paused = true)]
  async fn reveal_ticks_stream_lightweight_updates() {
    let oracle = Arc::new(ScriptedOracle::new());
    let (mut s, mut rx) = session(oracle).await;
    begin_level(&mut s, &mut rx, 1).await;
    let mut reveals = 0;
    loop {
      let out = s.handle(next(&mut rx).await);
      match out.first() {
        Some(ServerWsMessage::Reveal(r)) => {
          reveals += 1;
          assert!(r.typing);
        }
        Some(ServerWsMessage::Quest(v)) if v.state == TurnState::AiDisplaying && v.can_advance => break,
        _ => {}
      }
    }
    // "AI argument 1 (vi)" is 18 chars; the last tick completes it.
    assert_eq!(reveals, 17);
  }

  #[tokio::test(start_paused = true)]
  async fn locked_levels_cannot_be_opened() {
    let (mut s, _rx) = session(Arc::new(ScriptedOracle::new())).await;
    client(&mut s, ClientWsMessage::Navigate { screen: ScreenName::Quest });
    let out = client(&mut s, ClientWsMessage::OpenLevel { level: 3 });
    assert!(matches!(&out[0], ServerWsMessage::Error { .. }));
    let out = client(&mut s, ClientWsMessage::OpenLevel { level: 0 });
    assert!(matches!(&out[0], ServerWsMessage::Error { .. }));
  }

  #[tokio::test(start_paused = true)]
  async fn hardcore_debate_times_out_into_evaluation() {
    let oracle = Arc::new(ScriptedOracle::new());
    let (mut s, mut rx) = session(oracle.clone()).await;
    client(&mut s, ClientWsMessage::Navigate { screen: ScreenName::Hardcore });
    client(&mut s, ClientWsMessage::SetTopic { text: "Zoos".into() });
    client(&mut s, ClientWsMessage::ConfirmTopic);

    let mut started = false;
    let evaluation = loop {
      let out = s.handle(next(&mut rx).await);
      let Some(ServerWsMessage::Classic(v)) = out.into_iter().find(|m| matches!(m, ServerWsMessage::Classic(_))) else {
        continue;
      };
      if let Some(e) = v.evaluation {
        break e;
      }
      if v.step == DebateStep::Sides && v.side_a.is_some() && !started {
        started = true;
        client(&mut s, ClientWsMessage::SelectSide { side: SideChoice::A });
        client(&mut s, ClientWsMessage::ConfirmSide);
        client(&mut s, ClientWsMessage::StartDebate);
      }
    };
    assert_eq!(evaluation, "Timed out verdict");
    assert_eq!(oracle.count("classic_response"), 1);
    assert_eq!(oracle.count("evaluate_classic"), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn bias_screen_loads_a_question_on_entry_and_on_locale_change() {
    let oracle = Arc::new(ScriptedOracle::new());
    let (mut s, mut rx) = session(oracle.clone()).await;
    client(&mut s, ClientWsMessage::Navigate { screen: ScreenName::Bias });
    loop {
      let out = s.handle(next(&mut rx).await);
      if out.iter().any(|m| matches!(m, ServerWsMessage::Bias(v) if v.argument.is_some())) {
        break;
      }
    }
    let out = client(&mut s, ClientWsMessage::Answer { index: 0 });
    assert!(matches!(&out[0], ServerWsMessage::Bias(v) if v.score == 10 && v.correct_index == Some(0)));
    let out = client(&mut s, ClientWsMessage::SetLocale { locale: "ja".into() });
    assert!(matches!(&out[1], ServerWsMessage::Bias(v) if v.argument.is_none() && v.loading && v.score == 10));
    loop {
      let out = s.handle(next(&mut rx).await);
      if out.iter().any(|m| matches!(m, ServerWsMessage::Bias(v) if v.argument.is_some())) {
        break;
      }
    }
    assert_eq!(oracle.count("bias"), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn unknown_locale_is_reported() {
    let (mut s, _rx) = session(Arc::new(ScriptedOracle::new())).await;
    let out = client(&mut s, ClientWsMessage::SetLocale { locale: "xx".into() });
    assert!(matches!(&out[0], ServerWsMessage::Error { .. }));
  }
}
