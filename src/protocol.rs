//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::bias::BiasView;
use crate::classic::ClassicView;
use crate::domain::{Locale, SideChoice, Speaker};
use crate::hvh::HvhView;
use crate::quest::{BriefingView, QuestMapView, QuestView, RevealView};

/// Top-level screens a client can navigate to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenName {
  Menu,
  Quest,
  Classic,
  Hardcore,
  Hvh,
  Bias,
}

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
  Ping,
  SetLocale { locale: String },
  SetReducedMotion { enabled: bool },
  Navigate { screen: ScreenName },

  // Quest map / briefing
  ToggleHardcore { enabled: bool },
  OpenLevel { level: usize },
  BeginLevel,
  BackToMap,

  // Quest turns
  Skip,
  Advance,
  Select { id: String },
  SelectIndex { number: usize },
  Confirm,
  Retry,
  ReloadChoices,
  ExportSummary,

  // Open debates (classic, hardcore, hvh)
  SetTopic { text: String },
  AutoTopic,
  ConfirmTopic,
  SelectSide { side: SideChoice },
  ConfirmSide,
  StartDebate,
  Submit { text: String },
  EndDebate,
  SwitchSides,
  Replay,

  // Bias quiz
  NextQuestion,
  Answer { index: usize },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
  Pong,
  Hello {
    #[serde(rename = "sessionId")]
    session_id: String,
    locale: Locale,
    locales: Vec<Locale>,
  },
  Locale {
    locale: Locale,
    loaded: bool,
  },
  Menu,
  QuestMap(QuestMapView),
  Briefing(BriefingView),
  Quest(QuestView),
  /// Reveal progress only; sent on every ticker step.
  Reveal(RevealView),
  Classic(ClassicView),
  Hvh(HvhView),
  Bias(BiasView),
  Export {
    filename: String,
    content: String,
  },
  Error {
    message: String,
  },
}

//
// HTTP request/response DTOs
//

#[derive(Serialize)]
pub struct HealthOut {
  pub ok: bool,
  pub oracle: String,
}

#[derive(Serialize)]
pub struct LocalesOut {
  pub default: Locale,
  pub locales: Vec<LocaleOut>,
}

#[derive(Serialize)]
pub struct LocaleOut {
  pub tag: Locale,
  pub name: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct LocaleQuery {
  pub locale: Option<String>,
}

#[derive(Serialize)]
pub struct LevelOut {
  pub number: usize,
  pub title: String,
  pub description: String,
  #[serde(rename = "playerRole")]
  pub player_role: String,
  #[serde(rename = "aiRole")]
  pub ai_role: String,
  #[serde(rename = "firstSpeaker")]
  pub first_speaker: Speaker,
}

#[derive(Serialize)]
pub struct TopicOut {
  pub topic: String,
}

#[derive(Serialize)]
pub struct ErrorOut {
  pub error: String,
}
