//! Domain models: locales, topics and sides, transcript turns, quest choices,
//! level summaries and bias-quiz questions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Supported UI/content languages. The set is closed; the tag is what the
/// client sends and what locale files are named after.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Locale {
  #[serde(rename = "vi")] Vi,
  #[serde(rename = "en")] En,
  #[serde(rename = "fr")] Fr,
  #[serde(rename = "de")] De,
  #[serde(rename = "ja")] Ja,
  #[serde(rename = "zh-CN")] ZhCn,
}

impl Locale {
  pub const ALL: [Locale; 6] = [Locale::Vi, Locale::En, Locale::Fr, Locale::De, Locale::Ja, Locale::ZhCn];

  pub fn tag(self) -> &'static str {
    match self {
      Locale::Vi => "vi",
      Locale::En => "en",
      Locale::Fr => "fr",
      Locale::De => "de",
      Locale::Ja => "ja",
      Locale::ZhCn => "zh-CN",
    }
  }

  /// Language directive embedded in every oracle prompt.
  pub fn language_name(self) -> &'static str {
    match self {
      Locale::Vi => "Vietnamese (vi)",
      Locale::En => "English (en)",
      Locale::Fr => "French (fr)",
      Locale::De => "German (de)",
      Locale::Ja => "Japanese (ja)",
      Locale::ZhCn => "Simplified Chinese (zh-CN)",
    }
  }
}

impl Default for Locale {
  fn default() -> Self { Locale::Vi }
}

impl fmt::Display for Locale {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.tag()) }
}

#[derive(Debug, thiserror::Error)]
#[error("unsupported locale tag: {0}")]
pub struct UnknownLocale(pub String);

impl FromStr for Locale {
  type Err = UnknownLocale;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Locale::ALL
      .into_iter()
      .find(|l| l.tag().eq_ignore_ascii_case(s.trim()))
      .ok_or_else(|| UnknownLocale(s.to_string()))
  }
}

/// One side of a debate topic.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Side {
  pub title: String,
  pub summary: String,
}

/// Topic with its two opposing sides. Immutable once confirmed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Topic {
  pub topic: String,
  pub description: String,
  pub side_a: Side,
  pub side_b: Side,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SideChoice {
  A,
  B,
}

/// Who spoke a transcript turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
  Ai,
  /// Quest-mode player.
  Player,
  /// Human arguing against the AI in the open debate.
  User,
  /// Numbered human in the human-vs-human mode (1 or 2).
  Human(u8),
}

impl Speaker {
  pub fn label(self) -> String {
    match self {
      Speaker::Ai => "AI".into(),
      Speaker::Player => "Player".into(),
      Speaker::User => "User".into(),
      Speaker::Human(n) => format!("Player {n}"),
    }
  }
}

/// A transcript entry. Transcripts are append-only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Turn {
  pub speaker: Speaker,
  pub text: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub is_correct: Option<bool>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub rationale: Option<String>,
}

impl Turn {
  pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
    Self { speaker, text: text.into(), is_correct: None, rationale: None }
  }

  pub fn judged(speaker: Speaker, text: impl Into<String>, is_correct: bool, rationale: impl Into<String>) -> Self {
    Self { speaker, text: text.into(), is_correct: Some(is_correct), rationale: Some(rationale.into()) }
  }
}

/// Render a transcript as "Speaker: text" paragraphs for free-text prompts.
pub fn transcript_text(turns: &[Turn]) -> String {
  turns
    .iter()
    .map(|t| format!("{}: {}", t.speaker.label(), t.text))
    .collect::<Vec<_>>()
    .join("\n\n")
}

/// Candidate response offered to the quest player.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Choice {
  pub id: String,
  pub text: String,
  pub rationale: String,
  pub is_correct: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChoiceBatch {
  pub choices: Vec<Choice>,
  #[serde(default)]
  pub recommended: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TurnAnalysis {
  pub turn_index: u32,
  pub choice_text: String,
  pub is_correct: bool,
  pub explanation: String,
}

/// Post-level report. This is the only artifact the player can export.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelSummary {
  pub score: i64,
  pub overall_tips: String,
  pub per_turn_analysis: Vec<TurnAnalysis>,
}

/// Single bias-quiz item: an argument with one primary fallacy and four options.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BiasQuestion {
  pub argument: String,
  pub options: Vec<String>,
  pub correct_index: usize,
  pub explanation_correct: String,
  pub explanation_incorrect: String,
}

/// Number of predefined quest levels.
pub const LEVEL_COUNT: usize = 10;

/// Who opens each level.
pub const LEVEL_FIRST_SPEAKER: [Speaker; LEVEL_COUNT] = [
  Speaker::Ai, Speaker::Player, Speaker::Ai, Speaker::Player, Speaker::Ai,
  Speaker::Player, Speaker::Ai, Speaker::Player, Speaker::Ai, Speaker::Player,
];

/// Speaker of `turn` in `level`: the level's first speaker on even turns,
/// the other party on odd turns.
pub fn speaker_for_turn(level: usize, turn: usize) -> Speaker {
  let first = LEVEL_FIRST_SPEAKER[level % LEVEL_COUNT];
  if turn % 2 == 0 {
    first
  } else if first == Speaker::Ai {
    Speaker::Player
  } else {
    Speaker::Ai
  }
}
