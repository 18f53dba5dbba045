//! Loading arena configuration (prompts + game timings) from TOML.
//!
//! See `ArenaConfig`, `Prompts` and `GameSettings` for the expected schema.
//! Every field is optional; missing ones take the defaults below.

use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::Locale;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct ArenaConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub game: GameSettings,
}

/// Knobs of the game flows. Times are in milliseconds unless named otherwise.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GameSettings {
  pub default_locale: Locale,
  pub locales_dir: String,
  pub quest_turns: usize,
  pub reveal_cadence_ms: u64,
  pub feedback_dwell_ms: u64,
  pub hardcore_feedback_dwell_ms: u64,
  pub countdown_secs: u32,
  pub countdown_tick_ms: u64,
  pub hvh_rounds: u32,
}

impl Default for GameSettings {
  fn default() -> Self {
    Self {
      default_locale: Locale::Vi,
      locales_dir: "./locales".into(),
      quest_turns: 8,
      reveal_cadence_ms: 30,
      feedback_dwell_ms: 2500,
      hardcore_feedback_dwell_ms: 1500,
      countdown_secs: 120,
      countdown_tick_ms: 1000,
      hvh_rounds: 3,
    }
  }
}

impl GameSettings {
  /// Tickers need a non-zero period; a configured 0 runs at 1 ms.
  pub fn reveal_cadence(&self) -> Duration { Duration::from_millis(self.reveal_cadence_ms.max(1)) }

  pub fn feedback_dwell(&self, hardcore: bool) -> Duration {
    Duration::from_millis(if hardcore { self.hardcore_feedback_dwell_ms } else { self.feedback_dwell_ms })
  }

  pub fn countdown_tick(&self) -> Duration { Duration::from_millis(self.countdown_tick_ms.max(1)) }
}

/// Prompts used by the oracle client. Placeholders are `{name}` tokens filled
/// with `util::fill_template`; every template starts with a `{language}` line.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub system_instruction: String,
  pub topic_template: String,
  pub sides_template: String,
  pub ai_turn_template: String,
  pub choices_template: String,
  pub summary_template: String,
  pub classic_response_template: String,
  pub classic_eval_template: String,
  pub classic_timeout_note: String,
  pub classic_timeout_penalty: String,
  pub hvh_eval_template: String,
  pub bias_template: String,
  pub bias_difficulty_obvious: String,
  pub bias_difficulty_moderate: String,
  pub bias_difficulty_subtle: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      system_instruction: r#"You are the core system engine of an AI debate game called The Devil's Advocate.
Your role is NOT to be agreeable. You are a strict debate judge, adversary, bias manipulator, and competitive scoring engine.
You must:
- Be intellectually aggressive.
- Avoid validating weak arguments.
- Penalize laziness.
- Explicitly detect logical fallacies.
- Avoid giving full scores unless performance is truly exceptional.
Tone: Cold, analytical, sharp. This is a competitive intellectual arena."#.into(),

      topic_template: r#"LANGUAGE: {language}
Generate a neutral, highly debatable topic suitable for a rigorous intellectual debate.
The topic should be balanced, allowing for strong arguments on both sides.
Return ONLY the topic text as a plain string, no quotes, no extra text.
ALL GENERATED CONTENT MUST BE IN THE REQUESTED LANGUAGE."#.into(),

      sides_template: r#"LANGUAGE: {language}
Topic: {topic}

Generate two clear, balanced, and opposing sides for this debate topic.
ALL GENERATED CONTENT MUST BE IN THE REQUESTED LANGUAGE.

Return JSON matching this schema:
{
  "topic": "The original topic (translated if necessary)",
  "description": "A brief 1-sentence description of the core conflict",
  "sideA": { "title": "Short title for Side A", "summary": "1-sentence summary of Side A's stance" },
  "sideB": { "title": "Short title for Side B", "summary": "1-sentence summary of Side B's stance" }
}"#.into(),

      ai_turn_template: r#"LANGUAGE: {language}
Topic: {topic} - {description}
Player Role: {player_role}
AI Role: {ai_role}
Level: {level}
Turn: {turn}
Hardcore Mode: {hardcore}
History: {history}

Generate the AI's next argument in the debate. The AI is arguing from the perspective of "{ai_role}" against the player's stance "{player_role}".
Keep it concise, UI-friendly (max 2-3 sentences), and intellectually aggressive.
ALL GENERATED CONTENT MUST BE IN THE REQUESTED LANGUAGE."#.into(),

      choices_template: r#"LANGUAGE: {language}
Topic: {topic} - {description}
Player Role: {player_role}
AI Role: {ai_role}
Level: {level}
Turn: {turn}
Hardcore Mode: {hardcore}
History: {history}

Generate 2 to 4 possible response choices for the player. The player is arguing from the perspective of "{player_role}".
Exactly ONE choice must be logically sound and "correct" in the context of a rigorous debate.
The other choices should contain logical fallacies, weak evidence, or emotional appeals.
If Hardcore is true, make the correct choice subtler and harder to distinguish from the plausible incorrect ones.
ALL GENERATED CONTENT MUST BE IN THE REQUESTED LANGUAGE.

Return JSON matching this schema:
{
  "choices": [
    { "id": "unique_string", "text": "The choice text", "rationaleForCorrectness": "Why this is correct or incorrect (max 2 sentences)", "isCorrect": boolean }
  ],
  "recommendedNumber": integer
}"#.into(),

      summary_template: r#"LANGUAGE: {language}
Topic: {topic} - {description}
Player Role: {player_role}
AI Role: {ai_role}
Hardcore Mode: {hardcore}
Debate History: {history}

Generate a post-level summary of the player's performance.
Calculate a score (0-100) based on their correct picks and penalties for wrong attempts.
Provide a per-turn analysis explaining why their selected choices were correct or incorrect, and overall tips.
ALL GENERATED CONTENT MUST BE IN THE REQUESTED LANGUAGE.

Return JSON matching this schema:
{
  "score": integer,
  "overallTips": "string",
  "perTurnAnalysis": [
    { "turnIndex": integer, "playerChoiceText": "string", "isCorrect": boolean, "explanation": "string" }
  ]
}"#.into(),

      classic_response_template: r#"LANGUAGE: {language}
We are debating the topic: "{topic}".
I (the AI) am arguing FOR: "{ai_side}".
The User is arguing FOR: "{user_side}".

Here is the debate so far:
{transcript}

Provide your next rebuttal or opening statement as the AI.
Be intellectually aggressive, challenge weak premises, call out emotional reasoning, and identify fallacies explicitly.
Do not break character. Keep your response concise, sharp, and impactful (under 200 words).
ALL GENERATED CONTENT MUST BE IN THE REQUESTED LANGUAGE."#.into(),

      classic_eval_template: r#"LANGUAGE: {language}
Evaluate the user's performance in the following debate.
Topic: "{topic}"
AI argued FOR: "{ai_side}"
User argued FOR: "{user_side}"

Transcript:
{transcript}

{timeout_note}

Score the user on Rhetoric (0-10), Evidence (0-10), and Logic (0-10).
Detect logical fallacies used and deduct points:
- Minor fallacy: -1
- Moderate: -2
- Severe: -3
Base Score = Average(Rhetoric, Evidence, Logic) * 10
Final Score = Base Score - total penalties {timeout_penalty}.

Provide a detailed breakdown, total score, and simulate a leaderboard entry:
"Your score: X / 100"
"Estimated Rank Tier:"
0-40 = Novice
41-60 = Intermediate
61-75 = Advanced
76-85 = Elite
86+ = Grandmaster (rare)

Be strict. Do not reward surface-level arguments.
ALL GENERATED CONTENT MUST BE IN THE REQUESTED LANGUAGE."#.into(),

      classic_timeout_note: "NOTE: The user failed to respond within the time limit in Hardcore Mode. Apply a heavy penalty (-10) for unfinished argument.".into(),
      classic_timeout_penalty: "- 10 (timeout penalty)".into(),

      hvh_eval_template: r#"LANGUAGE: {language}
Evaluate the following debate between two human players on the topic: "{topic}".

Transcript:
{transcript}

Score each player on Rhetoric (0-10), Evidence (0-10), and Logic (0-10).
Detect logical fallacies used and deduct points:
- Minor fallacy (weak analogy, oversimplification): -1
- Moderate (false cause, strawman): -2
- Severe (ad hominem, circular reasoning, false dilemma): -3
Final Score = Average(Rhetoric, Evidence, Logic) * 10 - total penalties.

Provide a detailed evaluation for BOTH players, including:
- Strengths
- Weaknesses
- Most critical mistake
- Final Score (out of 100)
- Who won and why.

Be strict. Scores above 85/100 should be rare.
ALL GENERATED CONTENT MUST BE IN THE REQUESTED LANGUAGE."#.into(),

      bias_template: r#"LANGUAGE: {language}
Generate a random argument intentionally containing ONE primary fallacy. Also include 1-2 minor rhetorical flaws.
Difficulty level: {difficulty}.
Provide 4 answer choices (one correct fallacy, three plausible but incorrect options).
Also provide explanations for why the correct answer is correct and why the others are wrong.
ALL GENERATED CONTENT MUST BE IN THE REQUESTED LANGUAGE.

Return JSON matching this schema:
{
  "argument": "The argument containing the fallacy",
  "options": ["4 answer choices, one correct, three incorrect"],
  "correctOptionIndex": integer,
  "explanationCorrect": "Why the correct answer is correct",
  "explanationIncorrect": "Why the other options are wrong"
}"#.into(),

      bias_difficulty_obvious: "obvious fallacies (e.g., strawman, ad hominem)".into(),
      bias_difficulty_moderate: "moderate fallacies (e.g., false cause, slippery slope)".into(),
      bias_difficulty_subtle: "subtle fallacies (e.g., equivocation, begging the question, composition/division)".into(),
    }
  }
}

/// Attempt to load `ArenaConfig` from ARENA_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_arena_config_from_env() -> Option<ArenaConfig> {
  let path = std::env::var("ARENA_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<ArenaConfig>(&s) {
      Ok(cfg) => {
        info!(target: "devils_advocate", %path, "Loaded arena config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "devils_advocate", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "devils_advocate", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
