//! Minimal OpenAI client implementing the `Oracle`.
//!
//! We only call chat.completions and request either plain text or a strict JSON object.
//! Calls are instrumented and log model names, latencies, and response sizes (not contents).
//!
//! NOTE: We never log the API key. There is no retry here: a failed call is
//! reported to the caller, which degrades its screen.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::config::Prompts;
use crate::domain::{
  transcript_text, BiasQuestion, Choice, ChoiceBatch, LevelSummary, Locale, Side, Topic, Turn, TurnAnalysis,
};
use crate::oracle::{
  BiasDifficulty, DebateContext, Oracle, OracleError, OracleResult, SummaryContext, TurnContext,
};
use crate::util::fill_template;

/// Transcript turn as the model sees it: speakers spelled "AI" / "Player".
#[derive(Serialize)]
struct PromptTurn<'a> {
  speaker: String,
  text: &'a str,
  #[serde(skip_serializing_if = "Option::is_none")]
  is_correct: Option<bool>,
}

fn history_json(turns: &[Turn]) -> String {
  let turns: Vec<PromptTurn> = turns
    .iter()
    .map(|t| PromptTurn { speaker: t.speaker.label(), text: &t.text, is_correct: t.is_correct })
    .collect();
  serde_json::to_string(&turns).unwrap_or_else(|_| "[]".into())
}

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
  pub prompts: Prompts,
}

impl OpenAI {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env(prompts: Prompts) -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
    let timeout_secs = std::env::var("OPENAI_TIMEOUT_SECS")
      .ok()
      .and_then(|s| s.parse::<u64>().ok())
      .unwrap_or(30);

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(timeout_secs))
      .build()
      .ok()?;

    Some(Self { client, api_key, base_url, model, prompts })
  }

  async fn chat(&self, user: &str, temperature: f32, json: bool) -> OracleResult<String> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: self.model.clone(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: self.prompts.system_instruction.clone() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature,
      response_format: json.then(|| ResponseFormat { r#type: "json_object".into() }),
    };

    let start = Instant::now();
    let res = self.client.post(&url)
      .header(USER_AGENT, "devils-advocate-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await.map_err(|e| OracleError::Transport(e.to_string()))?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let message = extract_openai_error(&body).unwrap_or(body);
      error!(target: "oracle", elapsed = ?start.elapsed(), %status, "OpenAI call failed");
      return Err(OracleError::Http { status: status.as_u16(), message });
    }

    let body: ChatCompletionResponse = res.json().await.map_err(|e| OracleError::Parse(e.to_string()))?;
    if let Some(usage) = &body.usage {
      info!(target: "oracle", prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let text = body.choices.first()
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default().trim().to_string();
    info!(target: "oracle", elapsed = ?start.elapsed(), response_len = text.len(), "OpenAI response received");
    Ok(text)
  }

  /// Plain-text chat completion.
  #[instrument(level = "info", skip(self, user), fields(model = %self.model))]
  async fn chat_plain(&self, user: &str, temperature: f32) -> OracleResult<String> {
    self.chat(user, temperature, false).await
  }

  /// JSON-object chat completion. Generic over the target type T.
  #[instrument(level = "info", skip(self, user), fields(model = %self.model))]
  async fn chat_json<T: for<'a> Deserialize<'a>>(&self, user: &str, temperature: f32) -> OracleResult<T> {
    let text = self.chat(user, temperature, true).await?;
    serde_json::from_str::<T>(&text).map_err(|e| OracleError::Parse(format!("JSON parse error: {}", e)))
  }

  fn turn_prompt(&self, template: &str, ctx: &TurnContext) -> String {
    let history = history_json(&ctx.history);
    let level = (ctx.level_index + 1).to_string();
    let turn = (ctx.turn_index + 1).to_string();
    let hardcore = ctx.hardcore.to_string();
    fill_template(template, &[
      ("language", ctx.locale.language_name()),
      ("topic", &ctx.topic),
      ("description", &ctx.description),
      ("player_role", &ctx.player_role),
      ("ai_role", &ctx.ai_role),
      ("level", &level),
      ("turn", &turn),
      ("hardcore", &hardcore),
      ("history", &history),
    ])
  }

  fn debate_prompt(&self, template: &str, ctx: &DebateContext, extra: &[(&str, &str)]) -> String {
    let transcript = transcript_text(&ctx.transcript);
    let mut pairs = vec![
      ("language", ctx.locale.language_name()),
      ("topic", ctx.topic.as_str()),
      ("ai_side", ctx.ai_side.as_str()),
      ("user_side", ctx.user_side.as_str()),
      ("transcript", transcript.as_str()),
    ];
    pairs.extend_from_slice(extra);
    fill_template(template, &pairs)
  }
}

#[async_trait]
impl Oracle for OpenAI {
  fn name(&self) -> &str { "openai" }

  #[instrument(level = "info", skip(self), fields(%locale))]
  async fn generate_topic(&self, locale: Locale) -> OracleResult<String> {
    let user = fill_template(&self.prompts.topic_template, &[("language", locale.language_name())]);
    let text = self.chat_plain(&user, 0.9).await?;
    Ok(text.trim_matches('"').to_string())
  }

  #[instrument(level = "info", skip(self, topic), fields(%locale, topic_len = topic.len()))]
  async fn generate_sides(&self, topic: &str, locale: Locale) -> OracleResult<Topic> {
    let user = fill_template(&self.prompts.sides_template, &[("language", locale.language_name()), ("topic", topic)]);
    let w: SidesWire = self.chat_json(&user, 0.7).await?;
    Ok(Topic { topic: w.topic, description: w.description, side_a: w.side_a.into(), side_b: w.side_b.into() })
  }

  #[instrument(level = "info", skip(self, ctx), fields(locale = %ctx.locale, level = ctx.level_index, turn = ctx.turn_index))]
  async fn generate_ai_turn(&self, ctx: &TurnContext) -> OracleResult<String> {
    let user = self.turn_prompt(&self.prompts.ai_turn_template, ctx);
    self.chat_plain(&user, 0.8).await
  }

  #[instrument(level = "info", skip(self, ctx), fields(locale = %ctx.locale, level = ctx.level_index, turn = ctx.turn_index))]
  async fn generate_choices(&self, ctx: &TurnContext) -> OracleResult<ChoiceBatch> {
    let user = self.turn_prompt(&self.prompts.choices_template, ctx);
    let w: ChoicesWire = self.chat_json(&user, 0.8).await?;
    Ok(ChoiceBatch {
      choices: w.choices.into_iter().map(|c| Choice {
        id: c.id,
        text: c.text,
        rationale: c.rationale_for_correctness,
        is_correct: c.is_correct,
      }).collect(),
      recommended: w.recommended_number,
    })
  }

  #[instrument(level = "info", skip(self, ctx), fields(locale = %ctx.locale, turns = ctx.history.len()))]
  async fn level_summary(&self, ctx: &SummaryContext) -> OracleResult<LevelSummary> {
    let history = history_json(&ctx.history);
    let hardcore = ctx.hardcore.to_string();
    let user = fill_template(&self.prompts.summary_template, &[
      ("language", ctx.locale.language_name()),
      ("topic", &ctx.topic),
      ("description", &ctx.description),
      ("player_role", &ctx.player_role),
      ("ai_role", &ctx.ai_role),
      ("hardcore", &hardcore),
      ("history", &history),
    ]);
    let w: SummaryWire = self.chat_json(&user, 0.3).await?;
    Ok(LevelSummary {
      score: w.score,
      overall_tips: w.overall_tips,
      per_turn_analysis: w.per_turn_analysis.into_iter().map(|a| TurnAnalysis {
        turn_index: a.turn_index,
        choice_text: a.player_choice_text,
        is_correct: a.is_correct,
        explanation: a.explanation,
      }).collect(),
    })
  }

  #[instrument(level = "info", skip(self, ctx), fields(locale = %ctx.locale, turns = ctx.transcript.len()))]
  async fn classic_response(&self, ctx: &DebateContext) -> OracleResult<String> {
    let user = self.debate_prompt(&self.prompts.classic_response_template, ctx, &[]);
    self.chat_plain(&user, 0.8).await
  }

  #[instrument(level = "info", skip(self, ctx), fields(locale = %ctx.locale, turns = ctx.transcript.len(), %timed_out))]
  async fn evaluate_classic(&self, ctx: &DebateContext, timed_out: bool) -> OracleResult<String> {
    let (note, penalty) = if timed_out {
      (self.prompts.classic_timeout_note.as_str(), self.prompts.classic_timeout_penalty.as_str())
    } else {
      ("", "")
    };
    let user = self.debate_prompt(
      &self.prompts.classic_eval_template,
      ctx,
      &[("timeout_note", note), ("timeout_penalty", penalty)],
    );
    self.chat_plain(&user, 0.2).await
  }

  #[instrument(level = "info", skip(self, topic, transcript), fields(%locale, turns = transcript.len()))]
  async fn evaluate_hvh(&self, topic: &str, transcript: &[Turn], locale: Locale) -> OracleResult<String> {
    let text = transcript_text(transcript);
    let user = fill_template(&self.prompts.hvh_eval_template, &[
      ("language", locale.language_name()),
      ("topic", topic),
      ("transcript", &text),
    ]);
    self.chat_plain(&user, 0.2).await
  }

  #[instrument(level = "info", skip(self), fields(%locale, ?difficulty))]
  async fn bias_question(&self, difficulty: BiasDifficulty, locale: Locale) -> OracleResult<BiasQuestion> {
    let level = match difficulty {
      BiasDifficulty::Obvious => &self.prompts.bias_difficulty_obvious,
      BiasDifficulty::Moderate => &self.prompts.bias_difficulty_moderate,
      BiasDifficulty::Subtle => &self.prompts.bias_difficulty_subtle,
    };
    let user = fill_template(&self.prompts.bias_template, &[("language", locale.language_name()), ("difficulty", level)]);
    let w: BiasWire = self.chat_json(&user, 0.9).await?;
    Ok(BiasQuestion {
      argument: w.argument,
      options: w.options,
      correct_index: w.correct_option_index,
      explanation_correct: w.explanation_correct,
      explanation_incorrect: w.explanation_incorrect,
    })
  }
}

// --- Response shapes requested in the prompts ---

#[derive(Deserialize)]
struct SideWire { title: String, summary: String }

impl From<SideWire> for Side {
  fn from(w: SideWire) -> Self { Side { title: w.title, summary: w.summary } }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SidesWire {
  topic: String,
  description: String,
  side_a: SideWire,
  side_b: SideWire,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChoiceWire {
  id: String,
  text: String,
  #[serde(default)] rationale_for_correctness: String,
  is_correct: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChoicesWire {
  #[serde(default)] choices: Vec<ChoiceWire>,
  #[serde(default)] recommended_number: Option<u32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisWire {
  turn_index: u32,
  #[serde(default)] player_choice_text: String,
  is_correct: bool,
  #[serde(default)] explanation: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryWire {
  score: i64,
  #[serde(default)] overall_tips: String,
  #[serde(default)] per_turn_analysis: Vec<AnalysisWire>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BiasWire {
  argument: String,
  options: Vec<String>,
  correct_option_index: usize,
  #[serde(default)] explanation_correct: String,
  #[serde(default)] explanation_incorrect: String,
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }
#[derive(Serialize)]
struct ResponseFormat { #[serde(rename = "type")] r#type: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some(w.error.message),
    Err(_) => None,
  }
}
