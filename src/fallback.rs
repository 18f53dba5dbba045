//! Fixed degraded content shown in place of oracle output.
//!
//! Nothing here is generated locally: these are the static "system fault"
//! strings and empty results a screen falls back to when a call fails.

use crate::domain::LevelSummary;

pub const AI_TURN_FALLBACK: &str = "System error generating AI response.";
pub const DEBATE_INIT_FALLBACK: &str = "Error initializing debate.";
pub const DEBATE_TURN_FALLBACK: &str = "System fault.";
pub const DEBATE_EVAL_FALLBACK: &str = "Error evaluating debate.";
pub const HVH_EVAL_FALLBACK: &str = "Error evaluating debate. The system encountered a fault.";

/// Recorded as the user's turn when the hardcore countdown expires.
pub const TIMEOUT_TURN: &str = "[no response: time expired]";

pub fn summary_fallback() -> LevelSummary {
  LevelSummary {
    score: 0,
    overall_tips: "Error generating summary.".into(),
    per_turn_analysis: Vec::new(),
  }
}
