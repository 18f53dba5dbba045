//! Progressive, character-by-character reveal of a turn's text.
//!
//! Pure progress bookkeeping; the ticker that drives it is an engine effect.

#[derive(Debug, Clone, PartialEq)]
pub struct Reveal {
  text: String,
  total: usize,
  shown: usize,
}

impl Reveal {
  pub fn new(text: impl Into<String>) -> Self {
    let text = text.into();
    let total = text.chars().count();
    Self { text, total, shown: 0 }
  }

  /// Already complete (reduced motion, or nothing to animate).
  pub fn instant(text: impl Into<String>) -> Self {
    let mut r = Self::new(text);
    r.shown = r.total;
    r
  }

  /// Show one more character. Returns true when this tick completed the reveal.
  pub fn tick(&mut self) -> bool {
    if self.is_complete() {
      return false;
    }
    self.shown += 1;
    self.is_complete()
  }

  /// Snap to the full text. Returns false if there was nothing left to show.
  pub fn skip(&mut self) -> bool {
    if self.is_complete() {
      return false;
    }
    self.shown = self.total;
    true
  }

  pub fn is_complete(&self) -> bool { self.shown >= self.total }

  pub fn text(&self) -> &str { &self.text }

  pub fn visible(&self) -> String {
    self.text.chars().take(self.shown).collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn ticks_one_char_at_a_time() {
    let mut r = Reveal::new("héy");
    assert_eq!(r.visible(), "");
    assert!(!r.tick());
    assert_eq!(r.visible(), "h");
    assert!(!r.tick());
    assert_eq!(r.visible(), "hé");
    assert!(r.tick());
    assert!(r.is_complete());
    assert!(!r.tick());
  }

  #[test]
  fn skip_is_idempotent() {
    let mut r = Reveal::new("text");
    r.tick();
    assert!(r.skip());
    assert_eq!(r.visible(), "text");
    assert!(!r.skip());
  }

  #[test]
  fn empty_text_is_complete() {
    assert!(Reveal::new("").is_complete());
    assert!(Reveal::instant("abc").is_complete());
  }
}
