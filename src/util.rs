//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values in a
/// single pass. No escaping, no nesting: a value containing `{other}` is
/// inserted as-is, and unknown placeholders are left untouched.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = String::with_capacity(tpl.len());
  let mut rest = tpl;
  while let Some(open) = rest.find('{') {
    out.push_str(&rest[..open]);
    let after = &rest[open + 1..];
    let hit = after
      .find('}')
      .and_then(|close| pairs.iter().find(|(k, _)| *k == &after[..close]).map(|(_, v)| (close, *v)));
    match hit {
      Some((close, value)) => {
        out.push_str(value);
        rest = &after[close + 1..];
      }
      None => {
        out.push('{');
        rest = after;
      }
    }
  }
  out.push_str(rest);
  out
}

/// Log-safe preview of a (possibly long, possibly non-ASCII) string.
pub fn preview(s: &str, max_chars: usize) -> String {
  let mut chars = s.chars();
  let head: String = chars.by_ref().take(max_chars).collect();
  if chars.next().is_some() { format!("{head}…") } else { head }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fill_template_replaces_every_occurrence() {
    let out = fill_template("{a} vs {b}, again {a}", &[("a", "x"), ("b", "y")]);
    assert_eq!(out, "x vs y, again x");
  }

  #[test]
  fn fill_template_leaves_unknown_placeholders() {
    assert_eq!(fill_template("{missing} {a}", &[("a", "{a}")]), "{missing} {a}");
  }

  #[test]
  fn values_are_not_rescanned() {
    assert_eq!(fill_template("{a}-{b}", &[("a", "{b}"), ("b", "B")]), "{b}-B");
    assert_eq!(fill_template("{{a}} {", &[("a", "x")]), "{x} {");
  }

  #[test]
  fn preview_respects_char_boundaries() {
    assert_eq!(preview("tiếng việt", 5), "tiếng…");
    assert_eq!(preview("short", 10), "short");
  }
}
