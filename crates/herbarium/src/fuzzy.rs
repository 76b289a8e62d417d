//! Token-based, order-insensitive name similarity on a 0-100 scale.
//!
//! Scores follow the fuzzywuzzy family: a plain edit-distance ratio, a ratio
//! over sorted tokens, and a set ratio that rewards one name being a subset
//! of the other. [`score`] is the best of the token-based two.

use std::collections::BTreeSet;
use strsim::normalized_levenshtein;

/// Lowercase, replace anything that is not alphanumeric with a space and
/// collapse runs of whitespace.
pub fn normalize(text: &str) -> String {
  text
    .chars()
    .map(|c| if c.is_alphanumeric() { c } else { ' ' })
    .collect::<String>()
    .to_lowercase()
    .split_whitespace()
    .collect::<Vec<_>>()
    .join(" ")
}

/// Words of the normalized text.
pub fn tokens(text: &str) -> Vec<String> {
  normalize(text).split(' ').filter(|t| !t.is_empty()).map(str::to_string).collect()
}

/// Edit-distance similarity of two already-normalized strings.
pub fn ratio(a: &str, b: &str) -> u8 {
  match (a.is_empty(), b.is_empty()) {
    (true, true) => 100,
    (true, false) | (false, true) => 0,
    _ => to_percent(normalized_levenshtein(a, b)),
  }
}

/// Ratio after sorting each side's tokens alphabetically.
pub fn token_sort_ratio(a: &str, b: &str) -> u8 {
  let mut a_tokens = tokens(a);
  let mut b_tokens = tokens(b);
  a_tokens.sort();
  b_tokens.sort();
  ratio(&a_tokens.join(" "), &b_tokens.join(" "))
}

/// Compares the shared tokens against each side's full token set.
///
/// When every word of one side also appears on the other, the score is 100.
pub fn token_set_ratio(a: &str, b: &str) -> u8 {
  let a_set: BTreeSet<String> = tokens(a).into_iter().collect();
  let b_set: BTreeSet<String> = tokens(b).into_iter().collect();

  let shared = join(a_set.intersection(&b_set));
  let a_rest = join(a_set.difference(&b_set));
  let b_rest = join(b_set.difference(&a_set));

  let a_combined = combine(&shared, &a_rest);
  let b_combined = combine(&shared, &b_rest);

  let mut best = ratio(&a_combined, &b_combined);
  if !shared.is_empty() {
    best = best.max(ratio(&shared, &a_combined)).max(ratio(&shared, &b_combined));
  }
  best
}

/// Similarity used by the resolver. Zero when either side has no words.
pub fn score(query: &str, candidate: &str) -> u8 {
  if tokens(query).is_empty() || tokens(candidate).is_empty() {
    return 0;
  }
  token_sort_ratio(query, candidate).max(token_set_ratio(query, candidate))
}

fn to_percent(similarity: f64) -> u8 {
  (similarity.clamp(0.0, 1.0) * 100.0).round() as u8
}

fn join<'a>(words: impl Iterator<Item = &'a String>) -> String {
  words.map(String::as_str).collect::<Vec<_>>().join(" ")
}

fn combine(shared: &str, rest: &str) -> String {
  match (shared.is_empty(), rest.is_empty()) {
    (true, _) => rest.to_string(),
    (false, true) => shared.to_string(),
    (false, false) => format!("{shared} {rest}"),
  }
}
