//! Mapping an uncertain identification onto a care record.
//!
//! [`resolve`] runs three stages in strict order and stops at the first hit:
//!
//! 1. exact name equality (case and whitespace insensitive)
//! 2. whole-word containment against canonical names, accepted only when it
//!    singles out one record
//! 3. fuzzy scoring against every known name, gated by a threshold
//!
//! [`suggest`] uses the fuzzy stage alone with a lower bar and returns a short
//! ranked list for "did you mean" display. Neither function fails: no match is
//! `None` or an empty list.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::fuzzy;
use crate::record::{CareRecord, IdentificationResult};

pub const DEFAULT_RESOLVE_THRESHOLD: u8 = 75;
pub const DEFAULT_SUGGEST_THRESHOLD: u8 = 60;
pub const DEFAULT_SUGGEST_LIMIT: usize = 3;

/// Up to two names to look up. Blank fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
  pub scientific_name: Option<String>,
  pub common_name: Option<String>,
}

impl Query {
  pub fn new(scientific_name: Option<&str>, common_name: Option<&str>) -> Self {
    Self {
      scientific_name: scientific_name.map(str::to_string),
      common_name: common_name.map(str::to_string),
    }
  }

  /// A free-form name typed by a user. It is tried as both a scientific and a
  /// common name.
  pub fn from_name(name: &str) -> Self {
    Self::new(Some(name), Some(name))
  }

  fn scientific(&self) -> Option<String> {
    self.scientific_name.as_deref().map(key).filter(|k| !k.is_empty())
  }

  fn common(&self) -> Option<String> {
    self.common_name.as_deref().map(key).filter(|k| !k.is_empty())
  }

  /// Present fields, scientific first, without repeats.
  fn fields(&self) -> Vec<String> {
    let mut fields = Vec::with_capacity(2);
    for field in [self.scientific(), self.common()].into_iter().flatten() {
      if !fields.contains(&field) {
        fields.push(field);
      }
    }
    fields
  }

  pub fn is_empty(&self) -> bool {
    self.fields().is_empty()
  }
}

/// Placeholder names the identification could not fill in are left out, so
/// they never match a record.
impl From<&IdentificationResult> for Query {
  fn from(result: &IdentificationResult) -> Self {
    Self::new(result.known_scientific_name(), result.known_common_name())
  }
}

impl From<&str> for Query {
  fn from(name: &str) -> Self {
    Self::from_name(name)
  }
}

/// Which stage produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStage {
  Exact,
  Substring,
  Fuzzy,
}

impl std::fmt::Display for MatchStage {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      MatchStage::Exact => write!(f, "exact"),
      MatchStage::Substring => write!(f, "substring"),
      MatchStage::Fuzzy => write!(f, "fuzzy"),
    }
  }
}

/// A resolved record and how it was found.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution<'a> {
  pub record: &'a CareRecord,
  pub stage: MatchStage,
  /// Similarity of the winning name; 100 for exact and substring hits.
  pub score: u8,
}

/// Best single record for `query`, or `None` when nothing is confident enough.
pub fn resolve<'a>(query: &Query, records: &'a [CareRecord], threshold: u8) -> Option<&'a CareRecord> {
  resolve_detailed(query, records, threshold).map(|resolution| resolution.record)
}

/// [`resolve`], also reporting the stage and score of the match.
pub fn resolve_detailed<'a>(
  query: &Query,
  records: &'a [CareRecord],
  threshold: u8,
) -> Option<Resolution<'a>> {
  if records.is_empty() || query.is_empty() {
    return None;
  }

  if let Some(record) = exact_match(query, records) {
    debug!(record = %record.name, "exact match");
    return Some(Resolution { record, stage: MatchStage::Exact, score: 100 });
  }

  let contained = substring_matches(query, records);
  if let [index] = contained.as_slice() {
    let record = &records[*index];
    debug!(record = %record.name, "substring match");
    return Some(Resolution { record, stage: MatchStage::Substring, score: 100 });
  }
  if contained.len() > 1 {
    debug!(candidates = contained.len(), "ambiguous substring match, scoring all names");
  }

  let ranked = rank(query, records);
  let best = ranked.first()?;
  if best.score >= threshold {
    let record = &records[best.index];
    debug!(record = %record.name, score = best.score, threshold, "fuzzy match");
    Some(Resolution { record, stage: MatchStage::Fuzzy, score: best.score })
  } else {
    debug!(score = best.score, threshold, "no confident match");
    None
  }
}

/// Up to `limit` near matches scoring at least `threshold`, best first.
pub fn suggest<'a>(
  query: &Query,
  records: &'a [CareRecord],
  limit: usize,
  threshold: u8,
) -> Vec<&'a CareRecord> {
  if limit == 0 || records.is_empty() {
    return Vec::new();
  }

  rank(query, records)
    .into_iter()
    .take_while(|candidate| candidate.score >= threshold)
    .take(limit)
    .map(|candidate| &records[candidate.index])
    .collect()
}

/// A record index paired with its best score against the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MatchCandidate {
  index: usize,
  score: u8,
}

fn key(name: &str) -> String {
  name.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

fn exact_match<'a>(query: &Query, records: &'a [CareRecord]) -> Option<&'a CareRecord> {
  let usable = move || records.iter().filter(|r| r.is_usable());

  if let Some(scientific) = query.scientific() {
    let hit = usable().find(|record| {
      key(&record.name) == scientific
        || record.scientific_name.as_deref().map(key).as_deref() == Some(scientific.as_str())
    });
    if hit.is_some() {
      return hit;
    }
  }

  let common = query.common()?;
  usable().find(|record| {
    key(&record.name) == common || record.common_names.iter().any(|alias| key(alias) == common)
  })
}

/// Indices of records whose canonical name contains, or is contained in, a
/// query field on whole-word boundaries. One entry per record.
fn substring_matches(query: &Query, records: &[CareRecord]) -> Vec<usize> {
  let fields: Vec<Vec<String>> = query.fields().iter().map(|f| fuzzy::tokens(f)).collect();

  records
    .iter()
    .enumerate()
    .filter(|(_, record)| record.is_usable())
    .filter(|(_, record)| {
      let name = fuzzy::tokens(&record.name);
      fields.iter().any(|field| contains_run(&name, field) || contains_run(field, &name))
    })
    .map(|(index, _)| index)
    .collect()
}

/// True when `needle` appears as a contiguous run inside `haystack`.
fn contains_run(haystack: &[String], needle: &[String]) -> bool {
  !needle.is_empty()
    && needle.len() <= haystack.len()
    && haystack.windows(needle.len()).any(|window| window == needle)
}

/// Every usable record with its best score over all names and query fields,
/// sorted by score descending and then by collection order.
fn rank(query: &Query, records: &[CareRecord]) -> Vec<MatchCandidate> {
  let fields = query.fields();
  if fields.is_empty() {
    return Vec::new();
  }

  let mut candidates: Vec<MatchCandidate> = records
    .iter()
    .enumerate()
    .filter(|(_, record)| record.is_usable())
    .map(|(index, record)| {
      let score = candidate_names(record)
        .iter()
        .flat_map(|name| fields.iter().map(move |field| fuzzy::score(field, name)))
        .max()
        .unwrap_or(0);
      MatchCandidate { index, score }
    })
    .collect();

  // stable: equal scores keep collection order
  candidates.sort_by(|a, b| b.score.cmp(&a.score));
  candidates
}

/// A record's names, normalized and deduplicated.
fn candidate_names(record: &CareRecord) -> Vec<String> {
  let mut names: Vec<String> = Vec::new();
  for name in record.names().map(fuzzy::normalize) {
    if !name.is_empty() && !names.contains(&name) {
      names.push(name);
    }
  }
  names
}
