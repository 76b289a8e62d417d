use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RecordError;

/// Free-text care fields. `None` means unspecified.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CareFields {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub light: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub watering: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub temperature: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub humidity: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub feeding: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub toxicity: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
}

impl CareFields {
  /// The short care fields with their labels, in display order, specified or
  /// not. Free-form notes are not included.
  pub fn labelled(&self) -> [(&'static str, Option<&str>); 6] {
    [
      ("Light", self.light.as_deref()),
      ("Water", self.watering.as_deref()),
      ("Temperature", self.temperature.as_deref()),
      ("Humidity", self.humidity.as_deref()),
      ("Feeding", self.feeding.as_deref()),
      ("Toxicity", self.toxicity.as_deref()),
    ]
  }

  /// Labelled care fields that are specified, notes last.
  pub fn entries(&self) -> Vec<(&'static str, &str)> {
    self
      .labelled()
      .into_iter()
      .chain([("Notes", self.notes.as_deref())])
      .filter_map(|(label, value)| value.map(|v| (label, v)))
      .collect()
  }

  pub fn is_empty(&self) -> bool {
    self.entries().is_empty()
  }
}

/// Personality block as found in the care file.
///
/// Traits are kept loosely typed; `personality::build_profile` coerces them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalityBlock {
  #[serde(default, alias = "Title", skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,
  #[serde(default, alias = "Traits", skip_serializing_if = "Option::is_none")]
  pub traits: Option<Value>,
  #[serde(default, alias = "Prompt", skip_serializing_if = "Option::is_none")]
  pub prompt: Option<String>,
}

/// A plant's canonical name, aliases, care fields and optional personality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CareRecord {
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub scientific_name: Option<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub common_names: Vec<String>,
  #[serde(default, skip_serializing_if = "CareFields::is_empty")]
  pub care: CareFields,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub personality: Option<PersonalityBlock>,
}

impl CareRecord {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      scientific_name: None,
      common_names: Vec::new(),
      care: CareFields::default(),
      personality: None,
    }
  }

  pub fn with_scientific_name(mut self, scientific_name: impl Into<String>) -> Self {
    self.scientific_name = Some(scientific_name.into());
    self
  }

  pub fn with_common_names<I, S>(mut self, names: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.common_names = names.into_iter().map(Into::into).collect();
    self
  }

  pub fn with_care(mut self, care: CareFields) -> Self {
    self.care = care;
    self
  }

  pub fn with_personality(mut self, personality: PersonalityBlock) -> Self {
    self.personality = Some(personality);
    self
  }

  /// Records with a blank canonical name cannot take part in matching.
  pub fn is_usable(&self) -> bool {
    !self.name.trim().is_empty()
  }

  /// Canonical name, scientific name and aliases, skipping blanks.
  pub fn names(&self) -> impl Iterator<Item = &str> {
    std::iter::once(self.name.as_str())
      .chain(self.scientific_name.as_deref())
      .chain(self.common_names.iter().map(String::as_str))
      .filter(|name| !name.trim().is_empty())
  }

  /// Validate one loosely-shaped care-file entry.
  pub fn from_value(index: usize, value: Value) -> Result<Self, RecordError> {
    let raw: RawCareRecord =
      serde_json::from_value(value).map_err(|source| RecordError::Shape { index, source })?;
    raw.into_record(index)
  }
}

/// Stands in for a name the identification service did not report.
pub const UNKNOWN_NAME: &str = "Unknown";

/// An image-identification guess: names plus a confidence in [0, 100].
///
/// Missing names hold [`UNKNOWN_NAME`]; use [`known_scientific_name`] and
/// [`known_common_name`] when only real names are wanted.
///
/// [`known_scientific_name`]: IdentificationResult::known_scientific_name
/// [`known_common_name`]: IdentificationResult::known_common_name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentificationResult {
  pub scientific_name: String,
  pub common_name: String,
  pub confidence: f64,
}

impl IdentificationResult {
  pub fn new(
    scientific_name: impl Into<String>,
    common_name: impl Into<String>,
    confidence: f64,
  ) -> Self {
    Self {
      scientific_name: scientific_name.into(),
      common_name: common_name.into(),
      confidence: confidence.clamp(0.0, 100.0),
    }
  }

  pub fn known_scientific_name(&self) -> Option<&str> {
    known(&self.scientific_name)
  }

  pub fn known_common_name(&self) -> Option<&str> {
    known(&self.common_name)
  }
}

fn known(name: &str) -> Option<&str> {
  let name = name.trim();
  (!name.is_empty() && !name.eq_ignore_ascii_case(UNKNOWN_NAME)).then_some(name)
}

/// Care-file entry as written on disk. Accepts the legacy title-cased keys
/// and snake_case keys.
#[derive(Debug, Deserialize)]
struct RawCareRecord {
  #[serde(default, rename = "Plant Name", alias = "name")]
  name: Option<String>,
  #[serde(default, rename = "Scientific Name", alias = "scientific_name")]
  scientific_name: Option<String>,
  #[serde(default, rename = "Common Names", alias = "common_names", alias = "aliases")]
  common_names: Option<Value>,
  #[serde(default, rename = "Light Requirements", alias = "light")]
  light: Option<Value>,
  #[serde(default, rename = "Watering", alias = "watering")]
  watering: Option<Value>,
  #[serde(default, rename = "Temperature Range", alias = "temperature")]
  temperature: Option<Value>,
  #[serde(default, rename = "Humidity Preferences", alias = "humidity")]
  humidity: Option<Value>,
  #[serde(default, rename = "Feeding Schedule", alias = "feeding")]
  feeding: Option<Value>,
  #[serde(default, rename = "Toxicity", alias = "toxicity")]
  toxicity: Option<Value>,
  #[serde(default, rename = "Additional Care", alias = "notes")]
  notes: Option<Value>,
  #[serde(default, rename = "Personality", alias = "personality")]
  personality: Option<Value>,
}

impl RawCareRecord {
  fn into_record(self, index: usize) -> Result<CareRecord, RecordError> {
    let scientific_name = non_blank(self.scientific_name);
    let name = non_blank(self.name)
      .or_else(|| scientific_name.clone())
      .ok_or(RecordError::MissingName { index })?;

    let personality = match self.personality {
      Some(value @ Value::Object(_)) => serde_json::from_value(value).ok(),
      _ => None,
    };

    Ok(CareRecord {
      name,
      scientific_name,
      common_names: self.common_names.map(text_list).unwrap_or_default(),
      care: CareFields {
        light: self.light.and_then(text),
        watering: self.watering.and_then(text),
        temperature: self.temperature.and_then(text),
        humidity: self.humidity.and_then(text),
        feeding: self.feeding.and_then(text),
        toxicity: self.toxicity.and_then(text),
        notes: self.notes.and_then(text),
      },
      personality,
    })
  }
}

fn non_blank(value: Option<String>) -> Option<String> {
  value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Scalar JSON rendered as text; lists joined with commas.
pub(crate) fn text(value: Value) -> Option<String> {
  let rendered = match value {
    Value::String(s) => s,
    Value::Number(n) => n.to_string(),
    Value::Bool(b) => b.to_string(),
    Value::Array(items) => text_list(Value::Array(items)).join(", "),
    Value::Null | Value::Object(_) => return None,
  };
  non_blank(Some(rendered))
}

/// A string or a list of scalars, as a list of non-blank strings.
pub(crate) fn text_list(value: Value) -> Vec<String> {
  match value {
    Value::Array(items) => items
      .into_iter()
      .filter(|item| !matches!(item, Value::Array(_)))
      .filter_map(text)
      .collect(),
    other => text(other).into_iter().collect(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn legacy_keys_are_accepted() {
    let record = CareRecord::from_value(
      0,
      json!({
        "Plant Name": "Snake Plant",
        "Scientific Name": "Dracaena trifasciata",
        "Common Names": ["Mother-in-law's tongue", ""],
        "Light Requirements": "Low to bright indirect",
        "Watering": "Every 2-3 weeks",
        "Additional Care": "Wipe leaves",
        "Personality": {"Title": "The Stoic", "Traits": ["calm"], "Prompt": "Be calm."}
      }),
    )
    .unwrap();

    assert_eq!(record.name, "Snake Plant");
    assert_eq!(record.scientific_name.as_deref(), Some("Dracaena trifasciata"));
    assert_eq!(record.common_names, vec!["Mother-in-law's tongue"]);
    assert_eq!(record.care.light.as_deref(), Some("Low to bright indirect"));
    assert_eq!(record.care.notes.as_deref(), Some("Wipe leaves"));
    assert_eq!(record.personality.unwrap().title.as_deref(), Some("The Stoic"));
  }

  #[test]
  fn snake_case_keys_are_accepted() {
    let record = CareRecord::from_value(
      3,
      json!({"name": "Pothos", "aliases": "Devil's Ivy", "humidity": 60}),
    )
    .unwrap();

    assert_eq!(record.name, "Pothos");
    assert_eq!(record.common_names, vec!["Devil's Ivy"]);
    assert_eq!(record.care.humidity.as_deref(), Some("60"));
  }

  #[test]
  fn scientific_name_stands_in_for_missing_name() {
    let record =
      CareRecord::from_value(0, json!({"Scientific Name": "Ficus lyrata"})).unwrap();
    assert_eq!(record.name, "Ficus lyrata");
  }

  #[test]
  fn entry_without_name_is_rejected() {
    let err = CareRecord::from_value(7, json!({"Plant Name": "  ", "Watering": "weekly"}))
      .unwrap_err();
    assert!(matches!(err, RecordError::MissingName { index: 7 }));
  }

  #[test]
  fn non_object_entry_is_rejected() {
    let err = CareRecord::from_value(2, json!("just a string")).unwrap_err();
    assert!(matches!(err, RecordError::Shape { index: 2, .. }));
  }

  #[test]
  fn care_entries_skip_unspecified_fields() {
    let care = CareFields {
      watering: Some("Weekly".to_string()),
      toxicity: Some("Toxic to cats".to_string()),
      ..CareFields::default()
    };
    assert_eq!(care.entries(), vec![("Water", "Weekly"), ("Toxicity", "Toxic to cats")]);
    assert!(CareFields::default().is_empty());
  }

  #[test]
  fn labelled_fields_include_unspecified_ones() {
    let care = CareFields { light: Some("Bright".to_string()), ..CareFields::default() };
    let labelled = care.labelled();
    assert_eq!(labelled[0], ("Light", Some("Bright")));
    assert_eq!(labelled[1], ("Water", None));
    assert_eq!(labelled.map(|(label, _)| label)[5], "Toxicity");
  }

  #[test]
  fn placeholder_names_are_not_known() {
    let result = IdentificationResult::new("Epipremnum aureum", "Unknown", 40.0);
    assert_eq!(result.known_scientific_name(), Some("Epipremnum aureum"));
    assert_eq!(result.known_common_name(), None);

    let blank = IdentificationResult::new("  ", "unknown", 10.0);
    assert_eq!(blank.known_scientific_name(), None);
    assert_eq!(blank.known_common_name(), None);
  }

  #[test]
  fn names_include_scientific_and_aliases() {
    let record = CareRecord::new("Pothos")
      .with_scientific_name("Epipremnum aureum")
      .with_common_names(["Devil's Ivy", " "]);
    let names: Vec<&str> = record.names().collect();
    assert_eq!(names, vec!["Pothos", "Epipremnum aureum", "Devil's Ivy"]);
  }
}
