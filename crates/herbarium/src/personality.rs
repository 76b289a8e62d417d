//! Persona derived from a care record, used to seed chat tone.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::{text_list, CareRecord};

pub const DEFAULT_TRAIT: &str = "observant";
const DEFAULT_PROMPT: &str = "Respond in character.";
const FALLBACK_PROMPT: &str = "Respond simply.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalityProfile {
  pub title: String,
  /// Never empty.
  pub traits: Vec<String>,
  pub prompt: String,
}

impl PersonalityProfile {
  pub fn traits_line(&self) -> String {
    self.traits.join(", ")
  }
}

/// Display-ready profile for `record`. Always succeeds.
pub fn build_profile(record: &CareRecord) -> PersonalityProfile {
  let Some(block) = &record.personality else {
    return PersonalityProfile {
      title: format!("The {}", record.name),
      traits: vec![DEFAULT_TRAIT.to_string()],
      prompt: FALLBACK_PROMPT.to_string(),
    };
  };

  let title = non_blank(block.title.as_deref()).unwrap_or_else(|| record.name.clone());
  let prompt = non_blank(block.prompt.as_deref()).unwrap_or_else(|| DEFAULT_PROMPT.to_string());

  let mut traits = block.traits.clone().map(coerce_traits).unwrap_or_default();
  if traits.is_empty() {
    tracing::debug!(record = %record.name, "personality traits missing or malformed");
    traits.push(DEFAULT_TRAIT.to_string());
  }

  PersonalityProfile { title, traits, prompt }
}

/// System context for the chat model: who to be and what the plant needs.
pub fn persona_prompt(record: &CareRecord, profile: &PersonalityProfile) -> String {
  let mut prompt = format!(
    "IMMEDIATELY AND CONSISTENTLY act as the plant '{name}'. Do not reveal that you are an AI \
     or a language model. Your personality is '{title}' with traits: {traits}. Core \
     instruction: {instruction} Respond concisely (1-3 sentences max) in the first person, \
     embodying this persona. Reference your care needs naturally if relevant.",
    name = record.name,
    title = profile.title,
    traits = profile.traits_line(),
    instruction = profile.prompt,
  );

  let facts = record.care.entries();
  if !facts.is_empty() {
    prompt.push_str("\n\nCARE FACTS:");
    for (label, value) in facts {
      prompt.push_str(&format!("\n- {label}: {value}"));
    }
  }

  prompt
}

/// The model's first turn, acknowledging the persona.
pub fn greeting(record: &CareRecord) -> String {
  format!("Okay, I understand. I am {}. Ask me anything.", record.name)
}

fn coerce_traits(value: Value) -> Vec<String> {
  match value {
    Value::String(s) => s
      .split(',')
      .map(str::trim)
      .filter(|t| !t.is_empty())
      .map(str::to_string)
      .collect(),
    Value::Array(_) => text_list(value),
    _ => Vec::new(),
  }
}

fn non_blank(value: Option<&str>) -> Option<String> {
  value.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}
