//! Display formatting utilities for CLI output

use colored::*;
use herbarium::{CareRecord, IdentificationResult, PersonalityProfile};

use crate::chat::{ChatMessage, Role};
use crate::garden::SavedPlant;

const WIDTH: usize = 80;

/// Wrap text to `width` characters, breaking only between words.
///
/// Width counts characters, not bytes, so accented names wrap like plain ones.
/// A word longer than `width` gets a line of its own.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
  let mut lines = Vec::new();

  for paragraph in text.lines() {
    let mut line = String::new();
    let mut line_width = 0;

    for word in paragraph.split_whitespace() {
      let word_width = word.chars().count();
      if line_width > 0 && line_width + 1 + word_width > width {
        lines.push(std::mem::take(&mut line));
        line_width = 0;
      }
      if line_width > 0 {
        line.push(' ');
        line_width += 1;
      }
      line.push_str(word);
      line_width += word_width;
    }

    lines.push(line);
  }

  lines
}

/// Confidence colored green above 75, yellow above 50, red otherwise.
pub fn confidence_label(confidence: f64) -> ColoredString {
  let text = format!("{confidence:.1}%");
  if confidence > 75.0 {
    text.green().bold()
  } else if confidence > 50.0 {
    text.yellow().bold()
  } else {
    text.red().bold()
  }
}

pub fn render_identification(result: &IdentificationResult) -> String {
  format!(
    "{}\n  Scientific name: {}\n  Common name:     {}\n  Confidence:      {}\n",
    "Identification".blue().bold(),
    result.scientific_name.italic(),
    result.common_name,
    confidence_label(result.confidence),
  )
}

/// Care guide for a record. Unspecified fields show as "N/A".
pub fn render_care_guide(record: &CareRecord) -> String {
  let mut out = format!("=== {} Care Guide ===\n", record.name.green().bold());

  if let Some(scientific) = &record.scientific_name {
    out.push_str(&format!("{}\n", scientific.italic()));
  }
  if !record.common_names.is_empty() {
    out.push_str(&format!("Also known as: {}\n", record.common_names.join(", ")));
  }
  out.push('\n');

  let care = &record.care;
  for (label, value) in care.labelled() {
    out.push_str(&format!("{:<12} {}\n", format!("{label}:").bold(), value.unwrap_or("N/A")));
  }

  if let Some(notes) = &care.notes {
    out.push_str(&format!("\n{}\n", "Pro Tips".yellow().bold()));
    for line in wrap_text(notes, WIDTH) {
      out.push_str(&line);
      out.push('\n');
    }
  }

  out
}

pub fn render_suggestions(suggestions: &[&CareRecord]) -> String {
  if suggestions.is_empty() {
    return format!("{}\n", "Couldn't find similar plants.".yellow());
  }

  let mut out = format!("{}\n", "Perhaps one of these is a closer match?".cyan());
  for record in suggestions {
    match &record.scientific_name {
      Some(scientific) => out.push_str(&format!("  - {} ({})\n", record.name.bold(), scientific)),
      None => out.push_str(&format!("  - {}\n", record.name.bold())),
    }
  }
  out
}

pub fn render_profile(record: &CareRecord, profile: &PersonalityProfile) -> String {
  let mut out = format!("=== {} ===\n", profile.title.magenta().bold());
  out.push_str(&format!("Plant:  {}\n", record.name));
  out.push_str(&format!("Traits: {}\n", profile.traits_line()));
  for line in wrap_text(&format!("Voice:  {}", profile.prompt), WIDTH) {
    out.push_str(&line);
    out.push('\n');
  }
  out
}

pub fn render_message(message: &ChatMessage, plant_name: &str) -> String {
  let time = message.time.format("%H:%M");
  match message.role {
    Role::User => format!("{} {} {}", format!("You • {time}").dimmed(), ">".blue(), message.content),
    Role::Assistant => {
      format!("{} {} {}", format!("{plant_name} • {time}").dimmed(), "🌿".green(), message.content)
    }
  }
}

pub fn render_saved_plant(plant: &SavedPlant) -> String {
  let mut out = format!("=== {} ===\n", plant.nickname.cyan().bold());
  out.push_str(&format!("Saved: {}\n", plant.saved_at.format("%Y-%m-%d %H:%M UTC")));
  match &plant.plant_name {
    Some(name) => out.push_str(&format!("Plant: {name}\n")),
    None => out.push_str("Plant: no care record matched\n"),
  }
  if let Some(id) = &plant.identification {
    out.push('\n');
    out.push_str(&render_identification(id));
  }
  if !plant.chat_log.is_empty() {
    out.push_str(&format!("\nChat log ({} messages)\n", plant.chat_log.len()));
    let speaker = plant.plant_name.as_deref().unwrap_or(&plant.nickname);
    for message in &plant.chat_log {
      out.push_str(&render_message(message, speaker));
      out.push('\n');
    }
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use herbarium::CareFields;

  #[test]
  fn wrap_respects_width() {
    let lines = wrap_text("one two three four five", 9);
    assert_eq!(lines, vec!["one two", "three", "four five"]);
  }

  #[test]
  fn wrap_keeps_blank_paragraphs() {
    assert_eq!(wrap_text("a\n\nb", 80), vec!["a", "", "b"]);
  }

  #[test]
  fn wrap_counts_characters_not_bytes() {
    // 7 characters, 9 bytes each
    let lines = wrap_text("Sénécio Sénécio", 15);
    assert_eq!(lines, vec!["Sénécio Sénécio"]);
    assert_eq!(wrap_text("Sénécio Sénécio", 14), vec!["Sénécio", "Sénécio"]);
  }

  #[test]
  fn overlong_word_stays_whole() {
    assert_eq!(wrap_text("Spathiphyllum is", 5), vec!["Spathiphyllum", "is"]);
  }

  #[test]
  fn care_guide_marks_unspecified_fields() {
    colored::control::set_override(false);
    let record = CareRecord::new("Pothos").with_care(CareFields {
      watering: Some("Weekly".to_string()),
      notes: Some("Trim leggy vines.".to_string()),
      ..CareFields::default()
    });

    let guide = render_care_guide(&record);
    assert!(guide.contains("Pothos Care Guide"));
    assert!(guide.contains("Water:       Weekly"));
    assert!(guide.contains("Light:       N/A"));
    assert!(guide.contains("Trim leggy vines."));
  }

  #[test]
  fn empty_suggestions_say_so() {
    colored::control::set_override(false);
    assert!(render_suggestions(&[]).contains("Couldn't find similar plants."));
  }
}
