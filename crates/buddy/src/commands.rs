use anyhow::{anyhow, Context, Result};
use colored::*;
use herbarium::{
  build_profile, resolve_detailed, CareRecord, Catalog, IdentificationResult, MatchStage, Query,
};
use std::fs;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::chat::{ChatBackend, GeminiClient};
use crate::config::Config;
use crate::display;
use crate::garden::{Garden, SavedPlant};
use crate::identify::{Identifier, PlantNetClient};
use crate::session::ChatSession;

/// What a lookup produced: a record, or the closest alternatives.
#[derive(Debug)]
pub enum Lookup<'a> {
  Found { record: &'a CareRecord, stage: MatchStage, score: u8 },
  Suggestions(Vec<&'a CareRecord>),
}

impl<'a> Lookup<'a> {
  pub fn record(&self) -> Option<&'a CareRecord> {
    match self {
      Lookup::Found { record, .. } => Some(*record),
      Lookup::Suggestions(_) => None,
    }
  }
}

/// Resolve `query`, falling back to suggestions when nothing is confident.
pub fn lookup<'a>(catalog: &'a Catalog, query: &Query, config: &Config) -> Lookup<'a> {
  match resolve_detailed(query, catalog.records(), config.resolve_threshold) {
    Some(resolution) => Lookup::Found {
      record: resolution.record,
      stage: resolution.stage,
      score: resolution.score,
    },
    None => Lookup::Suggestions(catalog.suggest(
      query,
      config.suggest_limit,
      config.suggest_threshold,
    )),
  }
}

pub fn load_catalog(config: &Config) -> Result<Catalog> {
  let catalog = Catalog::load(&config.care_file)
    .with_context(|| format!("Failed to load plant care data from {}", config.care_file.display()))?;
  if catalog.skipped() > 0 {
    tracing::warn!(skipped = catalog.skipped(), "some care records were malformed and skipped");
  }
  Ok(catalog)
}

/// Print the care guide for `name`, or suggestions when it is unknown
pub fn show_care(config: &Config, name: &str) -> Result<()> {
  let catalog = load_catalog(config)?;
  print_lookup(&lookup(&catalog, &Query::from_name(name), config), name);
  Ok(())
}

fn print_lookup(result: &Lookup, asked: &str) {
  match result {
    Lookup::Found { record, stage, score } => {
      tracing::debug!(%stage, score, "matched '{asked}' to '{}'", record.name);
      if *stage == MatchStage::Fuzzy {
        println!("{} {} ({}% similar)\n", "Closest match:".dimmed(), record.name.bold(), score);
      }
      print!("{}", display::render_care_guide(record));
    }
    Lookup::Suggestions(suggestions) => {
      println!("No care instructions found for: {}", asked.yellow());
      print!("{}", display::render_suggestions(suggestions));
    }
  }
}

/// Print near matches for `name`
pub fn show_suggestions(config: &Config, name: &str, limit: usize, threshold: u8) -> Result<()> {
  let catalog = load_catalog(config)?;
  let suggestions = catalog.suggest(&Query::from_name(name), limit, threshold);
  print!("{}", display::render_suggestions(&suggestions));
  Ok(())
}

/// Print the personality profile of the plant matching `name`
pub fn show_profile(config: &Config, name: &str) -> Result<()> {
  let catalog = load_catalog(config)?;
  let record = require_record(&catalog, name, config)?;
  print!("{}", display::render_profile(record, &build_profile(record)));
  Ok(())
}

fn require_record<'a>(catalog: &'a Catalog, name: &str, config: &Config) -> Result<&'a CareRecord> {
  match lookup(catalog, &Query::from_name(name), config) {
    Lookup::Found { record, .. } => Ok(record),
    Lookup::Suggestions(suggestions) => {
      eprint!("{}", display::render_suggestions(&suggestions));
      Err(anyhow!("No care record found for '{}'", name))
    }
  }
}

/// Identify the plant in `image`, then show its care guide
pub async fn identify_image(config: &Config, image: &Path, save_as: Option<&str>) -> Result<()> {
  let catalog = load_catalog(config)?;
  let identifier = PlantNetClient::from_env(&config.identify)?;
  let bytes =
    fs::read(image).with_context(|| format!("Failed to read image {}", image.display()))?;

  let (identification, found) = identify_and_lookup(&identifier, bytes, &catalog, config).await?;

  print!("{}", display::render_identification(&identification));
  println!();
  print_lookup(&found, &identification.scientific_name);

  if let Some(nickname) = save_as {
    let garden = Garden::locate(config.garden_root.as_deref())?;
    let mut plant = SavedPlant::new(nickname.trim());
    plant.plant_name = found.record().map(|r| r.name.clone());
    plant.identification = Some(identification);
    garden.save(&plant)?;
    println!("\n{} Saved '{}'", "✓".green(), plant.nickname.cyan());
  }

  Ok(())
}

/// One identification followed by a lookup of the result.
pub async fn identify_and_lookup<'a>(
  identifier: &dyn Identifier,
  image: Vec<u8>,
  catalog: &'a Catalog,
  config: &Config,
) -> Result<(IdentificationResult, Lookup<'a>)> {
  let identification = identifier.identify(image).await.context("Identification failed")?;
  let found = lookup(catalog, &Query::from(&identification), config);
  Ok((identification, found))
}

/// Chat with the plant matching `name`: one message, or a stdin loop. With
/// `save_as`, the conversation is kept in the garden under that nickname.
pub async fn chat(
  config: &Config,
  name: &str,
  message: Option<&str>,
  save_as: Option<&str>,
) -> Result<()> {
  let catalog = load_catalog(config)?;
  let record = require_record(&catalog, name, config)?;
  let backend = GeminiClient::from_env(&config.chat)?;
  let mut session = ChatSession::new(record.clone());

  converse(&mut session, &backend, message).await?;

  if let Some(nickname) = save_as {
    let garden = Garden::locate(config.garden_root.as_deref())?;
    let mut plant = SavedPlant::new(nickname.trim());
    plant.plant_name = Some(record.name.clone());
    plant.chat_log = session.history().to_vec();
    garden.save(&plant)?;
    println!("{} Saved '{}'", "✓".green(), plant.nickname.cyan());
  }

  Ok(())
}

/// Pick up the conversation stored with a saved plant and write it back.
pub async fn chat_with_saved(config: &Config, nickname: &str, message: Option<&str>) -> Result<()> {
  let catalog = load_catalog(config)?;
  let garden = Garden::locate(config.garden_root.as_deref())?;
  let backend = GeminiClient::from_env(&config.chat)?;

  let mut plant = garden.load(nickname)?;
  let mut session = resume_session(&catalog, &plant, config)?;
  for earlier in session.history() {
    println!("{}", display::render_message(earlier, &session.record().name));
  }

  converse(&mut session, &backend, message).await?;
  store_history(&garden, &mut plant, &session)?;
  Ok(())
}

/// A session for `plant` carrying its saved chat log.
pub fn resume_session(catalog: &Catalog, plant: &SavedPlant, config: &Config) -> Result<ChatSession> {
  let plant_name = plant
    .plant_name
    .as_deref()
    .ok_or_else(|| anyhow!("'{}' is not linked to a care record", plant.nickname))?;
  let record = match linked_record(catalog, plant_name) {
    Some(record) => record,
    None => require_record(catalog, plant_name, config)?,
  };
  Ok(ChatSession::with_history(record.clone(), plant.chat_log.clone()))
}

fn store_history(garden: &Garden, plant: &mut SavedPlant, session: &ChatSession) -> Result<()> {
  plant.chat_log = session.history().to_vec();
  garden
    .update(plant)
    .with_context(|| format!("Failed to store the conversation with '{}'", plant.nickname))?;
  Ok(())
}

async fn converse(
  session: &mut ChatSession,
  backend: &dyn ChatBackend,
  message: Option<&str>,
) -> Result<()> {
  match message {
    Some(text) => {
      let reply = session.ask(backend, text).await;
      println!("{reply}");
      Ok(())
    }
    None => interactive_chat(session, backend).await,
  }
}

async fn interactive_chat(session: &mut ChatSession, backend: &dyn ChatBackend) -> Result<()> {
  let plant_name = session.record().name.clone();
  println!("{} {} (type 'exit' to leave)", "Chatting with".green(), plant_name.bold());

  let mut lines = BufReader::new(tokio::io::stdin()).lines();
  while let Some(line) = lines.next_line().await? {
    let text = line.trim();
    if text.is_empty() {
      continue;
    }
    if matches!(text, "exit" | "quit") {
      break;
    }

    session.ask(backend, text).await;
    if let Some(reply) = session.history().last() {
      println!("{}", display::render_message(reply, &plant_name));
    }
  }

  Ok(())
}

pub fn list_garden(config: &Config) -> Result<()> {
  let garden = Garden::locate(config.garden_root.as_deref())?;
  let nicknames = garden.list()?;

  if nicknames.is_empty() {
    println!("You haven't saved any plants yet.");
    return Ok(());
  }

  for nickname in nicknames {
    match garden.load(&nickname) {
      Ok(plant) => {
        let plant_name = plant.plant_name.as_deref().unwrap_or("unmatched");
        println!("{} {}", nickname.cyan(), format!("({plant_name})").dimmed());
      }
      Err(e) => {
        tracing::warn!("could not read saved plant '{nickname}': {e}");
        println!("{} {}", nickname.cyan(), "(unreadable)".red());
      }
    }
  }

  Ok(())
}

/// Print a saved plant and, when it is linked to one, its care guide
pub fn show_saved(config: &Config, nickname: &str) -> Result<()> {
  let garden = Garden::locate(config.garden_root.as_deref())?;
  let plant = garden.load(nickname)?;
  print!("{}", display::render_saved_plant(&plant));

  if let Some(plant_name) = &plant.plant_name {
    match load_catalog(config) {
      Ok(catalog) => match linked_record(&catalog, plant_name) {
        Some(record) => print!("\n{}", display::render_care_guide(record)),
        None => println!("\nNo care record named '{}' any more.", plant_name.yellow()),
      },
      Err(e) => tracing::warn!("care guide unavailable: {e:#}"),
    }
  }

  Ok(())
}

/// The record a saved plant was linked to, by its canonical name.
pub fn linked_record<'a>(catalog: &'a Catalog, plant_name: &str) -> Option<&'a CareRecord> {
  let wanted = plant_name.trim();
  catalog.records().iter().find(|record| record.name.eq_ignore_ascii_case(wanted))
}

/// Save `plant` under `nickname`, linked to its care record when one matches
pub fn save_to_garden(config: &Config, nickname: &str, plant: &str) -> Result<()> {
  let catalog = load_catalog(config)?;
  let garden = Garden::locate(config.garden_root.as_deref())?;

  let mut saved = SavedPlant::new(nickname.trim());
  saved.plant_name = lookup(&catalog, &Query::from_name(plant), config).record().map(|r| r.name.clone());
  if saved.plant_name.is_none() {
    println!("{} no care record matched '{}'; saving the nickname only", "!".yellow(), plant);
  }

  garden.save(&saved)?;
  println!("{} Saved '{}'", "✓".green(), saved.nickname.cyan());
  Ok(())
}

pub fn remove_from_garden(config: &Config, nickname: &str) -> Result<()> {
  let garden = Garden::locate(config.garden_root.as_deref())?;
  garden.remove(nickname)?;
  println!("{} Removed '{}'", "✓".green(), nickname.trim().cyan());
  Ok(())
}
