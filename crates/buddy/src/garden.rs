use chrono::{DateTime, Utc};
use dirs::home_dir;
use herbarium::IdentificationResult;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::chat::ChatMessage;

/// Overrides every other garden location; used by tests.
pub const GARDEN_ROOT_ENV: &str = "PLANT_BUDDY_GARDEN_ROOT";

const EXTENSION: &str = ".plant.yaml";

#[derive(Error, Debug)]
pub enum GardenError {
  #[error("Nickname needed")]
  EmptyNickname,

  #[error("Nickname '{nickname}' cannot contain path separators")]
  InvalidNickname { nickname: String },

  #[error("A plant named '{nickname}' already exists")]
  AlreadyExists { nickname: String },

  #[error("No saved plant named '{nickname}'")]
  NotFound { nickname: String },

  #[error("Could not find home directory")]
  NoHome,

  #[error("Garden storage error: {0}")]
  Io(#[from] std::io::Error),

  #[error("Saved plant file is corrupt: {0}")]
  Format(#[from] serde_yaml::Error),
}

/// A plant the user chose to keep, with what was known about it at the time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedPlant {
  pub nickname: String,
  /// Canonical name of the matched care record, if any
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub plant_name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub identification: Option<IdentificationResult>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub chat_log: Vec<ChatMessage>,
  pub saved_at: DateTime<Utc>,
}

impl SavedPlant {
  pub fn new(nickname: impl Into<String>) -> Self {
    Self {
      nickname: nickname.into(),
      plant_name: None,
      identification: None,
      chat_log: Vec::new(),
      saved_at: Utc::now(),
    }
  }
}

/// Directory of saved plants, one YAML file per nickname.
#[derive(Debug, Clone)]
pub struct Garden {
  root: PathBuf,
}

impl Garden {
  pub fn at(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  /// The garden named by the environment, then `configured`, then
  /// `~/.plant-buddy/garden`.
  pub fn locate(configured: Option<&Path>) -> Result<Self, GardenError> {
    Ok(Self::at(garden_root(configured)?))
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  fn file_path(&self, nickname: &str) -> Result<PathBuf, GardenError> {
    let nickname = validate_nickname(nickname)?;
    Ok(self.root.join(format!("{nickname}{EXTENSION}")))
  }

  /// Store a new plant. Existing nicknames are never overwritten.
  pub fn save(&self, plant: &SavedPlant) -> Result<PathBuf, GardenError> {
    let path = self.file_path(&plant.nickname)?;
    if path.exists() {
      return Err(GardenError::AlreadyExists { nickname: plant.nickname.trim().to_string() });
    }

    fs::create_dir_all(&self.root)?;
    fs::write(&path, serde_yaml::to_string(plant)?)?;
    tracing::debug!(path = %path.display(), "saved plant");
    Ok(path)
  }

  /// Overwrite a plant saved earlier, e.g. with a longer chat log.
  pub fn update(&self, plant: &SavedPlant) -> Result<PathBuf, GardenError> {
    let path = self.file_path(&plant.nickname)?;
    if !path.exists() {
      return Err(GardenError::NotFound { nickname: plant.nickname.trim().to_string() });
    }

    fs::write(&path, serde_yaml::to_string(plant)?)?;
    tracing::debug!(path = %path.display(), messages = plant.chat_log.len(), "updated plant");
    Ok(path)
  }

  pub fn load(&self, nickname: &str) -> Result<SavedPlant, GardenError> {
    let path = self.file_path(nickname)?;
    if !path.exists() {
      return Err(GardenError::NotFound { nickname: nickname.trim().to_string() });
    }
    let content = fs::read_to_string(&path)?;
    Ok(serde_yaml::from_str(&content)?)
  }

  /// Saved nicknames, sorted.
  pub fn list(&self) -> Result<Vec<String>, GardenError> {
    if !self.root.exists() {
      return Ok(vec![]);
    }

    let mut nicknames = Vec::new();
    for entry in fs::read_dir(&self.root)? {
      let entry = entry?;
      if !entry.file_type()?.is_file() {
        continue;
      }
      if let Some(name) = entry.file_name().to_str() {
        if let Some(nickname) = name.strip_suffix(EXTENSION) {
          nicknames.push(nickname.to_string());
        }
      }
    }

    nicknames.sort();
    Ok(nicknames)
  }

  pub fn remove(&self, nickname: &str) -> Result<(), GardenError> {
    let path = self.file_path(nickname)?;
    if !path.exists() {
      return Err(GardenError::NotFound { nickname: nickname.trim().to_string() });
    }
    fs::remove_file(&path)?;
    Ok(())
  }
}

/// Resolve the garden directory.
pub fn garden_root(configured: Option<&Path>) -> Result<PathBuf, GardenError> {
  // Allow tests or callers to override the root directory via env var
  if let Ok(custom_root) = std::env::var(GARDEN_ROOT_ENV) {
    if !custom_root.is_empty() {
      return Ok(PathBuf::from(custom_root));
    }
  }
  if let Some(root) = configured {
    return Ok(root.to_path_buf());
  }

  let home = home_dir().ok_or(GardenError::NoHome)?;
  Ok(home.join(".plant-buddy").join("garden"))
}

fn validate_nickname(nickname: &str) -> Result<&str, GardenError> {
  let nickname = nickname.trim();
  if nickname.is_empty() {
    return Err(GardenError::EmptyNickname);
  }
  if nickname.contains(['/', '\\']) || nickname.starts_with('.') {
    return Err(GardenError::InvalidNickname { nickname: nickname.to_string() });
  }
  Ok(nickname)
}
