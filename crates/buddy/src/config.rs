//! Configuration for Plant Buddy
//!
//! Every field has a default, so a missing or partial config file is fine.
//! API keys never live in the file; it only names the environment variables
//! that hold them.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use herbarium::resolver::{
  DEFAULT_RESOLVE_THRESHOLD, DEFAULT_SUGGEST_LIMIT, DEFAULT_SUGGEST_THRESHOLD,
};

/// Overrides the care file named in the config.
pub const CARE_FILE_ENV: &str = "PLANT_BUDDY_CARE_FILE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
  /// JSON array of care records
  #[serde(default = "default_care_file")]
  pub care_file: PathBuf,
  /// Minimum fuzzy score for an authoritative match
  #[serde(default = "default_resolve_threshold")]
  pub resolve_threshold: u8,
  /// Minimum fuzzy score for a suggestion
  #[serde(default = "default_suggest_threshold")]
  pub suggest_threshold: u8,
  /// Maximum number of suggestions shown
  #[serde(default = "default_suggest_limit")]
  pub suggest_limit: usize,
  #[serde(default)]
  pub identify: IdentifyConfig,
  #[serde(default)]
  pub chat: ChatConfig,
  /// Where saved plants live; see `garden::garden_root`
  #[serde(default)]
  pub garden_root: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentifyConfig {
  #[serde(default = "default_identify_url")]
  pub url: String,
  #[serde(default = "default_identify_timeout")]
  pub timeout_secs: u64,
  #[serde(default = "default_identify_key_env")]
  pub api_key_env: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatConfig {
  /// Base URL; the model path is appended
  #[serde(default = "default_chat_url")]
  pub url: String,
  #[serde(default = "default_chat_model")]
  pub model: String,
  #[serde(default = "default_chat_timeout")]
  pub timeout_secs: u64,
  #[serde(default = "default_chat_key_env")]
  pub api_key_env: String,
  #[serde(default = "default_temperature")]
  pub temperature: f32,
  #[serde(default = "default_max_output_tokens")]
  pub max_output_tokens: u32,
}

fn default_care_file() -> PathBuf {
  PathBuf::from("plant_care.json")
}
fn default_resolve_threshold() -> u8 {
  DEFAULT_RESOLVE_THRESHOLD
}
fn default_suggest_threshold() -> u8 {
  DEFAULT_SUGGEST_THRESHOLD
}
fn default_suggest_limit() -> usize {
  DEFAULT_SUGGEST_LIMIT
}
fn default_identify_url() -> String {
  "https://my-api.plantnet.org/v2/identify/all".to_string()
}
fn default_identify_timeout() -> u64 {
  20
}
fn default_identify_key_env() -> String {
  "PLANTNET_API_KEY".to_string()
}
fn default_chat_url() -> String {
  "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_chat_model() -> String {
  "gemini-1.5-flash".to_string()
}
fn default_chat_timeout() -> u64 {
  30
}
fn default_chat_key_env() -> String {
  "GEMINI_API_KEY".to_string()
}
fn default_temperature() -> f32 {
  0.7
}
fn default_max_output_tokens() -> u32 {
  200
}

impl Default for IdentifyConfig {
  fn default() -> Self {
    Self {
      url: default_identify_url(),
      timeout_secs: default_identify_timeout(),
      api_key_env: default_identify_key_env(),
    }
  }
}

impl Default for ChatConfig {
  fn default() -> Self {
    Self {
      url: default_chat_url(),
      model: default_chat_model(),
      timeout_secs: default_chat_timeout(),
      api_key_env: default_chat_key_env(),
      temperature: default_temperature(),
      max_output_tokens: default_max_output_tokens(),
    }
  }
}

impl Default for Config {
  fn default() -> Self {
    Self {
      care_file: default_care_file(),
      resolve_threshold: default_resolve_threshold(),
      suggest_threshold: default_suggest_threshold(),
      suggest_limit: default_suggest_limit(),
      identify: IdentifyConfig::default(),
      chat: ChatConfig::default(),
      garden_root: None,
    }
  }
}

impl Config {
  /// Load configuration from a file
  pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
      .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: Config = serde_json::from_str(&content)
      .with_context(|| format!("Invalid config file {}", path.display()))?;
    config.validate()?;
    Ok(config)
  }

  /// Load configuration from the current directory, the home directory, or defaults
  pub fn load() -> Result<Self> {
    for path in config_paths() {
      if path.exists() {
        tracing::debug!(path = %path.display(), "using config file");
        return Self::load_from_file(&path);
      }
    }
    Ok(Self::default())
  }

  /// Apply environment and command-line overrides. Later wins.
  pub fn with_overrides(mut self, care_file: Option<PathBuf>) -> Self {
    if let Some(from_env) = std::env::var_os(CARE_FILE_ENV).filter(|v| !v.is_empty()) {
      self.care_file = PathBuf::from(from_env);
    }
    if let Some(care_file) = care_file {
      self.care_file = care_file;
    }
    self
  }

  pub fn validate(&self) -> Result<()> {
    for (name, value) in
      [("resolve_threshold", self.resolve_threshold), ("suggest_threshold", self.suggest_threshold)]
    {
      if value > 100 {
        return Err(anyhow!("{name} must be between 0 and 100, got {value}"));
      }
    }
    if self.identify.timeout_secs == 0 || self.chat.timeout_secs == 0 {
      return Err(anyhow!("Request timeouts must be at least one second"));
    }
    Ok(())
  }
}

fn config_paths() -> Vec<PathBuf> {
  let mut paths = vec![PathBuf::from(".plant-buddy.json"), PathBuf::from("plant-buddy.json")];
  if let Some(home) = dirs::home_dir() {
    paths.push(home.join(".plant-buddy").join("config.json"));
  }
  paths
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;
  use std::fs;
  use tempfile::TempDir;

  #[test]
  fn partial_file_keeps_defaults() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.json");
    fs::write(&path, r#"{"resolve_threshold": 80, "chat": {"model": "gemini-pro"}}"#).unwrap();

    let config = Config::load_from_file(&path).unwrap();
    assert_eq!(config.resolve_threshold, 80);
    assert_eq!(config.suggest_threshold, 60);
    assert_eq!(config.suggest_limit, 3);
    assert_eq!(config.chat.model, "gemini-pro");
    assert_eq!(config.chat.timeout_secs, 30);
    assert_eq!(config.identify, IdentifyConfig::default());
  }

  #[test]
  fn out_of_range_threshold_is_rejected() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.json");
    fs::write(&path, r#"{"suggest_threshold": 140}"#).unwrap();

    let err = Config::load_from_file(&path).unwrap_err();
    assert!(format!("{err:#}").contains("suggest_threshold"));
  }

  #[test]
  fn invalid_json_names_the_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("broken.json");
    fs::write(&path, "{").unwrap();

    let err = Config::load_from_file(&path).unwrap_err();
    assert!(err.to_string().contains("broken.json"));
  }

  #[test]
  #[serial]
  fn command_line_care_file_beats_environment() {
    std::env::set_var(CARE_FILE_ENV, "from-env.json");
    let config = Config::default().with_overrides(None);
    assert_eq!(config.care_file, PathBuf::from("from-env.json"));

    let config = Config::default().with_overrides(Some(PathBuf::from("from-cli.json")));
    assert_eq!(config.care_file, PathBuf::from("from-cli.json"));
    std::env::remove_var(CARE_FILE_ENV);
  }
}
