//! Plant Buddy - identify a houseplant, read its care guide, chat with it
//!
//! The command-line surface over the `herbarium` care collection, with the
//! PlantNet and Gemini clients and the saved-plant garden.

pub mod chat;
pub mod commands;
pub mod config;
pub mod display;
pub mod garden;
pub mod identify;
pub mod session;

/// Value of the environment variable `env_var`, ignoring empty values.
pub fn api_key(env_var: &str) -> Option<String> {
  std::env::var(env_var).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
