//! Persona chat through the Gemini `generateContent` API.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

use crate::config::ChatConfig;

#[derive(Error, Debug)]
pub enum ChatError {
  #[error("No API key found; set {env_var}")]
  MissingApiKey { env_var: String },

  #[error("Chat request timed out")]
  Timeout,

  #[error("Error calling the chat API: {message}")]
  Request { message: String },

  #[error("Unexpected chat response format: {message}")]
  UnexpectedResponse { message: String },
}

impl From<reqwest::Error> for ChatError {
  fn from(e: reqwest::Error) -> Self {
    if e.is_timeout() {
      ChatError::Timeout
    } else if e.is_decode() {
      ChatError::UnexpectedResponse { message: e.to_string() }
    } else {
      ChatError::Request { message: e.to_string() }
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  User,
  Assistant,
}

/// One line of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
  pub role: Role,
  pub content: String,
  pub time: DateTime<Local>,
}

impl ChatMessage {
  pub fn user(content: impl Into<String>) -> Self {
    Self { role: Role::User, content: content.into(), time: Local::now() }
  }

  pub fn assistant(content: impl Into<String>) -> Self {
    Self { role: Role::Assistant, content: content.into(), time: Local::now() }
  }
}

/// A chat model that answers as a persona.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatBackend: Send + Sync {
  /// Reply to the last message of `history` in the voice set by `system_context`.
  async fn send_chat(
    &self,
    system_context: &str,
    greeting: &str,
    history: &[ChatMessage],
  ) -> Result<String, ChatError>;
}

pub struct GeminiClient {
  client: Client,
  endpoint: String,
  api_key: String,
  temperature: f32,
  max_output_tokens: u32,
}

impl GeminiClient {
  pub fn new(config: &ChatConfig, api_key: impl Into<String>) -> Result<Self, ChatError> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .map_err(|e| ChatError::Request { message: e.to_string() })?;

    Ok(Self {
      client,
      endpoint: format!(
        "{}/models/{}:generateContent",
        config.url.trim_end_matches('/'),
        config.model
      ),
      api_key: api_key.into(),
      temperature: config.temperature,
      max_output_tokens: config.max_output_tokens,
    })
  }

  /// Build a client with the API key from the configured environment variable.
  pub fn from_env(config: &ChatConfig) -> Result<Self, ChatError> {
    let api_key = crate::api_key(&config.api_key_env)
      .ok_or_else(|| ChatError::MissingApiKey { env_var: config.api_key_env.clone() })?;
    Self::new(config, api_key)
  }
}

#[async_trait]
impl ChatBackend for GeminiClient {
  async fn send_chat(
    &self,
    system_context: &str,
    greeting: &str,
    history: &[ChatMessage],
  ) -> Result<String, ChatError> {
    let payload = json!({
      "contents": build_contents(system_context, greeting, history),
      "generationConfig": {
        "temperature": self.temperature,
        "topP": 0.9,
        "maxOutputTokens": self.max_output_tokens,
      }
    });

    let response = self
      .client
      .post(&self.endpoint)
      .query(&[("key", self.api_key.as_str())])
      .json(&payload)
      .send()
      .await?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      tracing::warn!(%status, body = %body, "chat request failed");
      return Err(ChatError::Request { message: format!("HTTP {status}") });
    }

    let body: Value = response.json().await?;
    extract_reply(&body)
  }
}

/// Conversation as Gemini `contents`: the persona instructions as a user turn,
/// the greeting as a model turn, then the history.
pub fn build_contents(system_context: &str, greeting: &str, history: &[ChatMessage]) -> Value {
  let mut contents = vec![turn("user", system_context), turn("model", greeting)];
  for message in history {
    let role = match message.role {
      Role::User => "user",
      Role::Assistant => "model",
    };
    contents.push(turn(role, &message.content));
  }
  Value::Array(contents)
}

fn turn(role: &str, text: &str) -> Value {
  json!({"role": role, "parts": [{"text": text}]})
}

/// Text of the first candidate's first part.
pub fn extract_reply(body: &Value) -> Result<String, ChatError> {
  body
    .get("candidates")
    .and_then(|c| c.get(0))
    .and_then(|c| c.get("content"))
    .and_then(|c| c.get("parts"))
    .and_then(|p| p.get(0))
    .and_then(|p| p.get("text"))
    .and_then(Value::as_str)
    .map(str::to_string)
    .ok_or_else(|| {
      tracing::warn!(response = %body, "unexpected chat response structure");
      ChatError::UnexpectedResponse { message: "no candidate text".to_string() }
    })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn contents_start_with_persona_and_greeting() {
    let history = vec![ChatMessage::user("Do you like sun?"), ChatMessage::assistant("A little.")];
    let contents = build_contents("Be a fern.", "Hello, I am a fern.", &history);

    assert_eq!(
      contents,
      json!([
        {"role": "user", "parts": [{"text": "Be a fern."}]},
        {"role": "model", "parts": [{"text": "Hello, I am a fern."}]},
        {"role": "user", "parts": [{"text": "Do you like sun?"}]},
        {"role": "model", "parts": [{"text": "A little."}]}
      ])
    );
  }

  #[test]
  fn reply_is_first_candidate_text() {
    let body = json!({
      "candidates": [{"content": {"parts": [{"text": "I love bright, indirect light!"}]}}]
    });
    assert_eq!(extract_reply(&body).unwrap(), "I love bright, indirect light!");
  }

  #[test]
  fn missing_text_is_unexpected() {
    let body = json!({"candidates": [{"content": {"parts": []}}]});
    assert!(matches!(extract_reply(&body), Err(ChatError::UnexpectedResponse { .. })));
    assert!(extract_reply(&json!({})).is_err());
  }

  #[test]
  fn endpoint_includes_model() {
    let config = ChatConfig {
      url: "http://localhost:9999/v1beta/".to_string(),
      ..ChatConfig::default()
    };
    let client = GeminiClient::new(&config, "key").unwrap();
    assert_eq!(
      client.endpoint,
      "http://localhost:9999/v1beta/models/gemini-1.5-flash:generateContent"
    );
  }
}
