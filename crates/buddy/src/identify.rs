//! Plant identification from a photo via the PlantNet API.

use async_trait::async_trait;
use herbarium::{IdentificationResult, UNKNOWN_NAME};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::config::IdentifyConfig;

#[derive(Error, Debug)]
pub enum IdentifyError {
  #[error("No API key found; set {env_var}")]
  MissingApiKey { env_var: String },

  #[error("Identification request timed out")]
  Timeout,

  #[error("Network/API error connecting to PlantNet: {message}")]
  Request { message: String },

  #[error("Invalid PlantNet response format: {message}")]
  InvalidResponse { message: String },

  #[error("No plant matches found by PlantNet")]
  NoMatch,
}

impl From<reqwest::Error> for IdentifyError {
  fn from(e: reqwest::Error) -> Self {
    if e.is_timeout() {
      IdentifyError::Timeout
    } else if e.is_decode() {
      IdentifyError::InvalidResponse { message: e.to_string() }
    } else {
      IdentifyError::Request { message: e.to_string() }
    }
  }
}

/// Anything that can name the plant in a photo.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Identifier: Send + Sync {
  async fn identify(&self, image: Vec<u8>) -> Result<IdentificationResult, IdentifyError>;
}

pub struct PlantNetClient {
  client: Client,
  url: String,
  api_key: String,
}

impl PlantNetClient {
  pub fn new(config: &IdentifyConfig, api_key: impl Into<String>) -> Result<Self, IdentifyError> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .map_err(|e| IdentifyError::Request { message: e.to_string() })?;
    Ok(Self { client, url: config.url.clone(), api_key: api_key.into() })
  }

  /// Build a client with the API key from the configured environment variable.
  pub fn from_env(config: &IdentifyConfig) -> Result<Self, IdentifyError> {
    let api_key = crate::api_key(&config.api_key_env)
      .ok_or_else(|| IdentifyError::MissingApiKey { env_var: config.api_key_env.clone() })?;
    Self::new(config, api_key)
  }
}

#[async_trait]
impl Identifier for PlantNetClient {
  async fn identify(&self, image: Vec<u8>) -> Result<IdentificationResult, IdentifyError> {
    let part = Part::bytes(image).file_name("image.jpg");
    let form = Form::new().part("images", part);

    let response = self
      .client
      .post(&self.url)
      .query(&[("api-key", self.api_key.as_str()), ("include-related-images", "false")])
      .multipart(form)
      .send()
      .await?;

    let status = response.status();
    if status.as_u16() == 404 {
      // PlantNet answers 404 when the image contains no recognisable species
      return Err(IdentifyError::NoMatch);
    }
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      tracing::warn!(%status, body = %body, "PlantNet request failed");
      return Err(IdentifyError::Request { message: format!("HTTP {status}") });
    }

    let body: Value = response.json().await?;
    parse_response(&body)
  }
}

/// Best guess from a PlantNet `identify` response.
pub fn parse_response(body: &Value) -> Result<IdentificationResult, IdentifyError> {
  let results = body
    .get("results")
    .and_then(Value::as_array)
    .ok_or_else(|| IdentifyError::InvalidResponse { message: "missing results".to_string() })?;
  let best = results.first().ok_or(IdentifyError::NoMatch)?;

  let species = best.get("species");
  let scientific_name = species
    .and_then(|s| s.get("scientificNameWithoutAuthor"))
    .and_then(Value::as_str)
    .filter(|s| !s.trim().is_empty())
    .unwrap_or(UNKNOWN_NAME);
  let common_name = species
    .and_then(|s| s.get("commonNames"))
    .and_then(Value::as_array)
    .and_then(|names| names.first())
    .and_then(Value::as_str)
    .filter(|s| !s.trim().is_empty())
    .unwrap_or(UNKNOWN_NAME);
  let score = best.get("score").and_then(Value::as_f64).unwrap_or(0.0);
  let confidence = (score * 1000.0).round() / 10.0;

  Ok(IdentificationResult::new(scientific_name, common_name, confidence))
}

#[cfg(test)]
mod tests {
  use super::*;
  use herbarium::Query;
  use serde_json::json;

  #[test]
  fn parses_best_result() {
    let body = json!({
      "results": [
        {
          "score": 0.87654,
          "species": {
            "scientificNameWithoutAuthor": "Epipremnum aureum",
            "commonNames": ["Golden pothos", "Devil's ivy"]
          }
        },
        {"score": 0.05, "species": {"scientificNameWithoutAuthor": "Philodendron hederaceum"}}
      ]
    });

    let result = parse_response(&body).unwrap();
    assert_eq!(result.scientific_name, "Epipremnum aureum");
    assert_eq!(result.common_name, "Golden pothos");
    assert_eq!(result.confidence, 87.7);
  }

  #[test]
  fn missing_names_become_unknown() {
    let body = json!({"results": [{"score": 0.5, "species": {"commonNames": []}}]});
    let result = parse_response(&body).unwrap();
    assert_eq!(result.scientific_name, "Unknown");
    assert_eq!(result.common_name, "Unknown");
    assert_eq!(result.confidence, 50.0);
  }

  #[test]
  fn missing_common_name_is_left_out_of_the_query() {
    let body = json!({
      "results": [{"score": 0.4, "species": {"scientificNameWithoutAuthor": "Epipremnum aureum"}}]
    });
    let result = parse_response(&body).unwrap();
    assert_eq!(result.common_name, "Unknown");

    let query = Query::from(&result);
    assert_eq!(query.scientific_name.as_deref(), Some("Epipremnum aureum"));
    assert_eq!(query.common_name, None);
  }

  #[test]
  fn empty_results_is_no_match() {
    let err = parse_response(&json!({"results": []})).unwrap_err();
    assert!(matches!(err, IdentifyError::NoMatch));
  }

  #[test]
  fn missing_results_is_invalid() {
    let err = parse_response(&json!({"error": "bad key"})).unwrap_err();
    assert!(matches!(err, IdentifyError::InvalidResponse { .. }));
  }

  #[tokio::test]
  async fn mock_identifier_can_stand_in() {
    let mut identifier = MockIdentifier::new();
    identifier
      .expect_identify()
      .returning(|_| Ok(IdentificationResult::new("Ficus lyrata", "Fiddle-leaf fig", 91.0)));

    let result = identifier.identify(vec![1, 2, 3]).await.unwrap();
    assert_eq!(result.common_name, "Fiddle-leaf fig");
  }
}
