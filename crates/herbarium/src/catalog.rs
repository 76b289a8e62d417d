//! Loading and holding the care-record collection.
//!
//! A catalog is loaded once and then only borrowed. Entries that cannot be
//! turned into a [`CareRecord`] are logged and skipped; only an unreadable file
//! or a file that is not a JSON array fails the load.

use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::error::CatalogError;
use crate::record::CareRecord;
use crate::resolver::{self, Query};

#[derive(Debug, Clone, Default)]
pub struct Catalog {
  records: Vec<CareRecord>,
  skipped: usize,
}

impl Catalog {
  pub fn from_records(records: Vec<CareRecord>) -> Self {
    let total = records.len();
    let records: Vec<CareRecord> = records.into_iter().filter(CareRecord::is_usable).collect();
    Self { skipped: total - records.len(), records }
  }

  /// Load a care file from disk.
  pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
      .map_err(|source| CatalogError::Read { path: path.to_path_buf(), source })?;
    let catalog = Self::from_json_str(&content)?;
    info!(
      path = %path.display(),
      records = catalog.len(),
      skipped = catalog.skipped,
      "loaded care catalog"
    );
    Ok(catalog)
  }

  /// Parse a care file's contents.
  pub fn from_json_str(content: &str) -> Result<Self, CatalogError> {
    let value: Value =
      serde_json::from_str(content).map_err(|source| CatalogError::Parse { source })?;

    let entries = match value {
      Value::Array(entries) => entries,
      other => return Err(CatalogError::NotAList { found: json_kind(&other) }),
    };

    let mut records = Vec::with_capacity(entries.len());
    let mut skipped = 0;
    for (index, entry) in entries.into_iter().enumerate() {
      match CareRecord::from_value(index, entry) {
        Ok(record) => records.push(record),
        Err(e) => {
          warn!("skipping care record: {e}");
          skipped += 1;
        }
      }
    }

    Ok(Self { records, skipped })
  }

  pub fn records(&self) -> &[CareRecord] {
    &self.records
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }

  /// Number of entries dropped as malformed.
  pub fn skipped(&self) -> usize {
    self.skipped
  }

  pub fn resolve(&self, query: &Query, threshold: u8) -> Option<&CareRecord> {
    resolver::resolve(query, &self.records, threshold)
  }

  pub fn suggest(&self, query: &Query, limit: usize, threshold: u8) -> Vec<&CareRecord> {
    resolver::suggest(query, &self.records, limit, threshold)
  }
}

fn json_kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "a boolean",
    Value::Number(_) => "a number",
    Value::String(_) => "a string",
    Value::Array(_) => "an array",
    Value::Object(_) => "an object",
  }
}
