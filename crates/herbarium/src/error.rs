use std::path::PathBuf;
use thiserror::Error;

/// Failures reading a care file as a whole.
#[derive(Error, Debug)]
pub enum CatalogError {
  #[error("Failed to read care file {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Care file is not valid JSON: {source}")]
  Parse {
    #[source]
    source: serde_json::Error,
  },

  #[error("Care file must contain a JSON array of records, found {found}")]
  NotAList { found: &'static str },
}

/// A single care-file entry that cannot become a record. Skipped at load time.
#[derive(Error, Debug)]
pub enum RecordError {
  #[error("Record #{index} has no usable name")]
  MissingName { index: usize },

  #[error("Record #{index} is malformed: {source}")]
  Shape {
    index: usize,
    #[source]
    source: serde_json::Error,
  },
}
