//! Error types for the contact intake codec.

use thiserror::Error;

/// Failures that reject a whole upload. Bad individual rows are not errors;
/// they are reported in [`crate::IntakeReport::invalid_rows`].
#[derive(Debug, Error)]
pub enum Error {
  #[error("CSV error: {0}")]
  Csv(#[from] csv::Error),

  #[error("field mapping has no phone_number column")]
  MissingPhoneColumn,

  #[error("field mapping maps more than one column to {0}")]
  DuplicateTarget(&'static str),

  #[error("mapped column {0:?} is not in the CSV header")]
  UnknownColumn(String),

  #[error("invalid field mapping: {0}")]
  Mapping(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
