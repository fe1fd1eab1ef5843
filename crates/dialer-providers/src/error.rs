//! Error types for the provider clients.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("HTTP error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),

  /// The provider answered with a non-success status.
  #[error("provider rejected request ({status}): {body}")]
  Rejected { status: u16, body: String },

  #[error("invalid provider response: {0}")]
  InvalidResponse(String),

  #[error("missing credentials: {0}")]
  MissingCredentials(&'static str),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
