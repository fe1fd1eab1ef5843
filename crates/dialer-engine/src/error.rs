//! Error type for `dialer-engine`.

use std::time::Duration;

use dialer_core::store::AsCoreError;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  /// A domain rule was violated; callers map these onto client errors.
  #[error(transparent)]
  Core(#[from] dialer_core::Error),

  #[error(transparent)]
  Intake(#[from] dialer_intake::Error),

  #[error("store error: {0}")]
  Store(#[source] BoxError),

  #[error("intent classifier error: {0}")]
  Classifier(#[source] BoxError),

  #[error("{0} timed out after {1:?}")]
  Timeout(&'static str, Duration),
}

impl Error {
  /// Convert a backend error, lifting out any domain error it wraps.
  pub fn from_store<E>(err: E) -> Self
  where
    E: std::error::Error + AsCoreError + Send + Sync + 'static,
  {
    match err.into_core() {
      Ok(core) => Self::Core(core),
      Err(other) => Self::Store(Box::new(other)),
    }
  }

  /// The domain error behind this one, if any.
  pub fn core(&self) -> Option<&dialer_core::Error> {
    match self {
      Self::Core(e) => Some(e),
      _ => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
