//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use dialer_core::store::AsCoreError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  /// The request is valid but conflicts with current state.
  #[error("conflict: {0}")]
  Conflict(String),

  /// An external service failed while serving the request.
  #[error("upstream error: {0}")]
  Upstream(String),

  #[error("internal error: {0}")]
  Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Convert a store error, lifting out any domain error it wraps.
  pub fn from_store<E>(err: E) -> Self
  where
    E: std::error::Error + AsCoreError + Send + Sync + 'static,
  {
    dialer_engine::Error::from_store(err).into()
  }
}

impl From<dialer_core::Error> for ApiError {
  fn from(err: dialer_core::Error) -> Self {
    use dialer_core::Error as E;
    let message = err.to_string();
    match err {
      E::CampaignNotFound(_)
      | E::ContactNotFound(_)
      | E::TriggerNotFound(_)
      | E::AttemptNotFound(_) => Self::NotFound(message),
      E::Validation(_) => Self::BadRequest(message),
      E::InvalidCampaignState { .. }
      | E::InvalidTransition { .. }
      | E::ContactNotCalling { .. }
      | E::OutcomeAlreadyRecorded(_) => Self::Conflict(message),
      E::ProviderPlacement(_) => Self::Upstream(message),
      other @ (E::UnknownDiscriminant { .. } | E::Serialization(_)) => {
        Self::Internal(Box::new(other))
      }
    }
  }
}

impl From<dialer_engine::Error> for ApiError {
  fn from(err: dialer_engine::Error) -> Self {
    use dialer_engine::Error as E;
    match err {
      E::Core(e) => e.into(),
      E::Intake(e) => Self::BadRequest(e.to_string()),
      e @ (E::Classifier(_) | E::Timeout(..)) => Self::Upstream(e.to_string()),
      E::Store(e) => Self::Internal(e),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Upstream(m) => (StatusCode::BAD_GATEWAY, m.clone()),
      ApiError::Internal(e) => {
        tracing::error!(error = %e, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
