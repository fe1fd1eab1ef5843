//! Inbound provider callbacks.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/webhooks/voice` | End-of-call report; other message types are acknowledged and ignored |

use axum::{
  Json,
  body::Bytes,
  extract::State,
  response::{IntoResponse, Response},
};
use chrono::Utc;
use dialer_core::store::CampaignStore;
use dialer_engine::Providers;
use dialer_providers::decode_callback;
use serde_json::json;

use crate::{Engine, error::ApiError};

/// `POST /webhooks/voice`: settles the call and returns the
/// [`dialer_engine::IngestReceipt`].
///
/// A repeated report for a settled call answers 409; an unknown call handle
/// answers 404.
pub async fn voice<S, P>(
  State(engine): State<Engine<S, P>>,
  body: Bytes,
) -> Result<Response, ApiError>
where
  S: CampaignStore + 'static,
  P: Providers + 'static,
{
  let report = decode_callback(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;
  let Some(report) = report else {
    return Ok(Json(json!({ "status": "ignored" })).into_response());
  };

  let handle = report.call_handle.clone();
  let receipt = engine.ingest_outcome(report, Utc::now()).await.inspect_err(|e| {
    tracing::warn!(call_handle = %handle, error = %e, "callback rejected");
  })?;
  Ok(Json(receipt).into_response())
}
