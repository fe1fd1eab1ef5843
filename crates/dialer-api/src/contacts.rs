//! Handlers for contacts and the call-attempt log.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`    | `/campaigns/{id}/contacts` | `?status=`, `limit`, `offset` |
//! | `POST`   | `/campaigns/{id}/contacts/upload` | Raw CSV body, `?mapping=<json>` |
//! | `DELETE` | `/campaigns/{id}/contacts` | Draft campaigns only |
//! | `GET`    | `/campaigns/{id}/attempts` | `?contact_id=`, `limit`, `offset` |

use axum::{
  Json,
  body::Bytes,
  extract::{Path, Query, State},
};
use dialer_core::{
  attempt::CallAttempt,
  contact::{Contact, ContactStatus},
  store::{AttemptQuery, CampaignStore, ContactQuery, Page, PageRequest},
};
use dialer_engine::Providers;
use dialer_intake::{FieldMapping, IntakeReport};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Engine, error::ApiError};

// ─── Listing ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ContactParams {
  pub status: Option<ContactStatus>,
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

/// `GET /campaigns/{id}/contacts[?status=queued][&limit=50][&offset=0]`
pub async fn list<S, P>(
  State(engine): State<Engine<S, P>>,
  Path(id): Path<Uuid>,
  Query(params): Query<ContactParams>,
) -> Result<Json<Page<Contact>>, ApiError>
where
  S: CampaignStore + 'static,
  P: Providers + 'static,
{
  let query = ContactQuery {
    status: params.status,
    page:   PageRequest { limit: params.limit, offset: params.offset },
  };
  let page = engine
    .store()
    .list_contacts(id, query)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(page))
}

#[derive(Debug, Deserialize)]
pub struct AttemptParams {
  pub contact_id: Option<Uuid>,
  pub limit:      Option<usize>,
  pub offset:     Option<usize>,
}

/// `GET /campaigns/{id}/attempts`, newest first.
pub async fn attempts<S, P>(
  State(engine): State<Engine<S, P>>,
  Path(id): Path<Uuid>,
  Query(params): Query<AttemptParams>,
) -> Result<Json<Page<CallAttempt>>, ApiError>
where
  S: CampaignStore + 'static,
  P: Providers + 'static,
{
  let query = AttemptQuery {
    contact_id: params.contact_id,
    page:       PageRequest { limit: params.limit, offset: params.offset },
  };
  let page = engine
    .store()
    .list_attempts(id, query)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(page))
}

// ─── Intake ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UploadParams {
  /// JSON object mapping CSV column names to contact fields, e.g.
  /// `{"Phone":"phone_number","Plan":"custom"}`.
  pub mapping: String,
}

/// `POST /campaigns/{id}/contacts/upload?mapping=<json>`: body is the CSV.
pub async fn upload<S, P>(
  State(engine): State<Engine<S, P>>,
  Path(id): Path<Uuid>,
  Query(params): Query<UploadParams>,
  body: Bytes,
) -> Result<Json<IntakeReport>, ApiError>
where
  S: CampaignStore + 'static,
  P: Providers + 'static,
{
  let mapping = FieldMapping::from_json(&params.mapping)
    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
  let report = engine.upload_contacts(id, &body, &mapping).await?;
  Ok(Json(report))
}

#[derive(Debug, Serialize)]
pub struct ClearedBody {
  pub deleted: u64,
}

/// `DELETE /campaigns/{id}/contacts`: 409 unless the campaign is a draft.
pub async fn clear<S, P>(
  State(engine): State<Engine<S, P>>,
  Path(id): Path<Uuid>,
) -> Result<Json<ClearedBody>, ApiError>
where
  S: CampaignStore + 'static,
  P: Providers + 'static,
{
  let deleted = engine.clear_contacts(id).await?;
  tracing::info!(campaign_id = %id, deleted, "contacts cleared");
  Ok(Json(ClearedBody { deleted }))
}
