//! Handlers for campaign configuration.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/campaigns` | Optional `?status=draft\|scheduled\|running\|...` |
//! | `POST` | `/campaigns` | Body: [`CreateCampaignBody`]; returns 201 + draft campaign |
//! | `GET`  | `/campaigns/{id}` | Campaign with its counters |
//! | `POST` | `/campaigns/{id}/status` | Body: `{"status":"running"}` |
//! | `GET`  | `/campaigns/{id}/schedules` | Calling-window rows |
//! | `POST` | `/campaigns/{id}/schedules` | Body: [`NewSchedule`]; returns 201 |
//! | `GET`  | `/campaigns/{id}/triggers` | `?active_only=true` to hide inactive |
//! | `POST` | `/campaigns/{id}/triggers` | Body: [`NewTrigger`]; returns 201 |
//! | `POST` | `/triggers/{id}/active` | Body: `{"is_active":false}` |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use dialer_core::{
  campaign::{Campaign, CampaignStatus, NewCampaign},
  schedule::{CallingSchedule, NewSchedule},
  store::CampaignStore,
  trigger::{NewTrigger, Trigger},
};
use dialer_engine::Providers;
use serde::Deserialize;
use uuid::Uuid;

use crate::{Engine, error::ApiError};

// ─── Campaigns ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub status: Option<CampaignStatus>,
}

/// `GET /campaigns[?status=<status>]`
pub async fn list<S, P>(
  State(engine): State<Engine<S, P>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Campaign>>, ApiError>
where
  S: CampaignStore + 'static,
  P: Providers + 'static,
{
  let campaigns = engine
    .store()
    .list_campaigns(params.status)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(campaigns))
}

/// JSON body accepted by `POST /campaigns`. Omitted limits take the
/// defaults of [`NewCampaign::new`].
#[derive(Debug, Deserialize)]
pub struct CreateCampaignBody {
  pub tenant_id:            Uuid,
  pub name:                 String,
  pub max_concurrent_calls: Option<u32>,
  pub max_retries:          Option<u32>,
  pub retry_delay_hours:    Option<f64>,
  pub assistant_id:         Option<String>,
  pub phone_number_id:      Option<String>,
  pub sms_from_number:      Option<String>,
}

impl From<CreateCampaignBody> for NewCampaign {
  fn from(b: CreateCampaignBody) -> Self {
    let defaults = NewCampaign::new(b.tenant_id, b.name);
    NewCampaign {
      max_concurrent_calls: b.max_concurrent_calls.unwrap_or(defaults.max_concurrent_calls),
      max_retries: b.max_retries.unwrap_or(defaults.max_retries),
      retry_delay_hours: b.retry_delay_hours.unwrap_or(defaults.retry_delay_hours),
      assistant_id: b.assistant_id,
      phone_number_id: b.phone_number_id,
      sms_from_number: b.sms_from_number,
      ..defaults
    }
  }
}

/// `POST /campaigns`: returns 201 + the stored draft.
pub async fn create<S, P>(
  State(engine): State<Engine<S, P>>,
  Json(body): Json<CreateCampaignBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CampaignStore + 'static,
  P: Providers + 'static,
{
  let campaign = engine
    .store()
    .create_campaign(NewCampaign::from(body))
    .await
    .map_err(ApiError::from_store)?;
  tracing::info!(campaign_id = %campaign.campaign_id, "campaign created");
  Ok((StatusCode::CREATED, Json(campaign)))
}

/// `GET /campaigns/{id}`
pub async fn get_one<S, P>(
  State(engine): State<Engine<S, P>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Campaign>, ApiError>
where
  S: CampaignStore + 'static,
  P: Providers + 'static,
{
  let campaign = engine
    .store()
    .get_campaign(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("campaign {id} not found")))?;
  Ok(Json(campaign))
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub status: CampaignStatus,
}

/// `POST /campaigns/{id}/status`: 409 if the lifecycle forbids the move.
pub async fn set_status<S, P>(
  State(engine): State<Engine<S, P>>,
  Path(id): Path<Uuid>,
  Json(body): Json<StatusBody>,
) -> Result<Json<Campaign>, ApiError>
where
  S: CampaignStore + 'static,
  P: Providers + 'static,
{
  let campaign = engine.advance_campaign(id, body.status).await?;
  tracing::info!(campaign_id = %id, status = %campaign.status, "campaign status changed");
  Ok(Json(campaign))
}

// ─── Schedules ────────────────────────────────────────────────────────────────

/// `GET /campaigns/{id}/schedules`
pub async fn list_schedules<S, P>(
  State(engine): State<Engine<S, P>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<CallingSchedule>>, ApiError>
where
  S: CampaignStore + 'static,
  P: Providers + 'static,
{
  let schedules = engine
    .store()
    .list_schedules(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(schedules))
}

/// `POST /campaigns/{id}/schedules`: rejects `start >= end` with 400.
pub async fn add_schedule<S, P>(
  State(engine): State<Engine<S, P>>,
  Path(id): Path<Uuid>,
  Json(body): Json<NewSchedule>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CampaignStore + 'static,
  P: Providers + 'static,
{
  let schedule = engine
    .store()
    .add_schedule(id, body)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(schedule)))
}

// ─── Triggers ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TriggerParams {
  #[serde(default)]
  pub active_only: bool,
}

/// `GET /campaigns/{id}/triggers[?active_only=true]`, in evaluation order.
pub async fn list_triggers<S, P>(
  State(engine): State<Engine<S, P>>,
  Path(id): Path<Uuid>,
  Query(params): Query<TriggerParams>,
) -> Result<Json<Vec<Trigger>>, ApiError>
where
  S: CampaignStore + 'static,
  P: Providers + 'static,
{
  let triggers = engine
    .store()
    .list_triggers(id, params.active_only)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(triggers))
}

/// `POST /campaigns/{id}/triggers`
pub async fn add_trigger<S, P>(
  State(engine): State<Engine<S, P>>,
  Path(id): Path<Uuid>,
  Json(body): Json<NewTrigger>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CampaignStore + 'static,
  P: Providers + 'static,
{
  let trigger = engine
    .store()
    .add_trigger(id, body)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(trigger)))
}

#[derive(Debug, Deserialize)]
pub struct ActiveBody {
  pub is_active: bool,
}

/// `POST /triggers/{id}/active`: firing history survives a toggle.
pub async fn set_trigger_active<S, P>(
  State(engine): State<Engine<S, P>>,
  Path(id): Path<Uuid>,
  Json(body): Json<ActiveBody>,
) -> Result<Json<Trigger>, ApiError>
where
  S: CampaignStore + 'static,
  P: Providers + 'static,
{
  let trigger = engine
    .store()
    .set_trigger_active(id, body.is_active)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(trigger))
}
