//! Error types for `dialer-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::{campaign::CampaignStatus, contact::ContactStatus};

#[derive(Debug, Error)]
pub enum Error {
  /// A bad upload row or configuration value. Never retried.
  #[error("validation error: {0}")]
  Validation(String),

  #[error("campaign {id} is {status}; operation requires {required}")]
  InvalidCampaignState {
    id:       Uuid,
    status:   CampaignStatus,
    required: CampaignStatus,
  },

  #[error("campaign cannot move from {from} to {to}")]
  InvalidTransition {
    from: CampaignStatus,
    to:   CampaignStatus,
  },

  #[error("campaign not found: {0}")]
  CampaignNotFound(Uuid),

  #[error("contact not found: {0}")]
  ContactNotFound(Uuid),

  #[error("trigger not found: {0}")]
  TriggerNotFound(Uuid),

  #[error("no call attempt for handle {0:?}")]
  AttemptNotFound(String),

  /// An outcome arrived for a contact that is not currently `calling`.
  #[error("contact {id} is {status}, not calling")]
  ContactNotCalling { id: Uuid, status: ContactStatus },

  #[error("outcome already recorded for call {0:?}")]
  OutcomeAlreadyRecorded(String),

  /// The voice or messaging service refused or failed to start the request.
  #[error("provider placement failed: {0}")]
  ProviderPlacement(String),

  #[error("unknown {kind} discriminant: {value:?}")]
  UnknownDiscriminant { kind: &'static str, value: String },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
