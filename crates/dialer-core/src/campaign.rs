//! Campaigns, each a tenant-owned outbound calling effort.
//!
//! The orchestrator reads a campaign's concurrency and retry policy and owns
//! its aggregate counters. Everything else about a campaign is configured by
//! the surrounding portal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Status ──────────────────────────────────────────────────────────────────

/// Lifecycle status of a campaign. Only `Running` campaigns are dispatched.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CampaignStatus {
  Draft,
  Scheduled,
  Running,
  Paused,
  Completed,
  Cancelled,
}

impl CampaignStatus {
  pub fn is_terminal(self) -> bool {
    matches!(self, Self::Completed | Self::Cancelled)
  }
}

// ─── Counters ────────────────────────────────────────────────────────────────

/// Aggregate counters, always recomputed from the contact ledger inside the
/// same transaction as the write that changed them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignCounters {
  pub total_contacts:    u32,
  /// Contacts that reached a terminal state (`completed` or `failed`).
  pub contacts_called:   u32,
  pub contacts_answered: u32,
  pub contacts_failed:   u32,
}

// ─── Campaign ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
  pub campaign_id:          Uuid,
  pub tenant_id:            Uuid,
  pub name:                 String,
  pub status:               CampaignStatus,
  /// Upper bound on contacts simultaneously in `calling`. Always `>= 1`.
  pub max_concurrent_calls: u32,
  /// Extra attempts after the first; total attempts are `max_retries + 1`.
  pub max_retries:          u32,
  pub retry_delay_hours:    f64,
  /// Voice-provider assistant that conducts the call.
  pub assistant_id:         Option<String>,
  /// Voice-provider phone number the call is placed from.
  pub phone_number_id:      Option<String>,
  /// Sender for follow-up messages; falls back to the messaging default.
  pub sms_from_number:      Option<String>,
  pub counters:             CampaignCounters,
  pub created_at:           DateTime<Utc>,
  pub updated_at:           DateTime<Utc>,
}

impl Campaign {
  /// Total attempts a contact may receive.
  pub fn max_attempts(&self) -> u32 { self.max_retries.saturating_add(1) }

  /// The voice identifiers needed to place a call, if both are configured.
  pub fn voice_identifiers(&self) -> Option<(&str, &str)> {
    let assistant = self.assistant_id.as_deref().filter(|s| !s.is_empty())?;
    let number = self.phone_number_id.as_deref().filter(|s| !s.is_empty())?;
    Some((assistant, number))
  }

  /// The configured retry delay as a [`chrono::Duration`], clamped to
  /// `[0, MAX_RETRY_DELAY_HOURS]`.
  pub fn retry_delay(&self) -> chrono::Duration {
    let hours = if self.retry_delay_hours.is_finite() {
      self.retry_delay_hours.clamp(0.0, MAX_RETRY_DELAY_HOURS)
    } else {
      MAX_RETRY_DELAY_HOURS
    };
    chrono::Duration::milliseconds((hours * 3_600_000.0) as i64)
  }
}

// ─── NewCampaign ─────────────────────────────────────────────────────────────

/// Longest accepted retry delay: one year.
pub const MAX_RETRY_DELAY_HOURS: f64 = 8760.0;

/// Input to [`crate::store::CampaignStore::create_campaign`]. New campaigns
/// always start in [`CampaignStatus::Draft`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCampaign {
  pub tenant_id:            Uuid,
  pub name:                 String,
  pub max_concurrent_calls: u32,
  pub max_retries:          u32,
  pub retry_delay_hours:    f64,
  pub assistant_id:         Option<String>,
  pub phone_number_id:      Option<String>,
  pub sms_from_number:      Option<String>,
}

impl NewCampaign {
  /// Convenience constructor with a single line, two retries, and a one hour
  /// retry delay.
  pub fn new(tenant_id: Uuid, name: impl Into<String>) -> Self {
    Self {
      tenant_id,
      name: name.into(),
      max_concurrent_calls: 1,
      max_retries: 2,
      retry_delay_hours: 1.0,
      assistant_id: None,
      phone_number_id: None,
      sms_from_number: None,
    }
  }

  pub fn validate(&self) -> Result<()> {
    if self.name.trim().is_empty() {
      return Err(Error::Validation("campaign name is required".into()));
    }
    if self.max_concurrent_calls < 1 {
      return Err(Error::Validation(
        "max_concurrent_calls must be at least 1".into(),
      ));
    }
    if !(0.0..=MAX_RETRY_DELAY_HOURS).contains(&self.retry_delay_hours) {
      return Err(Error::Validation(format!(
        "retry_delay_hours must be between 0 and {MAX_RETRY_DELAY_HOURS}"
      )));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_round_trips_through_strings() {
    assert_eq!(CampaignStatus::Running.as_ref(), "running");
    assert_eq!(
      "cancelled".parse::<CampaignStatus>().unwrap(),
      CampaignStatus::Cancelled
    );
    assert!("archived".parse::<CampaignStatus>().is_err());
  }

  #[test]
  fn validate_rejects_zero_concurrency_and_negative_delay() {
    let mut input = NewCampaign::new(Uuid::new_v4(), "Spring outreach");
    assert!(input.validate().is_ok());

    input.max_concurrent_calls = 0;
    assert!(matches!(input.validate(), Err(Error::Validation(_))));

    input.max_concurrent_calls = 3;
    input.retry_delay_hours = -0.5;
    assert!(matches!(input.validate(), Err(Error::Validation(_))));
  }

  #[test]
  fn validate_caps_retry_delay_at_one_year() {
    let mut input = NewCampaign::new(Uuid::new_v4(), "Spring outreach");
    input.retry_delay_hours = MAX_RETRY_DELAY_HOURS;
    assert!(input.validate().is_ok());

    for bad in [1e10, f64::INFINITY, f64::NAN] {
      input.retry_delay_hours = bad;
      assert!(matches!(input.validate(), Err(Error::Validation(_))), "{bad}");
    }
  }
}
