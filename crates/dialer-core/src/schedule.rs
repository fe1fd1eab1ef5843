//! Calling schedules and the calling-window evaluator.
//!
//! A schedule row allows calls on one weekday between a start and end time,
//! evaluated in the contact's own timezone. Granularity is whole hours.

use chrono::{DateTime, Datelike, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallingSchedule {
  pub schedule_id: Uuid,
  pub campaign_id: Uuid,
  /// 0 = Sunday through 6 = Saturday.
  pub day_of_week: u8,
  pub start_time:  NaiveTime,
  pub end_time:    NaiveTime,
  pub is_active:   bool,
}

/// Input to [`crate::store::CampaignStore::add_schedule`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSchedule {
  pub day_of_week: u8,
  pub start_time:  NaiveTime,
  pub end_time:    NaiveTime,
  #[serde(default = "default_active")]
  pub is_active:   bool,
}

fn default_active() -> bool { true }

impl NewSchedule {
  /// Reject rows the evaluator cannot honour. Overnight windows
  /// (`start >= end`) are unsupported.
  pub fn validate(&self) -> Result<()> {
    if self.day_of_week > 6 {
      return Err(Error::Validation(format!(
        "day_of_week must be 0..=6, got {}",
        self.day_of_week
      )));
    }
    if self.start_time >= self.end_time {
      return Err(Error::Validation(format!(
        "schedule start {} must be before end {}",
        self.start_time, self.end_time
      )));
    }
    Ok(())
  }
}

/// Decide whether a contact may be dialed at `now`.
///
/// - No timezone: always eligible.
/// - Unrecognised timezone: never eligible, since the local hour is unknown.
/// - Otherwise the first active row for the contact-local weekday decides,
///   comparing the local hour against `[start_hour, end_hour)`.
pub fn is_eligible_now(
  timezone: Option<&str>,
  schedules: &[CallingSchedule],
  now: DateTime<Utc>,
) -> bool {
  let Some(name) = timezone else {
    return true;
  };
  let Ok(tz) = name.parse::<Tz>() else {
    return false;
  };

  let local = now.with_timezone(&tz);
  let weekday = local.weekday().num_days_from_sunday() as u8;

  let Some(row) = schedules
    .iter()
    .find(|s| s.is_active && s.day_of_week == weekday)
  else {
    return false;
  };

  let hour = local.hour();
  hour >= row.start_time.hour() && hour < row.end_time.hour()
}
