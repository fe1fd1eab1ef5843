//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings (microsecond
//! precision, `Z` suffix) so that SQL string comparison orders them
//! correctly. Enums are stored as their snake_case names, custom fields as
//! compact JSON, UUIDs as hyphenated lowercase strings.

use std::{collections::BTreeMap, str::FromStr};

use chrono::{DateTime, NaiveTime, SecondsFormat, Utc};
use dialer_core::{
  attempt::CallAttempt,
  campaign::{Campaign, CampaignCounters},
  contact::Contact,
  schedule::CallingSchedule,
  trigger::Trigger,
};
use rusqlite::Row;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("timestamp {s:?}: {e}")))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

pub fn encode_time(t: NaiveTime) -> String { t.format("%H:%M:%S").to_string() }

pub fn decode_time(s: &str) -> Result<NaiveTime> {
  NaiveTime::parse_from_str(s, "%H:%M:%S")
    .map_err(|e| Error::Decode(format!("time {s:?}: {e}")))
}

pub fn decode_enum<T: FromStr>(kind: &'static str, s: &str) -> Result<T> {
  s.parse().map_err(|_| {
    Error::Core(dialer_core::Error::UnknownDiscriminant {
      kind,
      value: s.to_owned(),
    })
  })
}

pub fn decode_count(value: i64) -> Result<u32> {
  u32::try_from(value).map_err(|_| Error::Decode(format!("count out of range: {value}")))
}

pub fn encode_fields(fields: &BTreeMap<String, String>) -> Result<String> {
  Ok(serde_json::to_string(fields)?)
}

pub fn decode_fields(s: &str) -> Result<BTreeMap<String, String>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Column lists ────────────────────────────────────────────────────────────

pub const CAMPAIGN_COLUMNS: &str = "campaign_id, tenant_id, name, status, \
  max_concurrent_calls, max_retries, retry_delay_hours, assistant_id, \
  phone_number_id, sms_from_number, total_contacts, contacts_called, \
  contacts_answered, contacts_failed, created_at, updated_at";

pub const SCHEDULE_COLUMNS: &str =
  "schedule_id, campaign_id, day_of_week, start_time, end_time, is_active";

pub const TRIGGER_COLUMNS: &str = "trigger_id, campaign_id, intent_description, \
  message_template, priority, is_active, created_at";

pub const CONTACT_COLUMNS: &str = "contact_id, campaign_id, phone_number, \
  first_name, last_name, email, custom_fields, area_code, timezone, status, \
  attempt_count, last_attempt_at, next_attempt_at, call_result, created_at";

pub const ATTEMPT_COLUMNS: &str = "attempt_id, campaign_id, contact_id, \
  call_handle, attempt_number, started_at, ended_at, duration_seconds, \
  transcript, summary, recording_url, ended_reason, outcome, message_sent, \
  trigger_fired";

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `campaigns` row.
pub struct RawCampaign {
  pub campaign_id:          String,
  pub tenant_id:            String,
  pub name:                 String,
  pub status:               String,
  pub max_concurrent_calls: i64,
  pub max_retries:          i64,
  pub retry_delay_hours:    f64,
  pub assistant_id:         Option<String>,
  pub phone_number_id:      Option<String>,
  pub sms_from_number:      Option<String>,
  pub total_contacts:       i64,
  pub contacts_called:      i64,
  pub contacts_answered:    i64,
  pub contacts_failed:      i64,
  pub created_at:           String,
  pub updated_at:           String,
}

impl RawCampaign {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      campaign_id:          row.get(0)?,
      tenant_id:            row.get(1)?,
      name:                 row.get(2)?,
      status:               row.get(3)?,
      max_concurrent_calls: row.get(4)?,
      max_retries:          row.get(5)?,
      retry_delay_hours:    row.get(6)?,
      assistant_id:         row.get(7)?,
      phone_number_id:      row.get(8)?,
      sms_from_number:      row.get(9)?,
      total_contacts:       row.get(10)?,
      contacts_called:      row.get(11)?,
      contacts_answered:    row.get(12)?,
      contacts_failed:      row.get(13)?,
      created_at:           row.get(14)?,
      updated_at:           row.get(15)?,
    })
  }

  pub fn into_campaign(self) -> Result<Campaign> {
    Ok(Campaign {
      campaign_id:          decode_uuid(&self.campaign_id)?,
      tenant_id:            decode_uuid(&self.tenant_id)?,
      name:                 self.name,
      status:               decode_enum("campaign status", &self.status)?,
      max_concurrent_calls: decode_count(self.max_concurrent_calls)?,
      max_retries:          decode_count(self.max_retries)?,
      retry_delay_hours:    self.retry_delay_hours,
      assistant_id:         self.assistant_id,
      phone_number_id:      self.phone_number_id,
      sms_from_number:      self.sms_from_number,
      counters:             CampaignCounters {
        total_contacts:    decode_count(self.total_contacts)?,
        contacts_called:   decode_count(self.contacts_called)?,
        contacts_answered: decode_count(self.contacts_answered)?,
        contacts_failed:   decode_count(self.contacts_failed)?,
      },
      created_at:           decode_dt(&self.created_at)?,
      updated_at:           decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values read directly from a `calling_schedules` row.
pub struct RawSchedule {
  pub schedule_id: String,
  pub campaign_id: String,
  pub day_of_week: i64,
  pub start_time:  String,
  pub end_time:    String,
  pub is_active:   bool,
}

impl RawSchedule {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      schedule_id: row.get(0)?,
      campaign_id: row.get(1)?,
      day_of_week: row.get(2)?,
      start_time:  row.get(3)?,
      end_time:    row.get(4)?,
      is_active:   row.get(5)?,
    })
  }

  pub fn into_schedule(self) -> Result<CallingSchedule> {
    Ok(CallingSchedule {
      schedule_id: decode_uuid(&self.schedule_id)?,
      campaign_id: decode_uuid(&self.campaign_id)?,
      day_of_week: u8::try_from(self.day_of_week)
        .map_err(|_| Error::Decode(format!("day_of_week {}", self.day_of_week)))?,
      start_time:  decode_time(&self.start_time)?,
      end_time:    decode_time(&self.end_time)?,
      is_active:   self.is_active,
    })
  }
}

/// Raw values read directly from a `triggers` row.
pub struct RawTrigger {
  pub trigger_id:         String,
  pub campaign_id:        String,
  pub intent_description: String,
  pub message_template:   String,
  pub priority:           i32,
  pub is_active:          bool,
  pub created_at:         String,
}

impl RawTrigger {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      trigger_id:         row.get(0)?,
      campaign_id:        row.get(1)?,
      intent_description: row.get(2)?,
      message_template:   row.get(3)?,
      priority:           row.get(4)?,
      is_active:          row.get(5)?,
      created_at:         row.get(6)?,
    })
  }

  pub fn into_trigger(self) -> Result<Trigger> {
    Ok(Trigger {
      trigger_id:         decode_uuid(&self.trigger_id)?,
      campaign_id:        decode_uuid(&self.campaign_id)?,
      intent_description: self.intent_description,
      message_template:   self.message_template,
      priority:           self.priority,
      is_active:          self.is_active,
      created_at:         decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `contacts` row.
pub struct RawContact {
  pub contact_id:      String,
  pub campaign_id:     String,
  pub phone_number:    String,
  pub first_name:      Option<String>,
  pub last_name:       Option<String>,
  pub email:           Option<String>,
  pub custom_fields:   String,
  pub area_code:       Option<String>,
  pub timezone:        Option<String>,
  pub status:          String,
  pub attempt_count:   i64,
  pub last_attempt_at: Option<String>,
  pub next_attempt_at: Option<String>,
  pub call_result:     Option<String>,
  pub created_at:      String,
}

impl RawContact {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      contact_id:      row.get(0)?,
      campaign_id:     row.get(1)?,
      phone_number:    row.get(2)?,
      first_name:      row.get(3)?,
      last_name:       row.get(4)?,
      email:           row.get(5)?,
      custom_fields:   row.get(6)?,
      area_code:       row.get(7)?,
      timezone:        row.get(8)?,
      status:          row.get(9)?,
      attempt_count:   row.get(10)?,
      last_attempt_at: row.get(11)?,
      next_attempt_at: row.get(12)?,
      call_result:     row.get(13)?,
      created_at:      row.get(14)?,
    })
  }

  pub fn into_contact(self) -> Result<Contact> {
    Ok(Contact {
      contact_id:      decode_uuid(&self.contact_id)?,
      campaign_id:     decode_uuid(&self.campaign_id)?,
      phone_number:    self.phone_number,
      first_name:      self.first_name,
      last_name:       self.last_name,
      email:           self.email,
      custom_fields:   decode_fields(&self.custom_fields)?,
      area_code:       self.area_code,
      timezone:        self.timezone,
      status:          decode_enum("contact status", &self.status)?,
      attempt_count:   decode_count(self.attempt_count)?,
      last_attempt_at: decode_opt_dt(self.last_attempt_at)?,
      next_attempt_at: decode_opt_dt(self.next_attempt_at)?,
      call_result:     self
        .call_result
        .as_deref()
        .map(|s| decode_enum("call outcome", s))
        .transpose()?,
      created_at:      decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `call_attempts` row.
pub struct RawAttempt {
  pub attempt_id:       String,
  pub campaign_id:      String,
  pub contact_id:       String,
  pub call_handle:      String,
  pub attempt_number:   i64,
  pub started_at:       String,
  pub ended_at:         Option<String>,
  pub duration_seconds: Option<i64>,
  pub transcript:       Option<String>,
  pub summary:          Option<String>,
  pub recording_url:    Option<String>,
  pub ended_reason:     Option<String>,
  pub outcome:          Option<String>,
  pub message_sent:     bool,
  pub trigger_fired:    Option<String>,
}

impl RawAttempt {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      attempt_id:       row.get(0)?,
      campaign_id:      row.get(1)?,
      contact_id:       row.get(2)?,
      call_handle:      row.get(3)?,
      attempt_number:   row.get(4)?,
      started_at:       row.get(5)?,
      ended_at:         row.get(6)?,
      duration_seconds: row.get(7)?,
      transcript:       row.get(8)?,
      summary:          row.get(9)?,
      recording_url:    row.get(10)?,
      ended_reason:     row.get(11)?,
      outcome:          row.get(12)?,
      message_sent:     row.get(13)?,
      trigger_fired:    row.get(14)?,
    })
  }

  pub fn into_attempt(self) -> Result<CallAttempt> {
    Ok(CallAttempt {
      attempt_id:       decode_uuid(&self.attempt_id)?,
      campaign_id:      decode_uuid(&self.campaign_id)?,
      contact_id:       decode_uuid(&self.contact_id)?,
      call_handle:      self.call_handle,
      attempt_number:   decode_count(self.attempt_number)?,
      started_at:       decode_dt(&self.started_at)?,
      ended_at:         decode_opt_dt(self.ended_at)?,
      duration_seconds: self.duration_seconds,
      transcript:       self.transcript,
      summary:          self.summary,
      recording_url:    self.recording_url,
      ended_reason:     self.ended_reason,
      outcome:          self
        .outcome
        .as_deref()
        .map(|s| decode_enum("call outcome", s))
        .transpose()?,
      message_sent:     self.message_sent,
      trigger_fired:    self.trigger_fired.as_deref().map(decode_uuid).transpose()?,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn timestamps_sort_lexically() {
    let whole = Utc.with_ymd_and_hms(2026, 3, 4, 15, 0, 0).unwrap();
    let later = whole + chrono::Duration::milliseconds(1);
    let (a, b) = (encode_dt(whole), encode_dt(later));
    assert_eq!(a, "2026-03-04T15:00:00.000000Z");
    assert!(a < b);
    assert_eq!(decode_dt(&b).unwrap(), later);
  }

  #[test]
  fn unknown_status_is_a_core_error() {
    let err = decode_enum::<dialer_core::contact::ContactStatus>("contact status", "ringing")
      .unwrap_err();
    assert!(matches!(
      err,
      Error::Core(dialer_core::Error::UnknownDiscriminant { .. })
    ));
  }
}
