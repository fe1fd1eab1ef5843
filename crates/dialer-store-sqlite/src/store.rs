//! [`SqliteStore`], the SQLite implementation of [`CampaignStore`].

use std::{collections::HashSet, path::Path};

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension as _, params};
use uuid::Uuid;

use dialer_core::{
  attempt::{CallAttempt, NewCallAttempt},
  campaign::{Campaign, CampaignCounters, CampaignStatus, NewCampaign},
  contact::{Contact, ContactStatus, NewContact},
  lifecycle::{SettleAttempt, check_campaign_transition},
  schedule::{CallingSchedule, NewSchedule},
  store::{AttemptQuery, CampaignStore, ContactQuery, Page, ReleaseContact},
  trigger::{NewTrigger, Trigger},
};

use crate::{
  Error, Result,
  encode::{
    ATTEMPT_COLUMNS, CAMPAIGN_COLUMNS, CONTACT_COLUMNS, RawAttempt, RawCampaign,
    RawContact, RawSchedule, RawTrigger, SCHEDULE_COLUMNS, TRIGGER_COLUMNS,
    decode_count, decode_enum, decode_uuid, encode_dt, encode_fields, encode_time, encode_uuid,
  },
  schema::{REFRESH_COUNTERS, SCHEMA},
};

/// A guard that failed inside a database closure. Converted into a domain
/// error once the ids it refers to are back in scope.
enum Rejection {
  CampaignNotFound,
  CampaignNotDraft(String),
  ContactNotFound,
  ContactNotCalling(String),
  AttemptNotFound,
  AlreadySettled,
  TriggerNotFound,
}

type Guarded<T> = std::result::Result<T, Rejection>;

fn campaign_status(
  conn: &rusqlite::Connection,
  campaign_id: &str,
) -> rusqlite::Result<Option<String>> {
  conn
    .query_row(
      "SELECT status FROM campaigns WHERE campaign_id = ?1",
      params![campaign_id],
      |r| r.get(0),
    )
    .optional()
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A contact ledger backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  fn reject(&self, rejection: Rejection, id: Uuid, handle: &str) -> Error {
    let core = match rejection {
      Rejection::CampaignNotFound => dialer_core::Error::CampaignNotFound(id),
      Rejection::CampaignNotDraft(status) => {
        match decode_enum::<CampaignStatus>("campaign status", &status) {
          Ok(status) => dialer_core::Error::InvalidCampaignState {
            id,
            status,
            required: CampaignStatus::Draft,
          },
          Err(e) => return e,
        }
      }
      Rejection::ContactNotFound => dialer_core::Error::ContactNotFound(id),
      Rejection::ContactNotCalling(status) => {
        match decode_enum::<ContactStatus>("contact status", &status) {
          Ok(status) => dialer_core::Error::ContactNotCalling { id, status },
          Err(e) => return e,
        }
      }
      Rejection::AttemptNotFound => {
        dialer_core::Error::AttemptNotFound(handle.to_owned())
      }
      Rejection::AlreadySettled => {
        dialer_core::Error::OutcomeAlreadyRecorded(handle.to_owned())
      }
      Rejection::TriggerNotFound => dialer_core::Error::TriggerNotFound(id),
    };
    Error::Core(core)
  }

  async fn get_trigger(&self, trigger_id: Uuid) -> Result<Option<Trigger>> {
    let id_str = encode_uuid(trigger_id);
    let raw: Option<RawTrigger> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {TRIGGER_COLUMNS} FROM triggers WHERE trigger_id = ?1"),
              params![id_str],
              RawTrigger::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawTrigger::into_trigger).transpose()
  }

  async fn get_attempt(&self, attempt_id: Uuid) -> Result<Option<CallAttempt>> {
    let id_str = encode_uuid(attempt_id);
    let raw: Option<RawAttempt> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {ATTEMPT_COLUMNS} FROM call_attempts WHERE attempt_id = ?1"),
              params![id_str],
              RawAttempt::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawAttempt::into_attempt).transpose()
  }
}

// ─── CampaignStore impl ──────────────────────────────────────────────────────

impl CampaignStore for SqliteStore {
  type Error = Error;

  // ── Campaigns ─────────────────────────────────────────────────────────────

  async fn create_campaign(&self, input: NewCampaign) -> Result<Campaign> {
    input.validate()?;

    let now = Utc::now();
    let campaign = Campaign {
      campaign_id:          Uuid::new_v4(),
      tenant_id:            input.tenant_id,
      name:                 input.name,
      status:               CampaignStatus::Draft,
      max_concurrent_calls: input.max_concurrent_calls,
      max_retries:          input.max_retries,
      retry_delay_hours:    input.retry_delay_hours,
      assistant_id:         input.assistant_id,
      phone_number_id:      input.phone_number_id,
      sms_from_number:      input.sms_from_number,
      counters:             CampaignCounters::default(),
      created_at:           now,
      updated_at:           now,
    };

    let id_str     = encode_uuid(campaign.campaign_id);
    let tenant_str = encode_uuid(campaign.tenant_id);
    let name       = campaign.name.clone();
    let status     = campaign.status.as_ref().to_owned();
    let max_calls  = i64::from(campaign.max_concurrent_calls);
    let retries    = i64::from(campaign.max_retries);
    let delay      = campaign.retry_delay_hours;
    let assistant  = campaign.assistant_id.clone();
    let number     = campaign.phone_number_id.clone();
    let sms_from   = campaign.sms_from_number.clone();
    let at_str     = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO campaigns (
             campaign_id, tenant_id, name, status, max_concurrent_calls,
             max_retries, retry_delay_hours, assistant_id, phone_number_id,
             sms_from_number, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
          params![
            id_str, tenant_str, name, status, max_calls, retries, delay,
            assistant, number, sms_from, at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    tracing::info!(campaign_id = %campaign.campaign_id, "campaign created");
    Ok(campaign)
  }

  async fn get_campaign(&self, id: Uuid) -> Result<Option<Campaign>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawCampaign> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE campaign_id = ?1"),
              params![id_str],
              RawCampaign::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawCampaign::into_campaign).transpose()
  }

  async fn list_campaigns(
    &self,
    status: Option<CampaignStatus>,
  ) -> Result<Vec<Campaign>> {
    let status_str = status.map(|s| s.as_ref().to_owned());

    let raws: Vec<RawCampaign> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CAMPAIGN_COLUMNS} FROM campaigns
           WHERE (?1 IS NULL OR status = ?1)
           ORDER BY created_at, rowid"
        ))?;
        let rows = stmt
          .query_map(params![status_str], RawCampaign::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCampaign::into_campaign).collect()
  }

  async fn set_campaign_status(
    &self,
    id: Uuid,
    to: CampaignStatus,
  ) -> Result<Campaign> {
    let current = self
      .get_campaign(id)
      .await?
      .ok_or(dialer_core::Error::CampaignNotFound(id))?;
    check_campaign_transition(current.status, to)?;

    let id_str   = encode_uuid(id);
    let from_str = current.status.as_ref().to_owned();
    let to_str   = to.as_ref().to_owned();
    let at_str   = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE campaigns SET status = ?3, updated_at = ?4
           WHERE campaign_id = ?1 AND status = ?2",
          params![id_str, from_str, to_str, at_str],
        )?)
      })
      .await?;

    let updated = self
      .get_campaign(id)
      .await?
      .ok_or(dialer_core::Error::CampaignNotFound(id))?;

    if changed == 0 {
      // Someone else moved the campaign between our read and write.
      return Err(
        dialer_core::Error::InvalidTransition { from: updated.status, to }.into(),
      );
    }

    tracing::info!(
      campaign_id = %id,
      from = %current.status,
      to = %to,
      "campaign status changed"
    );
    Ok(updated)
  }

  // ── Schedules and triggers ────────────────────────────────────────────────

  async fn add_schedule(
    &self,
    campaign_id: Uuid,
    input: NewSchedule,
  ) -> Result<CallingSchedule> {
    input.validate()?;

    let schedule = CallingSchedule {
      schedule_id: Uuid::new_v4(),
      campaign_id,
      day_of_week: input.day_of_week,
      start_time:  input.start_time,
      end_time:    input.end_time,
      is_active:   input.is_active,
    };

    let id_str       = encode_uuid(schedule.schedule_id);
    let campaign_str = encode_uuid(campaign_id);
    let day          = i64::from(schedule.day_of_week);
    let start_str    = encode_time(schedule.start_time);
    let end_str      = encode_time(schedule.end_time);
    let active       = schedule.is_active;

    let guarded: Guarded<()> = self
      .conn
      .call(move |conn| {
        if campaign_status(conn, &campaign_str)?.is_none() {
          return Ok(Err(Rejection::CampaignNotFound));
        }
        conn.execute(
          "INSERT INTO calling_schedules (
             schedule_id, campaign_id, day_of_week, start_time, end_time, is_active
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          params![id_str, campaign_str, day, start_str, end_str, active],
        )?;
        Ok(Ok(()))
      })
      .await?;
    guarded.map_err(|r| self.reject(r, campaign_id, ""))?;

    Ok(schedule)
  }

  async fn list_schedules(&self, campaign_id: Uuid) -> Result<Vec<CallingSchedule>> {
    let campaign_str = encode_uuid(campaign_id);

    let raws: Vec<RawSchedule> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SCHEDULE_COLUMNS} FROM calling_schedules
           WHERE campaign_id = ?1 ORDER BY rowid"
        ))?;
        let rows = stmt
          .query_map(params![campaign_str], RawSchedule::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSchedule::into_schedule).collect()
  }

  async fn add_trigger(&self, campaign_id: Uuid, input: NewTrigger) -> Result<Trigger> {
    input.validate()?;

    let trigger = Trigger {
      trigger_id:         Uuid::new_v4(),
      campaign_id,
      intent_description: input.intent_description,
      message_template:   input.message_template,
      priority:           input.priority,
      is_active:          input.is_active,
      created_at:         Utc::now(),
    };

    let id_str       = encode_uuid(trigger.trigger_id);
    let campaign_str = encode_uuid(campaign_id);
    let intent       = trigger.intent_description.clone();
    let template     = trigger.message_template.clone();
    let priority     = trigger.priority;
    let active       = trigger.is_active;
    let at_str       = encode_dt(trigger.created_at);

    let guarded: Guarded<()> = self
      .conn
      .call(move |conn| {
        if campaign_status(conn, &campaign_str)?.is_none() {
          return Ok(Err(Rejection::CampaignNotFound));
        }
        conn.execute(
          "INSERT INTO triggers (
             trigger_id, campaign_id, intent_description, message_template,
             priority, is_active, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          params![id_str, campaign_str, intent, template, priority, active, at_str],
        )?;
        Ok(Ok(()))
      })
      .await?;
    guarded.map_err(|r| self.reject(r, campaign_id, ""))?;

    Ok(trigger)
  }

  async fn list_triggers(
    &self,
    campaign_id: Uuid,
    active_only: bool,
  ) -> Result<Vec<Trigger>> {
    let campaign_str = encode_uuid(campaign_id);

    let raws: Vec<RawTrigger> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {TRIGGER_COLUMNS} FROM triggers
           WHERE campaign_id = ?1 AND (?2 = 0 OR is_active = 1)
           ORDER BY priority, created_at, rowid"
        ))?;
        let rows = stmt
          .query_map(params![campaign_str, active_only], RawTrigger::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTrigger::into_trigger).collect()
  }

  async fn set_trigger_active(&self, trigger_id: Uuid, active: bool) -> Result<Trigger> {
    let id_str = encode_uuid(trigger_id);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE triggers SET is_active = ?2 WHERE trigger_id = ?1",
          params![id_str, active],
        )?)
      })
      .await?;
    if changed == 0 {
      return Err(self.reject(Rejection::TriggerNotFound, trigger_id, ""));
    }

    self
      .get_trigger(trigger_id)
      .await?
      .ok_or_else(|| self.reject(Rejection::TriggerNotFound, trigger_id, ""))
  }

  // ── Contacts: intake ──────────────────────────────────────────────────────

  async fn existing_phone_numbers(&self, campaign_id: Uuid) -> Result<HashSet<String>> {
    let campaign_str = encode_uuid(campaign_id);

    let numbers = self
      .conn
      .call(move |conn| {
        let mut stmt =
          conn.prepare("SELECT phone_number FROM contacts WHERE campaign_id = ?1")?;
        let rows = stmt
          .query_map(params![campaign_str], |r| r.get::<_, String>(0))?
          .collect::<rusqlite::Result<HashSet<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(numbers)
  }

  async fn insert_contacts(
    &self,
    campaign_id: Uuid,
    contacts: Vec<NewContact>,
  ) -> Result<Vec<Contact>> {
    let now = Utc::now();
    let rows: Vec<Contact> = contacts
      .into_iter()
      .map(|c| Contact {
        contact_id:      Uuid::new_v4(),
        campaign_id,
        phone_number:    c.phone_number,
        first_name:      c.first_name,
        last_name:       c.last_name,
        email:           c.email,
        custom_fields:   c.custom_fields,
        area_code:       c.area_code,
        timezone:        c.timezone,
        status:          ContactStatus::Pending,
        attempt_count:   0,
        last_attempt_at: None,
        next_attempt_at: None,
        call_result:     None,
        created_at:      now,
      })
      .collect();

    let encoded = rows
      .iter()
      .map(|c| {
        Ok((
          encode_uuid(c.contact_id),
          c.phone_number.clone(),
          c.first_name.clone(),
          c.last_name.clone(),
          c.email.clone(),
          encode_fields(&c.custom_fields)?,
          c.area_code.clone(),
          c.timezone.clone(),
        ))
      })
      .collect::<Result<Vec<_>>>()?;

    let campaign_str = encode_uuid(campaign_id);
    let at_str       = encode_dt(now);

    let guarded: Guarded<Vec<bool>> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        match campaign_status(&tx, &campaign_str)? {
          None => return Ok(Err(Rejection::CampaignNotFound)),
          Some(s) if s != CampaignStatus::Draft.as_ref() => {
            return Ok(Err(Rejection::CampaignNotDraft(s)));
          }
          Some(_) => {}
        }

        let mut inserted = Vec::with_capacity(encoded.len());
        {
          let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO contacts (
               contact_id, campaign_id, phone_number, first_name, last_name,
               email, custom_fields, area_code, timezone, status, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 'pending', ?10)",
          )?;
          for (id, phone, first, last, email, fields, area, tz) in encoded {
            let n = stmt.execute(params![
              id,
              campaign_str,
              phone,
              first,
              last,
              email,
              fields,
              area,
              tz,
              at_str,
            ])?;
            inserted.push(n == 1);
          }
        }

        tx.execute(REFRESH_COUNTERS, params![campaign_str, at_str])?;
        tx.commit()?;
        Ok(Ok(inserted))
      })
      .await?;

    let inserted = guarded.map_err(|r| self.reject(r, campaign_id, ""))?;
    Ok(
      rows
        .into_iter()
        .zip(inserted)
        .filter_map(|(contact, ok)| ok.then_some(contact))
        .collect(),
    )
  }

  async fn clear_contacts(&self, campaign_id: Uuid) -> Result<u64> {
    let campaign_str = encode_uuid(campaign_id);
    let at_str       = encode_dt(Utc::now());

    let guarded: Guarded<usize> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        match campaign_status(&tx, &campaign_str)? {
          None => return Ok(Err(Rejection::CampaignNotFound)),
          Some(s) if s != CampaignStatus::Draft.as_ref() => {
            return Ok(Err(Rejection::CampaignNotDraft(s)));
          }
          Some(_) => {}
        }
        let removed = tx.execute(
          "DELETE FROM contacts WHERE campaign_id = ?1",
          params![campaign_str],
        )?;
        tx.execute(REFRESH_COUNTERS, params![campaign_str, at_str])?;
        tx.commit()?;
        Ok(Ok(removed))
      })
      .await?;

    let removed = guarded.map_err(|r| self.reject(r, campaign_id, ""))?;
    tracing::info!(campaign_id = %campaign_id, removed, "contacts cleared");
    Ok(removed as u64)
  }

  // ── Contacts: reads ───────────────────────────────────────────────────────

  async fn get_contact(&self, id: Uuid) -> Result<Option<Contact>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawContact> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE contact_id = ?1"),
              params![id_str],
              RawContact::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawContact::into_contact).transpose()
  }

  async fn list_contacts(
    &self,
    campaign_id: Uuid,
    query: ContactQuery,
  ) -> Result<Page<Contact>> {
    let campaign_str = encode_uuid(campaign_id);
    let status_str   = query.status.map(|s| s.as_ref().to_owned());
    let limit_val    = query.page.limit() as i64;
    let offset_val   = query.page.offset() as i64;

    let (raws, total): (Vec<RawContact>, i64) = self
      .conn
      .call(move |conn| {
        let total: i64 = conn.query_row(
          "SELECT COUNT(*) FROM contacts
           WHERE campaign_id = ?1 AND (?2 IS NULL OR status = ?2)",
          params![campaign_str, status_str],
          |r| r.get(0),
        )?;
        let mut stmt = conn.prepare(&format!(
          "SELECT {CONTACT_COLUMNS} FROM contacts
           WHERE campaign_id = ?1 AND (?2 IS NULL OR status = ?2)
           ORDER BY created_at, rowid
           LIMIT ?3 OFFSET ?4"
        ))?;
        let rows = stmt
          .query_map(
            params![campaign_str, status_str, limit_val, offset_val],
            RawContact::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok((rows, total))
      })
      .await?;

    Ok(Page {
      items: raws
        .into_iter()
        .map(RawContact::into_contact)
        .collect::<Result<_>>()?,
      total: total.max(0) as u64,
    })
  }

  async fn count_contacts(&self, campaign_id: Uuid, status: ContactStatus) -> Result<u32> {
    let campaign_str = encode_uuid(campaign_id);
    let status_str   = status.as_ref().to_owned();

    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM contacts WHERE campaign_id = ?1 AND status = ?2",
          params![campaign_str, status_str],
          |r| r.get(0),
        )?)
      })
      .await?;

    decode_count(count)
  }

  async fn dispatch_candidates(
    &self,
    campaign_id: Uuid,
    now: DateTime<Utc>,
    max_attempts: u32,
    limit: usize,
  ) -> Result<Vec<Contact>> {
    let campaign_str = encode_uuid(campaign_id);
    let now_str      = encode_dt(now);
    let max_val      = i64::from(max_attempts);
    let limit_val    = limit as i64;

    let raws: Vec<RawContact> = self
      .conn
      .call(move |conn| {
        // NULL sorts first, so queued contacts without a due time lead.
        let mut stmt = conn.prepare(&format!(
          "SELECT {CONTACT_COLUMNS} FROM contacts
           WHERE campaign_id = ?1
             AND attempt_count < ?3
             AND (status = 'pending'
                  OR (status = 'queued'
                      AND (next_attempt_at IS NULL OR next_attempt_at <= ?2)))
           ORDER BY CASE status WHEN 'pending' THEN 0 ELSE 1 END,
                    next_attempt_at, created_at, rowid
           LIMIT ?4"
        ))?;
        let rows = stmt
          .query_map(
            params![campaign_str, now_str, max_val, limit_val],
            RawContact::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawContact::into_contact).collect()
  }

  async fn stale_calling_contacts(&self, cutoff: DateTime<Utc>) -> Result<Vec<Contact>> {
    let cutoff_str = encode_dt(cutoff);

    let raws: Vec<RawContact> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CONTACT_COLUMNS} FROM contacts
           WHERE status = 'calling'
             AND (last_attempt_at IS NULL OR last_attempt_at < ?1)
           ORDER BY last_attempt_at, rowid"
        ))?;
        let rows = stmt
          .query_map(params![cutoff_str], RawContact::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawContact::into_contact).collect()
  }

  // ── Contacts: conditional transitions ─────────────────────────────────────

  async fn claim_contact(
    &self,
    contact_id: Uuid,
    expected: ContactStatus,
    now: DateTime<Utc>,
  ) -> Result<Option<Contact>> {
    let id_str       = encode_uuid(contact_id);
    let expected_str = expected.as_ref().to_owned();
    let now_str      = encode_dt(now);

    let raw: Option<RawContact> = self
      .conn
      .call(move |conn| {
        // The capacity check keeps overlapping ticks from exceeding the
        // campaign's concurrency cap.
        let changed = conn.execute(
          "UPDATE contacts AS c
           SET status = 'calling',
               attempt_count = attempt_count + 1,
               last_attempt_at = ?3
           WHERE c.contact_id = ?1
             AND c.status = ?2
             AND (SELECT COUNT(*) FROM contacts AS o
                  WHERE o.campaign_id = c.campaign_id AND o.status = 'calling')
               < (SELECT max_concurrent_calls FROM campaigns AS k
                  WHERE k.campaign_id = c.campaign_id)",
          params![id_str, expected_str, now_str],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(
          conn
            .query_row(
              &format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE contact_id = ?1"),
              params![id_str],
              RawContact::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawContact::into_contact).transpose()
  }

  async fn release_contact(&self, release: ReleaseContact) -> Result<bool> {
    let id_str     = encode_uuid(release.contact_id);
    let status_str = release.status.as_ref().to_owned();
    let count      = i64::from(release.attempt_count);
    let last_str   = release.last_attempt_at.map(encode_dt);

    let at_str     = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let changed = tx.execute(
          "UPDATE contacts
           SET status = ?2, attempt_count = ?3, last_attempt_at = ?4
           WHERE contact_id = ?1 AND status = 'calling'",
          params![id_str, status_str, count, last_str],
        )?;
        if changed == 1 {
          // A release may land the contact in `failed`.
          let campaign_str: String = tx.query_row(
            "SELECT campaign_id FROM contacts WHERE contact_id = ?1",
            params![id_str],
            |r| r.get(0),
          )?;
          tx.execute(REFRESH_COUNTERS, params![campaign_str, at_str])?;
        }
        tx.commit()?;
        Ok(changed)
      })
      .await?;

    Ok(changed == 1)
  }

  // ── Attempts ──────────────────────────────────────────────────────────────

  async fn record_attempt(&self, input: NewCallAttempt) -> Result<CallAttempt> {
    let attempt = CallAttempt {
      attempt_id:       Uuid::new_v4(),
      campaign_id:      input.campaign_id,
      contact_id:       input.contact_id,
      call_handle:      input.call_handle,
      attempt_number:   input.attempt_number,
      started_at:       input.started_at,
      ended_at:         None,
      duration_seconds: None,
      transcript:       None,
      summary:          None,
      recording_url:    None,
      ended_reason:     None,
      outcome:          None,
      message_sent:     false,
      trigger_fired:    None,
    };

    let id_str       = encode_uuid(attempt.attempt_id);
    let campaign_str = encode_uuid(attempt.campaign_id);
    let contact_str  = encode_uuid(attempt.contact_id);
    let handle       = attempt.call_handle.clone();
    let number       = i64::from(attempt.attempt_number);
    let started_str  = encode_dt(attempt.started_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO call_attempts (
             attempt_id, campaign_id, contact_id, call_handle, attempt_number,
             started_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          params![id_str, campaign_str, contact_str, handle, number, started_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(attempt)
  }

  async fn find_attempt_by_handle(&self, call_handle: &str) -> Result<Option<CallAttempt>> {
    let handle = call_handle.to_owned();

    let raw: Option<RawAttempt> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {ATTEMPT_COLUMNS} FROM call_attempts WHERE call_handle = ?1"),
              params![handle],
              RawAttempt::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAttempt::into_attempt).transpose()
  }

  async fn open_attempt_for_contact(&self, contact_id: Uuid) -> Result<Option<CallAttempt>> {
    let contact_str = encode_uuid(contact_id);

    let raw: Option<RawAttempt> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {ATTEMPT_COLUMNS} FROM call_attempts
                 WHERE contact_id = ?1 AND outcome IS NULL
                 ORDER BY started_at DESC, rowid DESC
                 LIMIT 1"
              ),
              params![contact_str],
              RawAttempt::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAttempt::into_attempt).transpose()
  }

  async fn list_attempts(
    &self,
    campaign_id: Uuid,
    query: AttemptQuery,
  ) -> Result<Page<CallAttempt>> {
    let campaign_str = encode_uuid(campaign_id);
    let contact_str  = query.contact_id.map(encode_uuid);
    let limit_val    = query.page.limit() as i64;
    let offset_val   = query.page.offset() as i64;

    let (raws, total): (Vec<RawAttempt>, i64) = self
      .conn
      .call(move |conn| {
        let total: i64 = conn.query_row(
          "SELECT COUNT(*) FROM call_attempts
           WHERE campaign_id = ?1 AND (?2 IS NULL OR contact_id = ?2)",
          params![campaign_str, contact_str],
          |r| r.get(0),
        )?;
        let mut stmt = conn.prepare(&format!(
          "SELECT {ATTEMPT_COLUMNS} FROM call_attempts
           WHERE campaign_id = ?1 AND (?2 IS NULL OR contact_id = ?2)
           ORDER BY started_at DESC, rowid DESC
           LIMIT ?3 OFFSET ?4"
        ))?;
        let rows = stmt
          .query_map(
            params![campaign_str, contact_str, limit_val, offset_val],
            RawAttempt::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok((rows, total))
      })
      .await?;

    Ok(Page {
      items: raws
        .into_iter()
        .map(RawAttempt::into_attempt)
        .collect::<Result<_>>()?,
      total: total.max(0) as u64,
    })
  }

  async fn settle_attempt(
    &self,
    attempt_id: Uuid,
    settle: SettleAttempt,
  ) -> Result<(CallAttempt, Contact)> {
    let handle       = settle.report.call_handle.clone();
    let attempt_str  = encode_uuid(attempt_id);
    let status_str   = settle.contact.status.as_ref().to_owned();
    let next_str     = settle.contact.next_attempt_at.map(encode_dt);
    let result_str   = settle.contact.call_result.as_ref().to_owned();
    let outcome_str  = settle.outcome.as_ref().to_owned();
    let ended_str    = settle.report.ended_at.map(encode_dt);
    let duration     = settle.duration_seconds;
    let transcript   = settle.report.transcript.clone();
    let summary      = settle.report.summary.clone();
    let recording    = settle.report.recording_url.clone();
    let reason       = settle.report.ended_reason.clone();
    let at_str       = encode_dt(Utc::now());

    let guarded: Guarded<String> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let row: Option<(String, String, Option<String>)> = tx
          .query_row(
            "SELECT contact_id, campaign_id, outcome FROM call_attempts
             WHERE attempt_id = ?1",
            params![attempt_str],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
          )
          .optional()?;
        let Some((contact_str, campaign_str, outcome)) = row else {
          return Ok(Err(Rejection::AttemptNotFound));
        };
        if outcome.is_some() {
          return Ok(Err(Rejection::AlreadySettled));
        }

        let moved = tx.execute(
          "UPDATE contacts
           SET status = ?2, next_attempt_at = ?3, call_result = ?4
           WHERE contact_id = ?1 AND status = 'calling'",
          params![contact_str, status_str, next_str, result_str],
        )?;
        if moved == 0 {
          let current: Option<String> = tx
            .query_row(
              "SELECT status FROM contacts WHERE contact_id = ?1",
              params![contact_str],
              |r| r.get(0),
            )
            .optional()?;
          return Ok(Err(match current {
            Some(s) => Rejection::ContactNotCalling(s),
            None => Rejection::ContactNotFound,
          }));
        }

        tx.execute(
          "UPDATE call_attempts
           SET ended_at = ?2, duration_seconds = ?3, transcript = ?4,
               summary = ?5, recording_url = ?6, ended_reason = ?7, outcome = ?8
           WHERE attempt_id = ?1 AND outcome IS NULL",
          params![
            attempt_str, ended_str, duration, transcript, summary, recording,
            reason, outcome_str,
          ],
        )?;
        tx.execute(REFRESH_COUNTERS, params![campaign_str, at_str])?;
        tx.commit()?;
        Ok(Ok(contact_str))
      })
      .await?;

    let contact_str = match guarded {
      Ok(id) => id,
      Err(Rejection::ContactNotCalling(s)) => {
        // Re-read so the error names the contact rather than the attempt.
        let attempt = self.get_attempt(attempt_id).await?;
        let id = attempt.map(|a| a.contact_id).unwrap_or(attempt_id);
        return Err(self.reject(Rejection::ContactNotCalling(s), id, &handle));
      }
      Err(r) => return Err(self.reject(r, attempt_id, &handle)),
    };

    let contact_id = decode_uuid(&contact_str)?;
    let attempt = self
      .get_attempt(attempt_id)
      .await?
      .ok_or_else(|| self.reject(Rejection::AttemptNotFound, attempt_id, &handle))?;
    let contact = self
      .get_contact(contact_id)
      .await?
      .ok_or_else(|| self.reject(Rejection::ContactNotFound, contact_id, &handle))?;

    Ok((attempt, contact))
  }

  // ── Trigger firing history ────────────────────────────────────────────────

  async fn fired_triggers(&self, contact_id: Uuid) -> Result<HashSet<Uuid>> {
    let contact_str = encode_uuid(contact_id);

    let ids: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt =
          conn.prepare("SELECT trigger_id FROM fired_triggers WHERE contact_id = ?1")?;
        let rows = stmt
          .query_map(params![contact_str], |r| r.get::<_, String>(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    ids.iter().map(|s| decode_uuid(s)).collect()
  }

  async fn reserve_trigger(
    &self,
    contact_id: Uuid,
    trigger_id: Uuid,
    attempt_id: Uuid,
  ) -> Result<bool> {
    let contact_str = encode_uuid(contact_id);
    let trigger_str = encode_uuid(trigger_id);
    let attempt_str = encode_uuid(attempt_id);
    let at_str      = encode_dt(Utc::now());

    let inserted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT OR IGNORE INTO fired_triggers (contact_id, trigger_id, attempt_id, fired_at)
           VALUES (?1, ?2, ?3, ?4)",
          params![contact_str, trigger_str, attempt_str, at_str],
        )?)
      })
      .await?;

    Ok(inserted == 1)
  }

  async fn release_trigger(&self, contact_id: Uuid, trigger_id: Uuid) -> Result<()> {
    let contact_str = encode_uuid(contact_id);
    let trigger_str = encode_uuid(trigger_id);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM fired_triggers WHERE contact_id = ?1 AND trigger_id = ?2",
          params![contact_str, trigger_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn mark_message_sent(&self, attempt_id: Uuid, trigger_id: Uuid) -> Result<()> {
    let attempt_str = encode_uuid(attempt_id);
    let trigger_str = encode_uuid(trigger_id);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE call_attempts SET message_sent = 1, trigger_fired = ?2
           WHERE attempt_id = ?1",
          params![attempt_str, trigger_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
