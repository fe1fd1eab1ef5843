//! The `CampaignStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `dialer-store-sqlite`).
//! The engine and the API depend on this abstraction, not on any concrete
//! backend.
//!
//! Contact writes that move a contact between states are conditional on the
//! contact's current status. A method that loses such a race reports it
//! (`None`, `false`, or [`crate::Error::ContactNotCalling`]) instead of
//! overwriting the winner's state.

use std::{collections::HashSet, future::Future};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  attempt::{CallAttempt, NewCallAttempt},
  campaign::{Campaign, CampaignStatus, NewCampaign},
  contact::{Contact, ContactStatus, NewContact},
  lifecycle::SettleAttempt,
  schedule::{CallingSchedule, NewSchedule},
  trigger::{NewTrigger, Trigger},
};

// ─── Query types ─────────────────────────────────────────────────────────────

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const MAX_PAGE_SIZE: usize = 500;

/// Offset pagination shared by the contact and attempt listings.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PageRequest {
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

impl PageRequest {
  pub fn limit(&self) -> usize {
    self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
  }

  pub fn offset(&self) -> usize { self.offset.unwrap_or(0) }
}

/// One page of results plus the unpaginated total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
  pub items: Vec<T>,
  pub total: u64,
}

/// Parameters for [`CampaignStore::list_contacts`].
#[derive(Debug, Clone, Default)]
pub struct ContactQuery {
  pub status: Option<ContactStatus>,
  pub page:   PageRequest,
}

/// Parameters for [`CampaignStore::list_attempts`].
#[derive(Debug, Clone, Default)]
pub struct AttemptQuery {
  pub contact_id: Option<Uuid>,
  pub page:       PageRequest,
}

/// What [`CampaignStore::release_contact`] restores after a failed placement.
#[derive(Debug, Clone, Copy)]
pub struct ReleaseContact {
  pub contact_id:      Uuid,
  pub status:          ContactStatus,
  pub attempt_count:   u32,
  pub last_attempt_at: Option<DateTime<Utc>>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the contact ledger and the campaign configuration it
/// belongs to.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait CampaignStore: Send + Sync {
  type Error: std::error::Error
    + From<crate::Error>
    + AsCoreError
    + Send
    + Sync
    + 'static;

  // ── Campaigns ─────────────────────────────────────────────────────────

  fn create_campaign(
    &self,
    input: NewCampaign,
  ) -> impl Future<Output = Result<Campaign, Self::Error>> + Send + '_;

  fn get_campaign(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Campaign>, Self::Error>> + Send + '_;

  /// List campaigns, optionally filtered by status, oldest first.
  fn list_campaigns(
    &self,
    status: Option<CampaignStatus>,
  ) -> impl Future<Output = Result<Vec<Campaign>, Self::Error>> + Send + '_;

  /// Move a campaign to `to`, validated against the lifecycle rules and
  /// conditional on the status read at the start of the call.
  fn set_campaign_status(
    &self,
    id: Uuid,
    to: CampaignStatus,
  ) -> impl Future<Output = Result<Campaign, Self::Error>> + Send + '_;

  // ── Schedules and triggers ────────────────────────────────────────────

  /// Add a calling-schedule row. Rows with `start >= end` are rejected.
  fn add_schedule(
    &self,
    campaign_id: Uuid,
    input: NewSchedule,
  ) -> impl Future<Output = Result<CallingSchedule, Self::Error>> + Send + '_;

  /// Schedule rows for a campaign in insertion order.
  fn list_schedules(
    &self,
    campaign_id: Uuid,
  ) -> impl Future<Output = Result<Vec<CallingSchedule>, Self::Error>> + Send + '_;

  fn add_trigger(
    &self,
    campaign_id: Uuid,
    input: NewTrigger,
  ) -> impl Future<Output = Result<Trigger, Self::Error>> + Send + '_;

  /// Triggers ordered by ascending priority, ties by creation order.
  fn list_triggers(
    &self,
    campaign_id: Uuid,
    active_only: bool,
  ) -> impl Future<Output = Result<Vec<Trigger>, Self::Error>> + Send + '_;

  /// Activate or deactivate a trigger. Firing history is left untouched.
  fn set_trigger_active(
    &self,
    trigger_id: Uuid,
    active: bool,
  ) -> impl Future<Output = Result<Trigger, Self::Error>> + Send + '_;

  // ── Contacts: intake ──────────────────────────────────────────────────

  /// Normalized phone numbers already present in a campaign.
  fn existing_phone_numbers(
    &self,
    campaign_id: Uuid,
  ) -> impl Future<Output = Result<HashSet<String>, Self::Error>> + Send + '_;

  /// Insert contacts into a draft campaign and recompute its counters in the
  /// same transaction. Numbers already present are skipped; the returned
  /// vector holds only the rows actually inserted.
  fn insert_contacts(
    &self,
    campaign_id: Uuid,
    contacts: Vec<NewContact>,
  ) -> impl Future<Output = Result<Vec<Contact>, Self::Error>> + Send + '_;

  /// Delete every contact of a draft campaign; returns how many went.
  fn clear_contacts(
    &self,
    campaign_id: Uuid,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Contacts: reads ───────────────────────────────────────────────────

  fn get_contact(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Contact>, Self::Error>> + Send + '_;

  fn list_contacts(
    &self,
    campaign_id: Uuid,
    query: ContactQuery,
  ) -> impl Future<Output = Result<Page<Contact>, Self::Error>> + Send + '_;

  fn count_contacts(
    &self,
    campaign_id: Uuid,
    status: ContactStatus,
  ) -> impl Future<Output = Result<u32, Self::Error>> + Send + '_;

  /// Dispatch candidates in priority order: `pending` first, then `queued`
  /// contacts due at `now` (null `next_attempt_at` counts as due), oldest
  /// due first. Only contacts with `attempt_count < max_attempts` qualify.
  fn dispatch_candidates(
    &self,
    campaign_id: Uuid,
    now: DateTime<Utc>,
    max_attempts: u32,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Contact>, Self::Error>> + Send + '_;

  /// Contacts of any campaign stuck in `calling` since before `cutoff`.
  fn stale_calling_contacts(
    &self,
    cutoff: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<Contact>, Self::Error>> + Send + '_;

  // ── Contacts: conditional transitions ─────────────────────────────────

  /// Move a contact from `expected` to `calling`, bumping `attempt_count`
  /// and stamping `last_attempt_at`. Returns `None` if the contact was no
  /// longer in `expected` (another worker got there first).
  fn claim_contact(
    &self,
    contact_id: Uuid,
    expected: ContactStatus,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Contact>, Self::Error>> + Send + '_;

  /// Move a `calling` contact out of `calling` without settling an attempt:
  /// undoing a claim whose call could not be placed, or expiring a claim
  /// that never got an attempt recorded. Refreshes the campaign counters.
  /// Returns whether the write happened.
  fn release_contact(
    &self,
    release: ReleaseContact,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Attempts ──────────────────────────────────────────────────────────

  fn record_attempt(
    &self,
    input: NewCallAttempt,
  ) -> impl Future<Output = Result<CallAttempt, Self::Error>> + Send + '_;

  fn find_attempt_by_handle<'a>(
    &'a self,
    call_handle: &'a str,
  ) -> impl Future<Output = Result<Option<CallAttempt>, Self::Error>> + Send + 'a;

  /// The most recent attempt for a contact that has no outcome yet.
  fn open_attempt_for_contact(
    &self,
    contact_id: Uuid,
  ) -> impl Future<Output = Result<Option<CallAttempt>, Self::Error>> + Send + '_;

  fn list_attempts(
    &self,
    campaign_id: Uuid,
    query: AttemptQuery,
  ) -> impl Future<Output = Result<Page<CallAttempt>, Self::Error>> + Send + '_;

  /// Settle an attempt in one transaction: record its outcome, move the
  /// contact out of `calling`, and refresh the campaign counters.
  ///
  /// Fails with [`crate::Error::OutcomeAlreadyRecorded`] if the attempt was
  /// already settled and [`crate::Error::ContactNotCalling`] if the contact
  /// is not in `calling`.
  fn settle_attempt(
    &self,
    attempt_id: Uuid,
    settle: SettleAttempt,
  ) -> impl Future<Output = Result<(CallAttempt, Contact), Self::Error>> + Send + '_;

  // ── Trigger firing history ────────────────────────────────────────────

  /// IDs of triggers that have fired for a contact, active or not.
  fn fired_triggers(
    &self,
    contact_id: Uuid,
  ) -> impl Future<Output = Result<HashSet<Uuid>, Self::Error>> + Send + '_;

  /// Reserve the single firing of `trigger_id` for `contact_id`. Returns
  /// `false` if it was already reserved.
  fn reserve_trigger(
    &self,
    contact_id: Uuid,
    trigger_id: Uuid,
    attempt_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Drop a reservation whose message could not be sent.
  fn release_trigger(
    &self,
    contact_id: Uuid,
    trigger_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Flag the attempt as having sent the message for `trigger_id`.
  fn mark_message_sent(
    &self,
    attempt_id: Uuid,
    trigger_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

/// Lets callers inspect backend errors for the domain error they wrap.
pub trait AsCoreError: Sized {
  fn as_core(&self) -> Option<&crate::Error>;

  /// Unwrap the domain error, or hand `self` back if it is a backend fault.
  fn into_core(self) -> Result<crate::Error, Self>;
}
