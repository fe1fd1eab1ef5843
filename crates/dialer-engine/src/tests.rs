//! Orchestrator scenarios against an in-memory store and fake providers.

use std::{
  collections::VecDeque,
  sync::{
    Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
  },
};

use chrono::{DateTime, Duration, NaiveTime, Utc};
use dialer_core::{
  attempt::{CallOutcome, CallReport},
  campaign::{Campaign, CampaignStatus, NewCampaign},
  contact::{Contact, ContactStatus, NewContact},
  provider::{IntentClassifier, MessagingService, PlaceCall, VoiceService},
  schedule::NewSchedule,
  store::{AttemptQuery, CampaignStore, PageRequest},
  trigger::{NewTrigger, Trigger},
};
use dialer_intake::{FieldMapping, FieldTarget};
use dialer_store_sqlite::SqliteStore;
use uuid::Uuid;

use crate::{CALLBACK_TIMEOUT, EngineConfig, Orchestrator, ProviderSet};

// ─── Fakes ───────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct FakeError(String);

/// Time a stalled fake takes to answer, well past any test timeout.
const STALL: std::time::Duration = std::time::Duration::from_secs(30);

/// Hands out `call-N` handles; pops a queued failure first if there is one.
#[derive(Default)]
struct FakeVoice {
  placed:   Mutex<Vec<PlaceCall>>,
  failures: Mutex<VecDeque<String>>,
  stall:    AtomicBool,
}

impl VoiceService for FakeVoice {
  type Error = FakeError;

  async fn place_call(&self, request: PlaceCall) -> Result<String, FakeError> {
    if self.stall.swap(false, Ordering::SeqCst) {
      tokio::time::sleep(STALL).await;
    }
    if let Some(msg) = self.failures.lock().unwrap().pop_front() {
      return Err(FakeError(msg));
    }
    let mut placed = self.placed.lock().unwrap();
    placed.push(request);
    Ok(format!("call-{}", placed.len()))
  }
}

#[derive(Default)]
struct FakeMessaging {
  sent:  Mutex<Vec<(String, Option<String>, String)>>,
  fail:  AtomicBool,
  stall: AtomicBool,
}

impl MessagingService for FakeMessaging {
  type Error = FakeError;

  async fn send_message(
    &self,
    to: &str,
    from: Option<&str>,
    body: &str,
  ) -> Result<String, FakeError> {
    if self.stall.load(Ordering::SeqCst) {
      tokio::time::sleep(STALL).await;
    }
    if self.fail.load(Ordering::SeqCst) {
      return Err(FakeError("gateway down".into()));
    }
    let mut sent = self.sent.lock().unwrap();
    sent.push((to.to_owned(), from.map(str::to_owned), body.to_owned()));
    Ok(format!("SM{}", sent.len()))
  }
}

/// Matches when the text contains the intent description, ignoring case.
#[derive(Default)]
struct FakeClassifier {
  calls: AtomicUsize,
  fail:  AtomicBool,
}

impl IntentClassifier for FakeClassifier {
  type Error = FakeError;

  async fn matches(&self, text: &str, intent_description: &str) -> Result<bool, FakeError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if self.fail.load(Ordering::SeqCst) {
      return Err(FakeError("model unavailable".into()));
    }
    Ok(text.to_lowercase().contains(&intent_description.to_lowercase()))
  }
}

type TestEngine =
  Orchestrator<SqliteStore, ProviderSet<FakeVoice, FakeMessaging, FakeClassifier>>;

// ─── Helpers ─────────────────────────────────────────────────────────────────

async fn engine() -> TestEngine { engine_with(EngineConfig::default()).await }

async fn engine_with(config: EngineConfig) -> TestEngine {
  let store = SqliteStore::open_in_memory().await.expect("in-memory store");
  Orchestrator::new(
    std::sync::Arc::new(store),
    ProviderSet {
      voice:      FakeVoice::default(),
      messaging:  FakeMessaging::default(),
      classifier: FakeClassifier::default(),
    },
    config,
  )
}

/// Provider requests give up after one second.
fn short_timeouts() -> EngineConfig {
  let mut config = EngineConfig::default();
  config.scheduler.placement_timeout_secs = 1;
  config
}

fn at(s: &str) -> DateTime<Utc> { s.parse().unwrap() }

/// Wednesday 2026-03-04, 15:00 UTC.
fn now() -> DateTime<Utc> { at("2026-03-04T15:00:00Z") }

async fn campaign(
  e: &TestEngine,
  max_concurrent_calls: u32,
  max_retries: u32,
  retry_delay_hours: f64,
) -> Campaign {
  let mut input = NewCampaign::new(Uuid::new_v4(), "renewals");
  input.max_concurrent_calls = max_concurrent_calls;
  input.max_retries = max_retries;
  input.retry_delay_hours = retry_delay_hours;
  input.assistant_id = Some("asst_1".into());
  input.phone_number_id = Some("pn_1".into());
  input.sms_from_number = Some("+14155550100".into());
  e.store().create_campaign(input).await.unwrap()
}

/// Insert contacts with no timezone, so no calling window applies.
async fn seed(e: &TestEngine, c: &Campaign, phones: &[&str]) -> Vec<Contact> {
  let batch = phones
    .iter()
    .map(|p| NewContact {
      phone_number: (*p).to_owned(),
      first_name: Some("Ada".into()),
      ..Default::default()
    })
    .collect();
  e.store().insert_contacts(c.campaign_id, batch).await.unwrap()
}

async fn start(e: &TestEngine, id: Uuid) {
  e.advance_campaign(id, CampaignStatus::Scheduled).await.unwrap();
  e.advance_campaign(id, CampaignStatus::Running).await.unwrap();
}

async fn contact(e: &TestEngine, id: Uuid) -> Contact {
  e.store().get_contact(id).await.unwrap().unwrap()
}

async fn trigger(e: &TestEngine, c: &Campaign, intent: &str, priority: i32) -> Trigger {
  e.store()
    .add_trigger(c.campaign_id, NewTrigger {
      intent_description: intent.into(),
      message_template:   format!("Hi {{{{first_name}}}}, about the {intent}."),
      priority,
      is_active:          true,
    })
    .await
    .unwrap()
}

fn no_answer(handle: &str) -> CallReport {
  CallReport {
    call_handle: handle.into(),
    ended_reason: Some("no-answer".into()),
    ..Default::default()
  }
}

fn conversation(handle: &str, transcript: &str) -> CallReport {
  CallReport {
    call_handle: handle.into(),
    ended_reason: Some("customer-ended-call".into()),
    transcript: Some(transcript.into()),
    started_at: Some(now()),
    ended_at: Some(now() + Duration::seconds(75)),
    ..Default::default()
  }
}

// ─── Dispatch ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn first_tick_fills_only_free_slots() {
  let e = engine().await;
  let c = campaign(&e, 2, 2, 1.0).await;
  seed(&e, &c, &[
    "+18005550101",
    "+18005550102",
    "+18005550103",
    "+18005550104",
    "+18005550105",
  ])
  .await;
  start(&e, c.campaign_id).await;

  let report = e.tick(now()).await;
  assert!(report.is_clean(), "{:?}", report.failures);
  assert_eq!(report.calls_placed, 2);

  let s = e.store();
  assert_eq!(s.count_contacts(c.campaign_id, ContactStatus::Calling).await.unwrap(), 2);
  assert_eq!(s.count_contacts(c.campaign_id, ContactStatus::Pending).await.unwrap(), 3);

  let placed = e.providers.voice.placed.lock().unwrap().clone();
  assert_eq!(placed.len(), 2);
  assert_eq!(placed[0].destination_number, "+18005550101");
  assert_eq!(placed[0].assistant_id, "asst_1");
  assert_eq!(placed[0].variables.get("first_name").map(String::as_str), Some("Ada"));

  let attempts = s
    .list_attempts(c.campaign_id, AttemptQuery::default())
    .await
    .unwrap();
  assert_eq!(attempts.total, 2);
  assert!(attempts.items.iter().all(|a| a.attempt_number == 1));

  // Nothing frees up until outcomes arrive.
  let again = e.tick(now() + Duration::minutes(1)).await;
  assert_eq!(again.calls_placed, 0);
}

#[tokio::test]
async fn contact_outside_calling_window_is_left_pending() {
  let e = engine().await;
  let c = campaign(&e, 1, 2, 1.0).await;
  let mut mapping = FieldMapping::default();
  mapping
    .insert("phone", FieldTarget::PhoneNumber)
    .insert("name", FieldTarget::FirstName);
  let intake = e
    .upload_contacts(c.campaign_id, b"phone,name\n(212) 555-0134,Ada\n", &mapping)
    .await
    .unwrap();
  assert_eq!(intake.valid_contacts, 1);

  // Wednesday 09:00-17:00 in the contact's own zone.
  e.store()
    .add_schedule(c.campaign_id, NewSchedule {
      day_of_week: 3,
      start_time:  NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
      end_time:    NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
      is_active:   true,
    })
    .await
    .unwrap();
  start(&e, c.campaign_id).await;

  // 01:00 UTC Thursday is 20:00 Wednesday in New York.
  let evening = e.tick(at("2026-03-05T01:00:00Z")).await;
  assert_eq!(evening.calls_placed, 0);
  assert_eq!(evening.skipped_ineligible, 1);

  let page = e
    .store()
    .list_contacts(c.campaign_id, Default::default())
    .await
    .unwrap();
  let stored = &page.items[0];
  assert_eq!(stored.timezone.as_deref(), Some("America/New_York"));
  assert_eq!(stored.status, ContactStatus::Pending);
  assert_eq!(stored.attempt_count, 0);

  // 15:00 UTC is 10:00 in New York.
  let morning = e.tick(now()).await;
  assert_eq!(morning.calls_placed, 1);
}

/// Two out-of-window contacts queued ahead of one with no calling window.
async fn window_blocked_head(e: &TestEngine) -> (Campaign, Vec<Contact>) {
  let c = campaign(e, 1, 2, 1.0).await;
  e.store()
    .add_schedule(c.campaign_id, NewSchedule {
      day_of_week: 3,
      start_time:  NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
      end_time:    NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
      is_active:   true,
    })
    .await
    .unwrap();
  let row = |phone: &str, timezone: Option<&str>| NewContact {
    phone_number: phone.to_owned(),
    timezone: timezone.map(str::to_owned),
    ..Default::default()
  };
  let seeded = e
    .store()
    .insert_contacts(c.campaign_id, vec![
      row("+18005550101", Some("Asia/Tokyo")),
      row("+18005550102", Some("Asia/Tokyo")),
      row("+18005550103", None),
    ])
    .await
    .unwrap();
  start(e, c.campaign_id).await;
  (c, seeded)
}

#[tokio::test]
async fn window_filter_runs_before_slot_cap() {
  let e = engine().await;
  let (_, seeded) = window_blocked_head(&e).await;

  // Midnight Thursday in Tokyo, Wednesday afternoon with no zone.
  let report = e.tick(now()).await;
  assert_eq!(report.calls_placed, 1);
  assert_eq!(report.skipped_ineligible, 2);
  assert_eq!(contact(&e, seeded[2].contact_id).await.status, ContactStatus::Calling);
  assert_eq!(contact(&e, seeded[0].contact_id).await.status, ContactStatus::Pending);
}

#[tokio::test]
async fn scan_stops_at_scan_factor() {
  let mut config = EngineConfig::default();
  config.scheduler.candidate_scan_factor = 2;
  let e = engine_with(config).await;
  let (_, seeded) = window_blocked_head(&e).await;

  let report = e.tick(now()).await;
  assert_eq!(report.calls_placed, 0);
  assert_eq!(report.skipped_ineligible, 2);
  assert_eq!(contact(&e, seeded[2].contact_id).await.status, ContactStatus::Pending);
}

#[tokio::test]
async fn placement_failure_restores_contact() {
  let e = engine().await;
  let c = campaign(&e, 1, 2, 1.0).await;
  let seeded = seed(&e, &c, &["+18005550101"]).await;
  start(&e, c.campaign_id).await;
  e.providers
    .voice
    .failures
    .lock()
    .unwrap()
    .push_back("number blocked".into());

  let report = e.tick(now()).await;
  assert_eq!(report.calls_placed, 0);
  assert_eq!(report.failures.len(), 1);
  assert_eq!(report.failures[0].contact_id, Some(seeded[0].contact_id));
  assert!(report.failures[0].error.contains("number blocked"));

  let after = contact(&e, seeded[0].contact_id).await;
  assert_eq!(after.status, ContactStatus::Pending);
  assert_eq!(after.attempt_count, 0);
  assert!(after.last_attempt_at.is_none());

  let retry = e.tick(now() + Duration::minutes(1)).await;
  assert_eq!(retry.calls_placed, 1);
}

#[tokio::test]
async fn placement_timeout_restores_contact() {
  let e = engine_with(short_timeouts()).await;
  let c = campaign(&e, 1, 2, 1.0).await;
  let seeded = seed(&e, &c, &["+18005550101"]).await;
  start(&e, c.campaign_id).await;
  e.providers.voice.stall.store(true, Ordering::SeqCst);

  let report = e.tick(now()).await;
  assert_eq!(report.calls_placed, 0);
  assert_eq!(report.failures.len(), 1);
  assert_eq!(report.failures[0].contact_id, Some(seeded[0].contact_id));
  assert!(report.failures[0].error.contains("timed out"), "{}", report.failures[0].error);

  let after = contact(&e, seeded[0].contact_id).await;
  assert_eq!(after.status, ContactStatus::Pending);
  assert_eq!(after.attempt_count, 0);
  let attempts = e
    .store()
    .list_attempts(c.campaign_id, AttemptQuery::default())
    .await
    .unwrap();
  assert_eq!(attempts.total, 0);

  assert_eq!(e.tick(now() + Duration::minutes(1)).await.calls_placed, 1);
}

#[tokio::test]
async fn unconfigured_campaign_does_not_block_others() {
  let e = engine().await;
  let mut input = NewCampaign::new(Uuid::new_v4(), "no assistant");
  input.phone_number_id = Some("pn_1".into());
  let broken = e.store().create_campaign(input).await.unwrap();
  seed(&e, &broken, &["+18005550101"]).await;
  start(&e, broken.campaign_id).await;

  let good = campaign(&e, 1, 0, 1.0).await;
  seed(&e, &good, &["+18005550102"]).await;
  start(&e, good.campaign_id).await;

  let report = e.tick(now()).await;
  assert_eq!(report.campaigns_processed, 2);
  assert_eq!(report.calls_placed, 1);
  assert_eq!(report.failures.len(), 1);
  assert_eq!(report.failures[0].campaign_id, Some(broken.campaign_id));
}

#[tokio::test]
async fn paused_campaign_is_not_dispatched() {
  let e = engine().await;
  let c = campaign(&e, 3, 0, 1.0).await;
  seed(&e, &c, &["+18005550101", "+18005550102"]).await;
  start(&e, c.campaign_id).await;
  e.advance_campaign(c.campaign_id, CampaignStatus::Paused)
    .await
    .unwrap();

  let report = e.tick(now()).await;
  assert_eq!(report.campaigns_processed, 0);
  assert_eq!(report.calls_placed, 0);
}

// ─── Outcomes ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn unanswered_call_is_queued_for_retry() {
  let e = engine().await;
  let c = campaign(&e, 1, 2, 1.0).await;
  let seeded = seed(&e, &c, &["+18005550101"]).await;
  start(&e, c.campaign_id).await;
  e.tick(now()).await;

  let receipt = e.ingest_outcome(no_answer("call-1"), now()).await.unwrap();
  assert_eq!(receipt.attempt.outcome, Some(CallOutcome::NoAnswer));
  assert_eq!(receipt.contact.status, ContactStatus::Queued);
  assert_eq!(receipt.contact.attempt_count, 1);
  assert_eq!(receipt.contact.next_attempt_at, Some(now() + Duration::hours(1)));
  assert_eq!(receipt.trigger_fired, None);

  // Not due yet, then due.
  assert_eq!(e.tick(now() + Duration::minutes(30)).await.calls_placed, 0);
  assert_eq!(e.tick(now() + Duration::hours(1)).await.calls_placed, 1);
  let second = contact(&e, seeded[0].contact_id).await;
  assert_eq!(second.status, ContactStatus::Calling);
  assert_eq!(second.attempt_count, 2);

  let campaign = e.store().get_campaign(c.campaign_id).await.unwrap().unwrap();
  assert_eq!(campaign.counters.contacts_called, 0);
}

#[tokio::test]
async fn last_attempt_fails_contact_for_good() {
  let e = engine().await;
  let c = campaign(&e, 1, 0, 0.0).await;
  let seeded = seed(&e, &c, &["+18005550101"]).await;
  start(&e, c.campaign_id).await;
  e.tick(now()).await;

  let receipt = e.ingest_outcome(no_answer("call-1"), now()).await.unwrap();
  assert_eq!(receipt.contact.status, ContactStatus::Failed);
  assert_eq!(receipt.contact.next_attempt_at, None);

  assert_eq!(e.tick(now() + Duration::days(1)).await.calls_placed, 0);
  let after = contact(&e, seeded[0].contact_id).await;
  assert_eq!(after.status, ContactStatus::Failed);
  assert_eq!(after.attempt_count, 1);

  let campaign = e.store().get_campaign(c.campaign_id).await.unwrap().unwrap();
  assert_eq!(campaign.counters.contacts_called, 1);
  assert_eq!(campaign.counters.contacts_failed, 1);
}

#[tokio::test]
async fn answered_call_completes_contact() {
  let e = engine().await;
  let c = campaign(&e, 1, 2, 1.0).await;
  seed(&e, &c, &["+18005550101"]).await;
  start(&e, c.campaign_id).await;
  e.tick(now()).await;

  let receipt = e
    .ingest_outcome(conversation("call-1", "AI: Hello\nUser: Hi"), now())
    .await
    .unwrap();
  assert_eq!(receipt.contact.status, ContactStatus::Completed);
  assert_eq!(receipt.attempt.duration_seconds, Some(75));

  let campaign = e.store().get_campaign(c.campaign_id).await.unwrap().unwrap();
  assert_eq!(campaign.counters.contacts_answered, 1);
  assert_eq!(campaign.counters.contacts_called, 1);
}

#[tokio::test]
async fn duplicate_and_unknown_callbacks_are_rejected() {
  let e = engine().await;
  let c = campaign(&e, 1, 2, 1.0).await;
  seed(&e, &c, &["+18005550101"]).await;
  start(&e, c.campaign_id).await;
  e.tick(now()).await;

  e.ingest_outcome(no_answer("call-1"), now()).await.unwrap();
  let dup = e.ingest_outcome(no_answer("call-1"), now()).await.unwrap_err();
  assert!(matches!(
    dup.core(),
    Some(dialer_core::Error::OutcomeAlreadyRecorded(_))
  ));

  let unknown = e.ingest_outcome(no_answer("call-404"), now()).await.unwrap_err();
  assert!(matches!(
    unknown.core(),
    Some(dialer_core::Error::AttemptNotFound(_))
  ));
}

// ─── Triggers ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn only_highest_priority_match_is_sent() {
  let e = engine().await;
  let c = campaign(&e, 1, 2, 1.0).await;
  seed(&e, &c, &["+18005550101"]).await;
  let callback = trigger(&e, &c, "callback", 2).await;
  let brochure = trigger(&e, &c, "brochure", 1).await;
  start(&e, c.campaign_id).await;
  e.tick(now()).await;

  let receipt = e
    .ingest_outcome(
      conversation("call-1", "User: send me the brochure, and a callback next week"),
      now(),
    )
    .await
    .unwrap();
  assert_eq!(receipt.trigger_fired, Some(brochure.trigger_id));
  assert_ne!(receipt.trigger_fired, Some(callback.trigger_id));

  let sent = e.providers.messaging.sent.lock().unwrap().clone();
  assert_eq!(sent.len(), 1);
  assert_eq!(sent[0].0, "+18005550101");
  assert_eq!(sent[0].1.as_deref(), Some("+14155550100"));
  assert_eq!(sent[0].2, "Hi Ada, about the brochure. Reply STOP to opt out.");

  let attempt = e.store().find_attempt_by_handle("call-1").await.unwrap().unwrap();
  assert!(attempt.message_sent);
  assert_eq!(attempt.trigger_fired, Some(brochure.trigger_id));
}

#[tokio::test]
async fn fired_trigger_never_sends_twice() {
  let e = engine().await;
  let c = campaign(&e, 1, 2, 1.0).await;
  seed(&e, &c, &["+18005550101"]).await;
  let brochure = trigger(&e, &c, "brochure", 1).await;
  start(&e, c.campaign_id).await;
  e.tick(now()).await;

  let text = "User: the brochure please";
  let receipt = e
    .ingest_outcome(conversation("call-1", text), now())
    .await
    .unwrap();
  assert_eq!(receipt.trigger_fired, Some(brochure.trigger_id));

  let again = e
    .evaluate_triggers(
      &e.store().get_campaign(c.campaign_id).await.unwrap().unwrap(),
      &receipt.contact,
      &receipt.attempt,
      text,
    )
    .await
    .unwrap();
  assert_eq!(again, None);

  // Deactivating and reactivating does not clear the history.
  e.store().set_trigger_active(brochure.trigger_id, false).await.unwrap();
  e.store().set_trigger_active(brochure.trigger_id, true).await.unwrap();
  let after_toggle = e
    .evaluate_triggers(
      &e.store().get_campaign(c.campaign_id).await.unwrap().unwrap(),
      &receipt.contact,
      &receipt.attempt,
      text,
    )
    .await
    .unwrap();
  assert_eq!(after_toggle, None);
  assert_eq!(e.providers.messaging.sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn inactive_trigger_is_not_evaluated() {
  let e = engine().await;
  let c = campaign(&e, 1, 2, 1.0).await;
  seed(&e, &c, &["+18005550101"]).await;
  let brochure = trigger(&e, &c, "brochure", 1).await;
  e.store().set_trigger_active(brochure.trigger_id, false).await.unwrap();
  start(&e, c.campaign_id).await;
  e.tick(now()).await;

  let receipt = e
    .ingest_outcome(conversation("call-1", "User: brochure"), now())
    .await
    .unwrap();
  assert_eq!(receipt.trigger_fired, None);
  assert_eq!(e.providers.classifier.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failed_send_releases_reservation() {
  let e = engine().await;
  let c = campaign(&e, 1, 2, 1.0).await;
  let seeded = seed(&e, &c, &["+18005550101"]).await;
  trigger(&e, &c, "brochure", 1).await;
  start(&e, c.campaign_id).await;
  e.tick(now()).await;
  e.providers.messaging.fail.store(true, Ordering::SeqCst);

  let receipt = e
    .ingest_outcome(conversation("call-1", "User: brochure"), now())
    .await
    .unwrap();
  assert_eq!(receipt.contact.status, ContactStatus::Completed);
  assert_eq!(receipt.trigger_fired, None);
  assert!(receipt.trigger_error.is_some());

  let fired = e.store().fired_triggers(seeded[0].contact_id).await.unwrap();
  assert!(fired.is_empty());
  let attempt = e.store().find_attempt_by_handle("call-1").await.unwrap().unwrap();
  assert!(!attempt.message_sent);
}

#[tokio::test]
async fn send_timeout_releases_reservation() {
  let e = engine_with(short_timeouts()).await;
  let c = campaign(&e, 1, 2, 1.0).await;
  let seeded = seed(&e, &c, &["+18005550101"]).await;
  trigger(&e, &c, "brochure", 1).await;
  start(&e, c.campaign_id).await;
  e.tick(now()).await;
  e.providers.messaging.stall.store(true, Ordering::SeqCst);

  let receipt = e
    .ingest_outcome(conversation("call-1", "User: brochure"), now())
    .await
    .unwrap();
  assert_eq!(receipt.contact.status, ContactStatus::Completed);
  assert_eq!(receipt.trigger_fired, None);
  assert!(receipt.trigger_error.as_deref().is_some_and(|e| e.contains("timed out")));

  let fired = e.store().fired_triggers(seeded[0].contact_id).await.unwrap();
  assert!(fired.is_empty());
  assert!(e.providers.messaging.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn classifier_error_does_not_fall_through() {
  let e = engine().await;
  let c = campaign(&e, 1, 2, 1.0).await;
  seed(&e, &c, &["+18005550101"]).await;
  trigger(&e, &c, "brochure", 1).await;
  trigger(&e, &c, "callback", 2).await;
  start(&e, c.campaign_id).await;
  e.tick(now()).await;
  e.providers.classifier.fail.store(true, Ordering::SeqCst);

  let receipt = e
    .ingest_outcome(conversation("call-1", "User: callback"), now())
    .await
    .unwrap();
  assert!(receipt.trigger_error.is_some());
  assert_eq!(e.providers.classifier.calls.load(Ordering::SeqCst), 1);
  assert!(e.providers.messaging.sent.lock().unwrap().is_empty());
}

// ─── Reconciliation ──────────────────────────────────────────────────────────

#[tokio::test]
async fn stale_call_is_expired_and_redialed() {
  let e = engine().await;
  let c = campaign(&e, 1, 2, 0.0).await;
  let seeded = seed(&e, &c, &["+18005550101"]).await;
  start(&e, c.campaign_id).await;
  e.tick(now()).await;

  // Well inside the window: nothing to reconcile.
  assert_eq!(e.tick(now() + Duration::minutes(30)).await.reconciled, 0);

  let later = e.tick(now() + Duration::minutes(61)).await;
  assert_eq!(later.reconciled, 1);
  assert_eq!(later.calls_placed, 1);

  let expired = e.store().find_attempt_by_handle("call-1").await.unwrap().unwrap();
  assert_eq!(expired.outcome, Some(CallOutcome::Failed));
  assert_eq!(expired.ended_reason.as_deref(), Some(CALLBACK_TIMEOUT));

  let redialed = contact(&e, seeded[0].contact_id).await;
  assert_eq!(redialed.status, ContactStatus::Calling);
  assert_eq!(redialed.attempt_count, 2);

  // The late callback for the expired attempt is refused.
  let late = e.ingest_outcome(no_answer("call-1"), now()).await.unwrap_err();
  assert!(matches!(
    late.core(),
    Some(dialer_core::Error::OutcomeAlreadyRecorded(_))
  ));
}

// ─── Intake ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn upload_reports_invalid_rows_and_duplicates() {
  let e = engine().await;
  let c = campaign(&e, 1, 2, 1.0).await;
  seed(&e, &c, &["+13035550100"]).await;

  let mut mapping = FieldMapping::default();
  mapping
    .insert("Phone", FieldTarget::PhoneNumber)
    .insert("First", FieldTarget::FirstName)
    .insert("Plan", FieldTarget::Custom);
  let csv = b"Phone,First,Plan\n\
    (303) 555-0100,Ada,gold\n\
    415-555-0101,Grace,silver\n\
    +1 415 555 0101,Grace,silver\n\
    555-0102,Alan,bronze\n\
    415-555-0103,,gold\n";

  let report = e.upload_contacts(c.campaign_id, csv, &mapping).await.unwrap();
  assert_eq!(report.valid_contacts, 1);
  assert_eq!(report.duplicates, 2);
  assert_eq!(report.invalid_contacts, 2);
  assert_eq!(report.invalid_rows[0].row, 4);

  let campaign = e.store().get_campaign(c.campaign_id).await.unwrap().unwrap();
  assert_eq!(campaign.counters.total_contacts, 2);

  let page = e
    .store()
    .list_contacts(c.campaign_id, dialer_core::store::ContactQuery {
      status: None,
      page:   PageRequest::default(),
    })
    .await
    .unwrap();
  let grace = page
    .items
    .iter()
    .find(|c| c.phone_number == "+14155550101")
    .unwrap();
  assert_eq!(grace.custom_fields.get("Plan").map(String::as_str), Some("silver"));
  assert_eq!(grace.timezone.as_deref(), Some("America/Los_Angeles"));
}

#[tokio::test]
async fn upload_requires_draft_campaign() {
  let e = engine().await;
  let c = campaign(&e, 1, 2, 1.0).await;
  start(&e, c.campaign_id).await;

  let mut mapping = FieldMapping::default();
  mapping.insert("Phone", FieldTarget::PhoneNumber);
  let err = e
    .upload_contacts(c.campaign_id, b"Phone\n2125550134\n", &mapping)
    .await
    .unwrap_err();
  assert!(matches!(
    err.core(),
    Some(dialer_core::Error::InvalidCampaignState { .. })
  ));

  let err = e.clear_contacts(c.campaign_id).await.unwrap_err();
  assert!(matches!(
    err.core(),
    Some(dialer_core::Error::InvalidCampaignState { .. })
  ));
}
