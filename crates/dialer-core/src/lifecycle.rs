//! State-machine rules for campaigns and contacts.
//!
//! These are pure decisions. Storage backends apply them with conditional
//! writes so that two workers can never transition the same row at once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  attempt::{CallOutcome, CallReport},
  campaign::{Campaign, CampaignStatus},
  contact::ContactStatus,
};

// ─── Campaign lifecycle ──────────────────────────────────────────────────────

/// Whether a campaign may move directly from `from` to `to`.
///
/// `draft → scheduled → running ↔ paused → {completed, cancelled}`; any
/// non-terminal campaign may also be cancelled.
pub fn campaign_transition_allowed(
  from: CampaignStatus,
  to: CampaignStatus,
) -> bool {
  use CampaignStatus::*;
  match (from, to) {
    (Draft, Scheduled) | (Scheduled, Running) => true,
    (Running, Paused) | (Paused, Running) => true,
    (Running | Paused, Completed) => true,
    (from, Cancelled) => !from.is_terminal(),
    _ => false,
  }
}

pub fn check_campaign_transition(
  from: CampaignStatus,
  to: CampaignStatus,
) -> Result<()> {
  if campaign_transition_allowed(from, to) {
    Ok(())
  } else {
    Err(Error::InvalidTransition { from, to })
  }
}

/// Contacts may only be added or cleared while a campaign is a draft.
pub fn require_draft(campaign: &Campaign) -> Result<()> {
  if campaign.status == CampaignStatus::Draft {
    Ok(())
  } else {
    Err(Error::InvalidCampaignState {
      id:       campaign.campaign_id,
      status:   campaign.status,
      required: CampaignStatus::Draft,
    })
  }
}

// ─── Contact lifecycle ───────────────────────────────────────────────────────

/// The contact-side effect of settling one call attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactTransition {
  pub status:          ContactStatus,
  pub next_attempt_at: Option<DateTime<Utc>>,
  pub call_result:     CallOutcome,
}

/// Decide where a `calling` contact goes once its attempt settles.
///
/// `attempt_count` is the contact's count including the attempt being
/// settled. Answered calls complete the contact; anything else is retried
/// after the campaign's delay until `max_retries + 1` attempts have been
/// made, after which the contact fails for good.
pub fn settle_attempt(
  campaign: &Campaign,
  attempt_count: u32,
  outcome: CallOutcome,
  now: DateTime<Utc>,
) -> ContactTransition {
  if outcome == CallOutcome::Answered {
    return ContactTransition {
      status:          ContactStatus::Completed,
      next_attempt_at: None,
      call_result:     outcome,
    };
  }

  if attempt_count < campaign.max_attempts() {
    ContactTransition {
      status:          ContactStatus::Queued,
      next_attempt_at: Some(
        now
          .checked_add_signed(campaign.retry_delay())
          .unwrap_or(DateTime::<Utc>::MAX_UTC),
      ),
      call_result:     outcome,
    }
  } else {
    ContactTransition {
      status:          ContactStatus::Failed,
      next_attempt_at: None,
      call_result:     outcome,
    }
  }
}

/// Everything a store needs to settle an attempt atomically: the attempt's
/// recorded outcome plus the contact transition.
#[derive(Debug, Clone)]
pub struct SettleAttempt {
  pub report:           CallReport,
  pub outcome:          CallOutcome,
  pub duration_seconds: Option<i64>,
  pub contact:          ContactTransition,
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use uuid::Uuid;

  use super::*;
  use crate::campaign::CampaignCounters;

  fn campaign(max_retries: u32, retry_delay_hours: f64) -> Campaign {
    let now = Utc::now();
    Campaign {
      campaign_id: Uuid::new_v4(),
      tenant_id: Uuid::new_v4(),
      name: "test".into(),
      status: CampaignStatus::Running,
      max_concurrent_calls: 2,
      max_retries,
      retry_delay_hours,
      assistant_id: Some("asst".into()),
      phone_number_id: Some("pn".into()),
      sms_from_number: None,
      counters: CampaignCounters::default(),
      created_at: now,
      updated_at: now,
    }
  }

  #[test]
  fn lifecycle_allows_documented_edges_only() {
    use CampaignStatus::*;
    assert!(campaign_transition_allowed(Draft, Scheduled));
    assert!(campaign_transition_allowed(Scheduled, Running));
    assert!(campaign_transition_allowed(Running, Paused));
    assert!(campaign_transition_allowed(Paused, Running));
    assert!(campaign_transition_allowed(Paused, Completed));
    assert!(campaign_transition_allowed(Draft, Cancelled));

    assert!(!campaign_transition_allowed(Draft, Running));
    assert!(!campaign_transition_allowed(Completed, Running));
    assert!(!campaign_transition_allowed(Cancelled, Cancelled));
    assert!(matches!(
      check_campaign_transition(Scheduled, Paused),
      Err(Error::InvalidTransition { .. })
    ));
  }

  #[test]
  fn unanswered_call_is_requeued_while_budget_remains() {
    let now = Utc.with_ymd_and_hms(2026, 3, 4, 15, 0, 0).unwrap();
    let t = settle_attempt(&campaign(2, 4.0), 1, CallOutcome::NoAnswer, now);
    assert_eq!(t.status, ContactStatus::Queued);
    assert_eq!(t.next_attempt_at, Some(now + chrono::Duration::hours(4)));
  }

  #[test]
  fn last_attempt_fails_the_contact() {
    let now = Utc::now();
    let t = settle_attempt(&campaign(2, 4.0), 3, CallOutcome::Busy, now);
    assert_eq!(t.status, ContactStatus::Failed);
    assert_eq!(t.next_attempt_at, None);
    assert_eq!(t.call_result, CallOutcome::Busy);
  }

  #[test]
  fn answered_call_completes_regardless_of_budget() {
    let t = settle_attempt(&campaign(0, 1.0), 1, CallOutcome::Answered, Utc::now());
    assert_eq!(t.status, ContactStatus::Completed);
  }

  #[test]
  fn oversized_retry_delay_is_clamped_not_overflowed() {
    let now = Utc.with_ymd_and_hms(2026, 3, 4, 15, 0, 0).unwrap();
    let t = settle_attempt(&campaign(2, 1e10), 1, CallOutcome::NoAnswer, now);
    assert_eq!(t.status, ContactStatus::Queued);
    assert_eq!(t.next_attempt_at, Some(now + chrono::Duration::hours(8760)));

    let t = settle_attempt(&campaign(2, 4.0), 1, CallOutcome::NoAnswer, DateTime::<Utc>::MAX_UTC);
    assert_eq!(t.next_attempt_at, Some(DateTime::<Utc>::MAX_UTC));
  }

  #[test]
  fn fractional_retry_delay_is_honoured() {
    let now = Utc::now();
    let t = settle_attempt(&campaign(1, 0.5), 1, CallOutcome::Voicemail, now);
    assert_eq!(t.next_attempt_at, Some(now + chrono::Duration::minutes(30)));
  }
}
