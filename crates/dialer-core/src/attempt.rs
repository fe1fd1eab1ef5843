//! Call attempts: the append-only log of placed calls and their outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

/// The internal result of a placed call.
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
pub enum CallOutcome {
  Answered,
  NoAnswer,
  Busy,
  Voicemail,
  Failed,
  Canceled,
}

impl CallOutcome {
  /// Map a provider's status and ended-reason codes onto an outcome.
  ///
  /// A non-empty transcript always wins: it is the authoritative signal that
  /// a conversation took place, whatever reason the provider reports.
  pub fn classify(
    status: Option<&str>,
    ended_reason: Option<&str>,
    transcript: Option<&str>,
  ) -> Self {
    if transcript.is_some_and(|t| !t.trim().is_empty()) {
      return Self::Answered;
    }

    let reason = ended_reason.unwrap_or_default().to_ascii_lowercase();
    let status = status.unwrap_or_default().to_ascii_lowercase();

    if reason.contains("voicemail") {
      Self::Voicemail
    } else if reason.contains("busy") || status == "busy" {
      Self::Busy
    } else if reason.contains("no-answer")
      || reason.contains("did-not-answer")
      || reason.contains("no_answer")
      || status == "no-answer"
    {
      Self::NoAnswer
    } else if reason.contains("cancel") || status.starts_with("cancel") {
      Self::Canceled
    } else if matches!(
      reason.as_str(),
      "customer-ended-call" | "assistant-ended-call" | "completed"
    ) {
      Self::Answered
    } else {
      Self::Failed
    }
  }
}

/// One placed call. Outcome fields are written exactly once, when the
/// provider callback (or the reconciliation sweep) settles the attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallAttempt {
  pub attempt_id:       Uuid,
  pub campaign_id:      Uuid,
  pub contact_id:       Uuid,
  /// Handle returned by the voice service; callbacks are keyed by it.
  pub call_handle:      String,
  pub attempt_number:   u32,
  pub started_at:       DateTime<Utc>,
  pub ended_at:         Option<DateTime<Utc>>,
  pub duration_seconds: Option<i64>,
  pub transcript:       Option<String>,
  pub summary:          Option<String>,
  pub recording_url:    Option<String>,
  pub ended_reason:     Option<String>,
  pub outcome:          Option<CallOutcome>,
  pub message_sent:     bool,
  pub trigger_fired:    Option<Uuid>,
}

/// Input to [`crate::store::CampaignStore::record_attempt`].
#[derive(Debug, Clone)]
pub struct NewCallAttempt {
  pub campaign_id:    Uuid,
  pub contact_id:     Uuid,
  pub call_handle:    String,
  pub attempt_number: u32,
  pub started_at:     DateTime<Utc>,
}

/// The provider's asynchronous report on a finished call, already decoded
/// from its wire format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallReport {
  pub call_handle:   String,
  pub status:        Option<String>,
  pub ended_reason:  Option<String>,
  pub transcript:    Option<String>,
  pub summary:       Option<String>,
  pub recording_url: Option<String>,
  pub started_at:    Option<DateTime<Utc>>,
  pub ended_at:      Option<DateTime<Utc>>,
}

impl CallReport {
  pub fn outcome(&self) -> CallOutcome {
    CallOutcome::classify(
      self.status.as_deref(),
      self.ended_reason.as_deref(),
      self.transcript.as_deref(),
    )
  }

  /// Whole seconds between start and end, when both are known.
  pub fn duration_seconds(&self) -> Option<i64> {
    match (self.started_at, self.ended_at) {
      (Some(start), Some(end)) if end >= start => {
        Some((end - start).num_seconds())
      }
      _ => None,
    }
  }

  /// Text handed to the trigger engine: transcript and summary joined, or
  /// `None` if both are empty.
  pub fn trigger_text(&self) -> Option<String> {
    let parts: Vec<&str> = [self.summary.as_deref(), self.transcript.as_deref()]
      .into_iter()
      .flatten()
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .collect();
    (!parts.is_empty()).then(|| parts.join("\n\n"))
  }
}
