//! Outcome Ingestor.

use chrono::{DateTime, Utc};
use dialer_core::{
  attempt::{CallAttempt, CallReport},
  contact::{Contact, ContactStatus},
  lifecycle::{self, SettleAttempt},
  store::CampaignStore,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{Error, Orchestrator, Result, providers::Providers};

/// What settling one call report did.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReceipt {
  pub attempt:       CallAttempt,
  pub contact:       Contact,
  /// The trigger whose message went out, if one matched.
  pub trigger_fired: Option<Uuid>,
  /// Trigger evaluation failed after the outcome was stored.
  pub trigger_error: Option<String>,
}

impl<S, P> Orchestrator<S, P>
where
  S: CampaignStore,
  P: Providers,
{
  /// Settle the attempt identified by `report.call_handle` and run the
  /// trigger engine over its transcript and summary.
  ///
  /// The outcome is stored before triggers run, so a trigger failure is
  /// reported in the receipt instead of failing the ingest.
  pub async fn ingest_outcome(
    &self,
    report: CallReport,
    now: DateTime<Utc>,
  ) -> Result<IngestReceipt> {
    let handle = report.call_handle.clone();
    let attempt = self
      .store
      .find_attempt_by_handle(&handle)
      .await
      .map_err(Error::from_store)?
      .ok_or_else(|| dialer_core::Error::AttemptNotFound(handle.clone()))?;
    if attempt.outcome.is_some() {
      return Err(dialer_core::Error::OutcomeAlreadyRecorded(handle).into());
    }

    let campaign = self
      .store
      .get_campaign(attempt.campaign_id)
      .await
      .map_err(Error::from_store)?
      .ok_or(dialer_core::Error::CampaignNotFound(attempt.campaign_id))?;
    let contact = self
      .store
      .get_contact(attempt.contact_id)
      .await
      .map_err(Error::from_store)?
      .ok_or(dialer_core::Error::ContactNotFound(attempt.contact_id))?;
    if contact.status != ContactStatus::Calling {
      return Err(
        dialer_core::Error::ContactNotCalling {
          id:     contact.contact_id,
          status: contact.status,
        }
        .into(),
      );
    }

    let outcome = report.outcome();
    let transition = lifecycle::settle_attempt(&campaign, contact.attempt_count, outcome, now);
    let text = report.trigger_text();
    let (attempt, contact) = self
      .store
      .settle_attempt(attempt.attempt_id, SettleAttempt {
        duration_seconds: report.duration_seconds(),
        outcome,
        contact: transition,
        report,
      })
      .await
      .map_err(Error::from_store)?;

    tracing::info!(
      campaign_id = %campaign.campaign_id,
      contact_id = %contact.contact_id,
      call_handle = %handle,
      %outcome,
      status = %contact.status,
      "call outcome recorded"
    );

    let mut receipt = IngestReceipt {
      attempt,
      contact,
      trigger_fired: None,
      trigger_error: None,
    };
    if let Some(text) = text {
      match self
        .evaluate_triggers(&campaign, &receipt.contact, &receipt.attempt, &text)
        .await
      {
        Ok(fired) => receipt.trigger_fired = fired,
        Err(e) => {
          tracing::warn!(
            contact_id = %receipt.contact.contact_id,
            call_handle = %handle,
            error = %e,
            "trigger evaluation failed"
          );
          receipt.trigger_error = Some(e.to_string());
        }
      }
    }

    Ok(receipt)
  }
}
