//! Reconciliation sweep for calls whose outcome never arrived.

use chrono::{DateTime, Utc};
use dialer_core::{
  attempt::{CallOutcome, CallReport},
  contact::{Contact, ContactStatus},
  lifecycle::{self, SettleAttempt},
  store::{CampaignStore, ReleaseContact},
};

use crate::{Error, Orchestrator, Result, TickReport, providers::Providers};

/// `ended_reason` recorded on attempts closed by the sweep.
pub const CALLBACK_TIMEOUT: &str = "callback-timeout";

impl<S, P> Orchestrator<S, P>
where
  S: CampaignStore,
  P: Providers,
{
  /// Give every contact stuck in `calling` past the configured age a
  /// synthetic `failed` outcome. The usual retry rule then applies.
  pub(crate) async fn reconcile_stale_calls(
    &self,
    now: DateTime<Utc>,
    report: &mut TickReport,
  ) {
    let cutoff = now - self.config.scheduler.stale_call_age();
    let stale = match self.store.stale_calling_contacts(cutoff).await {
      Ok(stale) => stale,
      Err(e) => {
        let e = Error::from_store(e);
        tracing::error!(error = %e, "could not scan for stale calls");
        report.fail(None, None, &e);
        return;
      }
    };

    for contact in stale {
      match self.expire_call(&contact, now).await {
        Ok(()) => report.reconciled += 1,
        Err(e) => {
          tracing::warn!(
            campaign_id = %contact.campaign_id,
            contact_id = %contact.contact_id,
            error = %e,
            "could not expire stale call"
          );
          report.fail(Some(contact.campaign_id), Some(contact.contact_id), &e);
        }
      }
    }
  }

  async fn expire_call(&self, contact: &Contact, now: DateTime<Utc>) -> Result<()> {
    let campaign = self
      .store
      .get_campaign(contact.campaign_id)
      .await
      .map_err(Error::from_store)?
      .ok_or(dialer_core::Error::CampaignNotFound(contact.campaign_id))?;
    let transition =
      lifecycle::settle_attempt(&campaign, contact.attempt_count, CallOutcome::Failed, now);

    let open = self
      .store
      .open_attempt_for_contact(contact.contact_id)
      .await
      .map_err(Error::from_store)?;

    match open {
      Some(attempt) => {
        let report = CallReport {
          call_handle: attempt.call_handle.clone(),
          ended_reason: Some(CALLBACK_TIMEOUT.into()),
          ended_at: Some(now),
          ..Default::default()
        };
        self
          .store
          .settle_attempt(attempt.attempt_id, SettleAttempt {
            report,
            outcome: CallOutcome::Failed,
            duration_seconds: None,
            contact: transition,
          })
          .await
          .map_err(Error::from_store)?;
        tracing::info!(
          contact_id = %contact.contact_id,
          call_handle = %attempt.call_handle,
          "stale call expired"
        );
      }
      None => {
        // The call was claimed but its attempt never got recorded. The claim
        // still consumed an attempt.
        let status = match transition.status {
          ContactStatus::Queued => ContactStatus::Queued,
          _ => ContactStatus::Failed,
        };
        self
          .store
          .release_contact(ReleaseContact {
            contact_id:      contact.contact_id,
            status,
            attempt_count:   contact.attempt_count,
            last_attempt_at: contact.last_attempt_at,
          })
          .await
          .map_err(Error::from_store)?;
        tracing::info!(contact_id = %contact.contact_id, %status, "stale claim released");
      }
    }
    Ok(())
  }
}
