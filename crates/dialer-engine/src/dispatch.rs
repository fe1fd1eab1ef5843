//! Dispatch Scheduler and Call Initiator.

use chrono::{DateTime, Utc};
use dialer_core::{
  attempt::{CallAttempt, NewCallAttempt},
  campaign::Campaign,
  contact::{Contact, ContactStatus},
  provider::{PlaceCall, VoiceService as _},
  schedule::is_eligible_now,
  store::{CampaignStore, ReleaseContact},
};

use crate::{Error, Orchestrator, Result, TickReport, providers::Providers};

impl<S, P> Orchestrator<S, P>
where
  S: CampaignStore,
  P: Providers,
{
  /// Fill a running campaign's free call slots.
  ///
  /// Slots are counted once, up front. Up to `slots × candidate_scan_factor`
  /// candidates are fetched in priority order, filtered by calling window,
  /// and only then cut to `slots`. Capping at `slots` before the filter
  /// would let out-of-window contacts at the head of the queue starve
  /// in-window ones behind them. Past the scan, a campaign whose first
  /// candidates are all out of window places nothing this tick.
  pub(crate) async fn dispatch_campaign(
    &self,
    campaign: &Campaign,
    now: DateTime<Utc>,
    report: &mut TickReport,
  ) -> Result<()> {
    let campaign_id = campaign.campaign_id;
    let Some((assistant_id, phone_number_id)) = campaign.voice_identifiers() else {
      let e = dialer_core::Error::ProviderPlacement(
        "campaign has no voice assistant or phone number configured".into(),
      );
      tracing::warn!(%campaign_id, "skipping campaign without voice identifiers");
      report.fail(Some(campaign_id), None, &e);
      return Ok(());
    };

    let active = self
      .store
      .count_contacts(campaign_id, ContactStatus::Calling)
      .await
      .map_err(Error::from_store)?;
    let slots = campaign.max_concurrent_calls.saturating_sub(active) as usize;
    if slots == 0 {
      tracing::debug!(%campaign_id, active, "no free call slots");
      return Ok(());
    }

    let schedules = self
      .store
      .list_schedules(campaign_id)
      .await
      .map_err(Error::from_store)?;
    let scan = slots.saturating_mul(self.config.scheduler.candidate_scan_factor.max(1));
    let candidates = self
      .store
      .dispatch_candidates(campaign_id, now, campaign.max_attempts(), scan)
      .await
      .map_err(Error::from_store)?;

    let mut eligible = Vec::with_capacity(slots);
    for contact in candidates {
      if eligible.len() == slots {
        break;
      }
      if is_eligible_now(contact.timezone.as_deref(), &schedules, now) {
        eligible.push(contact);
      } else {
        report.skipped_ineligible += 1;
        tracing::debug!(
          %campaign_id,
          contact_id = %contact.contact_id,
          timezone = contact.timezone.as_deref().unwrap_or_default(),
          "outside calling window"
        );
      }
    }

    for contact in eligible {
      let contact_id = contact.contact_id;
      match self
        .initiate_call(campaign, assistant_id, phone_number_id, contact, now)
        .await
      {
        Ok(Some(_)) => report.calls_placed += 1,
        Ok(None) => {
          tracing::debug!(%campaign_id, %contact_id, "contact claimed elsewhere");
        }
        Err(e) => {
          tracing::warn!(%campaign_id, %contact_id, error = %e, "call placement failed");
          report.fail(Some(campaign_id), Some(contact_id), &e);
        }
      }
    }

    Ok(())
  }

  /// Claim `contact`, place its call, and record the attempt.
  ///
  /// Returns `Ok(None)` if the claim was lost to another worker or the
  /// campaign hit its concurrency cap meanwhile. A placement failure puts
  /// the contact back exactly as it was, so the attempt does not count
  /// against its retry budget.
  async fn initiate_call(
    &self,
    campaign: &Campaign,
    assistant_id: &str,
    phone_number_id: &str,
    contact: Contact,
    now: DateTime<Utc>,
  ) -> Result<Option<CallAttempt>> {
    let prior = ReleaseContact {
      contact_id:      contact.contact_id,
      status:          contact.status,
      attempt_count:   contact.attempt_count,
      last_attempt_at: contact.last_attempt_at,
    };

    let Some(claimed) = self
      .store
      .claim_contact(contact.contact_id, contact.status, now)
      .await
      .map_err(Error::from_store)?
    else {
      return Ok(None);
    };

    let request = PlaceCall {
      assistant_id:       assistant_id.to_owned(),
      phone_number_id:    phone_number_id.to_owned(),
      destination_number: claimed.phone_number.clone(),
      variables:          claimed.call_variables(),
    };

    let timeout = self.config.scheduler.placement_timeout();
    let placed = tokio::time::timeout(timeout, self.providers.voice().place_call(request)).await;
    let call_handle = match placed {
      Ok(Ok(handle)) => handle,
      Ok(Err(e)) => {
        self.release(prior).await?;
        return Err(dialer_core::Error::ProviderPlacement(e.to_string()).into());
      }
      Err(_) => {
        self.release(prior).await?;
        return Err(Error::Timeout("call placement", timeout));
      }
    };

    let attempt = self
      .store
      .record_attempt(NewCallAttempt {
        campaign_id:    campaign.campaign_id,
        contact_id:     claimed.contact_id,
        call_handle:    call_handle.clone(),
        attempt_number: claimed.attempt_count,
        started_at:     now,
      })
      .await
      .map_err(Error::from_store)?;

    tracing::info!(
      campaign_id = %campaign.campaign_id,
      contact_id = %claimed.contact_id,
      %call_handle,
      attempt = attempt.attempt_number,
      "call placed"
    );
    Ok(Some(attempt))
  }

  async fn release(&self, prior: ReleaseContact) -> Result<()> {
    let released = self
      .store
      .release_contact(prior)
      .await
      .map_err(Error::from_store)?;
    if !released {
      tracing::warn!(contact_id = %prior.contact_id, "contact left calling before release");
    }
    Ok(())
  }
}
