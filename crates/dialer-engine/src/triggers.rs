//! Trigger Engine.

use dialer_core::{
  attempt::CallAttempt,
  campaign::Campaign,
  contact::Contact,
  provider::{IntentClassifier as _, MessagingService as _},
  store::CampaignStore,
};
use uuid::Uuid;

use crate::{Error, Orchestrator, Result, providers::Providers};

impl<S, P> Orchestrator<S, P>
where
  S: CampaignStore,
  P: Providers,
{
  /// Evaluate the campaign's active triggers against `text` and send at most
  /// one follow-up message.
  ///
  /// Triggers already fired for the contact are skipped, whatever their
  /// current activity. The first match (lowest priority value) is reserved,
  /// then sent; a failed send drops the reservation so a later call can
  /// fire it. A classifier error stops evaluation without falling through
  /// to lower-priority triggers.
  pub async fn evaluate_triggers(
    &self,
    campaign: &Campaign,
    contact: &Contact,
    attempt: &CallAttempt,
    text: &str,
  ) -> Result<Option<Uuid>> {
    let triggers = self
      .store
      .list_triggers(campaign.campaign_id, true)
      .await
      .map_err(Error::from_store)?;
    let fired = self
      .store
      .fired_triggers(contact.contact_id)
      .await
      .map_err(Error::from_store)?;

    for trigger in triggers.iter().filter(|t| !fired.contains(&t.trigger_id)) {
      let matched = self
        .providers
        .classifier()
        .matches(text, &trigger.intent_description)
        .await
        .map_err(|e| Error::Classifier(Box::new(e)))?;
      if !matched {
        continue;
      }

      let reserved = self
        .store
        .reserve_trigger(contact.contact_id, trigger.trigger_id, attempt.attempt_id)
        .await
        .map_err(Error::from_store)?;
      if !reserved {
        tracing::debug!(
          contact_id = %contact.contact_id,
          trigger_id = %trigger.trigger_id,
          "trigger fired concurrently"
        );
        return Ok(None);
      }

      let body = trigger.render(&contact.call_variables(), &self.config.opt_out_suffix);
      let timeout = self.config.scheduler.placement_timeout();
      let sent = tokio::time::timeout(
        timeout,
        self.providers.messaging().send_message(
          &contact.phone_number,
          campaign.sms_from_number.as_deref(),
          &body,
        ),
      )
      .await;

      let failure: Error = match sent {
        Ok(Ok(_)) => {
          self
            .store
            .mark_message_sent(attempt.attempt_id, trigger.trigger_id)
            .await
            .map_err(Error::from_store)?;
          tracing::info!(
            campaign_id = %campaign.campaign_id,
            contact_id = %contact.contact_id,
            trigger_id = %trigger.trigger_id,
            "trigger fired"
          );
          return Ok(Some(trigger.trigger_id));
        }
        Ok(Err(e)) => dialer_core::Error::ProviderPlacement(e.to_string()).into(),
        Err(_) => Error::Timeout("message send", timeout),
      };

      self
        .store
        .release_trigger(contact.contact_id, trigger.trigger_id)
        .await
        .map_err(Error::from_store)?;
      return Err(failure);
    }

    Ok(None)
  }
}
