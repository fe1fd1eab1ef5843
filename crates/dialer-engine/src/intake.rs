//! Contact intake and campaign configuration actions.

use dialer_core::{
  campaign::{Campaign, CampaignStatus},
  lifecycle::require_draft,
  store::CampaignStore,
};
use dialer_intake::{FieldMapping, IntakeReport, normalize_batch, read_csv};
use uuid::Uuid;

use crate::{Error, Orchestrator, Result, providers::Providers};

impl<S, P> Orchestrator<S, P>
where
  S: CampaignStore,
  P: Providers,
{
  async fn draft_campaign(&self, campaign_id: Uuid) -> Result<Campaign> {
    let campaign = self
      .store
      .get_campaign(campaign_id)
      .await
      .map_err(Error::from_store)?
      .ok_or(dialer_core::Error::CampaignNotFound(campaign_id))?;
    require_draft(&campaign)?;
    Ok(campaign)
  }

  /// Normalize a CSV upload and seed it into a draft campaign.
  pub async fn upload_contacts(
    &self,
    campaign_id: Uuid,
    csv: &[u8],
    mapping: &FieldMapping,
  ) -> Result<IntakeReport> {
    self.draft_campaign(campaign_id).await?;

    let rows = read_csv(csv, mapping)?;
    let existing = self
      .store
      .existing_phone_numbers(campaign_id)
      .await
      .map_err(Error::from_store)?;
    let batch = normalize_batch(rows, &existing);

    let offered = batch.contacts.len();
    let inserted = self
      .store
      .insert_contacts(campaign_id, batch.contacts)
      .await
      .map_err(Error::from_store)?;

    // Numbers another upload inserted in the meantime were skipped.
    let mut report = batch.report;
    let raced = (offered - inserted.len()) as u32;
    report.valid_contacts -= raced;
    report.duplicates += raced;

    tracing::info!(
      %campaign_id,
      valid = report.valid_contacts,
      invalid = report.invalid_contacts,
      duplicates = report.duplicates,
      "contacts uploaded"
    );
    Ok(report)
  }

  /// Remove every contact from a draft campaign.
  pub async fn clear_contacts(&self, campaign_id: Uuid) -> Result<u64> {
    self.draft_campaign(campaign_id).await?;
    self
      .store
      .clear_contacts(campaign_id)
      .await
      .map_err(Error::from_store)
  }

  /// Advance a campaign along its lifecycle.
  pub async fn advance_campaign(
    &self,
    campaign_id: Uuid,
    to: CampaignStatus,
  ) -> Result<Campaign> {
    self
      .store
      .set_campaign_status(campaign_id, to)
      .await
      .map_err(Error::from_store)
  }
}
