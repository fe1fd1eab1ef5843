//! The outbound calling orchestrator.
//!
//! [`Orchestrator`] ties a [`CampaignStore`] to the external voice,
//! messaging and classification services and exposes the operations that
//! move contacts through their call lifecycle:
//!
//! - [`Orchestrator::tick`] reconciles stale calls and dispatches new ones
//!   for every running campaign;
//! - [`Orchestrator::ingest_outcome`] settles a call from the provider's
//!   report and runs the trigger engine;
//! - [`Orchestrator::upload_contacts`] seeds a draft campaign from CSV.
//!
//! The engine owns no timer. The caller decides when to tick.
//!
//! [`CampaignStore`]: dialer_core::store::CampaignStore

mod dispatch;
mod ingest;
mod intake;
mod reconcile;
mod triggers;

pub mod config;
pub mod error;
pub mod providers;
pub mod report;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dialer_core::{campaign::CampaignStatus, store::CampaignStore};

pub use config::{EngineConfig, SchedulerConfig};
pub use error::{Error, Result};
pub use ingest::IngestReceipt;
pub use providers::{ProviderSet, Providers};
pub use reconcile::CALLBACK_TIMEOUT;
pub use report::{TickFailure, TickReport};

/// Runs campaigns against a store and a set of providers.
pub struct Orchestrator<S, P> {
  store:     Arc<S>,
  providers: P,
  config:    EngineConfig,
}

impl<S, P> Orchestrator<S, P>
where
  S: CampaignStore,
  P: Providers,
{
  pub fn new(store: Arc<S>, providers: P, config: EngineConfig) -> Self {
    Self { store, providers, config }
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn config(&self) -> &EngineConfig { &self.config }

  /// One scheduler pass: expire stale calls, then dispatch for every
  /// running campaign. Never fails; problems are collected in the report.
  pub async fn tick(&self, now: DateTime<Utc>) -> TickReport {
    let mut report = TickReport::default();

    self.reconcile_stale_calls(now, &mut report).await;

    let campaigns = match self.store.list_campaigns(Some(CampaignStatus::Running)).await {
      Ok(campaigns) => campaigns,
      Err(e) => {
        let e = Error::from_store(e);
        tracing::error!(error = %e, "could not list running campaigns");
        report.fail(None, None, &e);
        return report;
      }
    };

    for campaign in &campaigns {
      report.campaigns_processed += 1;
      if let Err(e) = self.dispatch_campaign(campaign, now, &mut report).await {
        tracing::warn!(campaign_id = %campaign.campaign_id, error = %e, "campaign dispatch failed");
        report.fail(Some(campaign.campaign_id), None, &e);
      }
    }

    tracing::info!(
      campaigns = report.campaigns_processed,
      placed = report.calls_placed,
      ineligible = report.skipped_ineligible,
      reconciled = report.reconciled,
      failures = report.failures.len(),
      "tick finished"
    );
    report
  }
}

#[cfg(test)]
mod tests;
