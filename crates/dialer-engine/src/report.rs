//! Per-tick accounting.

use serde::Serialize;
use uuid::Uuid;

/// One problem met during a tick. The tick carried on regardless.
#[derive(Debug, Clone, Serialize)]
pub struct TickFailure {
  pub campaign_id: Option<Uuid>,
  pub contact_id:  Option<Uuid>,
  pub error:       String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TickReport {
  pub campaigns_processed: u32,
  pub calls_placed:        u32,
  /// Candidates outside their calling window, left for a later tick.
  pub skipped_ineligible:  u32,
  /// Stale `calling` contacts given a synthetic failure.
  pub reconciled:          u32,
  pub failures:            Vec<TickFailure>,
}

impl TickReport {
  pub(crate) fn fail(
    &mut self,
    campaign_id: Option<Uuid>,
    contact_id: Option<Uuid>,
    error: &dyn std::fmt::Display,
  ) {
    self.failures.push(TickFailure {
      campaign_id,
      contact_id,
      error: error.to_string(),
    });
  }

  pub fn is_clean(&self) -> bool { self.failures.is_empty() }
}
