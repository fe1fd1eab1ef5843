//! Engine tuning, deserialised from the server's config file.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_OPT_OUT_SUFFIX: &str = "Reply STOP to opt out.";

/// Scheduler timing and limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
  /// Seconds between ticks when the server drives the scheduler itself.
  pub tick_interval_secs:     u64,
  /// Upper bound on one provider request (call placement or message send).
  pub placement_timeout_secs: u64,
  /// A contact `calling` for longer than this gets a synthetic failure.
  pub stale_call_minutes:     i64,
  /// Candidates fetched per free slot before calling-window filtering.
  pub candidate_scan_factor:  usize,
}

impl Default for SchedulerConfig {
  fn default() -> Self {
    Self {
      tick_interval_secs:     60,
      placement_timeout_secs: 30,
      stale_call_minutes:     60,
      candidate_scan_factor:  10,
    }
  }
}

impl SchedulerConfig {
  pub fn tick_interval(&self) -> Duration { Duration::from_secs(self.tick_interval_secs.max(1)) }

  pub fn placement_timeout(&self) -> Duration {
    Duration::from_secs(self.placement_timeout_secs.max(1))
  }

  pub fn stale_call_age(&self) -> chrono::Duration {
    chrono::Duration::minutes(self.stale_call_minutes.max(1))
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  pub scheduler:      SchedulerConfig,
  /// Appended to every follow-up message. Empty disables it.
  pub opt_out_suffix: String,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      scheduler:      SchedulerConfig::default(),
      opt_out_suffix: DEFAULT_OPT_OUT_SUFFIX.into(),
    }
  }
}
