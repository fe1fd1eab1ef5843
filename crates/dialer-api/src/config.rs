//! Server configuration, deserialised from `config.toml` and `DIALER_*`
//! environment variables.

use std::path::PathBuf;

use dialer_engine::{EngineConfig, SchedulerConfig, config::DEFAULT_OPT_OUT_SUFFIX};
use dialer_providers::{ClassifierConfig, MessagingConfig, VoiceConfig};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:           String,
  #[serde(default = "default_port")]
  pub port:           u16,
  pub store_path:     PathBuf,
  #[serde(default)]
  pub scheduler:      SchedulerConfig,
  #[serde(default)]
  pub voice:          VoiceConfig,
  #[serde(default)]
  pub messaging:      MessagingConfig,
  #[serde(default)]
  pub classifier:     ClassifierConfig,
  #[serde(default = "default_opt_out_suffix")]
  pub opt_out_suffix: String,
}

fn default_host() -> String { "127.0.0.1".into() }

fn default_port() -> u16 { 8080 }

fn default_opt_out_suffix() -> String { DEFAULT_OPT_OUT_SUFFIX.into() }

impl ServerConfig {
  pub fn engine_config(&self) -> EngineConfig {
    EngineConfig {
      scheduler:      self.scheduler.clone(),
      opt_out_suffix: self.opt_out_suffix.clone(),
    }
  }
}
