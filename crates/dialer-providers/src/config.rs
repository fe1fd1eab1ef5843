//! Connection settings for each provider, deserialised from the server's
//! config file.

use serde::{Deserialize, Serialize};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Voice-calling service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
  pub api_base:     String,
  pub api_key:      String,
  pub timeout_secs: u64,
}

impl Default for VoiceConfig {
  fn default() -> Self {
    Self {
      api_base:     "https://api.vapi.ai".into(),
      api_key:      String::new(),
      timeout_secs: DEFAULT_TIMEOUT_SECS,
    }
  }
}

/// SMS gateway speaking the `Accounts/{sid}/Messages.json` form API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagingConfig {
  pub api_base:     String,
  pub account_sid:  String,
  pub auth_token:   String,
  /// Sender used when a campaign has no number of its own.
  pub default_from: Option<String>,
  pub timeout_secs: u64,
}

impl Default for MessagingConfig {
  fn default() -> Self {
    Self {
      api_base:     "https://api.twilio.com/2010-04-01".into(),
      account_sid:  String::new(),
      auth_token:   String::new(),
      default_from: None,
      timeout_secs: DEFAULT_TIMEOUT_SECS,
    }
  }
}

/// OpenAI-compatible chat-completion endpoint used for intent matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
  pub api_base:     String,
  pub api_key:      String,
  pub model:        String,
  pub timeout_secs: u64,
}

impl Default for ClassifierConfig {
  fn default() -> Self {
    Self {
      api_base:     "https://api.openai.com/v1".into(),
      api_key:      String::new(),
      model:        "gpt-4o-mini".into(),
      timeout_secs: DEFAULT_TIMEOUT_SECS,
    }
  }
}
