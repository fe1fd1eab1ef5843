//! Triggers: intent-matched follow-up messages.
//!
//! A trigger fires at most once per contact. Firing history lives in the
//! ledger (see [`FiredTrigger`]), not on the trigger itself, so deactivating
//! and later reactivating a trigger never causes a re-fire.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trigger {
  pub trigger_id:         Uuid,
  pub campaign_id:        Uuid,
  /// Natural-language criterion handed to the intent classifier.
  pub intent_description: String,
  pub message_template:   String,
  /// Lower values are evaluated first; ties go to the older trigger.
  pub priority:           i32,
  pub is_active:          bool,
  pub created_at:         DateTime<Utc>,
}

impl Trigger {
  /// Render the message body: substitute `{{key}}` placeholders from `vars`,
  /// then append the opt-out suffix.
  ///
  /// Unknown placeholders render as empty strings.
  pub fn render(
    &self,
    vars: &BTreeMap<String, String>,
    opt_out_suffix: &str,
  ) -> String {
    let mut out = String::with_capacity(self.message_template.len());
    let mut rest = self.message_template.as_str();

    while let Some(open) = rest.find("{{") {
      out.push_str(&rest[..open]);
      let after = &rest[open + 2..];
      let Some(close) = after.find("}}") else {
        out.push_str(&rest[open..]);
        rest = "";
        break;
      };
      let key = after[..close].trim();
      if let Some(value) = vars.get(key) {
        out.push_str(value);
      }
      rest = &after[close + 2..];
    }
    out.push_str(rest);

    let body = out.trim_end();
    let suffix = opt_out_suffix.trim();
    if suffix.is_empty() {
      body.to_owned()
    } else {
      format!("{body} {suffix}")
    }
  }
}

/// Input to [`crate::store::CampaignStore::add_trigger`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTrigger {
  pub intent_description: String,
  pub message_template:   String,
  pub priority:           i32,
  #[serde(default = "default_active")]
  pub is_active:          bool,
}

fn default_active() -> bool { true }

impl NewTrigger {
  pub fn validate(&self) -> Result<()> {
    if self.intent_description.trim().is_empty() {
      return Err(Error::Validation("intent description is required".into()));
    }
    if self.message_template.trim().is_empty() {
      return Err(Error::Validation("message template is required".into()));
    }
    Ok(())
  }
}

/// Ledger record that a trigger has fired (or is firing) for a contact.
/// At most one exists per `(contact_id, trigger_id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiredTrigger {
  pub contact_id: Uuid,
  pub trigger_id: Uuid,
  pub attempt_id: Uuid,
  pub fired_at:   DateTime<Utc>,
}
