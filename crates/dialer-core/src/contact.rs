//! Contacts, each one phone-number target within a campaign.
//!
//! Contacts are created by intake and afterwards mutated only by the
//! orchestrator. The UI layer reads them but never writes.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::attempt::CallOutcome;

/// Where a contact sits in its call-attempt lifecycle.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ContactStatus {
  /// Never dialed.
  Pending,
  /// Waiting for a retry; eligible once `next_attempt_at` has passed.
  Queued,
  /// A call has been placed and its outcome has not arrived yet.
  Calling,
  Completed,
  Failed,
}

impl ContactStatus {
  pub fn is_terminal(self) -> bool {
    matches!(self, Self::Completed | Self::Failed)
  }

  /// Whether the dispatch scheduler may pick a contact in this state.
  pub fn is_dispatchable(self) -> bool {
    matches!(self, Self::Pending | Self::Queued)
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
  pub contact_id:      Uuid,
  pub campaign_id:     Uuid,
  /// Always E.164: a single leading `+` followed by the country code.
  pub phone_number:    String,
  pub first_name:      Option<String>,
  pub last_name:       Option<String>,
  pub email:           Option<String>,
  pub custom_fields:   BTreeMap<String, String>,
  pub area_code:       Option<String>,
  /// IANA zone name. `None` means the contact may be called at any hour.
  pub timezone:        Option<String>,
  pub status:          ContactStatus,
  pub attempt_count:   u32,
  pub last_attempt_at: Option<DateTime<Utc>>,
  pub next_attempt_at: Option<DateTime<Utc>>,
  pub call_result:     Option<CallOutcome>,
  pub created_at:      DateTime<Utc>,
}

impl Contact {
  /// Variables handed to the voice assistant when the call is placed.
  pub fn call_variables(&self) -> BTreeMap<String, String> {
    let mut vars = self.custom_fields.clone();
    let fixed = [
      ("first_name", self.first_name.as_deref()),
      ("last_name", self.last_name.as_deref()),
      ("email", self.email.as_deref()),
      ("phone_number", Some(self.phone_number.as_str())),
    ];
    for (key, value) in fixed {
      if let Some(v) = value {
        vars.insert(key.to_owned(), v.to_owned());
      }
    }
    vars
  }
}

/// A normalized contact produced by intake, ready to insert into the ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewContact {
  pub phone_number:  String,
  pub first_name:    Option<String>,
  pub last_name:     Option<String>,
  pub email:         Option<String>,
  pub custom_fields: BTreeMap<String, String>,
  pub area_code:     Option<String>,
  pub timezone:      Option<String>,
}
