//! Batch validation and deduplication.

use std::collections::HashSet;

use dialer_core::contact::NewContact;
use serde::{Deserialize, Serialize};

use crate::{
  area_codes::timezone_for_area_code,
  mapping::MappedRow,
  phone::{area_code, normalize_phone},
};

/// A row excluded from insertion, with the reason shown to the uploader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidRow {
  pub row:    usize,
  pub reason: String,
}

/// Upload summary returned to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeReport {
  pub valid_contacts:   u32,
  pub invalid_contacts: u32,
  pub duplicates:       u32,
  pub invalid_rows:     Vec<InvalidRow>,
}

/// Contacts ready to insert, plus the report describing what was dropped.
#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
  pub contacts: Vec<NewContact>,
  pub report:   IntakeReport,
}

fn plausible_email(email: &str) -> bool {
  match email.split_once('@') {
    Some((local, domain)) => {
      !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.contains(char::is_whitespace)
    }
    None => false,
  }
}

fn validate(row: MappedRow) -> Result<NewContact, &'static str> {
  if row.invalid_encoding {
    return Err("invalid encoding");
  }
  let raw_phone = row.phone_number.ok_or("missing phone number")?;
  if row.requires_first_name && row.first_name.is_none() {
    return Err("missing first name");
  }
  let phone_number = normalize_phone(&raw_phone).ok_or("invalid phone number")?;
  if row.email.as_deref().is_some_and(|e| !plausible_email(e)) {
    return Err("invalid email");
  }

  let area = area_code(&phone_number).map(str::to_owned);
  let timezone = match row.timezone {
    Some(tz) => {
      if tz.parse::<chrono_tz::Tz>().is_err() {
        return Err("invalid timezone");
      }
      Some(tz)
    }
    None => area
      .as_deref()
      .and_then(timezone_for_area_code)
      .map(str::to_owned),
  };

  Ok(NewContact {
    phone_number,
    first_name: row.first_name,
    last_name: row.last_name,
    email: row.email,
    custom_fields: row.custom_fields,
    area_code: area,
    timezone,
  })
}

/// Validate, normalize and deduplicate a batch.
///
/// Within the batch the first occurrence of a normalized number wins; later
/// ones count as duplicates, as do numbers already in `existing`.
pub fn normalize_batch(
  rows: Vec<MappedRow>,
  existing: &HashSet<String>,
) -> NormalizedBatch {
  let mut batch = NormalizedBatch::default();
  let mut seen: HashSet<String> = HashSet::new();

  for row in rows {
    let index = row.row;
    match validate(row) {
      Err(reason) => {
        batch.report.invalid_contacts += 1;
        batch.report.invalid_rows.push(InvalidRow {
          row:    index,
          reason: reason.to_owned(),
        });
      }
      Ok(contact) => {
        if existing.contains(&contact.phone_number)
          || !seen.insert(contact.phone_number.clone())
        {
          batch.report.duplicates += 1;
        } else {
          batch.report.valid_contacts += 1;
          batch.contacts.push(contact);
        }
      }
    }
  }

  batch
}
