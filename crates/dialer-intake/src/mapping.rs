//! CSV decoding and column-to-field mapping.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The contact field a CSV column feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldTarget {
  PhoneNumber,
  FirstName,
  LastName,
  Email,
  /// Explicit IANA timezone, overriding the area-code lookup.
  Timezone,
  /// Stored under the column's own name in `custom_fields`.
  Custom,
}

impl FieldTarget {
  fn name(self) -> &'static str {
    match self {
      Self::PhoneNumber => "phone_number",
      Self::FirstName => "first_name",
      Self::LastName => "last_name",
      Self::Email => "email",
      Self::Timezone => "timezone",
      Self::Custom => "custom",
    }
  }
}

/// Column name → target field. Columns not named here are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMapping {
  pub columns: BTreeMap<String, FieldTarget>,
}

impl FieldMapping {
  pub fn from_json(s: &str) -> Result<Self> { Ok(serde_json::from_str(s)?) }

  pub fn insert(&mut self, column: impl Into<String>, target: FieldTarget) -> &mut Self {
    self.columns.insert(column.into(), target);
    self
  }

  fn check(&self) -> Result<()> {
    for target in [
      FieldTarget::PhoneNumber,
      FieldTarget::FirstName,
      FieldTarget::LastName,
      FieldTarget::Email,
      FieldTarget::Timezone,
    ] {
      let n = self.columns.values().filter(|t| **t == target).count();
      if n > 1 {
        return Err(Error::DuplicateTarget(target.name()));
      }
      if n == 0 && target == FieldTarget::PhoneNumber {
        return Err(Error::MissingPhoneColumn);
      }
    }
    Ok(())
  }

  fn maps(&self, target: FieldTarget) -> bool {
    self.columns.values().any(|t| *t == target)
  }
}

/// One data row with mapped values pulled out. Empty cells are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappedRow {
  /// 1-based position among the data rows (the header is not counted).
  pub row:           usize,
  pub phone_number:  Option<String>,
  pub first_name:    Option<String>,
  pub last_name:     Option<String>,
  pub email:         Option<String>,
  pub timezone:      Option<String>,
  pub custom_fields: BTreeMap<String, String>,
  /// Whether the mapping had a first-name column, which makes it required.
  pub requires_first_name: bool,
  /// A mapped cell was not valid UTF-8; the row is reported, not inserted.
  pub invalid_encoding:    bool,
}

/// Decode `input` as CSV with a header row and apply `mapping`.
///
/// Header matching ignores case and surrounding whitespace. Rows shorter
/// than the header are tolerated; missing cells read as empty. A row whose
/// mapped cells are not UTF-8 comes back flagged with `invalid_encoding`
/// instead of failing the whole read.
pub fn read_csv(input: &[u8], mapping: &FieldMapping) -> Result<Vec<MappedRow>> {
  mapping.check()?;

  let mut reader = csv::ReaderBuilder::new()
    .flexible(true)
    .trim(csv::Trim::All)
    .from_reader(input);

  let headers = reader.byte_headers()?.clone();
  let mut columns = Vec::with_capacity(mapping.columns.len());
  for (column, target) in &mapping.columns {
    let index = headers
      .iter()
      .position(|h| String::from_utf8_lossy(h).trim().eq_ignore_ascii_case(column.trim()))
      .ok_or_else(|| Error::UnknownColumn(column.clone()))?;
    columns.push((index, column.trim().to_owned(), *target));
  }

  let requires_first_name = mapping.maps(FieldTarget::FirstName);
  let mut rows = Vec::new();
  for (i, record) in reader.byte_records().enumerate() {
    let record = record?;
    let mut row = MappedRow {
      row: i + 1,
      requires_first_name,
      ..Default::default()
    };

    for (index, column, target) in &columns {
      let Some(cell) = record.get(*index) else {
        continue;
      };
      let Ok(value) = std::str::from_utf8(cell) else {
        row.invalid_encoding = true;
        continue;
      };
      let value = value.trim();
      if value.is_empty() {
        continue;
      }
      let value = value.to_owned();
      match target {
        FieldTarget::PhoneNumber => row.phone_number = Some(value),
        FieldTarget::FirstName => row.first_name = Some(value),
        FieldTarget::LastName => row.last_name = Some(value),
        FieldTarget::Email => row.email = Some(value),
        FieldTarget::Timezone => row.timezone = Some(value),
        FieldTarget::Custom => {
          row.custom_fields.insert(column.clone(), value);
        }
      }
    }
    rows.push(row);
  }

  Ok(rows)
}
