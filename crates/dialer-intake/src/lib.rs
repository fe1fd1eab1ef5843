//! Contact intake for dialer campaigns.
//!
//! Turns an uploaded CSV batch into validated, normalized [`NewContact`]s.
//! Pure synchronous; the caller supplies the campaign's existing numbers and
//! persists the result.
//!
//! # Quick start
//!
//! ```no_run
//! use std::collections::HashSet;
//! use dialer_intake::{FieldMapping, normalize_batch, read_csv};
//!
//! let mapping = FieldMapping::from_json(r#"{"Phone": "phone_number", "Name": "first_name"}"#).unwrap();
//! let rows = read_csv(b"Phone,Name\n(212) 555-0134,Ada\n", &mapping).unwrap();
//! let batch = normalize_batch(rows, &HashSet::new());
//! assert_eq!(batch.report.valid_contacts, 1);
//! ```
//!
//! [`NewContact`]: dialer_core::contact::NewContact

mod area_codes;
mod batch;
pub mod error;
mod mapping;
mod phone;

pub use area_codes::timezone_for_area_code;
pub use batch::{IntakeReport, InvalidRow, NormalizedBatch, normalize_batch};
pub use error::{Error, Result};
pub use mapping::{FieldMapping, FieldTarget, MappedRow, read_csv};
pub use phone::{area_code, normalize_phone};
