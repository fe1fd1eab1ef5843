//! SQLite backend for the contact ledger.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every contact state transition is a
//! conditional `UPDATE ... WHERE status = ?`, and campaign counters are
//! recomputed inside the same transaction as the write that moved them.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
