//! Core types and trait definitions for the outbound calling orchestrator.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends, provider clients, and the engine all depend on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod attempt;
pub mod campaign;
pub mod contact;
pub mod error;
pub mod lifecycle;
pub mod provider;
pub mod schedule;
pub mod store;
pub mod trigger;

pub use error::{Error, Result};
