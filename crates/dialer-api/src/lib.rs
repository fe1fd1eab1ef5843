//! JSON REST API for the dialer.
//!
//! Exposes an axum [`Router`] backed by an [`Orchestrator`]: campaign
//! configuration, contact intake, the attempt log, and the voice provider's
//! outcome webhook. Auth and TLS are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = dialer_api::api_router(engine.clone()).layer(TraceLayer::new_for_http());
//! ```

pub mod campaigns;
pub mod config;
pub mod contacts;
pub mod error;
pub mod webhooks;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use dialer_core::store::CampaignStore;
use dialer_engine::{Orchestrator, Providers};

pub use config::ServerConfig;
pub use error::ApiError;

/// Shared handler state.
pub type Engine<S, P> = Arc<Orchestrator<S, P>>;

/// Build a fully-materialised API router for `engine`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, P>(engine: Engine<S, P>) -> Router<()>
where
  S: CampaignStore + 'static,
  P: Providers + 'static,
{
  Router::new()
    // Campaigns
    .route("/campaigns", get(campaigns::list::<S, P>).post(campaigns::create::<S, P>))
    .route("/campaigns/{id}", get(campaigns::get_one::<S, P>))
    .route("/campaigns/{id}/status", post(campaigns::set_status::<S, P>))
    .route(
      "/campaigns/{id}/schedules",
      get(campaigns::list_schedules::<S, P>).post(campaigns::add_schedule::<S, P>),
    )
    .route(
      "/campaigns/{id}/triggers",
      get(campaigns::list_triggers::<S, P>).post(campaigns::add_trigger::<S, P>),
    )
    .route("/triggers/{id}/active", post(campaigns::set_trigger_active::<S, P>))
    // Contacts and attempts
    .route(
      "/campaigns/{id}/contacts",
      get(contacts::list::<S, P>).delete(contacts::clear::<S, P>),
    )
    .route("/campaigns/{id}/contacts/upload", post(contacts::upload::<S, P>))
    .route("/campaigns/{id}/attempts", get(contacts::attempts::<S, P>))
    // Provider callbacks
    .route("/webhooks/voice", post(webhooks::voice::<S, P>))
    .with_state(engine)
}

#[cfg(test)]
mod tests;
