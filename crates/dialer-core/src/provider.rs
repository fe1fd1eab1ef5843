//! Contracts for the external services the orchestrator consumes.
//!
//! The voice-calling service, the messaging service, and the intent
//! classifier are opaque to the core. Concrete HTTP clients live in
//! `dialer-providers`; tests substitute in-process fakes.

use std::{collections::BTreeMap, future::Future};

/// Request to place one outbound call.
#[derive(Debug, Clone)]
pub struct PlaceCall {
  pub assistant_id:       String,
  pub phone_number_id:    String,
  pub destination_number: String,
  pub variables:          BTreeMap<String, String>,
}

/// Places calls. Outcomes arrive later, via a callback keyed by the returned
/// handle.
pub trait VoiceService: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Ask the provider to dial; returns the provider's call handle.
  fn place_call(
    &self,
    request: PlaceCall,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + '_;
}

/// Sends text messages.
pub trait MessagingService: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Send `body` from `from` to `to`; returns the provider's message handle.
  fn send_message<'a>(
    &'a self,
    to: &'a str,
    from: Option<&'a str>,
    body: &'a str,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + 'a;
}

/// Decides whether call content expresses a natural-language intent.
pub trait IntentClassifier: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn matches<'a>(
    &'a self,
    text: &'a str,
    intent_description: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;
}
