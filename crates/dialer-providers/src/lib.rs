//! HTTP clients for the services the dialer consumes.
//!
//! - [`VoiceClient`] places calls and [`decode_callback`] reads the
//!   provider's end-of-call report.
//! - [`MessagingClient`] sends follow-up texts.
//! - [`ClassifierClient`] asks a chat-completion model whether call content
//!   expresses an intent.
//!
//! Each client implements the matching trait from
//! [`dialer_core::provider`], so the engine never sees HTTP.

mod callback;
mod classifier;
pub mod config;
pub mod error;
mod messaging;
mod voice;

pub use callback::decode_callback;
pub use classifier::ClassifierClient;
pub use config::{ClassifierConfig, MessagingConfig, VoiceConfig};
pub use error::{Error, Result};
pub use messaging::MessagingClient;
pub use voice::VoiceClient;

fn http_client(timeout_secs: u64) -> Result<reqwest::Client> {
  Ok(
    reqwest::Client::builder()
      .timeout(std::time::Duration::from_secs(timeout_secs))
      .build()?,
  )
}

/// Turn a non-2xx response into [`Error::Rejected`], keeping the body for
/// the logs.
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response> {
  let status = resp.status();
  if status.is_success() {
    return Ok(resp);
  }
  let body = resp.text().await.unwrap_or_default();
  Err(Error::Rejected { status: status.as_u16(), body })
}

fn join_url(base: &str, path: &str) -> String {
  format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
