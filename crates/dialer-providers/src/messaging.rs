//! SMS gateway client (form-encoded `Messages.json` API, basic auth).

use dialer_core::provider::MessagingService;
use serde::Deserialize;

use crate::{
  Error, Result, check_status, config::MessagingConfig, http_client, join_url,
};

#[derive(Deserialize)]
struct SentMessage {
  sid: Option<String>,
}

/// Sends text messages through the configured account.
#[derive(Clone)]
pub struct MessagingClient {
  client: reqwest::Client,
  config: MessagingConfig,
}

impl MessagingClient {
  pub fn new(config: MessagingConfig) -> Result<Self> {
    let client = http_client(config.timeout_secs)?;
    Ok(Self { client, config })
  }
}

impl MessagingService for MessagingClient {
  type Error = Error;

  async fn send_message(
    &self,
    to: &str,
    from: Option<&str>,
    body: &str,
  ) -> Result<String> {
    if self.config.account_sid.is_empty() || self.config.auth_token.is_empty() {
      return Err(Error::MissingCredentials("messaging account_sid/auth_token"));
    }
    let from = from
      .or(self.config.default_from.as_deref())
      .ok_or(Error::MissingCredentials("messaging sender number"))?;

    let url = join_url(
      &self.config.api_base,
      &format!("/Accounts/{}/Messages.json", self.config.account_sid),
    );
    let resp = self
      .client
      .post(url)
      .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
      .form(&[("To", to), ("From", from), ("Body", body)])
      .send()
      .await?;
    let sent: SentMessage = check_status(resp).await?.json().await?;

    tracing::debug!(to, "message accepted");
    sent
      .sid
      .ok_or_else(|| Error::InvalidResponse("message response has no sid".into()))
  }
}
