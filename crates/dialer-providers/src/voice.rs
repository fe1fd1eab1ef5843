//! Voice-calling service client.

use dialer_core::provider::{PlaceCall, VoiceService};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result, check_status, config::VoiceConfig, http_client, join_url,
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateCall<'a> {
  assistant_id:        &'a str,
  phone_number_id:     &'a str,
  customer:            Customer<'a>,
  assistant_overrides: Overrides<'a>,
}

#[derive(Serialize)]
struct Customer<'a> {
  number: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Overrides<'a> {
  variable_values: &'a std::collections::BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct CreatedCall {
  id: Option<String>,
}

/// Places outbound calls with bearer-token auth.
///
/// Cheap to clone: the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct VoiceClient {
  client: reqwest::Client,
  config: VoiceConfig,
}

impl VoiceClient {
  pub fn new(config: VoiceConfig) -> Result<Self> {
    let client = http_client(config.timeout_secs)?;
    Ok(Self { client, config })
  }
}

impl VoiceService for VoiceClient {
  type Error = Error;

  async fn place_call(&self, request: PlaceCall) -> Result<String> {
    if self.config.api_key.is_empty() {
      return Err(Error::MissingCredentials("voice api_key"));
    }

    let body = CreateCall {
      assistant_id:        &request.assistant_id,
      phone_number_id:     &request.phone_number_id,
      customer:            Customer { number: &request.destination_number },
      assistant_overrides: Overrides { variable_values: &request.variables },
    };

    let resp = self
      .client
      .post(join_url(&self.config.api_base, "/call"))
      .bearer_auth(&self.config.api_key)
      .json(&body)
      .send()
      .await?;
    let created: CreatedCall = check_status(resp).await?.json().await?;

    created
      .id
      .filter(|id| !id.is_empty())
      .ok_or_else(|| Error::InvalidResponse("call response has no id".into()))
  }
}
