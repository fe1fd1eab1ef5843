//! Intent classifier backed by an OpenAI-compatible chat-completion API.
//!
//! The model is asked for a JSON object `{"matches": true|false}`. A bare
//! `yes`/`no` answer is tolerated.

use dialer_core::provider::IntentClassifier;
use serde_json::{Value, json};

use crate::{
  Error, Result, check_status, config::ClassifierConfig, http_client, join_url,
};

const SYSTEM_PROMPT: &str = "You decide whether a phone call expresses a \
  given intent. You receive the intent and the call's summary and \
  transcript. Reply with a JSON object {\"matches\": true} if the caller \
  clearly expressed the intent, otherwise {\"matches\": false}. Reply with \
  JSON only.";

#[derive(Clone)]
pub struct ClassifierClient {
  client: reqwest::Client,
  config: ClassifierConfig,
}

impl ClassifierClient {
  pub fn new(config: ClassifierConfig) -> Result<Self> {
    let client = http_client(config.timeout_secs)?;
    Ok(Self { client, config })
  }
}

fn parse_verdict(json: &Value) -> Result<bool> {
  let content = json
    .get("choices")
    .and_then(|v| v.as_array())
    .and_then(|arr| arr.first())
    .and_then(|choice| choice.get("message"))
    .and_then(|msg| msg.get("content"))
    .and_then(|c| c.as_str())
    .ok_or_else(|| Error::InvalidResponse("completion has no content".into()))?;

  if let Ok(parsed) = serde_json::from_str::<Value>(content.trim()) {
    if let Some(matches) = parsed.get("matches").and_then(Value::as_bool) {
      return Ok(matches);
    }
  }

  let answer = content.trim().trim_end_matches('.').to_ascii_lowercase();
  match answer.as_str() {
    "yes" | "true" => Ok(true),
    "no" | "false" => Ok(false),
    _ => Err(Error::InvalidResponse(format!(
      "unrecognised classifier answer: {content:?}"
    ))),
  }
}

impl IntentClassifier for ClassifierClient {
  type Error = Error;

  async fn matches(&self, text: &str, intent_description: &str) -> Result<bool> {
    let body = json!({
      "model": self.config.model,
      "temperature": 0,
      "response_format": { "type": "json_object" },
      "messages": [
        { "role": "system", "content": SYSTEM_PROMPT },
        {
          "role": "user",
          "content": format!("Intent: {intent_description}\n\nCall:\n{text}"),
        },
      ],
    });

    let mut req = self
      .client
      .post(join_url(&self.config.api_base, "/chat/completions"))
      .json(&body);
    if !self.config.api_key.is_empty() {
      req = req.bearer_auth(&self.config.api_key);
    }

    let json: Value = check_status(req.send().await?).await?.json().await?;
    parse_verdict(&json)
  }
}
