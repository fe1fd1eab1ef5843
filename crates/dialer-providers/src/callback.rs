//! Decoding of the voice provider's server-message webhook.
//!
//! Only `end-of-call-report` messages carry an outcome; every other message
//! type (status updates, transcripts in progress) decodes to `None`.

use chrono::{DateTime, Utc};
use dialer_core::attempt::CallReport;
use serde::Deserialize;

use crate::{Error, Result};

const END_OF_CALL_REPORT: &str = "end-of-call-report";

#[derive(Deserialize)]
struct Envelope {
  message: Message,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Message {
  #[serde(rename = "type")]
  kind:          String,
  call:          Option<CallRef>,
  status:        Option<String>,
  ended_reason:  Option<String>,
  artifact:      Option<Artifact>,
  analysis:      Option<Analysis>,
  // Older payloads put these at the top level.
  transcript:    Option<String>,
  summary:       Option<String>,
  recording_url: Option<String>,
  started_at:    Option<DateTime<Utc>>,
  ended_at:      Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CallRef {
  id:         String,
  status:     Option<String>,
  started_at: Option<DateTime<Utc>>,
  ended_at:   Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Artifact {
  transcript:    Option<String>,
  recording_url: Option<String>,
}

#[derive(Deserialize)]
struct Analysis {
  summary: Option<String>,
}

fn non_empty(s: Option<String>) -> Option<String> {
  s.filter(|s| !s.trim().is_empty())
}

/// Decode a webhook body. Returns `Ok(None)` for messages that are not
/// end-of-call reports.
pub fn decode_callback(body: &[u8]) -> Result<Option<CallReport>> {
  let Envelope { message } = serde_json::from_slice(body)?;
  if message.kind != END_OF_CALL_REPORT {
    return Ok(None);
  }

  let call = message
    .call
    .ok_or_else(|| Error::InvalidResponse("end-of-call report has no call".into()))?;
  let (transcript, recording_url) = match message.artifact {
    Some(a) => (a.transcript, a.recording_url),
    None => (None, None),
  };

  Ok(Some(CallReport {
    call_handle:   call.id,
    status:        message.status.or(call.status),
    ended_reason:  non_empty(message.ended_reason),
    transcript:    non_empty(transcript.or(message.transcript)),
    summary:       non_empty(message.analysis.and_then(|a| a.summary).or(message.summary)),
    recording_url: non_empty(recording_url.or(message.recording_url)),
    started_at:    message.started_at.or(call.started_at),
    ended_at:      message.ended_at.or(call.ended_at),
  }))
}
