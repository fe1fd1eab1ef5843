//! Router tests driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use chrono::Utc;
use dialer_core::provider::{IntentClassifier, MessagingService, PlaceCall, VoiceService};
use dialer_engine::{EngineConfig, Orchestrator, ProviderSet};
use dialer_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;
use uuid::Uuid;

use crate::{Engine, api_router};

// ── Fakes ───────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
#[error("fake provider failure")]
struct FakeError;

#[derive(Default)]
struct Voice(std::sync::atomic::AtomicUsize);

impl VoiceService for Voice {
  type Error = FakeError;

  async fn place_call(&self, _request: PlaceCall) -> Result<String, FakeError> {
    let n = self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
    Ok(format!("call-{n}"))
  }
}

struct Messaging;

impl MessagingService for Messaging {
  type Error = FakeError;

  async fn send_message(
    &self,
    _to: &str,
    _from: Option<&str>,
    _body: &str,
  ) -> Result<String, FakeError> {
    Ok("SM1".into())
  }
}

struct Classifier;

impl IntentClassifier for Classifier {
  type Error = FakeError;

  async fn matches(&self, text: &str, intent_description: &str) -> Result<bool, FakeError> {
    Ok(text.contains(intent_description))
  }
}

type TestEngine = Engine<SqliteStore, ProviderSet<Voice, Messaging, Classifier>>;

// ── Helpers ─────────────────────────────────────────────────────────────────

async fn engine() -> TestEngine {
  let store = SqliteStore::open_in_memory().await.unwrap();
  Arc::new(Orchestrator::new(
    Arc::new(store),
    ProviderSet {
      voice:      Voice::default(),
      messaging:  Messaging,
      classifier: Classifier,
    },
    EngineConfig::default(),
  ))
}

async fn send(app: Router, method: &str, uri: &str, body: Body) -> (StatusCode, Value) {
  let req = Request::builder()
    .method(method)
    .uri(uri)
    .header(header::CONTENT_TYPE, "application/json")
    .body(body)
    .unwrap();
  let resp = app.oneshot(req).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
    .await
    .unwrap();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, value)
}

async fn send_json(engine: &TestEngine, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
  send(api_router(engine.clone()), method, uri, Body::from(body.to_string())).await
}

async fn get(engine: &TestEngine, uri: &str) -> (StatusCode, Value) {
  send(api_router(engine.clone()), "GET", uri, Body::empty()).await
}

async fn create_campaign(engine: &TestEngine) -> String {
  let (status, body) = send_json(engine, "POST", "/campaigns", json!({
    "tenant_id": Uuid::new_v4(),
    "name": "spring renewals",
    "max_concurrent_calls": 2,
    "assistant_id": "asst_1",
    "phone_number_id": "pn_1"
  }))
  .await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  body["campaign_id"].as_str().unwrap().to_owned()
}

fn mapping_query() -> String {
  // {"phone":"phone_number","name":"first_name"}, percent-encoded.
  "mapping=%7B%22phone%22%3A%22phone_number%22%2C%22name%22%3A%22first_name%22%7D".into()
}

async fn upload(engine: &TestEngine, id: &str, csv: &str) -> (StatusCode, Value) {
  let uri = format!("/campaigns/{id}/contacts/upload?{}", mapping_query());
  send(api_router(engine.clone()), "POST", &uri, Body::from(csv.to_owned())).await
}

async fn advance(engine: &TestEngine, id: &str, to: &str) -> (StatusCode, Value) {
  send_json(engine, "POST", &format!("/campaigns/{id}/status"), json!({ "status": to })).await
}

fn end_of_call(handle: &str, transcript: &str) -> Value {
  json!({
    "message": {
      "type": "end-of-call-report",
      "call": { "id": handle },
      "endedReason": "customer-ended-call",
      "artifact": { "transcript": transcript }
    }
  })
}

// ── Campaigns ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_then_fetch_campaign() {
  let e = engine().await;
  let id = create_campaign(&e).await;

  let (status, body) = get(&e, &format!("/campaigns/{id}")).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"], "draft");
  assert_eq!(body["max_concurrent_calls"], 2);
  assert_eq!(body["max_retries"], 2);
  assert_eq!(body["counters"]["total_contacts"], 0);

  let (status, list) = get(&e, "/campaigns?status=draft").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(list.as_array().unwrap().len(), 1);

  let (status, list) = get(&e, "/campaigns?status=running").await;
  assert_eq!(status, StatusCode::OK);
  assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_campaign_is_404() {
  let e = engine().await;
  let (status, body) = get(&e, &format!("/campaigns/{}", Uuid::new_v4())).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert!(body["error"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn invalid_campaign_is_400() {
  let e = engine().await;
  let (status, _) = send_json(&e, "POST", "/campaigns", json!({
    "tenant_id": Uuid::new_v4(),
    "name": "x",
    "max_concurrent_calls": 0
  }))
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn illegal_transition_is_409() {
  let e = engine().await;
  let id = create_campaign(&e).await;

  let (status, _) = advance(&e, &id, "running").await;
  assert_eq!(status, StatusCode::CONFLICT);

  let (status, body) = advance(&e, &id, "scheduled").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"], "scheduled");
}

#[tokio::test]
async fn overnight_schedule_is_400() {
  let e = engine().await;
  let id = create_campaign(&e).await;
  let uri = format!("/campaigns/{id}/schedules");

  let (status, _) = send_json(&e, "POST", &uri, json!({
    "day_of_week": 1,
    "start_time": "22:00:00",
    "end_time": "06:00:00"
  }))
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, row) = send_json(&e, "POST", &uri, json!({
    "day_of_week": 1,
    "start_time": "09:00:00",
    "end_time": "17:00:00"
  }))
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(row["is_active"], true);

  let (_, rows) = get(&e, &uri).await;
  assert_eq!(rows.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn triggers_list_in_priority_order_and_toggle() {
  let e = engine().await;
  let id = create_campaign(&e).await;
  let uri = format!("/campaigns/{id}/triggers");

  for (intent, priority) in [("callback", 2), ("brochure", 1)] {
    let (status, _) = send_json(&e, "POST", &uri, json!({
      "intent_description": intent,
      "message_template": "Thanks {{first_name}}",
      "priority": priority
    }))
    .await;
    assert_eq!(status, StatusCode::CREATED);
  }

  let (_, triggers) = get(&e, &uri).await;
  assert_eq!(triggers[0]["intent_description"], "brochure");
  let first = triggers[0]["trigger_id"].as_str().unwrap().to_owned();

  let (status, toggled) = send_json(
    &e,
    "POST",
    &format!("/triggers/{first}/active"),
    json!({ "is_active": false }),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(toggled["is_active"], false);

  let (_, active) = get(&e, &format!("{uri}?active_only=true")).await;
  assert_eq!(active.as_array().unwrap().len(), 1);
  assert_eq!(active[0]["intent_description"], "callback");
}

// ── Contacts ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn upload_then_page_through_contacts() {
  let e = engine().await;
  let id = create_campaign(&e).await;

  let (status, report) = upload(
    &e,
    &id,
    "phone,name\n(800) 555-0101,Ada\n800.555.0102,Grace\n8005550101,Dup\nnope,Bad\n",
  )
  .await;
  assert_eq!(status, StatusCode::OK, "{report}");
  assert_eq!(report["valid_contacts"], 2);
  assert_eq!(report["duplicates"], 1);
  assert_eq!(report["invalid_contacts"], 1);
  assert_eq!(report["invalid_rows"][0]["row"], 4);

  let (status, page) = get(&e, &format!("/campaigns/{id}/contacts?limit=1&offset=1")).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(page["total"], 2);
  assert_eq!(page["items"].as_array().unwrap().len(), 1);
  assert_eq!(page["items"][0]["phone_number"], "+18005550102");

  let (_, pending) = get(&e, &format!("/campaigns/{id}/contacts?status=pending")).await;
  assert_eq!(pending["total"], 2);
}

#[tokio::test]
async fn upload_with_bad_mapping_is_400() {
  let e = engine().await;
  let id = create_campaign(&e).await;
  let uri = format!("/campaigns/{id}/contacts/upload?mapping=not-json");
  let (status, _) = send(api_router(e.clone()), "POST", &uri, Body::from("phone\n8005550101\n")).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn clear_is_draft_only() {
  let e = engine().await;
  let id = create_campaign(&e).await;
  upload(&e, &id, "phone,name\n8005550101,Ada\n").await;

  let (status, body) = send(
    api_router(e.clone()),
    "DELETE",
    &format!("/campaigns/{id}/contacts"),
    Body::empty(),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["deleted"], 1);

  advance(&e, &id, "scheduled").await;
  let (status, _) = send(
    api_router(e.clone()),
    "DELETE",
    &format!("/campaigns/{id}/contacts"),
    Body::empty(),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);
}

// ── Webhook ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn webhook_ignores_other_message_types() {
  let e = engine().await;
  let (status, body) = send_json(&e, "POST", "/webhooks/voice", json!({
    "message": { "type": "status-update", "status": "ringing" }
  }))
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"], "ignored");

  let (status, _) = send(api_router(e.clone()), "POST", "/webhooks/voice", Body::from("{")).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn webhook_unknown_call_is_404() {
  let e = engine().await;
  let (status, _) =
    send_json(&e, "POST", "/webhooks/voice", end_of_call("call-nope", "hello")).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn webhook_settles_call_once() {
  let e = engine().await;
  let id = create_campaign(&e).await;
  upload(&e, &id, "phone,name\n8005550101,Ada\n").await;
  send_json(&e, "POST", &format!("/campaigns/{id}/triggers"), json!({
    "intent_description": "brochure",
    "message_template": "Here is the brochure, {{first_name}}.",
    "priority": 1
  }))
  .await;
  advance(&e, &id, "scheduled").await;
  advance(&e, &id, "running").await;

  let report = e.tick(Utc::now()).await;
  assert_eq!(report.calls_placed, 1);

  let callback = end_of_call("call-1", "User: please send the brochure");
  let (status, receipt) = send_json(&e, "POST", "/webhooks/voice", callback.clone()).await;
  assert_eq!(status, StatusCode::OK, "{receipt}");
  assert_eq!(receipt["contact"]["status"], "completed");
  assert_eq!(receipt["attempt"]["outcome"], "answered");
  assert!(receipt["trigger_fired"].is_string());

  let (status, _) = send_json(&e, "POST", "/webhooks/voice", callback).await;
  assert_eq!(status, StatusCode::CONFLICT);

  let (_, attempts) = get(&e, &format!("/campaigns/{id}/attempts")).await;
  assert_eq!(attempts["total"], 1);
  assert_eq!(attempts["items"][0]["message_sent"], true);

  let (_, campaign) = get(&e, &format!("/campaigns/{id}")).await;
  assert_eq!(campaign["counters"]["contacts_answered"], 1);
}
