//! End-to-end tests for the webhook and staff API.
//!
//! Each test spins up an Axum server on a random port backed by a temp
//! database and a recording channel, then drives it over real HTTP.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use league_rsvp::channels::{OutboundChannel, SendMode, SendResult};
use league_rsvp::server::{AppState, router};
use league_rsvp::store::LibSqlBackend;

/// Outbound channel that keeps every message instead of calling Twilio.
#[derive(Default)]
struct StubChannel {
    sent: Mutex<Vec<(String, String, SendMode)>>,
}

impl StubChannel {
    fn sent(&self) -> Vec<(String, String, SendMode)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl OutboundChannel for StubChannel {
    fn name(&self) -> &str {
        "stub"
    }

    async fn send(&self, to: &str, body: &str, mode: SendMode) -> SendResult {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), body.to_string(), mode));
        match mode {
            SendMode::Test => SendResult::test_mode(),
            SendMode::Live => SendResult::sent("SM-stub"),
        }
    }
}

struct Server {
    _dir: tempfile::TempDir,
    base: String,
    channel: Arc<StubChannel>,
    client: reqwest::Client,
}

/// Start the full router on a random port.
async fn start_server() -> Server {
    let dir = tempfile::tempdir().unwrap();
    let db = Arc::new(
        LibSqlBackend::new_local(&dir.path().join("rsvp.db"))
            .await
            .unwrap(),
    );
    let channel = Arc::new(StubChannel::default());
    let app = router(AppState::new(db, channel.clone()));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    Server {
        _dir: dir,
        base: format!("http://127.0.0.1:{port}"),
        channel,
        client: reqwest::Client::new(),
    }
}

impl Server {
    async fn post_json(&self, path: &str, body: Value) -> (u16, Value) {
        let resp = self
            .client
            .post(format!("{}{path}", self.base))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap_or(Value::Null))
    }

    async fn get_json(&self, path: &str) -> Value {
        let resp = self
            .client
            .get(format!("{}{path}", self.base))
            .send()
            .await
            .unwrap();
        assert!(resp.status().is_success(), "GET {path}: {}", resp.status());
        resp.json().await.unwrap()
    }

    async fn webhook(&self, from: &str, body: &str) -> (u16, String) {
        let resp = self
            .client
            .post(format!("{}/webhook/whatsapp", self.base))
            .form(&[("From", from), ("Body", body)])
            .send()
            .await
            .unwrap();
        (resp.status().as_u16(), resp.text().await.unwrap())
    }

    /// One German-speaking player invited to one event. Returns (player_id, event_id).
    async fn seed_invitation(&self) -> (i64, i64) {
        let (status, player) = self
            .post_json(
                "/api/players",
                json!({
                    "first_name": "Jonas",
                    "last_name": "Keller",
                    "phone_number": "+491234567890",
                    "preferred_language": "DE",
                }),
            )
            .await;
        assert_eq!(status, 201);
        let (status, event) = self
            .post_json(
                "/api/events",
                json!({
                    "name": "Berlin Open",
                    "start_date": "2026-11-07",
                    "location": "Berlin",
                }),
            )
            .await;
        assert_eq!(status, 201);

        let player_id = player["id"].as_i64().unwrap();
        let event_id = event["id"].as_i64().unwrap();
        let (status, _) = self
            .post_json(
                &format!("/api/events/{event_id}/invitations"),
                json!({"player_ids": [player_id]}),
            )
            .await;
        assert_eq!(status, 200);
        (player_id, event_id)
    }
}

#[tokio::test]
async fn german_yes_reply_records_interest_and_confirms_live() {
    let server = start_server().await;
    let (player_id, event_id) = server.seed_invitation().await;

    let (status, body) = server
        .webhook("whatsapp:+491234567890", "JA bin dabei")
        .await;
    assert_eq!(status, 200);
    assert!(body.is_empty());

    let detail = server.get_json(&format!("/api/events/{event_id}")).await;
    assert_eq!(detail["invitations"][0]["response_status"], "interested");
    assert!(detail["invitations"][0]["response_date"].is_string());
    assert_eq!(detail["stats"]["interested"], 1);

    let responses = server.get_json("/api/responses").await;
    assert_eq!(responses[0]["response_text"], "JA bin dabei");
    assert_eq!(responses[0]["response_type"], "interested");
    assert_eq!(responses[0]["player_id"].as_i64(), Some(player_id));

    let sent = server.channel.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "+491234567890");
    assert!(sent[0].1.contains("Danke für dein Interesse an Berlin Open"));
    assert_eq!(sent[0].2, SendMode::Live);

    let messages = server.get_json("/api/messages").await;
    assert_eq!(messages[0]["kind"], "confirmation_interested");
    assert_eq!(messages[0]["status"], "sent");
}

#[tokio::test]
async fn unrecognized_reply_changes_nothing() {
    let server = start_server().await;
    let (_, event_id) = server.seed_invitation().await;

    let (status, body) = server.webhook("whatsapp:+491234567890", "WARUM").await;
    assert_eq!(status, 200);
    assert!(body.is_empty());

    let stats = server.get_json(&format!("/api/events/{event_id}/stats")).await;
    assert_eq!(stats["pending"], 1);
    assert_eq!(server.get_json("/api/responses").await, json!([]));
    assert!(server.channel.sent().is_empty());
}

#[tokio::test]
async fn unknown_sender_is_acknowledged_silently() {
    let server = start_server().await;
    let (status, body) = server.webhook("whatsapp:+15550000000", "YES").await;
    assert_eq!(status, 200);
    assert!(body.is_empty());
    assert!(server.channel.sent().is_empty());
}

#[tokio::test]
async fn test_mode_invitations_never_go_live() {
    let server = start_server().await;
    let (_, event_id) = server.seed_invitation().await;

    let (status, report) = server
        .post_json(
            &format!("/api/events/{event_id}/send"),
            json!({"kind": "invitation", "test_mode": true}),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(report, json!({"sent": 1, "failed": 0, "skipped": 0}));

    let sent = server.channel.sent();
    assert_eq!(sent[0].2, SendMode::Test);
    assert!(sent[0].1.contains("Datum: 07.11.2026"));

    let messages = server.get_json("/api/messages").await;
    assert_eq!(messages[0]["status"], "test");
    assert!(
        messages[0]["external_id"]
            .as_str()
            .unwrap()
            .starts_with("test-")
    );
}

#[tokio::test]
async fn later_reply_overwrites_earlier_one() {
    let server = start_server().await;
    let (_, event_id) = server.seed_invitation().await;

    server.webhook("whatsapp:+491234567890", "YES").await;
    server.webhook("whatsapp:+491234567890", "nein").await;

    let stats = server.get_json(&format!("/api/events/{event_id}/stats")).await;
    assert_eq!(stats["interested"], 0);
    assert_eq!(stats["not_interested"], 1);
    assert_eq!(server.get_json("/api/responses").await.as_array().unwrap().len(), 2);
    assert_eq!(server.channel.sent().len(), 2);
}
