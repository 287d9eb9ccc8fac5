//! HTTP server: inbound webhook, health check, and the staff JSON API.

pub mod api;
pub mod webhook;

use std::sync::Arc;

use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::trace::TraceLayer;

use crate::channels::OutboundChannel;
use crate::pipeline::{Outreach, RsvpIntake};
use crate::store::Database;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn Database>,
    pub intake: Arc<RsvpIntake>,
    pub outreach: Arc<Outreach>,
}

impl AppState {
    pub fn new(db: Arc<dyn Database>, channel: Arc<dyn OutboundChannel>) -> Self {
        Self {
            intake: Arc::new(RsvpIntake::new(Arc::clone(&db), Arc::clone(&channel))),
            outreach: Arc::new(Outreach::new(Arc::clone(&db), channel)),
            db,
        }
    }
}

/// Build the full router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/webhook/whatsapp", post(webhook::whatsapp_webhook))
        .merge(api::api_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "league-rsvp"
    }))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::channels::testing::RecordingChannel;
    use crate::store::LibSqlBackend;

    pub struct TestApp {
        pub _dir: tempfile::TempDir,
        pub db: Arc<LibSqlBackend>,
        pub channel: Arc<RecordingChannel>,
        pub router: Router,
    }

    pub async fn test_app() -> TestApp {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(
            LibSqlBackend::new_local(&dir.path().join("server.db"))
                .await
                .unwrap(),
        );
        let channel = Arc::new(RecordingChannel::new());
        let router = router(AppState::new(db.clone(), channel.clone()));
        TestApp {
            _dir: dir,
            db,
            channel,
            router,
        }
    }

    impl TestApp {
        pub async fn request(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            (status, bytes.to_vec())
        }

        pub async fn json(
            &self,
            method: &str,
            uri: &str,
            body: Option<serde_json::Value>,
        ) -> (StatusCode, serde_json::Value) {
            let builder = Request::builder().method(method).uri(uri);
            let request = match body {
                Some(body) => builder
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };
            let (status, bytes) = self.request(request).await;
            let value = if bytes.is_empty() {
                serde_json::Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, value)
        }
    }
}
