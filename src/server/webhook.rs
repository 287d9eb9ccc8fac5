//! Twilio WhatsApp inbound webhook.
//!
//! Always acknowledges with an empty 200 so the provider never retries.

use axum::Form;
use axum::extract::State;
use axum::extract::rejection::FormRejection;
use axum::http::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

use super::AppState;
use crate::pipeline::{InboundReply, IntakeOutcome};

/// Form fields Twilio posts for an inbound message.
#[derive(Debug, Deserialize)]
pub struct WhatsAppWebhook {
    #[serde(rename = "From", default)]
    pub from: String,
    #[serde(rename = "Body", default)]
    pub body: String,
}

/// POST /webhook/whatsapp
pub async fn whatsapp_webhook(
    State(state): State<AppState>,
    form: Result<Form<WhatsAppWebhook>, FormRejection>,
) -> StatusCode {
    let Form(payload) = match form {
        Ok(form) => form,
        Err(e) => {
            warn!(error = %e, "Malformed webhook payload");
            return StatusCode::OK;
        }
    };

    let reply = InboundReply::from_webhook(&payload.from, &payload.body);
    match state.intake.handle(&reply).await {
        IntakeOutcome::Failed(error) => warn!(from = %reply.from, %error, "Inbound reply failed"),
        outcome => debug!(from = %reply.from, ?outcome, "Inbound reply handled"),
    }
    StatusCode::OK
}
