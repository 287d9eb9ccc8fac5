//! WhatsApp channel over the Twilio Messages API.
//!
//! Without credentials, or in [`SendMode::Test`], messages are only logged.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::channels::{OutboundChannel, SendMode, SendResult};
use crate::config::TwilioConfig;
use crate::error::ChannelError;

const CHANNEL_NAME: &str = "whatsapp";
const WHATSAPP_PREFIX: &str = "whatsapp:";

pub struct TwilioWhatsAppChannel {
    config: TwilioConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct MessageCreated {
    sid: String,
}

impl TwilioWhatsAppChannel {
    pub fn new(config: TwilioConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.config.credentials().is_some()
    }

    fn messages_url(&self, account_sid: &str) -> String {
        format!(
            "{}/2010-04-01/Accounts/{account_sid}/Messages.json",
            self.config.api_base
        )
    }

    async fn post_message(
        &self,
        account_sid: &str,
        auth_token: &SecretString,
        to: &str,
        body: &str,
    ) -> Result<String, ChannelError> {
        let to = with_channel_prefix(to);
        let form = [
            ("To", to.as_str()),
            ("From", self.config.from_number.as_str()),
            ("Body", body),
        ];

        let resp = self
            .client
            .post(self.messages_url(account_sid))
            .basic_auth(account_sid, Some(auth_token.expose_secret()))
            .form(&form)
            .send()
            .await
            .map_err(|e| ChannelError::Http(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ChannelError::AuthFailed {
                name: CHANNEL_NAME.into(),
                reason: resp.text().await.unwrap_or_default(),
            });
        }
        if !status.is_success() {
            let err = resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                name: CHANNEL_NAME.into(),
                reason: format!("{status}: {err}"),
            });
        }

        let created: MessageCreated = resp.json().await.map_err(|e| ChannelError::SendFailed {
            name: CHANNEL_NAME.into(),
            reason: format!("unexpected response body: {e}"),
        })?;
        Ok(created.sid)
    }
}

#[async_trait]
impl OutboundChannel for TwilioWhatsAppChannel {
    fn name(&self) -> &str {
        CHANNEL_NAME
    }

    async fn send(&self, to: &str, body: &str, mode: SendMode) -> SendResult {
        let credentials = match (mode, self.config.credentials()) {
            (SendMode::Live, Some(credentials)) => credentials,
            (_, credentials) => {
                tracing::info!(
                    to,
                    body,
                    live_requested = mode == SendMode::Live,
                    has_credentials = credentials.is_some(),
                    "WhatsApp message logged, not sent"
                );
                return SendResult::test_mode();
            }
        };

        let (account_sid, auth_token) = credentials;
        match self.post_message(account_sid, auth_token, to, body).await {
            Ok(sid) => {
                tracing::debug!(to, sid = %sid, "WhatsApp message sent");
                SendResult::sent(sid)
            }
            Err(e) => {
                tracing::warn!(to, error = %e, "WhatsApp send failed");
                SendResult::failed(e.to_string())
            }
        }
    }
}

/// Add the `whatsapp:` address prefix if it is missing.
pub fn with_channel_prefix(number: &str) -> String {
    let number = number.trim();
    if number.starts_with(WHATSAPP_PREFIX) {
        number.to_string()
    } else {
        format!("{WHATSAPP_PREFIX}{number}")
    }
}

/// Remove the `whatsapp:` address prefix, if present.
pub fn strip_channel_prefix(address: &str) -> &str {
    let address = address.trim();
    address
        .strip_prefix(WHATSAPP_PREFIX)
        .map(str::trim)
        .unwrap_or(address)
}
