//! Outbound messaging channels.

pub mod whatsapp;

use async_trait::async_trait;
use serde::Serialize;

use crate::league::DeliveryStatus;

pub use whatsapp::TwilioWhatsAppChannel;

/// Whether a send should reach the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendMode {
    /// Deliver through the provider.
    Live,
    /// Log the message only.
    Test,
}

impl SendMode {
    pub fn from_test_flag(test_mode: bool) -> Self {
        if test_mode { Self::Test } else { Self::Live }
    }
}

/// Outcome status of a single send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SendStatus {
    Sent,
    TestMode,
    Failed,
}

/// Result of one send attempt. Channels never return errors; failures are
/// reported here with `status = Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendResult {
    pub status: SendStatus,
    /// Provider message id, or a synthetic `test-...` id in test mode.
    pub id: Option<String>,
    pub error: Option<String>,
}

impl SendResult {
    pub fn sent(id: impl Into<String>) -> Self {
        Self {
            status: SendStatus::Sent,
            id: Some(id.into()),
            error: None,
        }
    }

    pub fn test_mode() -> Self {
        Self {
            status: SendStatus::TestMode,
            id: Some(format!("test-{}", uuid::Uuid::new_v4())),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: SendStatus::Failed,
            id: None,
            error: Some(error.into()),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.status == SendStatus::Failed
    }

    /// Status to store on the outbound audit row.
    pub fn delivery_status(&self) -> DeliveryStatus {
        match self.status {
            SendStatus::Sent => DeliveryStatus::Sent,
            SendStatus::TestMode => DeliveryStatus::Test,
            SendStatus::Failed => DeliveryStatus::Failed,
        }
    }
}

/// A channel that can deliver a text message to a phone number.
#[async_trait]
pub trait OutboundChannel: Send + Sync {
    /// Channel name for logs.
    fn name(&self) -> &str;

    /// Deliver `body` to `to`. One attempt, no retry.
    async fn send(&self, to: &str, body: &str, mode: SendMode) -> SendResult;
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// A recorded call to [`RecordingChannel::send`].
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SentMessage {
        pub to: String,
        pub body: String,
        pub mode: SendMode,
    }

    /// Channel stub that records every send and answers with a fixed outcome.
    #[derive(Default)]
    pub struct RecordingChannel {
        pub sent: Mutex<Vec<SentMessage>>,
        fail: bool,
    }

    impl RecordingChannel {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        pub fn messages(&self) -> Vec<SentMessage> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl OutboundChannel for RecordingChannel {
        fn name(&self) -> &str {
            "recording"
        }

        async fn send(&self, to: &str, body: &str, mode: SendMode) -> SendResult {
            self.sent.lock().unwrap().push(SentMessage {
                to: to.to_string(),
                body: body.to_string(),
                mode,
            });
            if self.fail {
                SendResult::failed("provider unreachable")
            } else if mode == SendMode::Test {
                SendResult::test_mode()
            } else {
                SendResult::sent("SM-recorded")
            }
        }
    }
}
