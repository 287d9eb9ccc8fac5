//! Event notifications and bulk messages sent by league staff.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::channels::{OutboundChannel, SendMode};
use crate::error::OutreachError;
use crate::league::{NewOutboundMessage, Player};
use crate::store::Database;
use crate::templates::{self, MessageKind, TemplateVars};

/// Tally of one outreach run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutreachReport {
    /// Messages sent live or logged in test mode.
    pub sent: usize,
    pub failed: usize,
    /// Requested player ids that did not exist.
    pub skipped: usize,
}

pub struct Outreach {
    db: Arc<dyn Database>,
    channel: Arc<dyn OutboundChannel>,
}

impl Outreach {
    pub fn new(db: Arc<dyn Database>, channel: Arc<dyn OutboundChannel>) -> Self {
        Self { db, channel }
    }

    /// Send `kind` to every player invited to the event, each in their own language.
    ///
    /// `message` fills the `{message}` slot of update templates and is the
    /// whole body for `custom`.
    pub async fn send_event_messages(
        &self,
        event_id: i64,
        kind: MessageKind,
        message: Option<&str>,
        test_mode: bool,
    ) -> Result<OutreachReport, OutreachError> {
        let message = message.unwrap_or_default().trim();
        match kind {
            MessageKind::Invitation | MessageKind::Reminder => {}
            MessageKind::Update | MessageKind::Custom if !message.is_empty() => {}
            MessageKind::Update | MessageKind::Custom => {
                return Err(OutreachError::InvalidRequest(format!(
                    "{kind} messages need a message text"
                )));
            }
            _ => {
                return Err(OutreachError::InvalidRequest(format!(
                    "{kind} cannot be sent to an event"
                )));
            }
        }

        let event = self
            .db
            .get_event(event_id)
            .await?
            .ok_or(OutreachError::EventNotFound(event_id))?;
        let players = self.db.invited_players(event_id).await?;
        info!(
            event_id,
            %kind,
            players = players.len(),
            test_mode,
            "Sending event messages"
        );

        let mode = SendMode::from_test_flag(test_mode);
        let mut report = OutreachReport::default();
        for player in &players {
            let language = player.preferred_language;
            let vars = TemplateVars::for_event(&event, language).with_message(message);
            let body = templates::render_in(kind, language, &vars);
            self.deliver(player, Some(event.id), kind, body, mode, &mut report)
                .await;
        }

        info!(event_id, sent = report.sent, failed = report.failed, "Event messages done");
        Ok(report)
    }

    /// Send a custom message to each listed player. Unknown ids are skipped.
    pub async fn send_bulk(
        &self,
        player_ids: &[i64],
        message: &str,
        test_mode: bool,
    ) -> Result<OutreachReport, OutreachError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(OutreachError::InvalidRequest("message is required".into()));
        }
        if player_ids.is_empty() {
            return Err(OutreachError::InvalidRequest("no players selected".into()));
        }

        let mode = SendMode::from_test_flag(test_mode);
        let mut report = OutreachReport::default();
        for &player_id in player_ids {
            let Some(player) = self.db.get_player(player_id).await? else {
                warn!(player_id, "Bulk message skipped unknown player");
                report.skipped += 1;
                continue;
            };
            self.deliver(
                &player,
                None,
                MessageKind::Custom,
                message.to_string(),
                mode,
                &mut report,
            )
            .await;
        }

        info!(
            sent = report.sent,
            failed = report.failed,
            skipped = report.skipped,
            test_mode,
            "Bulk message done"
        );
        Ok(report)
    }

    async fn deliver(
        &self,
        player: &Player,
        event_id: Option<i64>,
        kind: MessageKind,
        body: String,
        mode: SendMode,
        report: &mut OutreachReport,
    ) {
        let result = self.channel.send(&player.phone_number, &body, mode).await;
        if result.is_failure() {
            report.failed += 1;
            warn!(
                player_id = player.id,
                error = result.error.as_deref().unwrap_or_default(),
                "Outbound message failed"
            );
        } else {
            report.sent += 1;
        }

        let record = NewOutboundMessage {
            player_id: Some(player.id),
            event_id,
            content: body,
            status: result.delivery_status(),
            kind,
            external_id: result.id,
        };
        if let Err(e) = self.db.record_outbound(&record).await {
            warn!(player_id = player.id, error = %e, "Failed to log outbound message");
        }
    }
}
