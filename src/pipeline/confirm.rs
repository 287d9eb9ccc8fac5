//! Localized acknowledgment sent after an RSVP is recorded.

use std::sync::Arc;

use tracing::{info, warn};

use crate::channels::{OutboundChannel, SendMode, SendResult};
use crate::league::{Category, Event, NewOutboundMessage, Player};
use crate::store::Database;
use crate::templates::{self, MessageKind, TemplateVars};

/// Sends confirmations over the outbound channel and logs each one.
///
/// Confirmations always go out live. A failed send or a failed audit write
/// is logged and returned, never raised.
pub struct ConfirmationDispatcher {
    db: Arc<dyn Database>,
    channel: Arc<dyn OutboundChannel>,
}

impl ConfirmationDispatcher {
    pub fn new(db: Arc<dyn Database>, channel: Arc<dyn OutboundChannel>) -> Self {
        Self { db, channel }
    }

    pub async fn dispatch(&self, player: &Player, event: &Event, category: Category) -> SendResult {
        let kind = MessageKind::confirmation_for(category);
        let vars = TemplateVars::for_event(event, player.preferred_language);
        let body = templates::render_in(kind, player.preferred_language, &vars);

        let result = self
            .channel
            .send(&player.phone_number, &body, SendMode::Live)
            .await;
        info!(
            player_id = player.id,
            event_id = event.id,
            %category,
            status = ?result.status,
            channel = self.channel.name(),
            "Confirmation dispatched"
        );

        let record = NewOutboundMessage {
            player_id: Some(player.id),
            event_id: Some(event.id),
            content: body,
            status: result.delivery_status(),
            kind,
            external_id: result.id.clone(),
        };
        if let Err(e) = self.db.record_outbound(&record).await {
            warn!(player_id = player.id, error = %e, "Failed to log confirmation");
        }

        result
    }
}
