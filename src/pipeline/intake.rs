//! Inbound reply handling: sender lookup, classification, state update,
//! confirmation.

use std::sync::Arc;

use tracing::{info, warn};

use crate::channels::whatsapp::strip_channel_prefix;
use crate::channels::{OutboundChannel, SendResult};
use crate::error::RsvpError;
use crate::league::Invitation;
use crate::pipeline::classifier::classify;
use crate::pipeline::confirm::ConfirmationDispatcher;
use crate::pipeline::updater::apply_response;
use crate::store::Database;

/// An inbound reply as delivered by the messaging provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundReply {
    /// Sender phone number without the channel prefix.
    pub from: String,
    /// Message text exactly as received.
    pub body: String,
}

impl InboundReply {
    pub fn new(from: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            body: body.into(),
        }
    }

    /// Build from raw webhook fields such as `From=whatsapp:+49...`.
    pub fn from_webhook(from: &str, body: &str) -> Self {
        Self::new(strip_channel_prefix(from), body)
    }
}

/// What happened to one inbound reply.
#[derive(Debug, Clone, PartialEq)]
pub enum IntakeOutcome {
    /// No player has the sender's phone number.
    UnknownSender,
    /// The text matched no reply vocabulary.
    Unrecognized,
    /// The player has never been invited to anything.
    NoInvitation,
    /// The invitation was updated and a confirmation sent (or attempted).
    Recorded {
        invitation: Invitation,
        confirmation: SendResult,
    },
    /// A storage error; nothing was changed.
    Failed(String),
}

/// Runs the full intake flow for inbound replies.
pub struct RsvpIntake {
    db: Arc<dyn Database>,
    dispatcher: ConfirmationDispatcher,
}

impl RsvpIntake {
    pub fn new(db: Arc<dyn Database>, channel: Arc<dyn OutboundChannel>) -> Self {
        let dispatcher = ConfirmationDispatcher::new(Arc::clone(&db), channel);
        Self { db, dispatcher }
    }

    /// Process one reply. Never fails: every outcome is reported and logged.
    pub async fn handle(&self, reply: &InboundReply) -> IntakeOutcome {
        let player = match self.db.get_player_by_phone(&reply.from).await {
            Ok(Some(player)) => player,
            Ok(None) => {
                info!(from = %reply.from, "Reply from unknown sender");
                return IntakeOutcome::UnknownSender;
            }
            Err(e) => {
                warn!(from = %reply.from, error = %e, "Sender lookup failed");
                return IntakeOutcome::Failed(e.to_string());
            }
        };

        let Some(category) = classify(&reply.body) else {
            info!(player_id = player.id, body = %reply.body, "Unrecognized reply");
            return IntakeOutcome::Unrecognized;
        };

        let invitation = match apply_response(self.db.as_ref(), &player, category, &reply.body).await
        {
            Ok(invitation) => invitation,
            Err(RsvpError::NoInvitationFound { .. }) => return IntakeOutcome::NoInvitation,
            Err(e) => return IntakeOutcome::Failed(e.to_string()),
        };

        let confirmation = match self.db.get_event(invitation.event_id).await {
            Ok(Some(event)) => self.dispatcher.dispatch(&player, &event, category).await,
            Ok(None) => SendResult::failed(format!("event {} not found", invitation.event_id)),
            Err(e) => SendResult::failed(e.to_string()),
        };
        if let Some(ref error) = confirmation.error {
            warn!(player_id = player.id, error = %error, "Confirmation not delivered");
        }

        IntakeOutcome::Recorded {
            invitation,
            confirmation,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::channels::testing::RecordingChannel;
    use crate::channels::{SendMode, SendStatus};
    use crate::league::{Category, Language, NewEvent, NewPlayer, ResponseStatus};
    use crate::store::LibSqlBackend;

    struct Harness {
        _dir: tempfile::TempDir,
        db: Arc<LibSqlBackend>,
        channel: Arc<RecordingChannel>,
        intake: RsvpIntake,
    }

    async fn harness(channel: RecordingChannel) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(
            LibSqlBackend::new_local(&dir.path().join("intake.db"))
                .await
                .unwrap(),
        );
        let channel = Arc::new(channel);
        let intake = RsvpIntake::new(db.clone(), channel.clone());
        Harness {
            _dir: dir,
            db,
            channel,
            intake,
        }
    }

    async fn invited_player(h: &Harness) -> (i64, i64) {
        let player = h
            .db
            .create_player(
                &NewPlayer::new("Jonas", "Keller", "+491234567890").with_language(Language::De),
            )
            .await
            .unwrap();
        let event = h
            .db
            .create_event(&NewEvent::new(
                "Hamburg Masters",
                NaiveDate::from_ymd_opt(2026, 8, 15).unwrap(),
                "Hamburg",
            ))
            .await
            .unwrap();
        h.db.invite_player(event.id, player.id).await.unwrap();
        (player.id, event.id)
    }

    #[test]
    fn webhook_sender_prefix_is_stripped() {
        let reply = InboundReply::from_webhook("whatsapp:+491234567890", " JA ");
        assert_eq!(reply.from, "+491234567890");
        assert_eq!(reply.body, " JA ");
    }

    #[tokio::test]
    async fn german_yes_is_recorded_and_confirmed() {
        let h = harness(RecordingChannel::new()).await;
        let (player_id, event_id) = invited_player(&h).await;

        let outcome = h
            .intake
            .handle(&InboundReply::from_webhook("whatsapp:+491234567890", "JA bin dabei"))
            .await;

        let IntakeOutcome::Recorded {
            invitation,
            confirmation,
        } = outcome
        else {
            panic!("expected Recorded");
        };
        assert_eq!(invitation.event_id, event_id);
        assert_eq!(invitation.response_status, ResponseStatus::Interested);
        assert_eq!(confirmation.status, SendStatus::Sent);

        let logs = h.db.list_response_logs(10).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].player_id, Some(player_id));
        assert_eq!(logs[0].response_type, Category::Interested);

        let sent = h.channel.messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].mode, SendMode::Live);
        assert!(sent[0].body.starts_with("✅ Super! Danke für dein Interesse an Hamburg Masters."));
    }

    #[tokio::test]
    async fn unknown_sender_is_ignored() {
        let h = harness(RecordingChannel::new()).await;
        invited_player(&h).await;

        let outcome = h.intake.handle(&InboundReply::new("+15550000", "YES")).await;
        assert_eq!(outcome, IntakeOutcome::UnknownSender);
        assert!(h.channel.messages().is_empty());
    }

    #[tokio::test]
    async fn unrecognized_text_changes_nothing() {
        let h = harness(RecordingChannel::new()).await;
        let (player_id, _) = invited_player(&h).await;

        let outcome = h.intake.handle(&InboundReply::new("+491234567890", "WARUM")).await;
        assert_eq!(outcome, IntakeOutcome::Unrecognized);

        let invitation = h
            .db
            .latest_invitation_for_player(player_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(invitation.response_status, ResponseStatus::Pending);
        assert!(h.db.list_response_logs(10).await.unwrap().is_empty());
        assert!(h.channel.messages().is_empty());
    }

    #[tokio::test]
    async fn player_without_invitation() {
        let h = harness(RecordingChannel::new()).await;
        h.db.create_player(&NewPlayer::new("Solo", "Player", "+4900"))
            .await
            .unwrap();

        let outcome = h.intake.handle(&InboundReply::new("+4900", "nein")).await;
        assert_eq!(outcome, IntakeOutcome::NoInvitation);
        assert!(h.channel.messages().is_empty());
    }

    #[tokio::test]
    async fn storage_failure_sends_no_confirmation() {
        let h = harness(RecordingChannel::new()).await;
        let (player_id, _) = invited_player(&h).await;
        h.db.fail_response_log_inserts().await;

        let outcome = h.intake.handle(&InboundReply::new("+491234567890", "JA")).await;
        assert!(matches!(outcome, IntakeOutcome::Failed(_)));
        assert!(h.channel.messages().is_empty());

        let invitation = h
            .db
            .latest_invitation_for_player(player_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(invitation.response_status, ResponseStatus::Pending);
        assert!(invitation.response_date.is_none());
        assert!(h.db.list_outbound_messages(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_confirmation_keeps_the_recorded_response() {
        let h = harness(RecordingChannel::failing()).await;
        let (player_id, _) = invited_player(&h).await;

        let outcome = h.intake.handle(&InboundReply::new("+491234567890", "mehr")).await;
        let IntakeOutcome::Recorded { confirmation, .. } = outcome else {
            panic!("expected Recorded");
        };
        assert!(confirmation.is_failure());

        let invitation = h
            .db
            .latest_invitation_for_player(player_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(invitation.response_status, ResponseStatus::MoreInfo);
        assert_eq!(h.db.list_response_logs(10).await.unwrap().len(), 1);
    }
}
