//! Applies a classified reply to the sender's most recent invitation.

use tracing::{info, warn};

use crate::error::RsvpError;
use crate::league::{Category, Invitation, Player};
use crate::store::Database;

/// Record `category` on the player's newest invitation and append the audit row.
///
/// Both writes commit together or not at all. The caller sends any
/// confirmation after this returns.
pub async fn apply_response(
    db: &dyn Database,
    player: &Player,
    category: Category,
    raw_text: &str,
) -> Result<Invitation, RsvpError> {
    match db.record_response(player.id, category, raw_text).await {
        Ok(Some(invitation)) => {
            info!(
                player_id = player.id,
                event_id = invitation.event_id,
                %category,
                "RSVP recorded"
            );
            Ok(invitation)
        }
        Ok(None) => {
            info!(player_id = player.id, "No invitation found for reply");
            Err(RsvpError::NoInvitationFound {
                player_id: player.id,
            })
        }
        Err(e) => {
            warn!(player_id = player.id, error = %e, "RSVP update rolled back");
            Err(RsvpError::Persistence(e))
        }
    }
}
