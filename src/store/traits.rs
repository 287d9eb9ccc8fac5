//! `Database` trait — single async interface for all league persistence.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::DatabaseError;
use crate::league::{
    Category, DashboardCounts, Event, Invitation, NewEvent, NewOutboundMessage, NewPlayer,
    OutboundMessage, Player, ResponseLog, ResponseStats, ResponseStatus,
};

/// Backend-agnostic database trait covering players, events, invitations,
/// and the inbound/outbound audit logs.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    // ── Players ─────────────────────────────────────────────────────

    /// Register a player. A duplicate phone number is a `Constraint` error.
    async fn create_player(&self, player: &NewPlayer) -> Result<Player, DatabaseError>;

    async fn get_player(&self, id: i64) -> Result<Option<Player>, DatabaseError>;

    /// Look up a player by phone number (no channel prefix).
    async fn get_player_by_phone(&self, phone_number: &str)
    -> Result<Option<Player>, DatabaseError>;

    /// All players, ordered by last then first name.
    async fn list_players(&self) -> Result<Vec<Player>, DatabaseError>;

    /// Newest players first, up to `limit`.
    async fn recent_players(&self, limit: usize) -> Result<Vec<Player>, DatabaseError>;

    /// Replace a player's fields. Returns `None` if the player does not exist.
    async fn update_player(
        &self,
        id: i64,
        player: &NewPlayer,
    ) -> Result<Option<Player>, DatabaseError>;

    /// Delete a player and their invitations. Returns whether a row was removed.
    async fn delete_player(&self, id: i64) -> Result<bool, DatabaseError>;

    // ── Events ──────────────────────────────────────────────────────

    async fn create_event(&self, event: &NewEvent) -> Result<Event, DatabaseError>;

    async fn get_event(&self, id: i64) -> Result<Option<Event>, DatabaseError>;

    /// All events, latest start date first.
    async fn list_events(&self) -> Result<Vec<Event>, DatabaseError>;

    /// Events starting on or after `from`, soonest first, up to `limit`.
    async fn upcoming_events(
        &self,
        from: NaiveDate,
        limit: usize,
    ) -> Result<Vec<Event>, DatabaseError>;

    async fn update_event(&self, id: i64, event: &NewEvent)
    -> Result<Option<Event>, DatabaseError>;

    /// Delete an event with its invitations and outbound messages.
    async fn delete_event(&self, id: i64) -> Result<bool, DatabaseError>;

    // ── Invitations ─────────────────────────────────────────────────

    /// Invite a player to an event. Returns `None` when already invited.
    async fn invite_player(
        &self,
        event_id: i64,
        player_id: i64,
    ) -> Result<Option<Invitation>, DatabaseError>;

    async fn remove_invitation(&self, event_id: i64, player_id: i64)
    -> Result<bool, DatabaseError>;

    async fn get_invitation(&self, id: i64) -> Result<Option<Invitation>, DatabaseError>;

    /// The player's invitation with the largest id.
    async fn latest_invitation_for_player(
        &self,
        player_id: i64,
    ) -> Result<Option<Invitation>, DatabaseError>;

    async fn list_invitations_for_player(
        &self,
        player_id: i64,
    ) -> Result<Vec<Invitation>, DatabaseError>;

    async fn list_invitations_for_event(
        &self,
        event_id: i64,
    ) -> Result<Vec<Invitation>, DatabaseError>;

    /// Staff edit of an invitation's status and notes.
    ///
    /// `None` notes keep the stored notes. The response date is stamped for
    /// any status but `Pending`, which clears it.
    async fn update_invitation(
        &self,
        id: i64,
        status: ResponseStatus,
        notes: Option<&str>,
    ) -> Result<Option<Invitation>, DatabaseError>;

    /// Players invited to an event, in invitation order.
    async fn invited_players(&self, event_id: i64) -> Result<Vec<Player>, DatabaseError>;

    /// Invited players whose invitation is in `status`.
    async fn players_by_response(
        &self,
        event_id: i64,
        status: ResponseStatus,
    ) -> Result<Vec<Player>, DatabaseError>;

    /// Invitation counts per status for one event.
    async fn event_response_stats(&self, event_id: i64) -> Result<ResponseStats, DatabaseError>;

    // ── Inbound responses ───────────────────────────────────────────

    /// Apply a classified reply to the player's latest invitation and append
    /// a processed `ResponseLog` row, in one transaction.
    ///
    /// Returns `Ok(None)` without writing anything when the player has no
    /// invitation. Any failure rolls back both writes.
    async fn record_response(
        &self,
        player_id: i64,
        category: Category,
        raw_text: &str,
    ) -> Result<Option<Invitation>, DatabaseError>;

    /// Newest response log rows first, up to `limit`.
    async fn list_response_logs(&self, limit: usize) -> Result<Vec<ResponseLog>, DatabaseError>;

    // ── Outbound messages ───────────────────────────────────────────

    async fn record_outbound(
        &self,
        message: &NewOutboundMessage,
    ) -> Result<OutboundMessage, DatabaseError>;

    /// Newest outbound messages first, up to `limit`.
    async fn list_outbound_messages(
        &self,
        limit: usize,
    ) -> Result<Vec<OutboundMessage>, DatabaseError>;

    // ── Dashboard ───────────────────────────────────────────────────

    async fn dashboard_counts(&self) -> Result<DashboardCounts, DatabaseError>;
}
