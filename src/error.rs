//! Error types for League RSVP.

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}

impl DatabaseError {
    /// Classify a libsql error from a write, surfacing constraint failures separately.
    pub fn from_write(op: &str, err: libsql::Error) -> Self {
        let msg = err.to_string();
        if msg.contains("constraint failed") {
            Self::Constraint(format!("{op}: {msg}"))
        } else {
            Self::Query(format!("{op}: {msg}"))
        }
    }
}

/// Outbound channel errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Failed to send message on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Authentication failed for channel {name}: {reason}")]
    AuthFailed { name: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(String),
}

/// Errors from applying a classified reply to a player's invitation.
#[derive(Debug, thiserror::Error)]
pub enum RsvpError {
    #[error("No invitation found for player {player_id}")]
    NoInvitationFound { player_id: i64 },

    #[error("Persistence failure: {0}")]
    Persistence(#[from] DatabaseError),
}

/// Errors from event and bulk message sends.
#[derive(Debug, thiserror::Error)]
pub enum OutreachError {
    #[error("Event {0} not found")]
    EventNotFound(i64),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}
