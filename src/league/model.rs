//! League data model: players, events, invitations, and audit records.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::templates::MessageKind;

/// Languages a player can receive messages in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Language {
    #[default]
    En,
    De,
    Es,
    Fr,
}

impl Language {
    pub const ALL: [Language; 4] = [Language::En, Language::De, Language::Es, Language::Fr];

    /// Two-letter uppercase code as stored in the database.
    pub fn code(&self) -> &'static str {
        match self {
            Self::En => "EN",
            Self::De => "DE",
            Self::Es => "ES",
            Self::Fr => "FR",
        }
    }

    /// Parse a code case-insensitively, falling back to English for anything unsupported.
    pub fn from_code_or_default(code: &str) -> Self {
        code.parse().unwrap_or_default()
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Language {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EN" => Ok(Self::En),
            "DE" => Ok(Self::De),
            "ES" => Ok(Self::Es),
            "FR" => Ok(Self::Fr),
            _ => Err(format!("Unknown language: {}", s)),
        }
    }
}

/// The classified intent of an inbound reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Interested,
    MoreInfo,
    NotInterested,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Interested => "interested",
            Self::MoreInfo => "more_info",
            Self::NotInterested => "not_interested",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "interested" => Ok(Self::Interested),
            "more_info" => Ok(Self::MoreInfo),
            "not_interested" => Ok(Self::NotInterested),
            _ => Err(format!("Unknown category: {}", s)),
        }
    }
}

/// RSVP state carried by an invitation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    #[default]
    Pending,
    Interested,
    MoreInfo,
    NotInterested,
    Confirmed,
}

impl ResponseStatus {
    pub const ALL: [ResponseStatus; 5] = [
        ResponseStatus::Pending,
        ResponseStatus::Interested,
        ResponseStatus::MoreInfo,
        ResponseStatus::NotInterested,
        ResponseStatus::Confirmed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Interested => "interested",
            Self::MoreInfo => "more_info",
            Self::NotInterested => "not_interested",
            Self::Confirmed => "confirmed",
        }
    }
}

impl From<Category> for ResponseStatus {
    fn from(category: Category) -> Self {
        match category {
            Category::Interested => Self::Interested,
            Category::MoreInfo => Self::MoreInfo,
            Category::NotInterested => Self::NotInterested,
        }
    }
}

impl std::fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResponseStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "interested" => Ok(Self::Interested),
            "more_info" => Ok(Self::MoreInfo),
            "not_interested" => Ok(Self::NotInterested),
            "confirmed" => Ok(Self::Confirmed),
            _ => Err(format!("Unknown response status: {}", s)),
        }
    }
}

/// Outcome recorded for an outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Sent,
    Test,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Test => "test",
            Self::Failed => "failed",
        }
    }
}

impl std::str::FromStr for DeliveryStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sent" => Ok(Self::Sent),
            "test" => Ok(Self::Test),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Unknown delivery status: {}", s)),
        }
    }
}

/// A registered league player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    /// Unique lookup key for inbound replies, without channel prefix.
    pub phone_number: String,
    pub email: Option<String>,
    pub skill_level: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub preferred_language: Language,
    pub created_at: DateTime<Utc>,
}

impl Player {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Fields for registering (or editing) a player.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewPlayer {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub skill_level: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub preferred_language: Language,
}

impl NewPlayer {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        phone_number: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            phone_number: phone_number.into(),
            ..Default::default()
        }
    }

    /// Builder: set preferred language.
    pub fn with_language(mut self, language: Language) -> Self {
        self.preferred_language = language;
        self
    }

    /// Builder: set email.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// A league event players are invited to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub location: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields for creating (or editing) an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEvent {
    pub name: String,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    pub location: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewEvent {
    pub fn new(name: impl Into<String>, start_date: NaiveDate, location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start_date,
            end_date: None,
            location: location.into(),
            description: None,
        }
    }

    /// Builder: set end date.
    pub fn with_end_date(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    /// Builder: set description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// One player asked to one event, carrying the RSVP state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invitation {
    pub id: i64,
    pub event_id: i64,
    pub player_id: i64,
    pub response_status: ResponseStatus,
    pub response_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Audit row for an inbound reply that was recognized and applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseLog {
    pub id: i64,
    pub player_id: Option<i64>,
    pub event_id: Option<i64>,
    pub response_text: String,
    pub response_type: Category,
    pub received_at: DateTime<Utc>,
    pub processed: bool,
}

/// Audit row for every message sent through the outbound channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub id: i64,
    pub player_id: Option<i64>,
    pub event_id: Option<i64>,
    pub content: String,
    pub direction: String,
    pub status: DeliveryStatus,
    pub kind: MessageKind,
    /// Provider message id (Twilio SID), when the provider returned one.
    pub external_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub sent_at: DateTime<Utc>,
}

/// Fields for logging an outbound message.
#[derive(Debug, Clone)]
pub struct NewOutboundMessage {
    pub player_id: Option<i64>,
    pub event_id: Option<i64>,
    pub content: String,
    pub status: DeliveryStatus,
    pub kind: MessageKind,
    pub external_id: Option<String>,
}

/// Invitation counts per response status for one event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseStats {
    pub pending: u64,
    pub interested: u64,
    pub more_info: u64,
    pub not_interested: u64,
    pub confirmed: u64,
}

impl ResponseStats {
    /// Add `count` invitations in `status`.
    pub fn add(&mut self, status: ResponseStatus, count: u64) {
        match status {
            ResponseStatus::Pending => self.pending += count,
            ResponseStatus::Interested => self.interested += count,
            ResponseStatus::MoreInfo => self.more_info += count,
            ResponseStatus::NotInterested => self.not_interested += count,
            ResponseStatus::Confirmed => self.confirmed += count,
        }
    }

    pub fn total(&self) -> u64 {
        self.pending + self.interested + self.more_info + self.not_interested + self.confirmed
    }
}

/// Headline totals for the staff dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardCounts {
    pub players: u64,
    pub events: u64,
    pub messages: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_parse_is_case_insensitive() {
        assert_eq!("de".parse::<Language>().unwrap(), Language::De);
        assert_eq!(" FR ".parse::<Language>().unwrap(), Language::Fr);
        assert!("IT".parse::<Language>().is_err());
    }

    #[test]
    fn unsupported_language_defaults_to_english() {
        assert_eq!(Language::from_code_or_default("IT"), Language::En);
        assert_eq!(Language::from_code_or_default(""), Language::En);
    }

    #[test]
    fn language_serializes_as_code() {
        assert_eq!(serde_json::to_string(&Language::Es).unwrap(), "\"ES\"");
        let parsed: Language = serde_json::from_str("\"DE\"").unwrap();
        assert_eq!(parsed, Language::De);
    }

    #[test]
    fn category_maps_onto_response_status() {
        assert_eq!(ResponseStatus::from(Category::Interested), ResponseStatus::Interested);
        assert_eq!(ResponseStatus::from(Category::MoreInfo), ResponseStatus::MoreInfo);
        assert_eq!(
            ResponseStatus::from(Category::NotInterested),
            ResponseStatus::NotInterested
        );
    }

    #[test]
    fn response_status_strings_match_category_strings() {
        for category in [Category::Interested, Category::MoreInfo, Category::NotInterested] {
            assert_eq!(ResponseStatus::from(category).as_str(), category.as_str());
        }
    }

    #[test]
    fn response_status_parse_rejects_unknown() {
        for status in ResponseStatus::ALL {
            assert_eq!(status.as_str().parse::<ResponseStatus>().unwrap(), status);
        }
        assert!("maybe".parse::<ResponseStatus>().is_err());
    }

    #[test]
    fn stats_total_sums_all_buckets() {
        let mut stats = ResponseStats::default();
        stats.add(ResponseStatus::Pending, 3);
        stats.add(ResponseStatus::Interested, 2);
        stats.add(ResponseStatus::Confirmed, 1);
        assert_eq!(stats.pending, 3);
        assert_eq!(stats.total(), 6);
    }
}
