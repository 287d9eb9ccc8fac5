//! Configuration types.

use std::net::SocketAddr;
use std::path::PathBuf;

use secrecy::SecretString;

use crate::error::ConfigError;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_DB_PATH: &str = "./data/league-rsvp.db";
const DEFAULT_WHATSAPP_NUMBER: &str = "whatsapp:+14155238886";
const DEFAULT_TWILIO_API_BASE: &str = "https://api.twilio.com";

/// Service configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Port the HTTP server binds on 0.0.0.0.
    pub port: u16,
    /// Path of the libSQL database file.
    pub db_path: PathBuf,
    /// Outbound WhatsApp channel settings.
    pub twilio: TwilioConfig,
}

/// Twilio WhatsApp credentials and endpoint.
///
/// Credentials are optional: without them the channel only logs messages.
#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: Option<String>,
    pub auth_token: Option<SecretString>,
    /// Sender number, `whatsapp:`-prefixed.
    pub from_number: String,
    /// Base URL of the Twilio REST API.
    pub api_base: String,
}

impl Default for TwilioConfig {
    fn default() -> Self {
        Self {
            account_sid: None,
            auth_token: None,
            from_number: DEFAULT_WHATSAPP_NUMBER.to_string(),
            api_base: DEFAULT_TWILIO_API_BASE.to_string(),
        }
    }
}

impl TwilioConfig {
    /// Account SID and auth token, if both are configured.
    pub fn credentials(&self) -> Option<(&str, &SecretString)> {
        match (&self.account_sid, &self.auth_token) {
            (Some(sid), Some(token)) => Some((sid.as_str(), token)),
            _ => None,
        }
    }
}

impl AppConfig {
    /// Build config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match non_empty("LEAGUE_RSVP_PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| ConfigError::InvalidValue {
                key: "LEAGUE_RSVP_PORT".to_string(),
                message: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        let db_path = non_empty("LEAGUE_RSVP_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));

        let from_number = non_empty("TWILIO_WHATSAPP_NUMBER")
            .unwrap_or_else(|| DEFAULT_WHATSAPP_NUMBER.to_string());
        if !from_number.starts_with("whatsapp:") {
            return Err(ConfigError::InvalidValue {
                key: "TWILIO_WHATSAPP_NUMBER".to_string(),
                message: format!("expected a whatsapp:-prefixed number, got {from_number}"),
            });
        }

        let twilio = TwilioConfig {
            account_sid: non_empty("TWILIO_ACCOUNT_SID"),
            auth_token: non_empty("TWILIO_AUTH_TOKEN").map(SecretString::from),
            from_number,
            api_base: non_empty("TWILIO_API_BASE")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_TWILIO_API_BASE.to_string()),
        };

        Ok(Self {
            port,
            db_path,
            twilio,
        })
    }

    /// Socket address the server listens on.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_set() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.db_path, PathBuf::from("./data/league-rsvp.db"));
        assert_eq!(config.twilio.from_number, "whatsapp:+14155238886");
        assert!(config.twilio.credentials().is_none());
    }

    #[test]
    fn reads_credentials() {
        let config = AppConfig::from_lookup(lookup(&[
            ("TWILIO_ACCOUNT_SID", "AC123"),
            ("TWILIO_AUTH_TOKEN", "secret"),
            ("TWILIO_API_BASE", "http://localhost:9999/"),
        ]))
        .unwrap();
        let (sid, token) = config.twilio.credentials().unwrap();
        assert_eq!(sid, "AC123");
        assert_eq!(token.expose_secret(), "secret");
        assert_eq!(config.twilio.api_base, "http://localhost:9999");
    }

    #[test]
    fn sid_without_token_has_no_credentials() {
        let config =
            AppConfig::from_lookup(lookup(&[("TWILIO_ACCOUNT_SID", "AC123")])).unwrap();
        assert!(config.twilio.credentials().is_none());
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = AppConfig::from_lookup(lookup(&[
            ("LEAGUE_RSVP_PORT", "  "),
            ("TWILIO_AUTH_TOKEN", ""),
        ]))
        .unwrap();
        assert_eq!(config.port, 5000);
        assert!(config.twilio.auth_token.is_none());
    }

    #[test]
    fn invalid_port_is_rejected() {
        let err = AppConfig::from_lookup(lookup(&[("LEAGUE_RSVP_PORT", "not-a-port")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "LEAGUE_RSVP_PORT"));
    }

    #[test]
    fn sender_number_needs_channel_prefix() {
        let err = AppConfig::from_lookup(lookup(&[("TWILIO_WHATSAPP_NUMBER", "+14155238886")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn bind_addr_uses_port() {
        let config = AppConfig::from_lookup(lookup(&[("LEAGUE_RSVP_PORT", "8080")])).unwrap();
        assert_eq!(config.bind_addr().port(), 8080);
    }
}
