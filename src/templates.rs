//! Outbound message templates, keyed by message kind and language.
//!
//! Every kind except `Custom` has a template for every supported language;
//! `template_for` falls back to English if one is ever missing. `Custom`
//! passes the caller's message through untouched.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::league::{Category, Event, Language};

/// Kinds of outbound message the service sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Invitation,
    Reminder,
    Update,
    Custom,
    ConfirmationInterested,
    ConfirmationMoreInfo,
    ConfirmationNotInterested,
}

impl MessageKind {
    pub const ALL: [MessageKind; 7] = [
        MessageKind::Invitation,
        MessageKind::Reminder,
        MessageKind::Update,
        MessageKind::Custom,
        MessageKind::ConfirmationInterested,
        MessageKind::ConfirmationMoreInfo,
        MessageKind::ConfirmationNotInterested,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invitation => "invitation",
            Self::Reminder => "reminder",
            Self::Update => "update",
            Self::Custom => "custom",
            Self::ConfirmationInterested => "confirmation_interested",
            Self::ConfirmationMoreInfo => "confirmation_more_info",
            Self::ConfirmationNotInterested => "confirmation_not_interested",
        }
    }

    /// The acknowledgment template for a classified reply.
    pub fn confirmation_for(category: Category) -> Self {
        match category {
            Category::Interested => Self::ConfirmationInterested,
            Category::MoreInfo => Self::ConfirmationMoreInfo,
            Category::NotInterested => Self::ConfirmationNotInterested,
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MessageKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MessageKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("Unknown message kind: {}", s))
    }
}

/// Fill-in values for a template. Empty fields render as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateVars {
    pub event_name: String,
    pub start_date: String,
    /// Pre-composed "End: ..." line including its newline, or empty.
    pub end_date_line: String,
    pub location: String,
    pub description: String,
    pub message: String,
}

impl TemplateVars {
    /// Variables for an event, formatted for `language`.
    pub fn for_event(event: &Event, language: Language) -> Self {
        let end_date = event.end_date.map(|d| d.format("%d.%m.%Y").to_string());
        Self {
            event_name: event.name.clone(),
            start_date: event.start_date.format("%d.%m.%Y").to_string(),
            end_date_line: end_date_line(language, end_date.as_deref()),
            location: event.location.clone(),
            description: event.description.clone().unwrap_or_default(),
            message: String::new(),
        }
    }

    /// Builder: set the free-text message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    fn get(&self, name: &str) -> &str {
        match name {
            "event_name" => &self.event_name,
            "start_date" => &self.start_date,
            "end_date_line" => &self.end_date_line,
            "location" => &self.location,
            "description" => &self.description,
            "message" => &self.message,
            _ => "",
        }
    }
}

/// Localized "End: <date>" line, or an empty string when there is no end date.
pub fn end_date_line(language: Language, end_date: Option<&str>) -> String {
    let Some(date) = end_date.filter(|d| !d.is_empty()) else {
        return String::new();
    };
    let label = match language {
        Language::En => "End: ",
        Language::De => "Ende: ",
        Language::Es | Language::Fr => "Fin: ",
    };
    format!("{label}{date}\n")
}

/// Render `kind` for a language code such as `"DE"`. Unsupported codes render in English.
pub fn render(kind: MessageKind, language: &str, vars: &TemplateVars) -> String {
    render_in(kind, Language::from_code_or_default(language), vars)
}

/// Render `kind` in `language`.
pub fn render_in(kind: MessageKind, language: Language, vars: &TemplateVars) -> String {
    if kind == MessageKind::Custom {
        return vars.message.clone();
    }
    let template = template_for(kind, language)
        .or_else(|| template_for(kind, Language::En))
        .unwrap_or_default();
    fill(template, vars)
}

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-z_]+)\}").expect("placeholder regex is valid"));

/// Single-pass substitution: substituted values are never re-scanned.
fn fill(template: &str, vars: &TemplateVars) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| vars.get(&caps[1]).to_string())
        .into_owned()
}

/// Template text for a (kind, language) pair. `Custom` has no template.
pub fn template_for(kind: MessageKind, language: Language) -> Option<&'static str> {
    use Language::*;
    use MessageKind::*;

    let text = match (kind, language) {
        (Custom, _) => return None,

        (Invitation, En) => INVITATION_EN,
        (Invitation, De) => INVITATION_DE,
        (Invitation, Es) => INVITATION_ES,
        (Invitation, Fr) => INVITATION_FR,

        (Reminder, En) => REMINDER_EN,
        (Reminder, De) => REMINDER_DE,
        (Reminder, Es) => REMINDER_ES,
        (Reminder, Fr) => REMINDER_FR,

        (Update, En) | (Update, De) => "*** UPDATE: {event_name} ***\n\n{message}\n\nWPC Series Europe",
        (Update, Es) => "*** ACTUALIZACION: {event_name} ***\n\n{message}\n\nWPC Series Europe",
        (Update, Fr) => "*** MISE A JOUR: {event_name} ***\n\n{message}\n\nWPC Series Europe",

        // Interested and more-info replies get the same acknowledgment.
        (ConfirmationInterested | ConfirmationMoreInfo, En) => THANKS_EN,
        (ConfirmationInterested | ConfirmationMoreInfo, De) => THANKS_DE,
        (ConfirmationInterested | ConfirmationMoreInfo, Es) => THANKS_ES,
        (ConfirmationInterested | ConfirmationMoreInfo, Fr) => THANKS_FR,

        (ConfirmationNotInterested, En) => DECLINED_EN,
        (ConfirmationNotInterested, De) => DECLINED_DE,
        (ConfirmationNotInterested, Es) => DECLINED_ES,
        (ConfirmationNotInterested, Fr) => DECLINED_FR,
    };
    Some(text)
}

const INVITATION_EN: &str = "\
*** {event_name} ***

Date: {start_date}
{end_date_line}Location: {location}

{description}

----------------------------------
Please reply with:

YES - I'm interested
INFO - Send me more details
NO - Not interested

Looking forward to hearing from you!

WPC Series Europe";

const INVITATION_DE: &str = "\
*** {event_name} ***

Datum: {start_date}
{end_date_line}Ort: {location}

{description}

----------------------------------
Bitte antworte mit:

JA - Ich bin interessiert
INFO - Schick mir mehr Details
NEIN - Nicht interessiert

Wir freuen uns auf deine Antwort!

WPC Series Europe";

const INVITATION_ES: &str = "\
*** {event_name} ***

Fecha: {start_date}
{end_date_line}Lugar: {location}

{description}

----------------------------------
Por favor responde con:

SI - Estoy interesado
INFO - Enviame mas detalles
NO - No estoy interesado

Esperamos tu respuesta!

WPC Series Europe";

const INVITATION_FR: &str = "\
*** {event_name} ***

Date: {start_date}
{end_date_line}Lieu: {location}

{description}

----------------------------------
Veuillez repondre avec:

OUI - Je suis interesse
INFO - Envoyez-moi plus de details
NON - Pas interesse

Au plaisir de vous lire!

WPC Series Europe";

const REMINDER_EN: &str = "\
*** REMINDER: {event_name} ***

Date: {start_date}
{end_date_line}Location: {location}

Don't forget to confirm your participation!

Reply with:
YES - Confirmed
NO - Cancel

WPC Series Europe";

const REMINDER_DE: &str = "\
*** ERINNERUNG: {event_name} ***

Datum: {start_date}
{end_date_line}Ort: {location}

Vergiss nicht, deine Teilnahme zu bestatigen!

Antworte mit:
JA - Bestatigt
NEIN - Absagen

WPC Series Europe";

const REMINDER_ES: &str = "\
*** RECORDATORIO: {event_name} ***

Fecha: {start_date}
{end_date_line}Lugar: {location}

No olvides confirmar tu participacion!

Responde con:
SI - Confirmado
NO - Cancelar

WPC Series Europe";

const REMINDER_FR: &str = "\
*** RAPPEL: {event_name} ***

Date: {start_date}
{end_date_line}Lieu: {location}

N'oubliez pas de confirmer votre participation!

Repondez avec:
OUI - Confirme
NON - Annuler

WPC Series Europe";

const THANKS_EN: &str = "\
✅ Great! Thank you for your interest in {event_name}.

We will contact you soon with more details.

WPC Series Europe";

const THANKS_DE: &str = "\
✅ Super! Danke für dein Interesse an {event_name}.

Wir melden uns bald mit weiteren Details.

WPC Series Europe";

const THANKS_ES: &str = "\
✅ ¡Genial! Gracias por tu interés en {event_name}.

Te contactaremos pronto con más detalles.

WPC Series Europe";

const THANKS_FR: &str = "\
✅ Super! Merci pour votre intérêt pour {event_name}.

Nous vous contacterons bientôt avec plus de détails.

WPC Series Europe";

const DECLINED_EN: &str = "\
👋 Understood. Thank you for your response.

We'll keep you informed about future events.

See you soon!

WPC Series Europe";

const DECLINED_DE: &str = "\
👋 Verstanden. Danke für deine Rückmeldung.

Wir halten dich über zukünftige Events auf dem Laufenden.

Bis bald!

WPC Series Europe";

const DECLINED_ES: &str = "\
👋 Entendido. Gracias por tu respuesta.

Te mantendremos informado sobre futuros eventos.

¡Hasta pronto!

WPC Series Europe";

const DECLINED_FR: &str = "\
👋 Compris. Merci pour votre réponse.

Nous vous tiendrons informé des événements futurs.

À bientôt!

WPC Series Europe";

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use super::*;

    fn vars() -> TemplateVars {
        TemplateVars {
            event_name: "Berlin Open".into(),
            start_date: "01.06.2026".into(),
            end_date_line: String::new(),
            location: "Tempelhof".into(),
            description: "Doubles only".into(),
            message: String::new(),
        }
    }

    #[test]
    fn every_kind_has_every_language() {
        for kind in MessageKind::ALL {
            for language in Language::ALL {
                let template = template_for(kind, language);
                if kind == MessageKind::Custom {
                    assert!(template.is_none());
                } else {
                    assert!(template.is_some(), "{kind} missing for {language}");
                }
            }
        }
    }

    #[test]
    fn german_invitation_is_interpolated() {
        let text = render(MessageKind::Invitation, "DE", &vars());
        assert!(text.starts_with("*** Berlin Open ***\n\nDatum: 01.06.2026\nOrt: Tempelhof\n"));
        assert!(text.contains("\nDoubles only\n"));
        assert!(text.contains("JA - Ich bin interessiert"));
        assert!(!text.contains('{'));
    }

    #[test]
    fn unsupported_language_falls_back_to_english() {
        let italian = render(MessageKind::Invitation, "IT", &vars());
        let english = render(MessageKind::Invitation, "EN", &vars());
        assert_eq!(italian, english);
        assert!(english.contains("Location: Tempelhof"));
    }

    #[test]
    fn custom_passes_message_through() {
        let v = vars().with_message("Courts moved to {location}");
        assert_eq!(
            render(MessageKind::Custom, "FR", &v),
            "Courts moved to {location}"
        );
    }

    #[test]
    fn missing_variables_render_empty() {
        let text = render(MessageKind::Update, "EN", &TemplateVars::default());
        assert_eq!(text, "*** UPDATE:  ***\n\n\n\nWPC Series Europe");
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let mut v = vars();
        v.event_name = "{location}".into();
        let text = render(MessageKind::ConfirmationInterested, "EN", &v);
        assert!(text.contains("interest in {location}."));
    }

    #[test]
    fn end_date_line_is_localized() {
        assert_eq!(end_date_line(Language::En, Some("02.06.2026")), "End: 02.06.2026\n");
        assert_eq!(end_date_line(Language::De, Some("02.06.2026")), "Ende: 02.06.2026\n");
        assert_eq!(end_date_line(Language::Fr, Some("02.06.2026")), "Fin: 02.06.2026\n");
        assert_eq!(end_date_line(Language::Es, None), "");
        assert_eq!(end_date_line(Language::Es, Some("")), "");
    }

    #[test]
    fn reminder_includes_end_date_line() {
        let event = Event {
            id: 1,
            name: "Summer Cup".into(),
            start_date: NaiveDate::from_ymd_opt(2026, 7, 4).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 7, 5),
            location: "Madrid".into(),
            description: None,
            created_at: Utc::now(),
        };
        let text = render_in(
            MessageKind::Reminder,
            Language::Es,
            &TemplateVars::for_event(&event, Language::Es),
        );
        assert!(text.contains("Fecha: 04.07.2026\nFin: 05.07.2026\nLugar: Madrid"));
    }

    #[test]
    fn interested_and_more_info_confirmations_match() {
        for language in Language::ALL {
            assert_eq!(
                template_for(MessageKind::ConfirmationInterested, language),
                template_for(MessageKind::ConfirmationMoreInfo, language)
            );
        }
    }

    #[test]
    fn german_decline_confirmation() {
        let text = render_in(MessageKind::ConfirmationNotInterested, Language::De, &vars());
        assert!(text.starts_with("👋 Verstanden. Danke für deine Rückmeldung."));
    }

    #[test]
    fn kind_roundtrips_through_str() {
        for kind in MessageKind::ALL {
            assert_eq!(kind.as_str().parse::<MessageKind>().unwrap(), kind);
        }
        assert!("bulk".parse::<MessageKind>().is_err());
    }
}
