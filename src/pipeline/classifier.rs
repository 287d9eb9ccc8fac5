//! Reply classifier: maps free-text RSVP replies onto a [`Category`].
//!
//! Matching is a fixed vocabulary in four languages. Text is trimmed and
//! uppercased, then checked against each rule in order; the first rule whose
//! exact set or prefix set matches wins.

use crate::league::Category;

/// One category's vocabulary.
struct ReplyRule {
    category: Category,
    exact: &'static [&'static str],
    prefixes: &'static [&'static str],
}

/// Evaluated in order.
static RULES: &[ReplyRule] = &[
    ReplyRule {
        category: Category::Interested,
        exact: &["YES", "JA", "SI", "OUI", "Y", "S"],
        prefixes: &["YES", "JA", "SI", "OUI"],
    },
    ReplyRule {
        category: Category::MoreInfo,
        exact: &["INFO", "INFORMATION", "MORE", "MEHR", "I"],
        prefixes: &["INFO", "MORE", "MEHR", "MAS"],
    },
    ReplyRule {
        category: Category::NotInterested,
        exact: &["NO", "NEIN", "NON", "N"],
        prefixes: &["NO", "NEIN"],
    },
];

impl ReplyRule {
    fn matches(&self, normalized: &str) -> bool {
        self.exact.contains(&normalized) || self.prefixes.iter().any(|p| normalized.starts_with(p))
    }
}

/// Classify a raw inbound reply. `None` means unrecognized.
pub fn classify(raw_text: &str) -> Option<Category> {
    let normalized = raw_text.trim().to_uppercase();
    if normalized.is_empty() {
        return None;
    }
    RULES
        .iter()
        .find(|rule| rule.matches(&normalized))
        .map(|rule| rule.category)
}
