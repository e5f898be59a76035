// Utility functions
use chrono::{DateTime, Utc};

/// Parses an RFC 3339 string into `DateTime<Utc>`, if possible.
pub fn parse_datetime(date_str: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(date_str)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Lowercases and collapses every whitespace run into a single space.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// True when the text contains any character from the Thai block.
pub fn has_thai(text: &str) -> bool {
    text.chars().any(|c| ('\u{0E00}'..='\u{0E7F}').contains(&c))
}

/// Keyword lookup used by every knowledge-base rule.
///
/// ASCII terms must sit on ASCII word boundaries ("skin" does not hit
/// "skinless"). Thai is written without spaces, so non-ASCII terms match
/// anywhere.
pub fn contains_term(text: &str, term: &str) -> bool {
    if term.is_empty() {
        return false;
    }
    if !term.is_ascii() {
        return text.contains(term);
    }
    text.match_indices(term).any(|(start, _)| {
        let before = text[..start].chars().next_back();
        let after = text[start + term.len()..].chars().next();
        !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
    })
}

pub fn contains_any<S: AsRef<str>>(text: &str, terms: &[S]) -> bool {
    terms.iter().any(|t| contains_term(text, t.as_ref()))
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
}
