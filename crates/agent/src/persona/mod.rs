//! Persona analysis and in-character responses.

pub mod analyzer;
pub mod generator;

pub use analyzer::PersonaAnalyzer;
pub use generator::ResponseGenerator;

/// First `max` characters of `text`, on a char boundary.
pub(crate) fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
