//! Example-value generation for `{{N}}` placeholder tokens.

use lazy_static::lazy_static;
use regex::Regex;

use crate::template::model::Placeholder;

lazy_static! {
    static ref PLACEHOLDER_TOKEN_RE: Regex = Regex::new(r"\{\{(\d+)\}\}").unwrap();
}

/// Distinct placeholder indices in a text, in order of first occurrence.
pub fn token_indices(text: &str) -> Vec<String> {
    let mut indices = Vec::new();
    for capture in PLACEHOLDER_TOKEN_RE.captures_iter(text) {
        let index = capture[1].to_string();
        if !indices.contains(&index) {
            indices.push(index);
        }
    }
    indices
}

/// Example values for every `{{N}}` token in `text`.
///
/// Declared placeholders contribute their example value in *declared*
/// order (not text-occurrence order); tokens with no declaration get the
/// literal `"Example"`, appended in text order. Carousel cards call this
/// per card with the card's own body text.
pub fn example_values(text: &str, placeholders: &[Placeholder]) -> Vec<String> {
    let tokens = token_indices(text);
    let mut values = Vec::new();

    for placeholder in placeholders {
        if tokens.contains(&placeholder.index) {
            values.push(placeholder.example.clone());
        }
    }

    for token in &tokens {
        if !placeholders.iter().any(|p| &p.index == token) {
            values.push("Example".to_string());
        }
    }

    values
}
