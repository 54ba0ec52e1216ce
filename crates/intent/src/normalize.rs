//! Text normalization shared by triggers, vocabularies and user messages.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Normalize text for keyword matching.
///
/// - Unicode NFKD, then combining marks dropped (`"preço"` → `"preco"`)
/// - lowercase
/// - anything that is not alphanumeric becomes a space
/// - whitespace collapsed and trimmed
pub fn normalize(text: &str) -> String {
    let stripped: String = text
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether `needle` occurs in `haystack` as whole words.
///
/// Both sides are expected to be normalized already.
pub fn contains_words(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    format!(" {haystack} ").contains(&format!(" {needle} "))
}
