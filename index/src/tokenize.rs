//! Free-text normalization into search terms.

/// Tokens of this many characters or fewer are discarded.
pub const MIN_TOKEN_CHARS: usize = 2;

/// Split text into lower-cased search terms.
///
/// Any non-alphanumeric character is a boundary, and terms of two characters
/// or fewer are dropped. The returned iterator is lazy and borrows `text`.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .filter(|word| word.chars().count() > MIN_TOKEN_CHARS)
}
