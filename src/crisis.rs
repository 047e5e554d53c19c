//! Crisis phrase detection.
//!
//! A literal, case-insensitive substring scan. There is no tokenization and
//! no negation handling: "I don't want to die" still matches. This check
//! runs before any scoring and its verdict cannot be overridden.

use crate::lexicon::CrisisLexicon;

/// Returns `true` if any crisis phrase occurs in `text`.
pub fn is_crisis(text: &str, lexicon: &CrisisLexicon) -> bool {
    is_crisis_lowered(&text.to_lowercase(), lexicon)
}

/// Same as [`is_crisis`] for text that is already lower-cased.
pub(crate) fn is_crisis_lowered(lower: &str, lexicon: &CrisisLexicon) -> bool {
    lexicon.phrases().iter().any(|p| lower.contains(p.as_str()))
}
