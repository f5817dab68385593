//! Sentence decomposition: free text → one lesson per word.
//!
//! Tokens are split on whitespace, stripped of every non-alphabetic
//! character and upper-cased.  Tokens left empty (pure numerals, lone
//! punctuation) are skipped.

use super::Lesson;

/// Decompose `text` into lessons, in order.
///
/// One-letter tokens become Beginner letter lessons; longer tokens become
/// Intermediate word lessons.
///
/// ```
/// use asl_tutor::lesson::decompose;
///
/// let lessons = decompose("Hello World!");
/// let targets: Vec<_> = lessons.iter().map(|l| l.target.as_str()).collect();
/// assert_eq!(targets, ["HELLO", "WORLD"]);
/// ```
pub fn decompose(text: &str) -> Vec<Lesson> {
    text.split_whitespace()
        .filter_map(|token| {
            let letters: String = token.chars().filter(|c| c.is_alphabetic()).collect();
            let mut chars = letters.chars();
            match (chars.next(), chars.next()) {
                (None, _) => None,
                (Some(c), None) => Some(Lesson::letter(c)),
                _ => Some(Lesson::word(&letters)),
            }
        })
        .collect()
}
