//! Guess-to-answer text matching used by the guess resolver.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Similarity ratio a partial match must reach to be accepted.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.70;

/// Normalize text for comparison: lowercase, fold diacritics, drop
/// punctuation, collapse whitespace.
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '_')
        .collect();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Check whether a free-text guess matches the target string.
///
/// Exact match after normalization always passes. Otherwise one normalized
/// string must contain the other and the length ratio `min/max` must reach
/// `threshold`. Empty guesses never match.
pub fn is_match(guess: &str, target: &str, threshold: f64) -> bool {
    let guess = normalize(guess);
    let target = normalize(target);

    if guess.is_empty() || target.is_empty() {
        return false;
    }

    if guess == target {
        return true;
    }

    if guess.contains(&target) || target.contains(&guess) {
        let min = guess.len().min(target.len()) as f64;
        let max = guess.len().max(target.len()) as f64;
        return min / max >= threshold;
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_folds_case_and_accents() {
        assert_eq!(normalize("Beyoncé"), "beyonce");
        assert_eq!(normalize("beyonce"), "beyonce");
        assert_eq!(normalize("  Daft   PUNK!  "), "daft punk");
        assert_eq!(normalize("AC/DC"), "acdc");
    }

    #[test]
    fn exact_match_after_normalization() {
        assert!(is_match("beyonce", "Beyoncé", DEFAULT_MATCH_THRESHOLD));
        assert!(is_match("The Beatles", "the beatles", DEFAULT_MATCH_THRESHOLD));
    }

    #[test]
    fn empty_guess_never_matches() {
        assert!(!is_match("", "anything", DEFAULT_MATCH_THRESHOLD));
        assert!(!is_match("   ", "anything", DEFAULT_MATCH_THRESHOLD));
        assert!(!is_match("...", "anything", DEFAULT_MATCH_THRESHOLD));
    }

    #[test]
    fn unrelated_guess_is_rejected() {
        assert!(!is_match("xyz", "The Beatles", DEFAULT_MATCH_THRESHOLD));
    }

    #[test]
    fn substring_needs_enough_overlap() {
        // "beatles" (7) vs "the beatles" (11): 7/11 < 0.70 -> rejected.
        assert!(!is_match("beatles", "The Beatles", DEFAULT_MATCH_THRESHOLD));
        // "he beatles" (10) vs "the beatles" (11): 10/11 >= 0.70 -> accepted.
        assert!(is_match("he beatles", "The Beatles", DEFAULT_MATCH_THRESHOLD));
    }

    #[test]
    fn threshold_boundary_is_inclusive() {
        // 7 chars contained in 10 chars: ratio exactly 0.70.
        assert!(is_match("abcdefg", "abcdefghij", 0.70));
        // The same pair fails once the ratio falls just below the threshold.
        assert!(!is_match("abcdef", "abcdefghij", 0.70));
        // A stricter threshold rejects the 0.70 pair.
        assert!(!is_match("abcdefg", "abcdefghij", 0.75));
    }
}
