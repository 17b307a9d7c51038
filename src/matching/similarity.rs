//! String similarity primitives, expressed on a 0-100 scale.

use strsim::normalized_levenshtein;

/// Edit-distance similarity between two normalized strings, 0-100.
pub fn ratio(a: &str, b: &str) -> f64 {
    normalized_levenshtein(a, b) * 100.0
}

/// Word-order-insensitive similarity: both sides are reduced to their
/// sorted, deduplicated token sets before comparison. "police karma"
/// scores 100 against "karma police".
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    ratio(&token_set(a), &token_set(b))
}

fn token_set(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.dedup();
    tokens.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_bounds() {
        assert_eq!(ratio("karma police", "karma police"), 100.0);
        assert_eq!(ratio("abc", "xyz"), 0.0);
        let partial = ratio("karma police", "karma polic");
        assert!(partial > 85.0 && partial < 100.0);
    }

    #[test]
    fn test_ratio_is_symmetric() {
        assert_eq!(ratio("paranoid android", "paranoid"), ratio("paranoid", "paranoid android"));
    }

    #[test]
    fn test_token_set_ignores_word_order_and_duplicates() {
        assert_eq!(token_set_ratio("police karma", "karma police"), 100.0);
        assert_eq!(token_set_ratio("karma karma police", "karma police"), 100.0);
        assert!(token_set_ratio("karma police", "karma patrol") < 100.0);
    }
}
