use url::Url;

/// Levenshtein similarity between two strings.
///
/// `(|longer| - edit_distance) / |longer|`, in `[0, 1]`. Two empty strings
/// are identical (1.0).
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    strsim::normalized_levenshtein(a, b)
}

/// Similarity between the paths of two URLs (case-sensitive).
///
/// Falls back to comparing the raw strings when either side does not parse.
pub fn path_similarity(a: &str, b: &str) -> f64 {
    match (Url::parse(a), Url::parse(b)) {
        (Ok(a), Ok(b)) => similarity(a.path(), b.path()),
        _ => similarity(a, b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_score_one() {
        assert_eq!(similarity("abc", "abc"), 1.0);
    }

    #[test]
    fn empty_strings_score_one() {
        assert_eq!(similarity("", ""), 1.0);
    }

    #[test]
    fn one_empty_string_scores_zero() {
        assert_eq!(similarity("abc", ""), 0.0);
    }

    #[test]
    fn known_ratio() {
        // edit distance 1 over longer length 4
        assert!((similarity("abcd", "abed") - 0.75).abs() < 1e-9);
    }

    #[test]
    fn title_change_scenario() {
        // "about us" vs "about our company": distance 10 over 17
        let s = similarity("about us", "about our company");
        assert!((s - 7.0 / 17.0).abs() < 0.01, "got {s}");
    }

    #[test]
    fn path_similarity_ignores_host() {
        let s = path_similarity("https://old.site/products/widget", "https://new.site/products/widget");
        assert_eq!(s, 1.0);
    }

    #[test]
    fn path_similarity_is_case_sensitive() {
        let a = path_similarity("https://a.com/Shop", "https://b.com/shop");
        assert!(a < 1.0);
    }
}
