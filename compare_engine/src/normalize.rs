use unicode_normalization::UnicodeNormalization;

/// Folds a human-entered string into its loose comparison form.
///
/// The text is decomposed (NFD), combining diacritical marks (U+0300 to U+036F)
/// are dropped, and the result is lower-cased and trimmed. Never fails.
pub fn normalize(value: &str) -> String {
    value
        .nfd()
        .filter(|c| !is_combining_diacritic(*c))
        .collect::<String>()
        .to_lowercase()
        .trim()
        .to_string()
}

/// Same as `normalize`, for optional inputs. A missing value is the empty string.
pub fn normalize_opt(value: Option<&str>) -> String {
    value.map(normalize).unwrap_or_default()
}

fn is_combining_diacritic(c: char) -> bool {
    ('\u{0300}'..='\u{036f}').contains(&c)
}

/// True when the normalized `haystack` contains the normalized `needle`.
/// An empty needle never matches.
pub fn loosely_contains(haystack: &str, needle: &str) -> bool {
    let target = normalize(needle);
    if target.is_empty() {
        return false;
    }
    normalize(haystack).contains(&target)
}
