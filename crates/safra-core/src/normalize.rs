//! Name canonicalization and fuzzy similarity
//!
//! `normalize_name` is the single canonical form used when comparing field
//! names, linked-area text and classification keywords. The Levenshtein
//! helpers back product grouping in the stock module.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Lowercase, strip diacritics, keep only `[a-z0-9 -]`, collapse whitespace.
///
/// Total and idempotent; empty input yields an empty string.
pub fn normalize_name(input: &str) -> String {
    let kept: String = input
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || *c == '-')
        .map(|c| c.to_ascii_lowercase())
        .collect();

    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Same as [`normalize_name`] for optional values
pub fn normalize_opt(input: Option<&str>) -> String {
    input.map(normalize_name).unwrap_or_default()
}

/// Edit distance over chars
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// `1 - distance / longest`, in `0.0..=1.0`
pub fn similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / longest as f64
}

/// Product-name key: like [`normalize_name`] but every other character,
/// `-` included, becomes a separator.
pub fn product_key(input: &str) -> String {
    let spaced: String = input
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect();

    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether two product names refer to the same product.
///
/// Short names need an exact match; the allowed distance grows with length.
pub fn are_similar(a: &str, b: &str) -> bool {
    if a.trim().is_empty() || b.trim().is_empty() {
        return false;
    }

    let a = product_key(a);
    let b = product_key(b);

    if a == b {
        return true;
    }
    if a.is_empty() || b.is_empty() {
        return false;
    }

    let avg_len = (a.chars().count() + b.chars().count()) as f64 / 2.0;
    if avg_len < 4.0 {
        return false;
    }

    let threshold = if avg_len <= 6.0 {
        0.85
    } else if avg_len <= 10.0 {
        0.75
    } else {
        0.7
    };

    similarity(&a, &b) > threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_diacritics_and_case() {
        assert_eq!(normalize_name("Talhão São José"), "talhao sao jose");
        assert_eq!(normalize_name("IRRIGAÇÃO"), "irrigacao");
        assert_eq!(normalize_name("Análise de Solo"), "analise de solo");
    }

    #[test]
    fn test_normalize_drops_punctuation_keeps_hyphen() {
        assert_eq!(normalize_name("Talhão #1 (Café)"), "talhao 1 cafe");
        assert_eq!(normalize_name("Gleba-Norte / lote 2"), "gleba-norte lote 2");
    }

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize_name("  talhao \t  10 \n"), "talhao 10");
        assert_eq!(normalize_name(""), "");
        assert_eq!(normalize_name("   "), "");
        assert_eq!(normalize_opt(None), "");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let samples = [
            "Talhão 1",
            "  Mão de  Obra ",
            "Serviços/Logística",
            "ção-ÇÃO",
            "Ünïcödé ñ 42",
            "日本 field",
            "",
        ];
        for s in samples {
            let once = normalize_name(s);
            assert_eq!(normalize_name(&once), once, "not idempotent for {:?}", s);
        }
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", "abc"), 0);
        assert_eq!(levenshtein("ureia", "uréia"), 1);
    }

    #[test]
    fn test_are_similar_thresholds() {
        // short names need exact match after normalization
        assert!(are_similar("NPK", "npk"));
        assert!(!are_similar("NPK", "NPQ"));

        // one typo in a long name is fine
        assert!(are_similar("Glifosato 480", "Glifosato 48O"));
        assert!(are_similar("Cloreto de Potássio", "Cloreto de Potasio"));

        // different products
        assert!(!are_similar("Ureia", "Calcário"));
        assert!(!are_similar("Roundup", "Randon"));
    }

    #[test]
    fn test_product_key_treats_punctuation_as_space() {
        assert_eq!(product_key("NPK 20-05-20"), "npk 20 05 20");
        assert_eq!(product_key("NPK 20.05.20"), "npk 20 05 20");
        assert_eq!(product_key("  Óleo/Mineral  "), "oleo mineral");
        assert!(are_similar("NPK 20-05-20", "NPK 20.05.20"));
        assert!(!are_similar("", ""));
        assert!(!are_similar("Ureia", "   "));
    }
}
