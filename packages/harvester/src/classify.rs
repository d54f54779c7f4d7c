//! Fiscal code classification.
//!
//! Tables usually carry a `tipo` column. When it is missing or holds an
//! unknown value, the taxonomy is inferred from the lexical shape of the
//! code itself.

use regex::Regex;
use std::sync::LazyLock;

use crate::types::Taxonomy;

/// `S` followed by exactly 8 digits, punctuation already removed.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static NBS_COMPACT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^S\d{8}$").expect("valid regex"));

/// `S####.####` or `S##.##.##.##`.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static NBS_DOTTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^S(?:\d{4}\.\d{4}|\d{2}\.\d{2}\.\d{2}\.\d{2})$").expect("valid regex")
});

/// Exactly 8 digits, or `####.####`.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static NCM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\d{8}|\d{4}\.\d{4})$").expect("valid regex"));

/// 2-5 digits with an optional 1-2 digit decimal part.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static LC116: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{2,5}(?:\.[0-9]{1,2})?$").expect("valid regex"));

/// Infer the taxonomy of a code from its pattern.
///
/// # Examples
/// ```
/// use ibptax_harvester::classify::classify;
/// use ibptax_harvester::types::Taxonomy;
///
/// assert_eq!(classify("85171231"), Taxonomy::Ncm);
/// assert_eq!(classify("S12345678"), Taxonomy::Nbs);
/// assert_eq!(classify("1401"), Taxonomy::Lc116);
/// assert_eq!(classify("AB12"), Taxonomy::Other);
/// ```
pub fn classify(code: &str) -> Taxonomy {
    let raw = code.trim().to_uppercase();
    if raw.is_empty() {
        return Taxonomy::Other;
    }
    let compact: String = raw
        .chars()
        .filter(|c| !matches!(c, '.' | '-' | ' '))
        .collect();

    if NBS_COMPACT.is_match(&compact) || NBS_DOTTED.is_match(&raw) {
        Taxonomy::Nbs
    } else if NCM.is_match(&compact) || NCM.is_match(&raw) {
        Taxonomy::Ncm
    } else if LC116.is_match(&raw) {
        Taxonomy::Lc116
    } else {
        Taxonomy::Other
    }
}

/// Resolve a row's taxonomy: a recognized `tipo` tag wins, the code pattern decides otherwise.
pub fn resolve(type_column: &str, code: &str) -> Taxonomy {
    Taxonomy::from_tag(type_column).unwrap_or_else(|| classify(code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_ncm() {
        assert_eq!(classify("85171231"), Taxonomy::Ncm);
        assert_eq!(classify("8517.1231"), Taxonomy::Ncm);
        assert_eq!(classify(" 8517-12-31 "), Taxonomy::Ncm);
    }

    #[test]
    fn test_classify_nbs() {
        assert_eq!(classify("S12345678"), Taxonomy::Nbs);
        assert_eq!(classify("s1234.5678"), Taxonomy::Nbs);
        assert_eq!(classify("S12.34.56.78"), Taxonomy::Nbs);
        assert_eq!(classify("S1234567"), Taxonomy::Other);
    }

    #[test]
    fn test_classify_lc116() {
        assert_eq!(classify("1401"), Taxonomy::Lc116);
        assert_eq!(classify("14.01"), Taxonomy::Lc116);
        assert_eq!(classify("01"), Taxonomy::Lc116);
        assert_eq!(classify("123456"), Taxonomy::Other);
        assert_eq!(classify("14.012"), Taxonomy::Other);
    }

    #[test]
    fn test_classify_other() {
        assert_eq!(classify("AB12"), Taxonomy::Other);
        assert_eq!(classify(""), Taxonomy::Other);
        assert_eq!(classify("1"), Taxonomy::Other);
    }

    #[test]
    fn test_nbs_precedes_ncm() {
        // Stripping punctuation never turns an S-code into a bare 8-digit code.
        assert_eq!(classify("S-1234-5678"), Taxonomy::Nbs);
    }

    #[test]
    fn test_resolve_prefers_explicit_tag() {
        assert_eq!(resolve("LC116", "85171231"), Taxonomy::Lc116);
        assert_eq!(resolve("out", "85171231"), Taxonomy::Other);
    }

    #[test]
    fn test_resolve_falls_back_to_pattern() {
        assert_eq!(resolve("", "85171231"), Taxonomy::Ncm);
        assert_eq!(resolve("0", "S12345678"), Taxonomy::Nbs);
        assert_eq!(resolve("servico", "AB12"), Taxonomy::Other);
    }
}
