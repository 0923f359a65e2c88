//! Text normalization for extracted PDF text.

use std::sync::LazyLock;

use regex::Regex;

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

// `\w` is Unicode-aware, so Turkish letters (ç, ğ, ı, İ, ö, ş, ü) survive.
static DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s.,!?;:()\-]").expect("valid character class"));

/// Collapse whitespace, drop characters outside word characters and `.,!?;:()-`, and trim.
pub fn clean_text(text: &str) -> String {
    let collapsed = WHITESPACE_RUN.replace_all(text, " ");
    let stripped = DISALLOWED.replace_all(&collapsed, "");
    stripped.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  a\n\n b\t\tc  "), "a b c");
    }

    #[test]
    fn test_clean_text_preserves_turkish_letters() {
        let input = "Çağrı İşleyişi: ölçüm, ğ ş ı ü!";
        assert_eq!(clean_text(input), input);
    }

    #[test]
    fn test_clean_text_strips_symbols() {
        assert_eq!(clean_text("fiyat: 5€ * 3 = 15€ (KDV) - #not"), "fiyat: 5  3  15 (KDV) - not");
    }

    #[test]
    fn test_clean_text_keeps_allowed_punctuation() {
        assert_eq!(clean_text("a.b,c!d?e;f:g(h)i-j"), "a.b,c!d?e;f:g(h)i-j");
    }

    #[test]
    fn test_clean_text_empty() {
        assert_eq!(clean_text(" \n\t "), "");
    }
}
