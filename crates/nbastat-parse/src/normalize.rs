use unicode_normalization::UnicodeNormalization;

/// Normalize the text of one table cell.
///
/// NFC-composes accented characters (player names such as "Nikola Jokić"
/// arrive both ways), then collapses every whitespace run, including
/// non-breaking spaces and the newlines left by the markup, to a single
/// space and trims the ends.
pub fn clean_text(input: &str) -> String {
    let nfc: String = input.nfc().collect();
    nfc.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_nfc() {
        // c + combining acute accent -> ć (precomposed)
        let decomposed = "Joki\u{0063}\u{0301}";
        assert_eq!(clean_text(decomposed), "Joki\u{0107}");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(clean_text("  Team\n   Totals "), "Team Totals");
        assert_eq!(clean_text("FG\u{a0}%"), "FG %");
        assert_eq!(clean_text(" \n\t "), "");
    }
}
