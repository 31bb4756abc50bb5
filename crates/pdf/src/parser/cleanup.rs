use unicode_normalization::UnicodeNormalization;

/// Normalize the text of one shown string.
///
/// NFC composition, Latin ligatures expanded, the usual bullet glyphs folded
/// into U+2022, replacement and NUL characters dropped. Spacing is kept as
/// shown so span widths stay meaningful.
pub fn clean_span_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.nfc() {
        match c {
            '\u{FFFD}' | '\0' => {}
            '\u{25CF}' | '\u{25CB}' | '\u{25A0}' | '\u{F0B7}' => out.push('\u{2022}'),
            c => match expand_ligature(c) {
                Some(letters) => out.push_str(letters),
                None => out.push(c),
            },
        }
    }
    out
}

fn expand_ligature(c: char) -> Option<&'static str> {
    Some(match c {
        '\u{FB00}' => "ff",
        '\u{FB01}' => "fi",
        '\u{FB02}' => "fl",
        '\u{FB03}' => "ffi",
        '\u{FB04}' => "ffl",
        '\u{FB05}' | '\u{FB06}' => "st",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_unchanged() {
        assert_eq!(clean_span_text("PNR: 2456789012"), "PNR: 2456789012");
    }

    #[test]
    fn test_ligatures_expanded() {
        assert_eq!(clean_span_text("\u{FB01}rst o\u{FB03}ce"), "first office");
        assert_eq!(clean_span_text("\u{FB06}ation"), "station");
    }

    #[test]
    fn test_bullets_folded() {
        assert_eq!(clean_span_text("\u{25CF} Item"), "\u{2022} Item");
        // Symbol-font private-use bullet.
        assert_eq!(clean_span_text("\u{F0B7}"), "\u{2022}");
    }

    #[test]
    fn test_garbage_characters_dropped() {
        assert_eq!(clean_span_text("NEW\u{FFFD} DEL\0HI"), "NEW DELHI");
    }

    #[test]
    fn test_spacing_kept() {
        assert_eq!(clean_span_text("  A   B "), "  A   B ");
    }

    #[test]
    fn test_composed_form() {
        assert_eq!(clean_span_text("Cafe\u{0301}"), "Caf\u{00E9}");
    }
}
