//! Standard-14 font selection for redrawn text.
//!
//! Embedded subset fonts rarely contain the glyphs a replacement needs, so
//! edits are drawn with the base-14 font closest to the original span.

use editz_core::edit::DrawStyle;
use editz_core::metadata::clean_font_name;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Helvetica,
    Times,
    Courier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinFont {
    pub family: Family,
    pub bold: bool,
    pub italic: bool,
}

const MONO_HINTS: [&str; 3] = ["courier", "mono", "consol"];
const SERIF_HINTS: [&str; 6] = ["times", "serif", "roman", "georgia", "garamond", "cambria"];

impl BuiltinFont {
    pub fn for_style(style: &DrawStyle) -> Self {
        BuiltinFont {
            family: family_for(&style.font, style.is_serif, style.is_monospace),
            bold: style.is_bold,
            italic: style.is_italic,
        }
    }

    /// PostScript name used as the `/BaseFont` entry.
    pub fn base_font_name(&self) -> &'static str {
        match (self.family, self.bold, self.italic) {
            (Family::Helvetica, false, false) => "Helvetica",
            (Family::Helvetica, true, false) => "Helvetica-Bold",
            (Family::Helvetica, false, true) => "Helvetica-Oblique",
            (Family::Helvetica, true, true) => "Helvetica-BoldOblique",
            (Family::Times, false, false) => "Times-Roman",
            (Family::Times, true, false) => "Times-Bold",
            (Family::Times, false, true) => "Times-Italic",
            (Family::Times, true, true) => "Times-BoldItalic",
            (Family::Courier, false, false) => "Courier",
            (Family::Courier, true, false) => "Courier-Bold",
            (Family::Courier, false, true) => "Courier-Oblique",
            (Family::Courier, true, true) => "Courier-BoldOblique",
        }
    }

    /// Key under `/Resources/Font`. Prefixed so it cannot collide with the
    /// document's own font names.
    pub fn resource_key(&self) -> String {
        let family = match self.family {
            Family::Helvetica => "Helv",
            Family::Times => "Times",
            Family::Courier => "Cour",
        };
        let style = match (self.bold, self.italic) {
            (false, false) => "",
            (true, false) => "B",
            (false, true) => "I",
            (true, true) => "BI",
        };
        format!("EZ{family}{style}")
    }
}

fn family_for(font: &str, is_serif: bool, is_monospace: bool) -> Family {
    let name = clean_font_name(font).to_lowercase();
    if is_monospace || MONO_HINTS.iter().any(|h| name.contains(h)) {
        Family::Courier
    } else if is_serif || (SERIF_HINTS.iter().any(|h| name.contains(h)) && !name.contains("sans")) {
        Family::Times
    } else {
        Family::Helvetica
    }
}

/// Encode text for a simple font using `/WinAnsiEncoding`. Characters the
/// encoding cannot express become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20AC}' => 0x80,
            '\u{201A}' => 0x82,
            '\u{0192}' => 0x83,
            '\u{201E}' => 0x84,
            '\u{2026}' => 0x85,
            '\u{2020}' => 0x86,
            '\u{2021}' => 0x87,
            '\u{02C6}' => 0x88,
            '\u{2030}' => 0x89,
            '\u{0160}' => 0x8A,
            '\u{2039}' => 0x8B,
            '\u{0152}' => 0x8C,
            '\u{017D}' => 0x8E,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{02DC}' => 0x98,
            '\u{2122}' => 0x99,
            '\u{0161}' => 0x9A,
            '\u{203A}' => 0x9B,
            '\u{0153}' => 0x9C,
            '\u{017E}' => 0x9E,
            '\u{0178}' => 0x9F,
            c if (c as u32) < 0x80 && !c.is_control() => c as u8,
            c if (0xA0..=0xFF).contains(&(c as u32)) => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use editz_core::edit::RenderMode;
    use editz_core::span::Rgb;

    fn style(font: &str, serif: bool, mono: bool, bold: bool, italic: bool) -> DrawStyle {
        DrawStyle {
            font: font.to_string(),
            size: 12.0,
            color: Rgb::BLACK,
            is_bold: bold,
            is_italic: italic,
            is_serif: serif,
            is_monospace: mono,
            char_spacing: 0.0,
            word_spacing: 0.0,
            render_mode: RenderMode::Fill,
        }
    }

    #[test]
    fn test_family_from_flags() {
        assert_eq!(
            BuiltinFont::for_style(&style("Unknown", false, true, false, false)).family,
            Family::Courier
        );
        assert_eq!(
            BuiltinFont::for_style(&style("Unknown", true, false, false, false)).family,
            Family::Times
        );
    }

    #[test]
    fn test_family_from_name() {
        let font = |name: &str| BuiltinFont::for_style(&style(name, false, false, false, false));
        assert_eq!(font("ABCDEF+TimesNewRomanPSMT").family, Family::Times);
        assert_eq!(font("DejaVuSansMono").family, Family::Courier);
        assert_eq!(font("OpenSans-Regular").family, Family::Helvetica);
        assert_eq!(font("NotoSerif").family, Family::Times);
        assert_eq!(font("PTSansSerif").family, Family::Helvetica);
        assert_eq!(font("Arial").family, Family::Helvetica);
    }

    #[test]
    fn test_base_font_names_and_keys() {
        let f = BuiltinFont::for_style(&style("Times", false, false, true, true));
        assert_eq!(f.base_font_name(), "Times-BoldItalic");
        assert_eq!(f.resource_key(), "EZTimesBI");

        let f = BuiltinFont::for_style(&style("Arial", false, false, false, false));
        assert_eq!(f.base_font_name(), "Helvetica");
        assert_eq!(f.resource_key(), "EZHelv");
    }

    #[test]
    fn test_encode_win_ansi() {
        assert_eq!(encode_win_ansi("Hi"), b"Hi".to_vec());
        assert_eq!(encode_win_ansi("caf\u{e9}"), vec![b'c', b'a', b'f', 0xE9]);
        assert_eq!(encode_win_ansi("\u{2022} \u{20AC}"), vec![0x95, b' ', 0x80]);
        assert_eq!(encode_win_ansi("\u{201C}q\u{201D}"), vec![0x93, b'q', 0x94]);
        assert_eq!(encode_win_ansi("\u{4E2D}"), vec![b'?']);
    }
}
