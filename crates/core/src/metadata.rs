//! Text metadata extractor.
//!
//! Turns the raw runs reported by a text-layout reader into [`TextSpan`]
//! records with the derived style properties the layout engine relies on.
//! Pure: the same raw spans always produce the same records.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use crate::geometry::BBox;
use crate::span::{FontWeight, Orientation, RawSpan, Rgb, SpanKey, StyleFlags, TextSpan};

/// Weight of the style-flag signal in [`boldness_score`].
pub const FLAG_BOLD_WEIGHT: f64 = 0.6;
/// Weight of the font-name signal in [`boldness_score`].
pub const NAME_BOLD_WEIGHT: f64 = 0.4;

const BOLD_KEYWORDS: [&str; 5] = ["bold", "heavy", "black", "demi", "semibold"];
const ITALIC_KEYWORDS: [&str; 2] = ["italic", "oblique"];
const LIGHT_KEYWORDS: [&str; 4] = ["thin", "light", "extralight", "ultralight"];

/// Optional capability that scores how heavy a span looks once rendered.
///
/// Implementations return a `[0, 100]` ink-density score, or `None` when the
/// page or region cannot be measured.
pub trait VisualBoldness {
    fn score(&self, page: u32, bbox: &BBox) -> Option<f64>;
}

/// Probe used when no rasteriser is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoVisualProbe;

impl VisualBoldness for NoVisualProbe {
    fn score(&self, _page: u32, _bbox: &BBox) -> Option<f64> {
        None
    }
}

/// Why a raw span was dropped.
#[derive(Debug, Error, PartialEq)]
pub enum MalformedSpan {
    #[error("missing bounding box")]
    MissingBBox,
    #[error("invalid bounding box {0:?}")]
    InvalidBBox([f64; 4]),
    #[error("missing font name")]
    MissingFont,
    #[error("missing font size")]
    MissingSize,
    #[error("invalid font size {0}")]
    InvalidSize(f64),
}

/// Normalise one page of raw spans. Empty runs are dropped silently;
/// malformed runs are dropped with a warning.
pub fn extract(page: u32, raw: &[RawSpan]) -> Vec<TextSpan> {
    extract_with(page, raw, &NoVisualProbe)
}

/// Like [`extract`], consulting `probe` for a visual boldness score.
pub fn extract_with(page: u32, raw: &[RawSpan], probe: &dyn VisualBoldness) -> Vec<TextSpan> {
    raw.iter()
        .filter(|span| !span.text.trim().is_empty())
        .filter_map(|span| match normalize(page, span, probe) {
            Ok(span) => Some(span),
            Err(reason) => {
                log::warn!("page {page}: skipping span {:?}: {reason}", span.text.trim());
                None
            }
        })
        .collect()
}

/// Extract every page and key the spans `text_item_1..` in document order.
pub fn extract_document<I>(pages: I, probe: &dyn VisualBoldness) -> BTreeMap<SpanKey, TextSpan>
where
    I: IntoIterator<Item = (u32, Vec<RawSpan>)>,
{
    pages
        .into_iter()
        .flat_map(|(page, raw)| extract_with(page, &raw, probe))
        .enumerate()
        .map(|(i, span)| (SpanKey::new(i + 1), span))
        .collect()
}

fn normalize(
    page: u32,
    raw: &RawSpan,
    probe: &dyn VisualBoldness,
) -> Result<TextSpan, MalformedSpan> {
    let coords = raw.bbox.ok_or(MalformedSpan::MissingBBox)?;
    let bbox = BBox::from(coords);
    if !bbox.is_well_formed() {
        return Err(MalformedSpan::InvalidBBox(coords));
    }

    let raw_font = raw.font.clone().ok_or(MalformedSpan::MissingFont)?;
    let size = raw.size.ok_or(MalformedSpan::MissingSize)?;
    if !size.is_finite() || size <= 0.0 {
        return Err(MalformedSpan::InvalidSize(size));
    }

    let font = clean_font_name(&raw_font).to_string();
    let flags = StyleFlags(raw.flags);
    let flag_bold = flags.is_bold();
    let name_bold = name_is_bold(&font);

    Ok(TextSpan {
        text: raw.text.trim().to_string(),
        bbox,
        page,
        is_bold: flag_bold || name_bold,
        is_italic: flags.is_italic() || name_is_italic(&font),
        boldness_score: boldness_score(flag_bold, name_bold),
        weight: font_weight(&font),
        font,
        raw_font,
        size,
        flags,
        color: raw.color.as_ref().map(Rgb::from_value).unwrap_or_default(),
        char_spacing: raw.char_spacing.unwrap_or(0.0),
        word_spacing: raw.word_spacing.unwrap_or(0.0),
        visual_boldness: probe.score(page, &bbox),
        orientation: raw.transform.map(Orientation::from_matrix),
    })
}

/// Remove a `ABCDEF+` subset prefix from an embedded font name.
pub fn clean_font_name(name: &str) -> &str {
    static SUBSET_PREFIX: OnceLock<Regex> = OnceLock::new();
    let re = SUBSET_PREFIX
        .get_or_init(|| Regex::new(r"^[A-Z0-9]{6}\+").expect("subset prefix pattern"));
    match re.find(name) {
        Some(m) => &name[m.end()..],
        None => name,
    }
}

fn name_has_any(name: &str, keywords: &[&str]) -> bool {
    let lower = name.to_lowercase();
    keywords.iter().any(|k| lower.contains(k))
}

pub fn name_is_bold(font: &str) -> bool {
    name_has_any(font, &BOLD_KEYWORDS)
}

pub fn name_is_italic(font: &str) -> bool {
    name_has_any(font, &ITALIC_KEYWORDS)
}

pub fn font_weight(font: &str) -> FontWeight {
    if name_is_bold(font) {
        FontWeight::Bold
    } else if name_has_any(font, &LIGHT_KEYWORDS) {
        FontWeight::Light
    } else {
        FontWeight::Regular
    }
}

/// Additive confidence in `[0, 1]` that a span renders bold.
pub fn boldness_score(flag_bold: bool, name_bold: bool) -> f64 {
    let mut score = 0.0;
    if flag_bold {
        score += FLAG_BOLD_WEIGHT;
    }
    if name_bold {
        score += NAME_BOLD_WEIGHT;
    }
    f64::min(score, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(text: &str, font: &str, flags: u32) -> RawSpan {
        RawSpan {
            text: text.to_string(),
            font: Some(font.to_string()),
            size: Some(12.0),
            flags,
            color: Some(serde_json::json!(0)),
            bbox: Some([10.0, 20.0, 50.0, 32.0]),
            ..Default::default()
        }
    }

    struct FixedProbe(f64);

    impl VisualBoldness for FixedProbe {
        fn score(&self, _page: u32, _bbox: &BBox) -> Option<f64> {
            Some(self.0)
        }
    }

    #[test]
    fn test_clean_font_name() {
        assert_eq!(clean_font_name("ABCDEF+Helvetica-Bold"), "Helvetica-Bold");
        assert_eq!(clean_font_name("AB12EF+Arial"), "Arial");
        assert_eq!(clean_font_name("abcdef+Arial"), "abcdef+Arial");
        assert_eq!(clean_font_name("ABC+Arial"), "ABC+Arial");
        assert_eq!(clean_font_name("Times-Roman"), "Times-Roman");
    }

    #[test]
    fn test_boldness_score_weights() {
        assert_eq!(boldness_score(false, false), 0.0);
        assert_eq!(boldness_score(true, false), 0.6);
        assert_eq!(boldness_score(false, true), 0.4);
        assert_eq!(boldness_score(true, true), 1.0);
    }

    #[test]
    fn test_extract_bold_by_name_after_prefix_strip() {
        let spans = extract(1, &[raw("Title", "XYZABC+Arial-BoldMT", 0)]);
        assert_eq!(spans.len(), 1);
        let s = &spans[0];
        assert_eq!(s.font, "Arial-BoldMT");
        assert_eq!(s.raw_font, "XYZABC+Arial-BoldMT");
        assert!(s.is_bold);
        assert_eq!(s.boldness_score, 0.4);
        assert_eq!(s.weight, FontWeight::Bold);
    }

    #[test]
    fn test_extract_bold_and_italic_by_flags() {
        let flags = StyleFlags::BOLD | StyleFlags::ITALIC;
        let s = &extract(1, &[raw("x", "Helvetica", flags)])[0];
        assert!(s.is_bold);
        assert!(s.is_italic);
        assert_eq!(s.boldness_score, 0.6);
    }

    #[test]
    fn test_extract_italic_by_name() {
        let s = &extract(1, &[raw("x", "Times-Oblique", 0)])[0];
        assert!(s.is_italic);
        assert!(!s.is_bold);
    }

    #[test]
    fn test_extract_light_weight() {
        let s = &extract(1, &[raw("x", "Roboto-Light", 0)])[0];
        assert_eq!(s.weight, FontWeight::Light);
    }

    #[test]
    fn test_extract_skips_empty_text() {
        let spans = extract(1, &[raw("   ", "Helvetica", 0), raw(" ok ", "Helvetica", 0)]);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "ok");
    }

    #[test]
    fn test_extract_skips_malformed_spans() {
        let mut no_bbox = raw("a", "Helvetica", 0);
        no_bbox.bbox = None;
        let mut inverted = raw("b", "Helvetica", 0);
        inverted.bbox = Some([50.0, 20.0, 10.0, 32.0]);
        let mut zero_size = raw("c", "Helvetica", 0);
        zero_size.size = Some(0.0);
        let mut no_font = raw("d", "Helvetica", 0);
        no_font.font = None;

        let spans = extract(
            1,
            &[no_bbox, inverted, zero_size, no_font, raw("e", "Helvetica", 0)],
        );
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "e");
    }

    #[test]
    fn test_extract_color() {
        let mut span = raw("x", "Helvetica", 0);
        span.color = Some(serde_json::json!(0xFF0000));
        assert_eq!(extract(1, &[span.clone()])[0].color, Rgb { r: 255, g: 0, b: 0 });

        span.color = Some(serde_json::json!(1.5));
        assert_eq!(extract(1, &[span.clone()])[0].color, Rgb::BLACK);

        span.color = None;
        assert_eq!(extract(1, &[span])[0].color, Rgb::BLACK);
    }

    #[test]
    fn test_extract_spacing_defaults_to_zero() {
        let s = &extract(1, &[raw("x", "Helvetica", 0)])[0];
        assert_eq!(s.char_spacing, 0.0);
        assert_eq!(s.word_spacing, 0.0);
    }

    #[test]
    fn test_extract_orientation_from_transform() {
        let mut span = raw("x", "Helvetica", 0);
        span.transform = Some([2.0, 0.0, 0.0, 3.0, 0.0, 0.0]);
        let o = extract(1, &[span])[0].orientation.unwrap();
        assert_eq!(o.rotation_degrees, 0.0);
        assert_eq!(o.scale_x, 2.0);
        assert_eq!(o.scale_y, 3.0);
    }

    #[test]
    fn test_extract_is_deterministic() {
        let input = vec![
            raw("one", "ABCDEF+Helvetica-Bold", 16),
            raw("two", "Times-Italic", 2),
        ];
        assert_eq!(extract(3, &input), extract(3, &input));
    }

    #[test]
    fn test_extract_with_visual_probe() {
        let s = &extract_with(1, &[raw("x", "Helvetica", 0)], &FixedProbe(80.0))[0];
        assert_eq!(s.visual_boldness, Some(80.0));
        assert!(!s.is_bold);
        assert!(s.effective_bold());
    }

    #[test]
    fn test_extract_document_keys_in_order() {
        let pages = vec![
            (1, vec![raw("a", "Helvetica", 0), raw("b", "Helvetica", 0)]),
            (2, vec![raw("", "Helvetica", 0), raw("c", "Helvetica", 0)]),
        ];
        let map = extract_document(pages, &NoVisualProbe);
        let keys: Vec<String> = map.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["text_item_1", "text_item_2", "text_item_3"]);
        assert_eq!(map[&SpanKey::new(3)].text, "c");
        assert_eq!(map[&SpanKey::new(3)].page, 2);
    }
}
