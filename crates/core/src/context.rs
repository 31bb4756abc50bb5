//! Page-level layout context for a single span.
//!
//! Everything here is derived from geometry and text alone: alignment
//! ratios, list and header signals, line extent and the free space around
//! the span.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::geometry::BBox;
use crate::span::TextSpan;

/// Two spans whose `y0` differ by at most this much share a visual line.
pub const SAME_LINE_TOLERANCE: f64 = 5.0;
/// Edge ratio under which a span counts as hugging the left or right margin.
pub const EDGE_RATIO: f64 = 0.05;
pub const CENTER_RATIO: f64 = 0.02;
pub const CENTER_BALANCE: f64 = 0.1;
/// Font size above `HEADER_SIZE_RATIO * average` reads as a header.
pub const HEADER_SIZE_RATIO: f64 = 1.3;
pub const HEADER_MAX_WORDS: usize = 8;
/// A line wider than this share of the page is treated as justified.
pub const JUSTIFIED_WIDTH_RATIO: f64 = 0.75;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignmentRatios {
    pub left: f64,
    pub right: f64,
    pub center: f64,
}

/// Distance from the span to each page edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AvailableSpace {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutContext {
    pub alignment: Alignment,
    pub ratios: AlignmentRatios,
    pub is_list_item: bool,
    pub is_header: bool,
    pub is_justified: bool,
    /// Horizontal extent of the span's visual line.
    pub line_width: f64,
    pub average_font_size: f64,
    pub available_space: AvailableSpace,
}

pub fn alignment_ratios(bbox: &BBox, page_width: f64) -> AlignmentRatios {
    AlignmentRatios {
        left: bbox.x0 / page_width,
        right: (page_width - bbox.x1) / page_width,
        center: (bbox.center_x() - page_width / 2.0).abs() / page_width,
    }
}

/// Left unless the ratios clearly say otherwise.
pub fn determine_alignment(bbox: &BBox, page_width: f64) -> Alignment {
    if !page_width.is_finite() || page_width <= 0.0 || !bbox.is_finite() {
        return Alignment::Left;
    }
    let r = alignment_ratios(bbox, page_width);
    if r.left <= EDGE_RATIO {
        Alignment::Left
    } else if r.right <= EDGE_RATIO {
        Alignment::Right
    } else if r.center <= CENTER_RATIO && (r.left - r.right).abs() <= CENTER_BALANCE {
        Alignment::Center
    } else {
        Alignment::Left
    }
}

pub fn same_line(a: &BBox, b: &BBox) -> bool {
    (a.y0 - b.y0).abs() <= SAME_LINE_TOLERANCE
}

/// Siblings usable as context: same page, finite well-formed geometry, and
/// not the target itself.
pub fn usable_siblings<'a>(target: &TextSpan, siblings: &'a [TextSpan]) -> Vec<&'a TextSpan> {
    siblings
        .iter()
        .filter(|s| s.page == target.page && s.bbox.is_well_formed() && !s.same_run(target))
        .collect()
}

/// Target plus same-line siblings, left to right.
pub fn line_spans<'a>(target: &'a TextSpan, siblings: &'a [TextSpan]) -> Vec<&'a TextSpan> {
    let mut line: Vec<&TextSpan> = usable_siblings(target, siblings)
        .into_iter()
        .filter(|s| same_line(&s.bbox, &target.bbox))
        .collect();
    line.push(target);
    line.sort_by(|a, b| a.bbox.x0.total_cmp(&b.bbox.x0));
    line
}

/// Text of the target's visual line, spans joined by single spaces.
pub fn line_text(target: &TextSpan, siblings: &[TextSpan]) -> String {
    line_spans(target, siblings)
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Horizontal extent of the target's visual line.
pub fn line_width(target: &TextSpan, siblings: &[TextSpan]) -> f64 {
    let line = line_spans(target, siblings);
    let x0 = line.iter().map(|s| s.bbox.x0).fold(f64::INFINITY, f64::min);
    let x1 = line.iter().map(|s| s.bbox.x1).fold(f64::NEG_INFINITY, f64::max);
    x1 - x0
}

pub fn is_justified(target: &TextSpan, siblings: &[TextSpan], page_width: f64) -> bool {
    page_width > 0.0 && line_width(target, siblings) > page_width * JUSTIFIED_WIDTH_RATIO
}

/// Mean font size over the target and its siblings.
pub fn average_font_size(target: &TextSpan, siblings: &[&TextSpan]) -> f64 {
    let sizes: Vec<f64> = std::iter::once(target)
        .chain(siblings.iter().copied())
        .map(|s| s.size)
        .filter(|size| size.is_finite() && *size > 0.0)
        .collect();
    if sizes.is_empty() {
        return 0.0;
    }
    sizes.iter().sum::<f64>() / sizes.len() as f64
}

fn list_marker_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"^\s*\d+[.)]\s",
            r"^\s*[•\-*+]\s",
            r"^\s*[A-Za-z][.)]\s",
            r"^\s*\([A-Za-z0-9]\)\s",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("list marker pattern"))
        .collect()
    })
}

/// Text opens with a numbered, lettered or bulleted list marker.
pub fn has_list_marker(text: &str) -> bool {
    list_marker_patterns().iter().any(|re| re.is_match(text))
}

/// A span consisting of nothing but a list marker.
pub fn is_bullet_token(text: &str) -> bool {
    static BULLET: OnceLock<Regex> = OnceLock::new();
    let re = BULLET.get_or_init(|| {
        Regex::new(r"^(?:[•·◦▪‣\-*+]|\d+[.)]|[A-Za-z][.)]|\([A-Za-z0-9]\))$")
            .expect("bullet token pattern")
    });
    re.is_match(text.trim())
}

/// The nearest span to the left on the target's line is a bullet token.
pub fn has_bullet_before(target: &TextSpan, siblings: &[TextSpan]) -> bool {
    usable_siblings(target, siblings)
        .into_iter()
        .filter(|s| same_line(&s.bbox, &target.bbox) && s.bbox.x1 <= target.bbox.x0)
        .max_by(|a, b| a.bbox.x1.total_cmp(&b.bbox.x1))
        .is_some_and(|s| is_bullet_token(&s.text))
}

fn is_title_like(text: &str) -> bool {
    static TITLE: OnceLock<Regex> = OnceLock::new();
    let re = TITLE.get_or_init(|| Regex::new(r"^[A-Z][A-Za-z\s]{2,}$").expect("title pattern"));
    re.is_match(text.trim()) && text.split_whitespace().count() <= HEADER_MAX_WORDS
}

pub fn is_header(target: &TextSpan, average_font_size: f64) -> bool {
    (average_font_size > 0.0 && target.size > average_font_size * HEADER_SIZE_RATIO)
        || (is_title_like(&target.text) && target.effective_bold())
}

pub fn analyze_context(
    target: &TextSpan,
    siblings: &[TextSpan],
    page_width: f64,
    page_height: f64,
) -> LayoutContext {
    let usable = usable_siblings(target, siblings);
    let average = average_font_size(target, &usable);
    let bbox = &target.bbox;

    LayoutContext {
        alignment: determine_alignment(bbox, page_width),
        ratios: alignment_ratios(bbox, page_width),
        is_list_item: has_list_marker(&line_text(target, siblings))
            || has_list_marker(&target.text)
            || has_bullet_before(target, siblings),
        is_header: is_header(target, average),
        is_justified: is_justified(target, siblings, page_width),
        line_width: line_width(target, siblings),
        average_font_size: average,
        available_space: AvailableSpace {
            left: bbox.x0,
            right: page_width - bbox.x1,
            top: bbox.y0,
            bottom: page_height - bbox.y1,
        },
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::span::{FontWeight, Rgb, StyleFlags};

    pub(crate) fn make_span(text: &str, bbox: [f64; 4], size: f64) -> TextSpan {
        TextSpan {
            text: text.to_string(),
            bbox: BBox::from(bbox),
            page: 1,
            font: "Helvetica".to_string(),
            raw_font: "Helvetica".to_string(),
            size,
            flags: StyleFlags::default(),
            is_bold: false,
            is_italic: false,
            color: Rgb::BLACK,
            char_spacing: 0.0,
            word_spacing: 0.0,
            boldness_score: 0.0,
            weight: FontWeight::Regular,
            visual_boldness: None,
            orientation: None,
        }
    }

    #[test]
    fn test_alignment_left_margin() {
        let b = BBox::new(20.0, 0.0, 200.0, 10.0);
        assert_eq!(determine_alignment(&b, 612.0), Alignment::Left);
    }

    #[test]
    fn test_alignment_right_margin() {
        let b = BBox::new(400.0, 0.0, 600.0, 10.0);
        assert_eq!(determine_alignment(&b, 612.0), Alignment::Right);
    }

    #[test]
    fn test_alignment_center() {
        let b = BBox::new(256.0, 0.0, 356.0, 10.0);
        assert_eq!(determine_alignment(&b, 612.0), Alignment::Center);
    }

    #[test]
    fn test_alignment_defaults_left() {
        // Off-center, away from both margins.
        let b = BBox::new(150.0, 0.0, 250.0, 10.0);
        assert_eq!(determine_alignment(&b, 612.0), Alignment::Left);
        assert_eq!(determine_alignment(&b, 0.0), Alignment::Left);
    }

    #[test]
    fn test_list_marker_patterns() {
        assert!(has_list_marker("1. First"));
        assert!(has_list_marker("  2) Second"));
        assert!(has_list_marker("• bullet"));
        assert!(has_list_marker("- dash"));
        assert!(has_list_marker("a. lettered"));
        assert!(has_list_marker("(b) paren"));
        assert!(!has_list_marker("1.5 million"));
        assert!(!has_list_marker("Plain text"));
    }

    #[test]
    fn test_bullet_before() {
        let target = make_span("Item", [70.0, 100.0, 100.0, 112.0], 10.0);
        let siblings = vec![
            make_span("•", [50.0, 100.0, 56.0, 112.0], 10.0),
            make_span("other", [50.0, 140.0, 80.0, 152.0], 10.0),
        ];
        assert!(has_bullet_before(&target, &siblings));

        let siblings = vec![
            make_span("•", [10.0, 100.0, 16.0, 112.0], 10.0),
            make_span("Label", [20.0, 100.0, 60.0, 112.0], 10.0),
        ];
        assert!(!has_bullet_before(&target, &siblings));
    }

    #[test]
    fn test_line_text_orders_by_x() {
        let target = make_span("B", [100.0, 100.0, 110.0, 112.0], 10.0);
        let siblings = vec![
            make_span("C", [200.0, 102.0, 210.0, 114.0], 10.0),
            make_span("A", [10.0, 99.0, 20.0, 111.0], 10.0),
            make_span("below", [10.0, 130.0, 40.0, 142.0], 10.0),
        ];
        assert_eq!(line_text(&target, &siblings), "A B C");
    }

    #[test]
    fn test_line_text_ignores_target_copy_and_other_pages() {
        let target = make_span("B", [100.0, 100.0, 110.0, 112.0], 10.0);
        let mut other_page = make_span("Z", [10.0, 100.0, 20.0, 112.0], 10.0);
        other_page.page = 2;
        let siblings = vec![target.clone(), other_page];
        assert_eq!(line_text(&target, &siblings), "B");
    }

    #[test]
    fn test_is_justified() {
        let target = make_span("word", [40.0, 100.0, 80.0, 112.0], 10.0);
        let wide = vec![make_span("rest of line", [85.0, 100.0, 570.0, 112.0], 10.0)];
        assert!(is_justified(&target, &wide, 612.0));
        assert!(!is_justified(&target, &[], 612.0));
    }

    #[test]
    fn test_is_header_by_size() {
        let target = make_span("Big", [0.0, 0.0, 10.0, 10.0], 24.0);
        assert!(is_header(&target, 10.0));
        assert!(!is_header(&target, 20.0));
    }

    #[test]
    fn test_is_header_by_title_and_bold() {
        let mut target = make_span("Annual Report", [0.0, 0.0, 10.0, 10.0], 10.0);
        assert!(!is_header(&target, 10.0));
        target.is_bold = true;
        assert!(is_header(&target, 10.0));
        target.text = "one two three four five six seven eight nine".to_string();
        assert!(!is_header(&target, 10.0));
    }

    #[test]
    fn test_analyze_context() {
        let target = make_span("Title", [256.0, 50.0, 356.0, 74.0], 24.0);
        let siblings = vec![
            make_span("body", [50.0, 100.0, 300.0, 112.0], 10.0),
            make_span("body", [50.0, 120.0, 300.0, 132.0], 10.0),
        ];
        let ctx = analyze_context(&target, &siblings, 612.0, 792.0);
        assert_eq!(ctx.alignment, Alignment::Center);
        assert!(ctx.is_header);
        assert!(!ctx.is_list_item);
        assert!(!ctx.is_justified);
        assert_eq!(ctx.line_width, 100.0);
        assert_eq!(ctx.available_space.left, 256.0);
        assert_eq!(ctx.available_space.right, 256.0);
        assert_eq!(ctx.available_space.top, 50.0);
        assert_eq!(ctx.available_space.bottom, 718.0);
    }
}
