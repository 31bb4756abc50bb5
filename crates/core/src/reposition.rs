//! Geometry for placing replacement text.
//!
//! Widths are always estimated as `chars * font_size * 0.6`; no glyph
//! metrics are consulted.

use crate::classify::{Anchor, LayoutRole};
use crate::geometry::{BBox, Point};

/// Average glyph advance as a fraction of the font size.
pub const CHAR_WIDTH_FACTOR: f64 = 0.6;
/// Baseline sits this fraction of the font size above the box bottom.
pub const BASELINE_FACTOR: f64 = 0.2;
/// Uniform padding around the original box when erasing it.
pub const ERASE_PADDING: f64 = 2.0;

pub fn estimated_width(text: &str, font_size: f64) -> f64 {
    text.chars().count() as f64 * font_size * CHAR_WIDTH_FACTOR
}

/// Result of repositioning a box for new text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub bbox: BBox,
    /// A page-boundary clamp moved the box.
    pub clamped: bool,
    /// Estimated new width minus estimated old width.
    pub width_change: f64,
}

pub fn reposition(
    role: LayoutRole,
    old_text: &str,
    new_text: &str,
    original: BBox,
    font_size: f64,
    page_width: f64,
) -> BBox {
    place(role, old_text, new_text, original, font_size, page_width).bbox
}

/// [`reposition`] with diagnostics.
///
/// A degenerate box, an unusable font size or an unusable page width
/// returns the original box unchanged. Clamping only applies to centred and right-anchored roles.
pub fn place(
    role: LayoutRole,
    old_text: &str,
    new_text: &str,
    original: BBox,
    font_size: f64,
    page_width: f64,
) -> Placement {
    if original.is_degenerate()
        || !font_size.is_finite()
        || font_size <= 0.0
        || !page_width.is_finite()
        || page_width <= 0.0
    {
        return Placement {
            bbox: original,
            clamped: false,
            width_change: 0.0,
        };
    }

    let width = estimated_width(new_text, font_size);
    let width_change = width - estimated_width(old_text, font_size);
    let BBox { x0, y0, x1, y1 } = original;

    let (bbox, clamped) = match role.anchor() {
        Anchor::Left => (BBox::new(x0, y0, x0 + width, y1), false),
        Anchor::Center => {
            let center = original.center_x();
            clamp_to_page(
                BBox::new(center - width / 2.0, y0, center + width / 2.0, y1),
                page_width,
            )
        }
        Anchor::Right => clamp_to_page(BBox::new(x1 - width, y0, x1, y1), page_width),
    };

    Placement {
        bbox,
        clamped,
        width_change,
    }
}

/// Shift the box back inside `[0, page_width]`, keeping its width. The left
/// edge wins when the box is wider than the page.
pub fn clamp_to_page(bbox: BBox, page_width: f64) -> (BBox, bool) {
    if bbox.x0 < 0.0 {
        (bbox.shifted_x(-bbox.x0), true)
    } else if page_width.is_finite() && page_width > 0.0 && bbox.x1 > page_width {
        (bbox.shifted_x(page_width - bbox.x1), true)
    } else {
        (bbox, false)
    }
}

/// Text-draw origin for a box: left edge, approximate baseline.
pub fn insertion_anchor(bbox: &BBox, font_size: f64) -> Point {
    Point {
        x: bbox.x0,
        y: bbox.y1 - font_size * BASELINE_FACTOR,
    }
}

/// Region to blank out before drawing: always the original box, padded.
pub fn erase_rect(original: &BBox) -> BBox {
    original.padded(ERASE_PADDING)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-4;

    fn assert_bbox_eq(actual: BBox, expected: BBox) {
        let a: [f64; 4] = actual.into();
        let e: [f64; 4] = expected.into();
        for (x, y) in a.iter().zip(e.iter()) {
            assert!((x - y).abs() < EPS, "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn test_width_monotonic_in_length() {
        let mut last = estimated_width("", 11.0);
        for n in 1..50 {
            let w = estimated_width(&"x".repeat(n), 11.0);
            assert!(w > last);
            last = w;
        }
    }

    #[test]
    fn test_width_counts_chars_not_bytes() {
        assert_eq!(estimated_width("é•", 10.0), estimated_width("ab", 10.0));
    }

    #[test]
    fn test_station_example() {
        let bbox = reposition(
            LayoutRole::StationOrCode,
            "NDLS",
            "NEW DELHI",
            BBox::new(100.0, 200.0, 160.0, 214.0),
            12.0,
            612.0,
        );
        assert_bbox_eq(bbox, BBox::new(97.6, 200.0, 162.4, 214.0));
    }

    #[test]
    fn test_left_aligned_example() {
        let bbox = reposition(
            LayoutRole::LeftAligned,
            "Hi",
            "Hello World",
            BBox::new(50.0, 100.0, 90.0, 112.0),
            10.0,
            612.0,
        );
        assert_bbox_eq(bbox, BBox::new(50.0, 100.0, 116.0, 112.0));
    }

    #[test]
    fn test_right_aligned_example() {
        // 16 chars at size 25/3 gives w' = 80.
        let text = "x".repeat(16);
        let bbox = reposition(
            LayoutRole::RightAligned,
            "old",
            &text,
            BBox::new(500.0, 100.0, 560.0, 112.0),
            25.0 / 3.0,
            612.0,
        );
        assert_bbox_eq(bbox, BBox::new(480.0, 100.0, 560.0, 112.0));
    }

    #[test]
    fn test_left_fixed_roles_keep_x0() {
        let original = BBox::new(50.0, 100.0, 90.0, 112.0);
        for role in [
            LayoutRole::LeftAligned,
            LayoutRole::ListItem,
            LayoutRole::TableLeft,
            LayoutRole::StructuredLeft,
        ] {
            for text in ["", "a", "a much longer replacement string"] {
                let bbox = reposition(role, "old", text, original, 10.0, 612.0);
                assert_eq!(bbox.x0, original.x0);
                assert_eq!(bbox.y0, original.y0);
                assert_eq!(bbox.y1, original.y1);
            }
        }
    }

    #[test]
    fn test_left_fixed_overflow_not_clamped() {
        let original = BBox::new(500.0, 100.0, 560.0, 112.0);
        let p = place(
            LayoutRole::LeftAligned,
            "old",
            &"x".repeat(40),
            original,
            10.0,
            612.0,
        );
        assert_eq!(p.bbox.x0, 500.0);
        assert!(p.bbox.x1 > 612.0);
        assert!(!p.clamped);
    }

    #[test]
    fn test_right_fixed_roles_keep_x1() {
        let original = BBox::new(300.0, 100.0, 360.0, 112.0);
        for role in [LayoutRole::RightAligned, LayoutRole::TableRight] {
            let bbox = reposition(role, "old", "new text", original, 10.0, 612.0);
            assert_eq!(bbox.x1, 360.0);
        }
    }

    #[test]
    fn test_center_preserved() {
        let original = BBox::new(200.0, 10.0, 260.0, 22.0);
        for role in [LayoutRole::StationOrCode, LayoutRole::IsolatedCenter] {
            for text in ["A", "MEDIUM", "A LONGER CENTERED TITLE"] {
                let bbox = reposition(role, "old", text, original, 12.0, 612.0);
                assert!((bbox.center_x() - original.center_x()).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_center_clamped_at_left_edge() {
        let original = BBox::new(0.0, 10.0, 20.0, 22.0);
        let p = place(
            LayoutRole::StationOrCode,
            "AB",
            "NEW DELHI",
            original,
            12.0,
            612.0,
        );
        assert!(p.clamped);
        assert_eq!(p.bbox.x0, 0.0);
        assert!((p.bbox.width() - estimated_width("NEW DELHI", 12.0)).abs() < EPS);
    }

    #[test]
    fn test_right_clamped_at_left_edge() {
        let original = BBox::new(10.0, 10.0, 30.0, 22.0);
        let p = place(
            LayoutRole::RightAligned,
            "AB",
            "a long replacement",
            original,
            12.0,
            612.0,
        );
        assert!(p.clamped);
        assert_eq!(p.bbox.x0, 0.0);
        assert!((p.bbox.width() - estimated_width("a long replacement", 12.0)).abs() < EPS);
    }

    #[test]
    fn test_center_clamped_at_right_edge() {
        let original = BBox::new(590.0, 10.0, 610.0, 22.0);
        let p = place(
            LayoutRole::IsolatedCenter,
            "AB",
            "LONG TITLE",
            original,
            12.0,
            612.0,
        );
        assert!(p.clamped);
        assert!((p.bbox.x1 - 612.0).abs() < EPS);
        assert!((p.bbox.width() - estimated_width("LONG TITLE", 12.0)).abs() < EPS);
    }

    #[test]
    fn test_degenerate_geometry_returns_original() {
        let zero_width = BBox::new(50.0, 100.0, 50.0, 112.0);
        assert_eq!(
            reposition(LayoutRole::LeftAligned, "a", "bbb", zero_width, 10.0, 612.0),
            zero_width
        );
        let ok = BBox::new(50.0, 100.0, 90.0, 112.0);
        assert_eq!(
            reposition(LayoutRole::StationOrCode, "a", "bbb", ok, 0.0, 612.0),
            ok
        );
        assert_eq!(
            reposition(LayoutRole::RightAligned, "a", "bbb", ok, f64::NAN, 612.0),
            ok
        );
    }

    #[test]
    fn test_unusable_page_width_returns_original() {
        let ok = BBox::new(50.0, 100.0, 90.0, 112.0);
        for page_width in [f64::NAN, f64::INFINITY, 0.0] {
            let p = place(LayoutRole::LeftAligned, "a", "much longer", ok, 10.0, page_width);
            assert_eq!(p.bbox, ok);
            assert_eq!(p.width_change, 0.0);
        }
    }

    #[test]
    fn test_width_change() {
        let p = place(
            LayoutRole::LeftAligned,
            "Hi",
            "Hello World",
            BBox::new(50.0, 100.0, 90.0, 112.0),
            10.0,
            612.0,
        );
        assert!((p.width_change - 54.0).abs() < EPS);
    }

    #[test]
    fn test_insertion_anchor() {
        let p = insertion_anchor(&BBox::new(50.0, 100.0, 116.0, 112.0), 10.0);
        assert_eq!(p.x, 50.0);
        assert_eq!(p.y, 110.0);
    }

    #[test]
    fn test_erase_rect_uses_original() {
        let r = erase_rect(&BBox::new(50.0, 100.0, 90.0, 112.0));
        assert_eq!(r, BBox::new(48.0, 98.0, 92.0, 114.0));
    }
}
