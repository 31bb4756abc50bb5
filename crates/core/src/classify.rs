//! Layout role classification.
//!
//! Rules are tried in a fixed priority order and the first match wins:
//!
//! 1. list item
//! 2. station name or code label
//! 3. structured (label:value / tabular) line
//! 4. table cell
//! 5. isolated header
//! 6. right aligned
//! 7. left aligned
//!
//! Classification never fails. Unusable geometry resolves to
//! [`LayoutRole::LeftAligned`].

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::context::{self, has_bullet_before, has_list_marker, same_line, usable_siblings};
use crate::span::TextSpan;

pub const STRUCTURE_DELIMITERS: [char; 3] = [':', '|', '\t'];
pub const MIN_STRUCTURE_DELIMITERS: usize = 2;
pub const MIN_TABLE_NEIGHBORS: usize = 2;
/// Maximum gap to a neighbour for the target to count as not isolated.
pub const NEIGHBOR_GAP: f64 = 20.0;
/// Above/below neighbours must start within this many units horizontally.
pub const NEIGHBOR_X_RANGE: f64 = 100.0;
pub const MIN_EMPTY_DIRECTIONS: usize = 2;
pub const SHORT_TEXT_CHARS: usize = 25;
/// Isolated text this close to the page centre (as a share of page width) is centred.
pub const CENTER_ZONE_RATIO: f64 = 0.15;
pub const RIGHT_MARGIN: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutRole {
    ListItem,
    StationOrCode,
    StructuredLeft,
    TableLeft,
    TableRight,
    IsolatedCenter,
    RightAligned,
    LeftAligned,
}

/// Which edge of the box stays put when the text changes length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Left,
    Center,
    Right,
}

impl LayoutRole {
    pub fn strategy(&self) -> &'static str {
        match self {
            LayoutRole::ListItem => "list_item",
            LayoutRole::StationOrCode => "station_or_code",
            LayoutRole::StructuredLeft => "structured_left",
            LayoutRole::TableLeft => "table_left",
            LayoutRole::TableRight => "table_right",
            LayoutRole::IsolatedCenter => "isolated_center",
            LayoutRole::RightAligned => "right_aligned",
            LayoutRole::LeftAligned => "left_aligned",
        }
    }

    pub fn anchor(&self) -> Anchor {
        match self {
            LayoutRole::ListItem
            | LayoutRole::StructuredLeft
            | LayoutRole::TableLeft
            | LayoutRole::LeftAligned => Anchor::Left,
            LayoutRole::StationOrCode | LayoutRole::IsolatedCenter => Anchor::Center,
            LayoutRole::RightAligned | LayoutRole::TableRight => Anchor::Right,
        }
    }
}

impl std::fmt::Display for LayoutRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.strategy())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub role: LayoutRole,
    pub reasoning: String,
}

impl Classification {
    fn new(role: LayoutRole, reasoning: impl Into<String>) -> Self {
        Classification {
            role,
            reasoning: reasoning.into(),
        }
    }
}

pub fn classify(
    target: &TextSpan,
    line_text: &str,
    page_width: f64,
    siblings: &[TextSpan],
) -> LayoutRole {
    classify_with_reason(target, line_text, page_width, siblings).role
}

pub fn classify_with_reason(
    target: &TextSpan,
    line_text: &str,
    page_width: f64,
    siblings: &[TextSpan],
) -> Classification {
    let result = run_rules(target, line_text, page_width, siblings);
    log::debug!(
        "classified {:?} as {}: {}",
        target.text,
        result.role,
        result.reasoning
    );
    result
}

fn run_rules(
    target: &TextSpan,
    line_text: &str,
    page_width: f64,
    siblings: &[TextSpan],
) -> Classification {
    if !target.bbox.is_well_formed() || !target.size.is_finite() || !page_width.is_finite() {
        return Classification::new(
            LayoutRole::LeftAligned,
            "unusable target geometry, keeping original position",
        );
    }

    if has_list_marker(line_text)
        || has_list_marker(&target.text)
        || has_bullet_before(target, siblings)
    {
        return Classification::new(LayoutRole::ListItem, "list marker on line");
    }

    if is_station_or_code(&target.text) {
        return Classification::new(
            LayoutRole::StationOrCode,
            format!("station or code label {:?}, keeping center", target.text.trim()),
        );
    }

    let delimiters = line_text
        .chars()
        .filter(|c| STRUCTURE_DELIMITERS.contains(c))
        .count();
    if delimiters >= MIN_STRUCTURE_DELIMITERS {
        return Classification::new(
            LayoutRole::StructuredLeft,
            format!("{delimiters} structural delimiters on line"),
        );
    }

    let usable = usable_siblings(target, siblings);

    if let Some(role) = table_role(target, &usable) {
        return Classification::new(role, "aligned with other cells on the same line");
    }

    if let Some(reason) = isolated_center(target, line_text, page_width, &usable) {
        return Classification::new(LayoutRole::IsolatedCenter, reason);
    }

    if page_width - target.bbox.x1 < RIGHT_MARGIN {
        return Classification::new(
            LayoutRole::RightAligned,
            format!("right margin {:.1} below {RIGHT_MARGIN}", page_width - target.bbox.x1),
        );
    }

    Classification::new(LayoutRole::LeftAligned, "no layout signal, keeping left edge")
}

/// `NEW DELHI (NDLS)` style station names and bare uppercase codes.
pub fn is_station_or_code(text: &str) -> bool {
    static STATION: OnceLock<Regex> = OnceLock::new();
    static CODE: OnceLock<Regex> = OnceLock::new();
    let station = STATION
        .get_or_init(|| Regex::new(r"^[A-Z\s]+\s*\([A-Z]{2,4}\)$").expect("station pattern"));
    let code = CODE.get_or_init(|| Regex::new(r"^[A-Z0-9]+$").expect("code pattern"));

    let trimmed = text.trim();
    station.is_match(&trimmed.to_uppercase()) || code.is_match(trimmed)
}

fn table_role(target: &TextSpan, siblings: &[&TextSpan]) -> Option<LayoutRole> {
    let t = &target.bbox;
    let (mut before, mut after) = (0usize, 0usize);
    for s in siblings.iter().filter(|s| same_line(&s.bbox, t)) {
        if s.bbox.x1 <= t.x0 {
            before += 1;
        } else if s.bbox.x0 >= t.x1 {
            after += 1;
        }
    }
    if before + after < MIN_TABLE_NEIGHBORS {
        return None;
    }
    Some(if before == 0 {
        LayoutRole::TableLeft
    } else if after == 0 {
        LayoutRole::TableRight
    } else {
        LayoutRole::TableLeft
    })
}

/// Count of the four directions with no neighbour close by.
fn empty_directions(target: &TextSpan, siblings: &[&TextSpan]) -> usize {
    let t = &target.bbox;
    let near_column = |s: &&&TextSpan| (s.bbox.x0 - t.x0).abs() < NEIGHBOR_X_RANGE;

    let above = siblings
        .iter()
        .filter(near_column)
        .any(|s| s.bbox.y1 <= t.y0 && t.y0 - s.bbox.y1 <= NEIGHBOR_GAP);
    let below = siblings
        .iter()
        .filter(near_column)
        .any(|s| s.bbox.y0 >= t.y1 && s.bbox.y0 - t.y1 <= NEIGHBOR_GAP);
    let left = siblings
        .iter()
        .filter(|s| same_line(&s.bbox, t))
        .any(|s| s.bbox.x1 <= t.x0 && t.x0 - s.bbox.x1 <= NEIGHBOR_GAP);
    let right = siblings
        .iter()
        .filter(|s| same_line(&s.bbox, t))
        .any(|s| s.bbox.x0 >= t.x1 && s.bbox.x0 - t.x1 <= NEIGHBOR_GAP);

    [above, below, left, right].iter().filter(|has| !**has).count()
}

fn is_caps_header(text: &str) -> bool {
    static CAPS: OnceLock<Regex> = OnceLock::new();
    let re = CAPS.get_or_init(|| Regex::new(r"^[A-Z0-9\s()]+$").expect("caps header pattern"));
    let trimmed = text.trim();
    re.is_match(trimmed) && trimmed.chars().any(|c| c.is_ascii_uppercase())
}

/// Set larger than the surrounding text and bold. Size alone is not enough.
fn is_bold_display(target: &TextSpan, average_font_size: f64) -> bool {
    average_font_size > 0.0
        && target.size > average_font_size * context::HEADER_SIZE_RATIO
        && target.effective_bold()
}

fn isolated_center(
    target: &TextSpan,
    line_text: &str,
    page_width: f64,
    siblings: &[&TextSpan],
) -> Option<String> {
    let empty = empty_directions(target, siblings);
    if empty < MIN_EMPTY_DIRECTIONS {
        return None;
    }

    let average = context::average_font_size(target, siblings);
    let short_whole_line =
        target.text.chars().count() <= SHORT_TEXT_CHARS && target.text.trim() == line_text.trim();
    let header_like = is_caps_header(&target.text) || is_bold_display(target, average);
    if !(short_whole_line || header_like) {
        return None;
    }

    let offset = (target.bbox.center_x() - page_width / 2.0).abs();
    if offset <= page_width * CENTER_ZONE_RATIO {
        Some(format!(
            "isolated ({empty} empty directions) near page center, offset {offset:.1}"
        ))
    } else if header_like {
        Some(format!(
            "isolated header ({empty} empty directions), keeping its own center"
        ))
    } else {
        None
    }
}
