//! Edit planning: from a span key and replacement text to everything the
//! PDF writer needs to erase the old run and draw the new one.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::classify::{classify_with_reason, LayoutRole};
use crate::context::{analyze_context, line_text};
use crate::geometry::{BBox, Point};
use crate::reposition::{erase_rect, estimated_width, insertion_anchor, place};
use crate::span::{Rgb, SpanKey, TextSpan};
use crate::EditError;

/// A justified line whose target grows by more than this share may need a break.
pub const LINE_BREAK_GROWTH: f64 = 0.3;
/// Visual boldness above this is drawn with fill and stroke.
pub const STROKE_BOLD_THRESHOLD: f64 = 75.0;

#[derive(Debug, Clone)]
pub struct EditRequest {
    pub target: SpanKey,
    pub new_text: String,
    /// Every span of the document, keyed as produced by extraction.
    pub spans: BTreeMap<SpanKey, TextSpan>,
    pub page_width: f64,
    pub page_height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentDecision {
    pub strategy: LayoutRole,
    pub new_bbox: BBox,
    pub reasoning: String,
    pub clamped: bool,
    pub overflow_risk: bool,
    pub needs_line_break: bool,
    pub width_change: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    #[default]
    Fill,
    FillStroke,
}

impl RenderMode {
    /// Operand for the `Tr` text operator.
    pub fn operand(&self) -> i64 {
        match self {
            RenderMode::Fill => 0,
            RenderMode::FillStroke => 2,
        }
    }
}

/// How the replacement text is drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawStyle {
    pub font: String,
    pub size: f64,
    pub color: Rgb,
    pub is_bold: bool,
    pub is_italic: bool,
    pub is_serif: bool,
    pub is_monospace: bool,
    pub char_spacing: f64,
    pub word_spacing: f64,
    pub render_mode: RenderMode,
}

impl DrawStyle {
    pub fn from_span(span: &TextSpan) -> Self {
        let render_mode = match span.visual_boldness {
            Some(score) if score > STROKE_BOLD_THRESHOLD => RenderMode::FillStroke,
            _ => RenderMode::Fill,
        };
        DrawStyle {
            font: span.font.clone(),
            size: span.size,
            color: span.color,
            is_bold: span.effective_bold(),
            is_italic: span.is_italic,
            is_serif: span.flags.is_serif(),
            is_monospace: span.flags.is_monospace(),
            char_spacing: span.char_spacing,
            word_spacing: span.word_spacing,
            render_mode,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditPlan {
    pub key: SpanKey,
    pub page: u32,
    pub old_text: String,
    pub new_text: String,
    pub original_bbox: BBox,
    #[serde(flatten)]
    pub decision: AlignmentDecision,
    /// Text-draw origin in top-left page space.
    pub anchor: Point,
    /// Region blanked before drawing, in top-left page space.
    pub erase: BBox,
    pub style: DrawStyle,
}

pub fn plan_edit(request: &EditRequest) -> Result<EditPlan, EditError> {
    let target = request
        .spans
        .get(&request.target)
        .ok_or(EditError::MissingTarget(request.target))?;

    let siblings: Vec<TextSpan> = request
        .spans
        .iter()
        .filter(|(key, span)| **key != request.target && span.page == target.page)
        .map(|(_, span)| span.clone())
        .collect();

    let line = line_text(target, &siblings);
    let classification = classify_with_reason(target, &line, request.page_width, &siblings);
    let context = analyze_context(target, &siblings, request.page_width, request.page_height);

    let placement = place(
        classification.role,
        &target.text,
        &request.new_text,
        target.bbox,
        target.size,
        request.page_width,
    );

    let old_width = estimated_width(&target.text, target.size);
    let needs_line_break = context.is_justified
        && old_width > 0.0
        && placement.width_change > old_width * LINE_BREAK_GROWTH;

    let decision = AlignmentDecision {
        strategy: classification.role,
        new_bbox: placement.bbox,
        reasoning: classification.reasoning,
        clamped: placement.clamped,
        overflow_risk: placement.bbox.x1 > request.page_width,
        needs_line_break,
        width_change: placement.width_change,
    };

    log::debug!(
        "{}: {} -> {:?} ({})",
        request.target,
        decision.strategy,
        <[f64; 4]>::from(decision.new_bbox),
        decision.reasoning
    );

    Ok(EditPlan {
        key: request.target,
        page: target.page,
        old_text: target.text.clone(),
        new_text: request.new_text.clone(),
        original_bbox: target.bbox,
        anchor: insertion_anchor(&placement.bbox, target.size),
        erase: erase_rect(&target.bbox),
        style: DrawStyle::from_span(target),
        decision,
    })
}
