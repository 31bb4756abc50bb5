//! Content-stream text walker.
//!
//! Interprets the text, colour and graphics-state operators of a page and
//! emits one [`RawSpan`] per shown string (`Tj`, `'`, `"`) or `TJ` array.
//! Bounding boxes are reported in page space with the origin at the top-left
//! corner; the box is one font size tall with the baseline
//! `BASELINE_FACTOR * size` above its bottom edge.
//!
//! | Operator | Action |
//! |----------|--------|
//! | `q` / `Q` | Save / restore CTM and fill colour |
//! | `cm`     | Concatenate to the CTM |
//! | `g` `rg` `k` `sc` `scn` | Set fill colour |
//! | `BT`     | Begin text object -- reset matrices |
//! | `ET`     | End text object |
//! | `Tf`     | Set font and size |
//! | `Tm`     | Set text matrix directly |
//! | `Td`     | Translate text position |
//! | `TD`     | Translate and set leading |
//! | `T*`     | Move to start of next line |
//! | `TL`     | Set text leading |
//! | `Tc`     | Set character spacing |
//! | `Tw`     | Set word spacing |
//! | `Tz`     | Set horizontal scaling |
//! | `Ts`     | Set text rise |
//! | `Tj`     | Show a string |
//! | `TJ`     | Show strings with kerning adjustments |
//! | `'`      | Move to next line and show string |
//! | `"`      | Set spacing, move to next line and show string |

use editz_core::metadata::{clean_font_name, name_is_bold, name_is_italic};
use editz_core::reposition::{BASELINE_FACTOR, CHAR_WIDTH_FACTOR};
use editz_core::span::{RawSpan, StyleFlags};

use super::backend::{
    decode_pdf_string, descriptor_flags, BackendFontInfo, ContentOp, Operand, PageBox, PageId,
    PdfBackend,
};
use super::cleanup::clean_span_text;
use crate::PdfError;

/// Elements `[a, b, c, d, e, f]` of a 2D affine transform.
pub type Matrix = [f64; 6];

pub const IDENTITY_MATRIX: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// Glyph advance assumed when a font has no `/Widths` entry for a code, in
/// thousandths of a text-space unit.
const DEFAULT_GLYPH_WIDTH: f64 = CHAR_WIDTH_FACTOR * 1000.0;

/// A `TJ` adjustment wider than this share of an average glyph reads as a
/// word gap.
const TJ_SPACE_RATIO: f64 = 0.3;

/// Descriptor weights at or above this read as bold.
const BOLD_WEIGHT: f64 = 600.0;

/// `m1 x m2` in the PDF row-vector convention.
pub fn multiply(m1: &Matrix, m2: &Matrix) -> Matrix {
    let [a1, b1, c1, d1, e1, f1] = *m1;
    let [a2, b2, c2, d2, e2, f2] = *m2;
    [
        a1 * a2 + b1 * c2,
        a1 * b2 + b1 * d2,
        c1 * a2 + d1 * c2,
        c1 * b2 + d1 * d2,
        e1 * a2 + f1 * c2 + e2,
        e1 * b2 + f1 * d2 + f2,
    ]
}

fn cmyk_to_rgb(c: f64, m: f64, y: f64, k: f64) -> [f64; 3] {
    [(1.0 - c) * (1.0 - k), (1.0 - m) * (1.0 - k), (1.0 - y) * (1.0 - k)]
}

/// Pack `0.0..=1.0` components into a 24-bit integer.
pub fn pack_rgb(rgb: [f64; 3]) -> u32 {
    let channel = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u32;
    (channel(rgb[0]) << 16) | (channel(rgb[1]) << 8) | channel(rgb[2])
}

// ---------------------------------------------------------------------------
// Internal: state
// ---------------------------------------------------------------------------

/// The part of the graphics state saved by `q` and restored by `Q`.
#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    fill: [f64; 3],
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: IDENTITY_MATRIX,
            fill: [0.0, 0.0, 0.0],
        }
    }
}

#[derive(Debug, Clone)]
struct TextState {
    font: Option<BackendFontInfo>,
    font_name: String,
    font_size: f64,
    text_matrix: Matrix,
    line_matrix: Matrix,
    /// Horizontal scaling factor (percent / 100).
    horiz_scale: f64,
    char_spacing: f64,
    word_spacing: f64,
    text_rise: f64,
    leading: f64,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font: None,
            font_name: String::new(),
            font_size: 0.0,
            text_matrix: IDENTITY_MATRIX,
            line_matrix: IDENTITY_MATRIX,
            horiz_scale: 1.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            text_rise: 0.0,
            leading: 0.0,
        }
    }
}

impl TextState {
    /// Advance the text matrix horizontally by `dx` text-space units.
    fn advance_x(&mut self, dx: f64) {
        self.text_matrix[4] += dx * self.text_matrix[0];
        self.text_matrix[5] += dx * self.text_matrix[1];
    }

    /// Multiply the text line matrix by a translation (used by Td / TD).
    fn translate_line(&mut self, tx: f64, ty: f64) {
        let m = &self.line_matrix;
        let new_tx = m[0] * tx + m[2] * ty + m[4];
        let new_ty = m[1] * tx + m[3] * ty + m[5];
        self.line_matrix[4] = new_tx;
        self.line_matrix[5] = new_ty;
        self.text_matrix = self.line_matrix;
    }

    /// Horizontal displacement for shown bytes, in unscaled text space.
    fn string_advance(&self, bytes: &[u8]) -> f64 {
        let font = self.font.as_ref();
        let per_glyph = |width: f64, is_space: bool| {
            let mut tx = width / 1000.0 * self.font_size + self.char_spacing;
            if is_space {
                tx += self.word_spacing;
            }
            tx * self.horiz_scale
        };

        if font.is_some_and(|f| f.is_two_byte()) {
            return bytes
                .chunks(2)
                .map(|_| per_glyph(DEFAULT_GLYPH_WIDTH, false))
                .sum();
        }

        bytes
            .iter()
            .map(|&code| {
                let width = font
                    .and_then(|f| f.width_for(code as u32))
                    .filter(|w| *w > 0.0)
                    .unwrap_or(DEFAULT_GLYPH_WIDTH);
                per_glyph(width, code == b' ')
            })
            .sum()
    }
}

// ---------------------------------------------------------------------------
// Walker
// ---------------------------------------------------------------------------

struct Walker {
    page_box: PageBox,
    fonts: Vec<BackendFontInfo>,
    gs: GraphicsState,
    gs_stack: Vec<GraphicsState>,
    text: TextState,
    spans: Vec<RawSpan>,
}

/// A shown run waiting to become a span.
struct PendingRun {
    text: String,
    /// Text rendering matrix (`Tm x CTM`) where the run starts.
    start: Matrix,
    /// Unscaled text-space advance of the run.
    advance: f64,
}

impl Walker {
    fn apply(&mut self, op: &ContentOp) {
        let nums: Vec<f64> = op
            .operands
            .iter()
            .filter_map(Operand::number)
            .collect();

        match op.operator.as_str() {
            // -- Graphics state -----------------------------------------
            "q" => self.gs_stack.push(self.gs.clone()),
            "Q" => {
                if let Some(saved) = self.gs_stack.pop() {
                    self.gs = saved;
                }
            }
            "cm" => {
                if let [a, b, c, d, e, f] = nums[..] {
                    self.gs.ctm = multiply(&[a, b, c, d, e, f], &self.gs.ctm);
                }
            }

            // -- Fill colour --------------------------------------------
            "g" => {
                if let [gray] = nums[..] {
                    self.gs.fill = [gray, gray, gray];
                }
            }
            "rg" => {
                if let [r, g, b] = nums[..] {
                    self.gs.fill = [r, g, b];
                }
            }
            "k" => {
                if let [c, m, y, k] = nums[..] {
                    self.gs.fill = cmyk_to_rgb(c, m, y, k);
                }
            }
            "sc" | "scn" => match nums[..] {
                [gray] => self.gs.fill = [gray, gray, gray],
                [r, g, b] => self.gs.fill = [r, g, b],
                [c, m, y, k] => self.gs.fill = cmyk_to_rgb(c, m, y, k),
                _ => {}
            },

            // -- Text object --------------------------------------------
            "BT" => {
                self.text.text_matrix = IDENTITY_MATRIX;
                self.text.line_matrix = IDENTITY_MATRIX;
            }
            "ET" => {}

            "Tf" => self.set_font(&op.operands),
            "Tm" => {
                if let [a, b, c, d, e, f] = nums[..] {
                    self.text.text_matrix = [a, b, c, d, e, f];
                    self.text.line_matrix = self.text.text_matrix;
                }
            }
            "Td" => {
                if let [tx, ty] = nums[..] {
                    self.text.translate_line(tx, ty);
                }
            }
            "TD" => {
                // TD is equivalent to: -ty TL ; tx ty Td
                if let [tx, ty] = nums[..] {
                    self.text.leading = -ty;
                    self.text.translate_line(tx, ty);
                }
            }
            "T*" => {
                let leading = self.text.leading;
                self.text.translate_line(0.0, -leading);
            }
            "TL" => {
                if let Some(&v) = nums.first() {
                    self.text.leading = v;
                }
            }
            "Tc" => {
                if let Some(&v) = nums.first() {
                    self.text.char_spacing = v;
                }
            }
            "Tw" => {
                if let Some(&v) = nums.first() {
                    self.text.word_spacing = v;
                }
            }
            "Tz" => {
                if let Some(&v) = nums.first() {
                    self.text.horiz_scale = v / 100.0;
                }
            }
            "Ts" => {
                if let Some(&v) = nums.first() {
                    self.text.text_rise = v;
                }
            }

            // -- Show text ----------------------------------------------
            "Tj" => {
                if let Some(Operand::Str(bytes)) = op.operands.first() {
                    self.show_string(bytes);
                }
            }
            "TJ" => {
                if let Some(Operand::Array(arr)) = op.operands.first() {
                    self.show_array(arr);
                }
            }
            "'" => {
                let leading = self.text.leading;
                self.text.translate_line(0.0, -leading);
                if let Some(Operand::Str(bytes)) = op.operands.first() {
                    self.show_string(bytes);
                }
            }
            "\"" => {
                // `aw ac (s) "` is `aw Tw ac Tc (s) '`
                if let [aw, ac, Operand::Str(bytes)] = &op.operands[..] {
                    if let Some(aw) = aw.number() {
                        self.text.word_spacing = aw;
                    }
                    if let Some(ac) = ac.number() {
                        self.text.char_spacing = ac;
                    }
                    let leading = self.text.leading;
                    self.text.translate_line(0.0, -leading);
                    self.show_string(bytes);
                }
            }

            _ => { /* Ignore non-text operators */ }
        }
    }

    fn set_font(&mut self, operands: &[Operand]) {
        let [key, size, ..] = operands else {
            return;
        };
        let key = match key {
            Operand::Name(n) | Operand::Str(n) => n.clone(),
            _ => return,
        };
        let font = self.fonts.iter().find(|info| info.name == key).cloned();
        self.text.font_name = font
            .as_ref()
            .and_then(|f| f.base_font.clone())
            .unwrap_or_else(|| String::from_utf8_lossy(&key).into_owned());
        self.text.font = font;
        self.text.font_size = size.number().unwrap_or(0.0);
    }

    fn rendering_matrix(&self) -> Matrix {
        multiply(&self.text.text_matrix, &self.gs.ctm)
    }

    fn decode(&self, bytes: &[u8]) -> String {
        match &self.text.font {
            Some(font) => font.decode(bytes),
            None => decode_pdf_string(bytes),
        }
    }

    fn show_string(&mut self, bytes: &[u8]) {
        let start = self.rendering_matrix();
        let advance = self.text.string_advance(bytes);
        let text = self.decode(bytes);
        self.text.advance_x(advance);
        self.emit(PendingRun {
            text,
            start,
            advance,
        });
    }

    /// Elements are either strings to render or numeric kerning adjustments
    /// (in thousandths of a unit of text space). One span per array.
    fn show_array(&mut self, arr: &[Operand]) {
        let start = self.rendering_matrix();
        let mut text = String::new();
        let mut advance = 0.0;
        let mut advance_at_last_glyph = 0.0;
        let gap_threshold = self.text.font_size * CHAR_WIDTH_FACTOR * TJ_SPACE_RATIO;

        for elem in arr {
            match elem {
                Operand::Str(bytes) => {
                    let dx = self.text.string_advance(bytes);
                    text.push_str(&self.decode(bytes));
                    self.text.advance_x(dx);
                    advance += dx;
                    advance_at_last_glyph = advance;
                }
                val => {
                    // Negative value = move right, positive = move left.
                    if let Some(adj) = val.number() {
                        let dx = -adj / 1000.0 * self.text.font_size * self.text.horiz_scale;
                        if dx > gap_threshold && !text.is_empty() && !text.ends_with(' ') {
                            text.push(' ');
                        }
                        self.text.advance_x(dx);
                        advance += dx;
                    }
                }
            }
        }

        self.emit(PendingRun {
            text: text.trim_end().to_string(),
            start,
            advance: advance_at_last_glyph,
        });
    }

    fn style_flags(&self) -> u32 {
        let mut flags = StyleFlags::default();
        if let Some(font) = &self.text.font {
            let descriptor = font.descriptor_flags.unwrap_or(0);
            if descriptor & descriptor_flags::FIXED_PITCH != 0 {
                flags.insert(StyleFlags::MONOSPACE);
            }
            if descriptor & descriptor_flags::SERIF != 0 {
                flags.insert(StyleFlags::SERIF);
            }
            if descriptor & descriptor_flags::ITALIC != 0 {
                flags.insert(StyleFlags::ITALIC);
            }
            if descriptor & descriptor_flags::FORCE_BOLD != 0
                || font.descriptor_weight.is_some_and(|w| w >= BOLD_WEIGHT)
            {
                flags.insert(StyleFlags::BOLD);
            }
        }
        // Standard-14 fonts ship without descriptors; their names are canonical.
        if self.text.font.as_ref().is_none_or(|f| f.descriptor_flags.is_none()) {
            let name = clean_font_name(&self.text.font_name);
            if name_is_bold(name) {
                flags.insert(StyleFlags::BOLD);
            }
            if name_is_italic(name) {
                flags.insert(StyleFlags::ITALIC);
            }
        }
        if self.text.text_rise > 0.0 {
            flags.insert(StyleFlags::SUPERSCRIPT);
        }
        flags.0
    }

    fn emit(&mut self, run: PendingRun) {
        let text = clean_span_text(&run.text);
        if text.trim().is_empty() {
            return;
        }

        let m = run.start;
        let rise = self.text.text_rise;
        let (ux, uy) = (m[2] * rise + m[4], m[3] * rise + m[5]);
        let size = (self.text.font_size * (m[2] * m[2] + m[3] * m[3]).sqrt()).abs();
        let width = run.advance * (m[0] * m[0] + m[1] * m[1]).sqrt();

        let (x0, baseline) = self.page_box.to_top_left(ux, uy);
        let y1 = baseline + BASELINE_FACTOR * size;
        let (x0, x1) = if width >= 0.0 {
            (x0, x0 + width)
        } else {
            (x0 + width, x0)
        };

        let flags = self.style_flags();
        self.spans.push(RawSpan {
            text,
            font: Some(self.text.font_name.clone()).filter(|n| !n.is_empty()),
            size: Some(size),
            flags,
            color: Some(serde_json::Value::from(pack_rgb(self.gs.fill))),
            bbox: Some([x0, y1 - size, x1, y1]),
            transform: Some(m),
            char_spacing: Some(self.text.char_spacing),
            word_spacing: Some(self.text.word_spacing),
        });
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Walk a single page's content stream and produce its raw spans in
/// content-stream order.
pub fn extract_page_spans(
    backend: &dyn PdfBackend,
    page_id: PageId,
) -> Result<Vec<RawSpan>, PdfError> {
    let raw_content = backend.page_content(page_id)?;
    let ops = backend.decode_content(&raw_content)?;

    let mut walker = Walker {
        page_box: backend.page_box(page_id)?,
        fonts: backend.page_fonts(page_id).unwrap_or_default(),
        gs: GraphicsState::default(),
        gs_stack: Vec::new(),
        text: TextState::default(),
        spans: Vec::new(),
    };

    for op in &ops {
        walker.apply(op);
    }

    Ok(walker.spans)
}

/// Extract raw spans from every page, keyed by 1-based page number.
pub fn extract_all_pages(backend: &dyn PdfBackend) -> Result<Vec<(u32, Vec<RawSpan>)>, PdfError> {
    backend
        .pages()
        .into_iter()
        .map(|(page_num, page_id)| Ok((page_num, extract_page_spans(backend, page_id)?)))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
