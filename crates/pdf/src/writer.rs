//! Erase-and-redraw writer.
//!
//! An edit never rewrites the page's existing operators. The original
//! content is wrapped in `q ... Q` and a new stream is appended that paints
//! the padded original box white and draws the replacement text on top.

use editz_core::edit::{EditPlan, RenderMode};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use crate::fonts::{encode_win_ansi, BuiltinFont};
use crate::parser::backend::{LopdfBackend, PageBox, PdfBackend};
use crate::PdfError;

/// Stroke width for fill+stroke text, as a share of the font size.
const STROKE_WIDTH_RATIO: f64 = 0.03;

/// Apply one planned edit on the page its target span came from and return
/// the re-serialised document.
pub fn apply_edit(bytes: &[u8], plan: &EditPlan) -> Result<Vec<u8>, PdfError> {
    let backend = LopdfBackend::load_bytes(bytes)?;
    let page_id = backend.page_id(plan.page)?;
    let page_box = backend.page_box(page_id)?;
    let mut doc = backend.into_doc();

    let font = BuiltinFont::for_style(&plan.style);
    let font_key = font.resource_key();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => Object::Name(font.base_font_name().as_bytes().to_vec()),
        "Encoding" => "WinAnsiEncoding",
    });

    let mut resources = effective_resources(&doc, page_id);
    let mut fonts = resolve_dict(&doc, resources.get(b"Font").ok()).unwrap_or_default();
    fonts.set(font_key.as_bytes().to_vec(), Object::Reference(font_id));
    resources.set("Font", Object::Dictionary(fonts));

    let prefix = encode_stream(vec![Operation::new("q", vec![])])?;
    let suffix = encode_stream(edit_operations(plan, &page_box, &font_key))?;
    let prefix_id = doc.add_object(Stream::new(Dictionary::new(), prefix));
    let suffix_id = doc.add_object(Stream::new(Dictionary::new(), suffix));

    let mut contents = vec![Object::Reference(prefix_id)];
    contents.extend(existing_contents(&doc, page_id));
    contents.push(Object::Reference(suffix_id));

    let page_dict = doc
        .get_object_mut(page_id)
        .and_then(|obj| obj.as_dict_mut())
        .map_err(|e| PdfError::Write(format!("cannot get page dictionary: {}", e)))?;
    page_dict.set("Resources", Object::Dictionary(resources));
    page_dict.set("Contents", Object::Array(contents));

    log::debug!(
        "page {}: erase {:?}, draw {:?} with /{} ({})",
        plan.page,
        <[f64; 4]>::from(plan.erase),
        plan.new_text,
        font_key,
        font.base_font_name()
    );

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| PdfError::Write(e.to_string()))?;
    Ok(out)
}

/// The appended content: restore the original state, blank the old run,
/// draw the new one.
fn edit_operations(plan: &EditPlan, page_box: &PageBox, font_key: &str) -> Vec<Operation> {
    let real = |v: f64| Object::Real(v as f32);

    let erase = plan.erase;
    let (ex, ey) = page_box.to_user_space(erase.x0, erase.y1);
    let mut ops = vec![
        Operation::new("Q", vec![]),
        Operation::new("q", vec![]),
        Operation::new("rg", vec![real(1.0), real(1.0), real(1.0)]),
        Operation::new(
            "re",
            vec![real(ex), real(ey), real(erase.width()), real(erase.height())],
        ),
        Operation::new("f", vec![]),
        Operation::new("Q", vec![]),
    ];

    if plan.new_text.is_empty() {
        return ops;
    }

    let style = &plan.style;
    let [r, g, b] = style.color.normalized();
    let (ax, ay) = page_box.to_user_space(plan.anchor.x, plan.anchor.y);

    ops.push(Operation::new("q", vec![]));
    ops.push(Operation::new("rg", vec![real(r), real(g), real(b)]));
    if style.render_mode == RenderMode::FillStroke {
        ops.push(Operation::new("RG", vec![real(r), real(g), real(b)]));
        ops.push(Operation::new("w", vec![real(style.size * STROKE_WIDTH_RATIO)]));
    }
    ops.extend([
        Operation::new("BT", vec![]),
        Operation::new(
            "Tf",
            vec![Object::Name(font_key.as_bytes().to_vec()), real(style.size)],
        ),
        Operation::new("Tc", vec![real(style.char_spacing)]),
        Operation::new("Tw", vec![real(style.word_spacing)]),
        Operation::new("Tr", vec![Object::Integer(style.render_mode.operand())]),
        Operation::new(
            "Tm",
            vec![real(1.0), real(0.0), real(0.0), real(1.0), real(ax), real(ay)],
        ),
        Operation::new(
            "Tj",
            vec![Object::string_literal(encode_win_ansi(&plan.new_text))],
        ),
        Operation::new("ET", vec![]),
        Operation::new("Q", vec![]),
    ]);
    ops
}

/// Streams are concatenated by readers, so each one ends on a separator.
fn encode_stream(operations: Vec<Operation>) -> Result<Vec<u8>, PdfError> {
    let mut bytes = Content { operations }
        .encode()
        .map_err(|e| PdfError::Write(format!("content stream encode error: {}", e)))?;
    if bytes.last().is_some_and(|b| !b.is_ascii_whitespace()) {
        bytes.push(b'\n');
    }
    Ok(bytes)
}

fn resolve_dict(doc: &Document, obj: Option<&Object>) -> Option<Dictionary> {
    match obj? {
        Object::Dictionary(d) => Some(d.clone()),
        Object::Reference(id) => doc.get_dictionary(*id).ok().cloned(),
        _ => None,
    }
}

/// The page's resources as an owned dictionary, inherited from the page
/// tree when the page has none of its own.
fn effective_resources(doc: &Document, page_id: ObjectId) -> Dictionary {
    let mut node = doc.get_dictionary(page_id).ok();
    while let Some(dict) = node {
        if let Some(resources) = resolve_dict(doc, dict.get(b"Resources").ok()) {
            return resources;
        }
        node = dict
            .get(b"Parent")
            .and_then(|p| p.as_reference())
            .and_then(|id| doc.get_dictionary(id))
            .ok();
    }
    Dictionary::new()
}

/// Existing `/Contents` entries, flattened to a list of stream references.
fn existing_contents(doc: &Document, page_id: ObjectId) -> Vec<Object> {
    let Some(contents) = doc
        .get_dictionary(page_id)
        .ok()
        .and_then(|page| page.get(b"Contents").ok())
    else {
        return Vec::new();
    };

    match contents {
        Object::Array(items) => items.clone(),
        Object::Reference(id) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        _ => Vec::new(),
    }
}
