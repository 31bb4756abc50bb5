//! PDF collaborator for editz.
//!
//! Reads text runs and page geometry out of a document with `lopdf`, hands
//! them to `editz_core`, and writes planned edits back as erase-and-redraw
//! content streams. Every entry point is bytes in, bytes out: no state is
//! kept between calls.

use std::collections::BTreeMap;

use thiserror::Error;

use editz_core::edit::{plan_edit, EditPlan, EditRequest};
use editz_core::metadata::{extract_document, NoVisualProbe, VisualBoldness};
use editz_core::span::{SpanKey, TextSpan};
use editz_core::EditError;
use parser::backend::{LopdfBackend, PdfBackend};

pub mod fonts;
pub mod parser;
pub mod raster;
pub mod types;
pub mod writer;

pub use types::*;
pub use writer::apply_edit;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF parsing error: {0}")]
    Parse(String),
    #[error("Document is encrypted")]
    Encrypted,
    #[error("Page {0} not found")]
    PageNotFound(u32),
    #[error("PDF write error: {0}")]
    Write(String),
    #[error("Raster error: {0}")]
    Raster(String),
    #[error(transparent)]
    Core(#[from] EditError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Extract every text span of a document, keyed `text_item_<n>` in
/// document order.
pub fn extract(bytes: &[u8]) -> Result<ExtractedDocument, PdfError> {
    extract_with(bytes, &NoVisualProbe)
}

/// [`extract`] with a visual boldness probe.
pub fn extract_with(
    bytes: &[u8],
    probe: &dyn VisualBoldness,
) -> Result<ExtractedDocument, PdfError> {
    let backend = LopdfBackend::load_bytes(bytes)?;

    let mut pages = BTreeMap::new();
    for (page_num, page_id) in backend.pages() {
        pages.insert(page_num, PageGeometry::from(backend.page_box(page_id)?));
    }

    let raw = parser::text::extract_all_pages(&backend)?;
    let spans = extract_document(raw, probe);
    log::debug!(
        "extracted {} spans from {} pages",
        spans.len(),
        pages.len()
    );

    Ok(ExtractedDocument { pages, spans })
}

/// Size of one page (1-based).
pub fn page_geometry(bytes: &[u8], page: u32) -> Result<PageGeometry, PdfError> {
    let backend = LopdfBackend::load_bytes(bytes)?;
    let page_id = backend.page_id(page)?;
    Ok(backend.page_box(page_id)?.into())
}

/// Plan an edit against the given span map and apply it on the page the
/// target span was extracted from.
pub fn edit(
    bytes: &[u8],
    target: SpanKey,
    new_text: &str,
    spans: BTreeMap<SpanKey, TextSpan>,
) -> Result<(EditPlan, Vec<u8>), PdfError> {
    let page = spans
        .get(&target)
        .map(|span| span.page)
        .ok_or(EditError::MissingTarget(target))?;
    let geometry = page_geometry(bytes, page)?;
    let plan = plan_edit(&EditRequest {
        target,
        new_text: new_text.to_string(),
        spans,
        page_width: geometry.width,
        page_height: geometry.height,
    })?;
    let edited = apply_edit(bytes, &plan)?;
    Ok((plan, edited))
}

// ---------------------------------------------------------------------------
// Test fixtures
// ---------------------------------------------------------------------------
