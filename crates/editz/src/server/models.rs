use std::collections::BTreeMap;

use editz_core::edit::EditPlan;
use editz_core::span::{SpanKey, TextSpan};
use pdf::PageGeometry;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub message: String,
    pub version: &'static str,
    pub features: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Flat per-span record for listing text in a client.
#[derive(Debug, Serialize)]
pub struct TextItem {
    pub metadata_key: SpanKey,
    pub text: String,
    pub page: u32,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub font: String,
    pub size: f64,
    pub color: u32,
    pub flags: u32,
    pub is_bold: bool,
    pub is_italic: bool,
    pub visual_boldness: f64,
}

impl TextItem {
    pub fn new(key: SpanKey, span: &TextSpan) -> Self {
        TextItem {
            metadata_key: key,
            text: span.text.clone(),
            page: span.page,
            x: span.bbox.x0,
            y: span.bbox.y0,
            width: span.bbox.width(),
            height: span.bbox.height(),
            font: span.font.clone(),
            size: span.size,
            color: span.color.packed(),
            flags: span.flags.0,
            is_bold: span.effective_bold(),
            is_italic: span.is_italic,
            visual_boldness: span.visual_boldness.unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub file_id: String,
    pub filename: String,
    pub text_items: Vec<TextItem>,
    pub text_metadata: BTreeMap<SpanKey, TextSpan>,
    pub pages: BTreeMap<u32, PageGeometry>,
    pub total_items: usize,
    /// The uploaded document, base64 encoded, for the client to send back.
    pub pdf_data: String,
}

#[derive(Debug, Deserialize)]
pub struct EditRequest {
    pub page: u32,
    pub metadata_key: String,
    pub new_text: String,
    pub pdf_data: String,
    pub text_metadata: BTreeMap<SpanKey, TextSpan>,
}

#[derive(Debug, Serialize)]
pub struct EditResponse {
    pub success: bool,
    pub message: String,
    pub pdf_data: String,
    pub edit_details: EditPlan,
}

#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    pub pdf_data: String,
}
