use axum::extract::{Multipart, Path};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::Engine;
use editz_core::span::SpanKey;

use super::models::{
    DownloadRequest, EditRequest, EditResponse, Health, ServiceInfo, TextItem, UploadResponse,
};
use crate::error::Error;

/// Anything shorter cannot be a complete PDF.
const MIN_PDF_BYTES: usize = 100;

const FEATURES: [&str; 5] = [
    "Span metadata extraction",
    "Layout-aware repositioning",
    "Boldness detection",
    "Multi-page processing",
    "Stateless editing",
];

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

async fn run_blocking<T, F>(f: F) -> Result<T, Error>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, pdf::PdfError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Internal(format!("Task join error: {e}")))?
        .map_err(Error::from)
}

fn decode_pdf_data(data: &str) -> Result<Vec<u8>, Error> {
    base64::engine::general_purpose::STANDARD
        .decode(data.trim())
        .map_err(|e| Error::InvalidPdfData(e.to_string()))
}

fn encode_pdf_data(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

fn new_file_id() -> String {
    format!("{:032x}", rand::random::<u128>())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        message: "editz PDF text editing backend".to_string(),
        version: env!("CARGO_PKG_VERSION"),
        features: FEATURES.to_vec(),
    })
}

pub async fn health() -> Json<Health> {
    Json(Health {
        status: "healthy",
        service: "editz",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn upload_pdf(mut multipart: Multipart) -> Result<Json<UploadResponse>, Error> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::InvalidUpload(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| Error::InvalidUpload(e.to_string()))?;
        upload = Some((filename, bytes.to_vec()));
        break;
    }

    let (filename, bytes) =
        upload.ok_or_else(|| Error::InvalidUpload("missing multipart field 'file'".to_string()))?;
    process_upload(filename, bytes).await.map(Json)
}

/// Extract a freshly uploaded document.
pub async fn process_upload(filename: String, bytes: Vec<u8>) -> Result<UploadResponse, Error> {
    if !filename.to_lowercase().ends_with(".pdf") {
        return Err(Error::NotPdf(filename));
    }

    let pdf_data = encode_pdf_data(&bytes);
    let document = run_blocking(move || pdf::extract(&bytes)).await?;

    let file_id = new_file_id();
    log::info!(
        "upload {} ({}): {} spans on {} page(s)",
        file_id,
        filename,
        document.total_items(),
        document.page_count()
    );

    Ok(UploadResponse {
        success: true,
        text_items: document
            .spans
            .iter()
            .map(|(key, span)| TextItem::new(*key, span))
            .collect(),
        total_items: document.total_items(),
        text_metadata: document.spans,
        pages: document.pages,
        file_id,
        filename,
        pdf_data,
    })
}

pub async fn edit_pdf(
    Path(file_id): Path<String>,
    Json(request): Json<EditRequest>,
) -> Result<Json<EditResponse>, Error> {
    let bytes = decode_pdf_data(&request.pdf_data)?;
    let key = SpanKey::parse(&request.metadata_key)
        .map_err(|e| Error::InvalidKey(format!("{}: {}", e, request.metadata_key)))?;
    let target_page = request
        .text_metadata
        .get(&key)
        .map(|span| span.page)
        .ok_or_else(|| {
            Error::MissingTarget(format!("Text item '{}' not found in metadata", key))
        })?;
    if target_page != request.page {
        return Err(Error::PageMismatch {
            key: key.to_string(),
            requested: request.page,
            actual: target_page,
        });
    }

    let new_text = request.new_text;
    let spans = request.text_metadata;
    let (plan, edited) = run_blocking(move || pdf::edit(&bytes, key, &new_text, spans)).await?;

    log::info!(
        "edit {} {}: {} ({} -> {})",
        file_id,
        key,
        plan.decision.strategy,
        plan.old_text,
        plan.new_text
    );

    Ok(Json(EditResponse {
        success: true,
        message: format!(
            "Text successfully edited: '{}' -> '{}'",
            plan.old_text, plan.new_text
        ),
        pdf_data: encode_pdf_data(&edited),
        edit_details: plan,
    }))
}

pub async fn download_pdf(
    Path(file_id): Path<String>,
    Json(request): Json<DownloadRequest>,
) -> Result<Response, Error> {
    if request.pdf_data.is_empty() {
        return Err(Error::InvalidPdfData("No PDF data provided".to_string()));
    }
    let bytes = decode_pdf_data(&request.pdf_data)?;
    if bytes.len() < MIN_PDF_BYTES {
        return Err(Error::InvalidPdfData("PDF data too small".to_string()));
    }
    if !bytes.starts_with(b"%PDF") {
        return Err(Error::InvalidPdfData("Invalid PDF format".to_string()));
    }

    log::info!("download {}: {} bytes", file_id, bytes.len());

    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=edited_{file_id}.pdf"),
        ),
    ];
    Ok((StatusCode::OK, headers, bytes).into_response())
}
