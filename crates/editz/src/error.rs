use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use editz_core::EditError;
use pdf::PdfError;

#[derive(thiserror::Error, Debug, serde::Deserialize, serde::Serialize)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    #[error("Only PDF files are allowed: {0}")]
    NotPdf(String),

    #[error("Invalid PDF data: {0}")]
    InvalidPdfData(String),

    #[error("{0}")]
    InvalidKey(String),

    #[error("{0}")]
    MissingTarget(String),

    #[error("Page {0} not found")]
    PageNotFound(u32),

    #[error("Text item '{key}' is on page {actual}, not page {requested}")]
    PageMismatch {
        key: String,
        requested: u32,
        actual: u32,
    },

    #[error("PDF generation failed: {0}")]
    EditFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::InvalidUpload(_)
            | Error::NotPdf(_)
            | Error::InvalidPdfData(_)
            | Error::InvalidKey(_)
            | Error::MissingTarget(_)
            | Error::PageNotFound(_)
            | Error::PageMismatch { .. } => StatusCode::BAD_REQUEST,
            Error::EditFailed(_) | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PdfError> for Error {
    fn from(e: PdfError) -> Self {
        match e {
            PdfError::Parse(_) | PdfError::Encrypted => Error::InvalidPdfData(e.to_string()),
            PdfError::PageNotFound(page) => Error::PageNotFound(page),
            PdfError::Core(EditError::MissingTarget(_)) => Error::MissingTarget(e.to_string()),
            PdfError::Core(EditError::InvalidSpanKey(_)) => Error::InvalidKey(e.to_string()),
            PdfError::Write(_) | PdfError::Raster(_) | PdfError::Io(_) => {
                Error::EditFailed(e.to_string())
            }
        }
    }
}

#[derive(serde::Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_client_error() {
            log::warn!("rejected request: {}", self);
        } else {
            log::error!("request failed: {}", self);
        }
        let body = ErrorBody {
            success: false,
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use editz_core::span::SpanKey;

    #[test]
    fn test_pdf_error_mapping() {
        assert_eq!(
            Error::from(PdfError::Parse("bad xref".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert!(matches!(
            Error::from(PdfError::PageNotFound(4)),
            Error::PageNotFound(4)
        ));
        let missing = Error::from(PdfError::Core(EditError::MissingTarget(SpanKey::new(7))));
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            missing.to_string(),
            "Text item 'text_item_7' not found in metadata"
        );
        assert_eq!(
            Error::from(PdfError::Write("disk full".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_response_status() {
        let response = Error::NotPdf("notes.txt".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let response = Error::Internal("join".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
