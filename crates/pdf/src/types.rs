use std::collections::BTreeMap;

use editz_core::span::{SpanKey, TextSpan};
use serde::{Deserialize, Serialize};

use crate::parser::backend::PageBox;

/// Page size in page-space units (points).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub width: f64,
    pub height: f64,
}

impl From<PageBox> for PageGeometry {
    fn from(page_box: PageBox) -> Self {
        PageGeometry {
            width: page_box.width(),
            height: page_box.height(),
        }
    }
}

/// Everything extraction learns about a document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedDocument {
    /// Keyed by 1-based page number.
    pub pages: BTreeMap<u32, PageGeometry>,
    pub spans: BTreeMap<SpanKey, TextSpan>,
}

impl ExtractedDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn total_items(&self) -> usize {
        self.spans.len()
    }

    /// Spans of one page, in document order.
    pub fn page_spans(&self, page: u32) -> impl Iterator<Item = (&SpanKey, &TextSpan)> {
        self.spans.iter().filter(move |(_, span)| span.page == page)
    }
}
