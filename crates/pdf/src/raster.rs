//! Ink-density boldness probe over rendered page images.
//!
//! Rendering is left to an external rasteriser; this module reads the
//! grayscale result and measures how much of a span's box is inked.

use std::collections::BTreeMap;
use std::path::Path;

use editz_core::geometry::BBox;
use editz_core::metadata::VisualBoldness;
use image::GrayImage;

use crate::PdfError;

/// Luma below this counts as ink.
pub const INK_THRESHOLD: u8 = 240;

/// Page images rendered at `zoom` times page-space resolution.
#[derive(Debug, Clone)]
pub struct RasterInkDensity {
    pages: BTreeMap<u32, GrayImage>,
    zoom: f64,
}

impl RasterInkDensity {
    pub fn new(pages: BTreeMap<u32, GrayImage>, zoom: f64) -> Self {
        Self { pages, zoom }
    }

    /// Load `page-<n>.png` files from a directory, e.g. the output of
    /// `pdftoppm -r 144 -png -gray`. Other files are ignored.
    pub fn from_dir(dir: &Path, zoom: f64) -> Result<Self, PdfError> {
        let mut pages = BTreeMap::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let Some(page) = page_number(&path) else {
                continue;
            };
            let img = image::open(&path)
                .map_err(|e| PdfError::Raster(format!("{}: {}", path.display(), e)))?;
            pages.insert(page, img.to_luma8());
        }
        log::debug!("loaded {} page images from {}", pages.len(), dir.display());
        Ok(Self { pages, zoom })
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

fn page_number(path: &Path) -> Option<u32> {
    if path.extension()?.to_str()? != "png" {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    stem.strip_prefix("page-")?.parse().ok()
}

impl VisualBoldness for RasterInkDensity {
    fn score(&self, page: u32, bbox: &BBox) -> Option<f64> {
        let img = self.pages.get(&page)?;
        let scale = |v: f64, max: u32| ((v * self.zoom).max(0.0) as u32).min(max);
        let (x0, x1) = (scale(bbox.x0, img.width()), scale(bbox.x1, img.width()));
        let (y0, y1) = (scale(bbox.y0, img.height()), scale(bbox.y1, img.height()));
        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        let mut inked = 0u64;
        for y in y0..y1 {
            for x in x0..x1 {
                if img.get_pixel(x, y).0[0] < INK_THRESHOLD {
                    inked += 1;
                }
            }
        }
        let total = (x1 - x0) as u64 * (y1 - y0) as u64;
        Some(inked as f64 / total as f64 * 100.0)
    }
}
