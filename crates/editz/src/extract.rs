use std::path::PathBuf;

use pdf::raster::RasterInkDensity;
use pdf::ExtractedDocument;

use crate::prelude::{eprintln, println, *};

#[derive(Debug, Clone, clap::Args)]
pub struct ExtractOptions {
    /// Path to the PDF file
    pub path: PathBuf,

    /// Only show spans from this page (1-based)
    #[arg(long)]
    pub page: Option<u32>,

    /// Print a table instead of JSON
    #[arg(long, default_value = "false")]
    pub table: bool,

    /// Directory of rendered page images (`page-<n>.png`) used to score
    /// visual boldness
    #[arg(long)]
    pub raster_dir: Option<PathBuf>,

    /// Scale the page images were rendered at, relative to 72 dpi
    #[arg(long, default_value = "2.0")]
    pub zoom: f64,
}

pub async fn run(options: ExtractOptions, global: crate::Global) -> Result<()> {
    let document = tokio::task::spawn_blocking({
        let options = options.clone();
        move || extract_data(&options)
    })
    .await??;

    if global.verbose {
        eprintln!(
            "{} spans on {} page(s)",
            document.total_items(),
            document.page_count()
        );
    }

    if options.table {
        output_table(&document, options.page);
    } else {
        let spans: std::collections::BTreeMap<_, _> = match options.page {
            Some(page) => document.page_spans(page).collect(),
            None => document.spans.iter().collect(),
        };
        println!("{}", serde_json::to_string_pretty(&spans)?);
    }

    Ok(())
}

/// Read and extract a document, with visual boldness when page images are given.
pub fn extract_data(options: &ExtractOptions) -> Result<ExtractedDocument> {
    let bytes = read_pdf(&options.path)?;

    let document = match &options.raster_dir {
        Some(dir) => {
            let probe = RasterInkDensity::from_dir(dir, options.zoom).map_err(|e| eyre!(e))?;
            pdf::extract_with(&bytes, &probe)
        }
        None => pdf::extract(&bytes),
    }
    .map_err(|e| eyre!(e))?;

    if let Some(page) = options.page {
        if !document.pages.contains_key(&page) {
            return Err(eyre!(
                "Page {} not found (document has {} pages)",
                page,
                document.page_count()
            ));
        }
    }

    Ok(document)
}

fn output_table(document: &ExtractedDocument, page: Option<u32>) {
    let mut table = new_table();
    table.add_row(prettytable::row![
        "Key", "Page", "Text", "Font", "Size", "BBox", "Bold"
    ]);

    for (key, span) in &document.spans {
        if page.is_some_and(|p| p != span.page) {
            continue;
        }
        let b = span.bbox;
        let bold = if span.effective_bold() { "yes" } else { "" };
        table.add_row(prettytable::row![
            key,
            span.page,
            &span.text,
            &span.font,
            format!("{:.1}", span.size),
            format!("{:.1} {:.1} {:.1} {:.1}", b.x0, b.y0, b.x1, b.y1),
            bold
        ]);
    }

    table.printstd();
}
