use std::path::Path;

pub use anstream::eprintln;
pub use anstream::println;
pub use color_eyre::eyre::{eyre, Context, OptionExt, Result};

/// Read a document from disk, refusing anything without a PDF header.
pub fn read_pdf(path: &Path) -> Result<Vec<u8>> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    if !bytes.starts_with(b"%PDF") {
        return Err(eyre!("{} is not a PDF document", path.display()));
    }
    Ok(bytes)
}

/// Borderless table with one space of padding on each side.
pub fn new_table() -> prettytable::Table {
    let mut table = prettytable::Table::new();
    table.set_format(
        prettytable::format::FormatBuilder::new()
            .padding(1, 1)
            .build(),
    );
    table
}
