use std::collections::BTreeMap;

use lopdf::{self, content::Content};

use crate::PdfError;

// ---------------------------------------------------------------------------
// Type aliases
// ---------------------------------------------------------------------------

/// A page identifier mirroring `lopdf::ObjectId`: (object number, generation number).
pub type PageId = (u32, u16);

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// Font descriptor flag bits (PDF 32000-1, table 123) that feed span style flags.
pub mod descriptor_flags {
    pub const FIXED_PITCH: u32 = 1 << 0;
    pub const SERIF: u32 = 1 << 1;
    pub const ITALIC: u32 = 1 << 6;
    pub const FORCE_BOLD: u32 = 1 << 18;
}

/// Font information extracted from a page's resource dictionary.
#[derive(Debug, Clone, Default)]
pub struct BackendFontInfo {
    /// The font name key as it appears in the resource dictionary (e.g. `b"F1"`).
    pub name: Vec<u8>,
    /// Base font name from the font dictionary, if present.
    pub base_font: Option<String>,
    /// Font subtype (e.g. `Type1`, `TrueType`, `Type0`).
    pub subtype: Option<String>,
    /// Encoding entry from the font dictionary, if present.
    pub encoding: Option<String>,
    /// `/Flags` of the font descriptor, if the font has one.
    pub descriptor_flags: Option<u32>,
    /// `/FontWeight` of the font descriptor (400 regular, 700 bold).
    pub descriptor_weight: Option<f64>,
    /// First character code covered by `widths`.
    pub first_char: u32,
    /// Glyph advances in thousandths of a text-space unit.
    pub widths: Vec<f64>,
}

impl BackendFontInfo {
    /// Fonts addressed with 2-byte character codes.
    pub fn is_two_byte(&self) -> bool {
        self.subtype.as_deref() == Some("Type0")
            || self
                .encoding
                .as_deref()
                .is_some_and(|e| e.contains("Identity"))
    }

    /// Decode the bytes of a shown string. Identity-encoded fonts carry
    /// 2-byte codes, read here as UTF-16BE.
    pub fn decode(&self, bytes: &[u8]) -> String {
        if self.is_two_byte() && !bytes.is_empty() && bytes.len() % 2 == 0 {
            let text = utf16_be(bytes);
            if text.chars().any(|c| c != '\u{FFFD}' && c != '\0') {
                return text;
            }
        }
        decode_pdf_string(bytes)
    }

    /// Advance for a single-byte character code, if `/Widths` covers it.
    pub fn width_for(&self, code: u32) -> Option<f64> {
        let index = code.checked_sub(self.first_char)? as usize;
        self.widths.get(index).copied()
    }
}

/// Page MediaBox `[llx, lly, urx, ury]` in PDF user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub llx: f64,
    pub lly: f64,
    pub urx: f64,
    pub ury: f64,
}

impl PageBox {
    /// US Letter, used when a page carries no usable MediaBox.
    pub const LETTER: PageBox = PageBox {
        llx: 0.0,
        lly: 0.0,
        urx: 612.0,
        ury: 792.0,
    };

    pub fn width(&self) -> f64 {
        self.urx - self.llx
    }

    pub fn height(&self) -> f64 {
        self.ury - self.lly
    }

    /// PDF user space (origin bottom-left) to page space (origin top-left).
    pub fn to_top_left(&self, x: f64, y: f64) -> (f64, f64) {
        (x - self.llx, self.ury - y)
    }

    /// Page space (origin top-left) back to PDF user space.
    pub fn to_user_space(&self, x: f64, y: f64) -> (f64, f64) {
        (x + self.llx, self.ury - y)
    }
}

/// Content-stream operand, reduced to the shapes the text walker reads.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Number(f64),
    Name(Vec<u8>),
    Str(Vec<u8>),
    Array(Vec<Operand>),
    /// Booleans, dictionaries, references and null.
    Other,
}

impl Operand {
    pub fn number(&self) -> Option<f64> {
        match self {
            Operand::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<&lopdf::Object> for Operand {
    fn from(obj: &lopdf::Object) -> Self {
        match obj {
            lopdf::Object::Integer(i) => Operand::Number(*i as f64),
            lopdf::Object::Real(r) => Operand::Number(f64::from(*r)),
            lopdf::Object::Name(n) => Operand::Name(n.clone()),
            lopdf::Object::String(s, _) => Operand::Str(s.clone()),
            lopdf::Object::Array(items) => Operand::Array(items.iter().map(Operand::from).collect()),
            _ => Operand::Other,
        }
    }
}

/// A single content-stream operation.
#[derive(Debug, Clone)]
pub struct ContentOp {
    pub operator: String,
    pub operands: Vec<Operand>,
}

/// Decode the bytes of a PDF string: UTF-16BE when it carries a byte order
/// mark, UTF-8 when valid, Latin-1 otherwise.
pub fn decode_pdf_string(bytes: &[u8]) -> String {
    match bytes {
        [0xFE, 0xFF, rest @ ..] => utf16_be(rest),
        _ => match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
        },
    }
}

/// A dangling odd byte is dropped.
fn utf16_be(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

// ---------------------------------------------------------------------------
// PdfBackend trait
// ---------------------------------------------------------------------------

/// Abstraction over a PDF parsing backend (currently backed by `lopdf`).
///
/// The content-stream walker only talks to this trait so it can be tested
/// against pre-decoded operations.
pub trait PdfBackend {
    /// Return a mapping from 1-based page number to [`PageId`].
    fn pages(&self) -> BTreeMap<u32, PageId>;

    /// Return font information for every font referenced by the given page.
    fn page_fonts(&self, page: PageId) -> Result<Vec<BackendFontInfo>, PdfError>;

    /// Return the page MediaBox, inherited from the page tree if necessary.
    fn page_box(&self, page: PageId) -> Result<PageBox, PdfError>;

    /// Return the decompressed content stream bytes for a page.
    fn page_content(&self, page: PageId) -> Result<Vec<u8>, PdfError>;

    /// Decode raw content-stream bytes into a sequence of [`ContentOp`]s.
    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>, PdfError>;
}

// ---------------------------------------------------------------------------
// LopdfBackend
// ---------------------------------------------------------------------------

/// Concrete [`PdfBackend`] implementation backed by [`lopdf::Document`].
pub struct LopdfBackend {
    doc: lopdf::Document,
}

impl LopdfBackend {
    /// Parse a PDF from an in-memory byte slice.
    pub fn load_bytes(data: &[u8]) -> Result<Self, PdfError> {
        let doc = lopdf::Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        if doc.is_encrypted() {
            return Err(PdfError::Encrypted);
        }

        Ok(Self { doc })
    }

    /// Give up the backend and keep the document for mutation.
    pub fn into_doc(self) -> lopdf::Document {
        self.doc
    }

    /// Total number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Resolve a 1-based page number.
    pub fn page_id(&self, page: u32) -> Result<PageId, PdfError> {
        self.doc
            .get_pages()
            .get(&page)
            .copied()
            .ok_or(PdfError::PageNotFound(page))
    }

    // -- private helpers ----------------------------------------------------

    /// Follow a single reference, if `obj` is one.
    fn resolve<'a>(&'a self, obj: &'a lopdf::Object) -> Option<&'a lopdf::Object> {
        match obj {
            lopdf::Object::Reference(id) => self.doc.get_object(*id).ok(),
            other => Some(other),
        }
    }

    /// Walk up the page tree to find the MediaBox array.
    fn find_media_box(&self, dict: &lopdf::Dictionary) -> Option<Vec<lopdf::Object>> {
        if let Some(arr) = dict
            .get(b"MediaBox")
            .ok()
            .and_then(|obj| self.resolve(obj))
            .and_then(|obj| obj.as_array().ok())
        {
            return Some(arr.clone());
        }

        let parent_id = dict.get(b"Parent").ok()?.as_reference().ok()?;
        let parent = self.doc.get_object(parent_id).ok()?.as_dict().ok()?;
        self.find_media_box(parent)
    }

    /// Convert a vector of lopdf objects to `f64` values.
    fn array_to_f64s(&self, objects: &[lopdf::Object]) -> Result<Vec<f64>, PdfError> {
        objects
            .iter()
            .map(|obj| match self.resolve(obj) {
                Some(lopdf::Object::Integer(i)) => Ok(*i as f64),
                Some(lopdf::Object::Real(f)) => Ok(*f as f64),
                other => Err(PdfError::Parse(format!(
                    "expected number in array, got {:?}",
                    other
                ))),
            })
            .collect()
    }

    fn font_info(&self, name: &[u8], dict: &lopdf::Dictionary) -> BackendFontInfo {
        let name_entry = |key: &[u8]| {
            dict.get(key)
                .ok()
                .and_then(|o| o.as_name().ok())
                .map(|n| String::from_utf8_lossy(n).into_owned())
        };

        let descriptor = dict
            .get(b"FontDescriptor")
            .ok()
            .and_then(|obj| self.resolve(obj))
            .and_then(|obj| obj.as_dict().ok());

        let descriptor_flags = descriptor
            .and_then(|fd| fd.get(b"Flags").ok())
            .and_then(|flags| flags.as_i64().ok())
            .map(|flags| flags as u32);

        let descriptor_weight = descriptor
            .and_then(|fd| fd.get(b"FontWeight").ok())
            .and_then(|w| self.array_to_f64s(std::slice::from_ref(w)).ok())
            .and_then(|w| w.first().copied());

        let first_char = dict
            .get(b"FirstChar")
            .ok()
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(0)
            .max(0) as u32;

        let widths = dict
            .get(b"Widths")
            .ok()
            .and_then(|obj| self.resolve(obj))
            .and_then(|obj| obj.as_array().ok())
            .and_then(|arr| self.array_to_f64s(arr).ok())
            .unwrap_or_default();

        BackendFontInfo {
            name: name.to_vec(),
            base_font: name_entry(b"BaseFont"),
            subtype: name_entry(b"Subtype"),
            encoding: name_entry(b"Encoding"),
            descriptor_flags,
            descriptor_weight,
            first_char,
            widths,
        }
    }
}

// ---------------------------------------------------------------------------
// PdfBackend implementation for LopdfBackend
// ---------------------------------------------------------------------------

impl PdfBackend for LopdfBackend {
    fn pages(&self) -> BTreeMap<u32, PageId> {
        self.doc.get_pages()
    }

    fn page_fonts(&self, page: PageId) -> Result<Vec<BackendFontInfo>, PdfError> {
        let fonts_map = self
            .doc
            .get_page_fonts(page)
            .map_err(|e| PdfError::Parse(format!("cannot get page fonts: {}", e)))?;

        Ok(fonts_map
            .iter()
            .map(|(name, dict)| self.font_info(name, dict))
            .collect())
    }

    fn page_box(&self, page: PageId) -> Result<PageBox, PdfError> {
        let page_dict = self
            .doc
            .get_object(page)
            .and_then(|obj| obj.as_dict())
            .map_err(|e| PdfError::Parse(format!("cannot get page dictionary: {}", e)))?;

        let Some(media_box) = self.find_media_box(page_dict) else {
            log::warn!("page {:?} has no MediaBox, assuming US Letter", page);
            return Ok(PageBox::LETTER);
        };

        let nums = self.array_to_f64s(&media_box)?;
        if nums.len() < 4 {
            return Err(PdfError::Parse(format!(
                "MediaBox has {} elements, expected 4",
                nums.len()
            )));
        }

        // Normalise in case the corners are given in reverse order.
        Ok(PageBox {
            llx: nums[0].min(nums[2]),
            lly: nums[1].min(nums[3]),
            urx: nums[0].max(nums[2]),
            ury: nums[1].max(nums[3]),
        })
    }

    fn page_content(&self, page: PageId) -> Result<Vec<u8>, PdfError> {
        self.doc
            .get_page_content(page)
            .map_err(|e| PdfError::Parse(format!("cannot get page content: {}", e)))
    }

    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>, PdfError> {
        let content = Content::decode(data)
            .map_err(|e| PdfError::Parse(format!("content stream decode error: {}", e)))?;

        Ok(content
            .operations
            .into_iter()
            .map(|op| ContentOp {
                operator: op.operator,
                operands: op.operands.iter().map(Operand::from).collect(),
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_decode_pdf_string() {
        assert_eq!(decode_pdf_string(b"Gate 12"), "Gate 12");
        // 0xE9 alone is not UTF-8, so it is read as Latin-1.
        assert_eq!(decode_pdf_string(&[b'c', b'a', b'f', 0xE9]), "caf\u{e9}");
        assert_eq!(decode_pdf_string(&[0xFE, 0xFF, 0x00, 0x4E, 0x00, 0x44]), "ND");
        assert_eq!(decode_pdf_string(&[0xFE, 0xFF, 0x00, 0x4E, 0x00]), "N");
    }

    #[test]
    fn test_operand_from_object() {
        let arr = lopdf::Object::Array(vec![
            lopdf::Object::Integer(-250),
            lopdf::Object::Real(1.5),
            lopdf::Object::string_literal("AB"),
            lopdf::Object::Reference((7, 0)),
        ]);
        assert_eq!(
            Operand::from(&arr),
            Operand::Array(vec![
                Operand::Number(-250.0),
                Operand::Number(1.5),
                Operand::Str(b"AB".to_vec()),
                Operand::Other,
            ]),
        );
        assert_eq!(Operand::Name(b"F1".to_vec()).number(), None);
    }

    #[test]
    fn test_identity_fonts_decode_two_byte_codes() {
        let cid = BackendFontInfo {
            subtype: Some("Type0".to_string()),
            encoding: Some("Identity-H".to_string()),
            ..Default::default()
        };
        assert_eq!(cid.decode(&[0x00, 0x50, 0x00, 0x4E, 0x00, 0x52]), "PNR");
        assert_eq!(BackendFontInfo::default().decode(b"PNR"), "PNR");
    }

    // -- font info ------------------------------------------------------------

    #[test]
    fn test_width_lookup_respects_first_char() {
        let font = BackendFontInfo {
            first_char: 32,
            widths: vec![278.0, 278.0, 355.0],
            ..Default::default()
        };
        assert_eq!(font.width_for(34), Some(355.0));
        assert_eq!(font.width_for(31), None);
        assert_eq!(font.width_for(35), None);
    }

    #[test]
    fn test_two_byte_fonts() {
        let type0 = BackendFontInfo {
            subtype: Some("Type0".to_string()),
            ..Default::default()
        };
        assert!(type0.is_two_byte());
        assert!(!BackendFontInfo::default().is_two_byte());
    }

    // -- page box -------------------------------------------------------------

    #[test]
    fn test_page_box_conversions() {
        let b = PageBox {
            llx: 10.0,
            lly: 0.0,
            urx: 622.0,
            ury: 792.0,
        };
        assert_eq!(b.width(), 612.0);
        assert_eq!(b.to_top_left(110.0, 692.0), (100.0, 100.0));
        assert_eq!(b.to_user_space(100.0, 100.0), (110.0, 692.0));
    }

    // -- lopdf-backed -------------------------------------------------------

    #[test]
    fn test_load_rejects_garbage() {
        assert!(matches!(
            LopdfBackend::load_bytes(b"not a pdf"),
            Err(PdfError::Parse(_))
        ));
    }

    #[test]
    fn test_inherited_media_box_and_fonts() {
        let bytes = fixtures::single_page(fixtures::text_block("F1", 12.0, 72.0, 700.0, "Hi"));
        let backend = LopdfBackend::load_bytes(&bytes).unwrap();
        let page = backend.page_id(1).unwrap();

        let page_box = backend.page_box(page).unwrap();
        assert_eq!(page_box.width(), 612.0);
        assert_eq!(page_box.height(), 792.0);

        let fonts = backend.page_fonts(page).unwrap();
        let helv = fonts.iter().find(|f| f.name == b"F1").unwrap();
        assert_eq!(helv.base_font.as_deref(), Some("Helvetica"));
        assert_eq!(helv.first_char, 32);
        assert_eq!(helv.width_for(b'H' as u32), Some(722.0));
        assert_eq!(helv.descriptor_flags, Some(32));

        assert!(matches!(
            backend.page_id(2),
            Err(PdfError::PageNotFound(2))
        ));
    }
}
