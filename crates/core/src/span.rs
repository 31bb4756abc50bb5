use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::geometry::BBox;

// ---------------------------------------------------------------------------
// SpanKey
// ---------------------------------------------------------------------------

/// Stable document-wide address of an extracted span: `text_item_<n>`, 1-based.
///
/// Ordered by ordinal so a `BTreeMap<SpanKey, _>` iterates in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpanKey(usize);

const SPAN_KEY_PREFIX: &str = "text_item_";

impl SpanKey {
    pub fn new(ordinal: usize) -> Self {
        SpanKey(ordinal)
    }

    pub fn parse(s: &str) -> Result<Self, InvalidSpanKey> {
        let ordinal = s
            .strip_prefix(SPAN_KEY_PREFIX)
            .ok_or(InvalidSpanKey)?
            .parse::<usize>()
            .map_err(|_| InvalidSpanKey)?;
        if ordinal == 0 {
            return Err(InvalidSpanKey);
        }
        Ok(SpanKey(ordinal))
    }

    pub fn ordinal(&self) -> usize {
        self.0
    }
}

impl fmt::Display for SpanKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SPAN_KEY_PREFIX}{}", self.0)
    }
}

impl Serialize for SpanKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SpanKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        SpanKey::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Error)]
#[error("Invalid span key (expected 'text_item_{{n}}' with n >= 1)")]
pub struct InvalidSpanKey;

// ---------------------------------------------------------------------------
// StyleFlags
// ---------------------------------------------------------------------------

/// Style bitset as emitted by the text-layout reader.
///
/// | bit | meaning     |
/// |-----|-------------|
/// | 0   | superscript |
/// | 1   | italic      |
/// | 2   | serif       |
/// | 3   | monospace   |
/// | 4   | bold        |
/// | 5   | vertical    |
/// | 6   | underline   |
/// | 7   | strikeout   |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StyleFlags(pub u32);

impl StyleFlags {
    pub const SUPERSCRIPT: u32 = 1 << 0;
    pub const ITALIC: u32 = 1 << 1;
    pub const SERIF: u32 = 1 << 2;
    pub const MONOSPACE: u32 = 1 << 3;
    pub const BOLD: u32 = 1 << 4;
    pub const VERTICAL: u32 = 1 << 5;
    pub const UNDERLINE: u32 = 1 << 6;
    pub const STRIKEOUT: u32 = 1 << 7;

    pub fn contains(&self, bit: u32) -> bool {
        self.0 & bit != 0
    }

    pub fn insert(&mut self, bit: u32) {
        self.0 |= bit;
    }

    pub fn is_superscript(&self) -> bool {
        self.contains(Self::SUPERSCRIPT)
    }

    pub fn is_italic(&self) -> bool {
        self.contains(Self::ITALIC)
    }

    pub fn is_serif(&self) -> bool {
        self.contains(Self::SERIF)
    }

    pub fn is_monospace(&self) -> bool {
        self.contains(Self::MONOSPACE)
    }

    pub fn is_bold(&self) -> bool {
        self.contains(Self::BOLD)
    }

    pub fn is_vertical(&self) -> bool {
        self.contains(Self::VERTICAL)
    }

    pub fn is_underline(&self) -> bool {
        self.contains(Self::UNDERLINE)
    }

    pub fn is_strikeout(&self) -> bool {
        self.contains(Self::STRIKEOUT)
    }
}

// ---------------------------------------------------------------------------
// Rgb
// ---------------------------------------------------------------------------

/// 8-bit RGB colour.
///
/// On the wire this is the packed 24-bit integer. Deserialisation also
/// accepts an `[r, g, b]` list; anything else reads as black.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    pub fn from_packed(color: i64) -> Self {
        Rgb {
            r: ((color >> 16) & 0xFF) as u8,
            g: ((color >> 8) & 0xFF) as u8,
            b: (color & 0xFF) as u8,
        }
    }

    pub fn packed(&self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    /// Components in the `0.0..=1.0` range used by PDF colour operators.
    pub fn normalized(&self) -> [f64; 3] {
        [
            self.r as f64 / 255.0,
            self.g as f64 / 255.0,
            self.b as f64 / 255.0,
        ]
    }

    /// Interpret a loosely-typed colour value. Integers are unpacked, a
    /// three-element numeric list is read as 0-255 components, everything
    /// else is black.
    pub fn from_value(value: &serde_json::Value) -> Self {
        if let Some(packed) = value.as_i64() {
            return Rgb::from_packed(packed);
        }
        if let Some(parts) = value.as_array() {
            let channels: Vec<f64> = parts.iter().filter_map(|v| v.as_f64()).collect();
            if parts.len() == 3 && channels.len() == 3 {
                let channel = |v: f64| v.round().clamp(0.0, 255.0) as u8;
                return Rgb {
                    r: channel(channels[0]),
                    g: channel(channels[1]),
                    b: channel(channels[2]),
                };
            }
        }
        Rgb::BLACK
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.packed())
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(Rgb::from_value(&value))
    }
}

// ---------------------------------------------------------------------------
// Font weight / orientation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    Light,
    #[default]
    Regular,
    Bold,
}

/// Rotation and scale read off a 2D affine transform `[a, b, c, d, e, f]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    pub rotation_degrees: f64,
    pub scale_x: f64,
    pub scale_y: f64,
}

impl Orientation {
    pub fn from_matrix(m: [f64; 6]) -> Self {
        let [a, b, c, d, _, _] = m;
        Orientation {
            rotation_degrees: b.atan2(a).to_degrees(),
            scale_x: (a * a + b * b).sqrt(),
            scale_y: (c * c + d * d).sqrt(),
        }
    }
}

// ---------------------------------------------------------------------------
// Spans
// ---------------------------------------------------------------------------

/// A span exactly as the text-layout reader reports it. Every geometric or
/// font field is optional so one bad record can be skipped without failing
/// the page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSpan {
    pub text: String,
    #[serde(default, alias = "font_name")]
    pub font: Option<String>,
    #[serde(default, alias = "font_size")]
    pub size: Option<f64>,
    #[serde(default)]
    pub flags: u32,
    #[serde(default)]
    pub color: Option<serde_json::Value>,
    #[serde(default)]
    pub bbox: Option<[f64; 4]>,
    #[serde(default, alias = "matrix")]
    pub transform: Option<[f64; 6]>,
    #[serde(default, alias = "charspace")]
    pub char_spacing: Option<f64>,
    #[serde(default, alias = "wordspace")]
    pub word_spacing: Option<f64>,
}

fn first_page() -> u32 {
    1
}

/// Normalised span metadata. This is also the flat record exchanged with
/// HTTP clients, so every derived field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSpan {
    pub text: String,
    pub bbox: BBox,
    /// 1-based page number.
    #[serde(default = "first_page")]
    pub page: u32,
    /// Font name with any subset prefix removed.
    pub font: String,
    #[serde(default)]
    pub raw_font: String,
    pub size: f64,
    #[serde(default)]
    pub flags: StyleFlags,
    #[serde(default)]
    pub is_bold: bool,
    #[serde(default)]
    pub is_italic: bool,
    #[serde(default)]
    pub color: Rgb,
    #[serde(default)]
    pub char_spacing: f64,
    #[serde(default)]
    pub word_spacing: f64,
    #[serde(default)]
    pub boldness_score: f64,
    #[serde(default)]
    pub weight: FontWeight,
    #[serde(
        default,
        alias = "visual_boldness_score",
        skip_serializing_if = "Option::is_none"
    )]
    pub visual_boldness: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<Orientation>,
}

/// Visual boldness above this reads as bold even without flag or name hints.
pub const VISUAL_BOLD_THRESHOLD: f64 = 50.0;

impl TextSpan {
    /// Bold by flag, name, or rendered ink density.
    pub fn effective_bold(&self) -> bool {
        self.is_bold
            || self
                .visual_boldness
                .is_some_and(|score| score > VISUAL_BOLD_THRESHOLD)
    }

    /// Two records describe the same run on the page.
    pub fn same_run(&self, other: &TextSpan) -> bool {
        self.page == other.page && self.text == other.text && self.bbox == other.bbox
    }
}
