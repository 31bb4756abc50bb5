use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in page space (origin top-left, y grows downward).
///
/// Serialises as the flat `[x0, y0, x1, y1]` list used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BBox {
    pub const fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    /// Horizontal center.
    pub fn center_x(&self) -> f64 {
        (self.x0 + self.x1) / 2.0
    }

    pub fn is_finite(&self) -> bool {
        self.x0.is_finite() && self.y0.is_finite() && self.x1.is_finite() && self.y1.is_finite()
    }

    /// `x1 >= x0` and `y1 >= y0`, all coordinates finite.
    pub fn is_well_formed(&self) -> bool {
        self.is_finite() && self.x1 >= self.x0 && self.y1 >= self.y0
    }

    /// A box that cannot be repositioned: non-finite, inverted, or without area.
    pub fn is_degenerate(&self) -> bool {
        !self.is_well_formed() || self.width() <= 0.0 || self.height() <= 0.0
    }

    /// Grow the box by `amount` on every side.
    pub fn padded(&self, amount: f64) -> Self {
        Self {
            x0: self.x0 - amount,
            y0: self.y0 - amount,
            x1: self.x1 + amount,
            y1: self.y1 + amount,
        }
    }

    /// Same width and height, moved horizontally by `dx`.
    pub fn shifted_x(&self, dx: f64) -> Self {
        Self {
            x0: self.x0 + dx,
            x1: self.x1 + dx,
            ..*self
        }
    }
}

impl From<[f64; 4]> for BBox {
    fn from(v: [f64; 4]) -> Self {
        BBox::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BBox> for [f64; 4] {
    fn from(b: BBox) -> Self {
        [b.x0, b.y0, b.x1, b.y1]
    }
}

/// A point in page space, serialised as `[x, y]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl From<[f64; 2]> for Point {
    fn from(v: [f64; 2]) -> Self {
        Point { x: v[0], y: v[1] }
    }
}

impl From<Point> for [f64; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}
