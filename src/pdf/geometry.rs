/*!
 * Geometry primitives in PDF user space.
 *
 * PDF uses a bottom-left origin: x grows to the right, y grows upward.
 * Matrices follow the PDF row-vector convention `[a b c d e f]`.
 */

use serde::{Deserialize, Serialize};

/// Affine transform `[a b c d e f]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::identity()
    }
}

impl Matrix {
    pub const fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub const fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    pub const fn translation(tx: f32, ty: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// `self × other`: apply `self` first, then `other`
    pub fn multiply(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    /// Length of the transformed unit x vector
    pub fn scale_x(&self) -> f32 {
        self.a.hypot(self.b)
    }

    /// Length of the transformed unit y vector
    pub fn scale_y(&self) -> f32 {
        self.c.hypot(self.d)
    }
}

/// Axis-aligned rectangle, `x0 <= x1` and `y0 <= y1`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BoundingBox {
    /// Box spanning a baseline origin, a width and a height above the baseline
    pub fn from_origin(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x0: x.min(x + width),
            y0: y.min(y + height),
            x1: x.max(x + width),
            y1: y.max(y + height),
        }
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }
}

/// Page dimensions in points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    /// US Letter, 8.5 × 11 in
    pub const LETTER: PageSize = PageSize { width: 612.0, height: 792.0 };

    /// ISO A4
    pub const A4: PageSize = PageSize { width: 595.0, height: 842.0 };

    /// Build from a `MediaBox` array `[llx lly urx ury]`
    pub fn from_media_box(media_box: [f32; 4]) -> Self {
        Self {
            width: (media_box[2] - media_box[0]).abs(),
            height: (media_box[3] - media_box[1]).abs(),
        }
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self::LETTER
    }
}
