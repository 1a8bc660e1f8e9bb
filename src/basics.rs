//! Foundation types: rounding helpers, points and rectangles.
//!
//! Rectangles use INCLUSIVE corners (`x2`/`y2` are the last covered pixel),
//! matching the rest of the canvas code. Scanline ranges
//! ([`LinePos`](crate::filter_weights_applicator::LinePos)) are the one
//! half-open exception.

// ============================================================================
// Rounding and conversion functions
// ============================================================================

/// Round a double to the nearest integer (round half away from zero).
#[inline]
pub fn iround(v: f64) -> i32 {
    if v < 0.0 {
        (v - 0.5) as i32
    } else {
        (v + 0.5) as i32
    }
}

/// Floor a double to the nearest integer toward negative infinity.
#[inline]
pub fn ifloor(v: f64) -> i32 {
    let i = v as i32;
    i - (i as f64 > v) as i32
}

/// Ceiling of a double as a signed integer.
#[inline]
pub fn iceil(v: f64) -> i32 {
    v.ceil() as i32
}

/// Round `value` up to the next multiple of `alignment` (a power of two).
#[inline]
pub fn align_pow2_hi(value: i32, alignment: i32) -> i32 {
    debug_assert!(alignment > 0 && alignment & (alignment - 1) == 0);
    (value + alignment - 1) & !(alignment - 1)
}

/// Round `value` down to a multiple of `alignment` (a power of two).
#[inline]
pub fn align_pow2_lo(value: i32, alignment: i32) -> i32 {
    debug_assert!(alignment > 0 && alignment & (alignment - 1) == 0);
    value & !(alignment - 1)
}

// ============================================================================
// Point
// ============================================================================

/// A 2D point.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointBase<T: Copy> {
    pub x: T,
    pub y: T,
}

impl<T: Copy> PointBase<T> {
    pub fn new(x: T, y: T) -> Self {
        Self { x, y }
    }
}

pub type PointI = PointBase<i32>;
pub type PointD = PointBase<f64>;

// ============================================================================
// Rect
// ============================================================================

/// A rectangle defined by two inclusive corner points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect<T: Copy> {
    pub x1: T,
    pub y1: T,
    pub x2: T,
    pub y2: T,
}

impl<T: Copy + PartialOrd> Rect<T> {
    pub fn new(x1: T, y1: T, x2: T, y2: T) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Returns `true` if the rectangle covers at least one point.
    pub fn is_valid(&self) -> bool {
        self.x1 <= self.x2 && self.y1 <= self.y2
    }

    /// Returns `true` if `(x, y)` lies inside the rectangle.
    pub fn contains(&self, x: T, y: T) -> bool {
        x >= self.x1 && x <= self.x2 && y >= self.y1 && y <= self.y2
    }

    /// Intersection of two rectangles. The result may be invalid.
    pub fn intersect(&self, r: &Self) -> Self {
        let mut out = *self;
        if out.x2 > r.x2 {
            out.x2 = r.x2;
        }
        if out.y2 > r.y2 {
            out.y2 = r.y2;
        }
        if out.x1 < r.x1 {
            out.x1 = r.x1;
        }
        if out.y1 < r.y1 {
            out.y1 = r.y1;
        }
        out
    }

    /// Returns `true` if the two rectangles share at least one point.
    pub fn overlaps(&self, r: &Self) -> bool {
        !(r.x1 > self.x2 || r.x2 < self.x1 || r.y1 > self.y2 || r.y2 < self.y1)
    }
}

/// Rectangle with `i32` pixel coordinates.
pub type RectI = Rect<i32>;
/// Rectangle with `f64` coordinates.
pub type RectD = Rect<f64>;

impl RectI {
    /// The canonical empty rectangle.
    pub const EMPTY: RectI = RectI {
        x1: 0,
        y1: 0,
        x2: -1,
        y2: -1,
    };

    /// Create from origin and size. Non-positive sizes give an empty rect.
    pub fn from_xywh(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self::new(x, y, x + w - 1, y + h - 1)
    }

    pub fn width(&self) -> i32 {
        (self.x2 - self.x1 + 1).max(0)
    }

    pub fn height(&self) -> i32 {
        (self.y2 - self.y1 + 1).max(0)
    }

    pub fn is_empty(&self) -> bool {
        !self.is_valid()
    }

    /// Pixel count, zero for empty rectangles.
    pub fn area(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    /// Bounding box of both rectangles. Empty operands are ignored.
    pub fn unite(&self, r: &Self) -> Self {
        if self.is_empty() {
            return *r;
        }
        if r.is_empty() {
            return *self;
        }
        Self::new(
            self.x1.min(r.x1),
            self.y1.min(r.y1),
            self.x2.max(r.x2),
            self.y2.max(r.y2),
        )
    }

    pub fn translate(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x1 + dx, self.y1 + dy, self.x2 + dx, self.y2 + dy)
    }

    /// Move each edge by the given amounts (like `QRect::adjusted`).
    pub fn adjusted(&self, dx1: i32, dy1: i32, dx2: i32, dy2: i32) -> Self {
        Self::new(self.x1 + dx1, self.y1 + dy1, self.x2 + dx2, self.y2 + dy2)
    }

    /// Grow the rectangle so both its origin and its exclusive far edge
    /// land on multiples of `alignment` (a power of two).
    pub fn aligned_to_pow2(&self, alignment: i32) -> Self {
        if self.is_empty() {
            return *self;
        }
        let x1 = align_pow2_lo(self.x1, alignment);
        let y1 = align_pow2_lo(self.y1, alignment);
        let x2 = align_pow2_hi(self.x2 + 1, alignment) - 1;
        let y2 = align_pow2_hi(self.y2 + 1, alignment) - 1;
        Self::new(x1, y1, x2, y2)
    }

    pub fn to_f64(&self) -> RectD {
        RectD::new(
            self.x1 as f64,
            self.y1 as f64,
            (self.x2 + 1) as f64,
            (self.y2 + 1) as f64,
        )
    }
}

impl RectD {
    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    /// Smallest pixel rectangle covering this one. For `RectD` the far
    /// corner is an exclusive continuous coordinate.
    pub fn to_aligned(&self) -> RectI {
        let x1 = ifloor(self.x1);
        let y1 = ifloor(self.y1);
        let x2 = iceil(self.x2) - 1;
        let y2 = iceil(self.y2) - 1;
        RectI::new(x1, y1, x2, y2)
    }

    pub fn scaled(&self, sx: f64, sy: f64) -> Self {
        Self::new(self.x1 * sx, self.y1 * sy, self.x2 * sx, self.y2 * sy)
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x1 + dx, self.y1 + dy, self.x2 + dx, self.y2 + dy)
    }
}

// ============================================================================
// Tests
// ============================================================================
