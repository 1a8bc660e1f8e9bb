//! 24.8 fixed-point numbers.
//!
//! Used wherever a fractional step is accumulated across a scanline and
//! floating-point drift would change which filter phase a pixel picks.
//! Values are stored as `raw / 256` in an `i32`, so magnitudes beyond about
//! ±8 million overflow; arithmetic outside that range is undefined.

use core::fmt;
use core::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use crate::basics::iround;

pub const FIXED_POINT_SHIFT: u32 = 8;
pub const FIXED_POINT_ONE: i32 = 1 << FIXED_POINT_SHIFT; // 256
pub const FIXED_POINT_MASK: i32 = FIXED_POINT_ONE - 1;
const HALF_RAW: i32 = FIXED_POINT_ONE / 2;

/// Signed 24.8 fixed-point value.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FixedPoint {
    d: i32,
}

impl FixedPoint {
    pub const ZERO: FixedPoint = FixedPoint { d: 0 };
    pub const ONE: FixedPoint = FixedPoint { d: FIXED_POINT_ONE };
    pub const HALF: FixedPoint = FixedPoint { d: HALF_RAW };

    /// Exact integer value.
    #[inline]
    pub const fn from_int(v: i32) -> Self {
        Self {
            d: v << FIXED_POINT_SHIFT,
        }
    }

    /// Nearest representable value (ties away from zero).
    #[inline]
    pub fn from_f64(v: f64) -> Self {
        Self {
            d: iround(v * FIXED_POINT_ONE as f64),
        }
    }

    #[inline]
    pub fn from_f32(v: f32) -> Self {
        Self::from_f64(v as f64)
    }

    /// Build from the raw "256-frac" representation (`raw / 256`).
    #[inline]
    pub const fn from_raw256(raw: i32) -> Self {
        Self { d: raw }
    }

    /// The raw "256-frac" representation.
    #[inline]
    pub const fn to_raw256(self) -> i32 {
        self.d
    }

    /// Truncate toward zero.
    #[inline]
    pub fn to_int(self) -> i32 {
        if self.d >= 0 {
            self.d >> FIXED_POINT_SHIFT
        } else {
            -((-self.d) >> FIXED_POINT_SHIFT)
        }
    }

    /// Round toward negative infinity.
    #[inline]
    pub fn to_int_floor(self) -> i32 {
        self.d >> FIXED_POINT_SHIFT
    }

    /// Round toward positive infinity.
    #[inline]
    pub fn to_int_ceil(self) -> i32 {
        (self.d + FIXED_POINT_MASK) >> FIXED_POINT_SHIFT
    }

    /// Round to nearest, ties away from zero.
    #[inline]
    pub fn to_int_round(self) -> i32 {
        if self.d >= 0 {
            (self.d + HALF_RAW) >> FIXED_POINT_SHIFT
        } else {
            -((-self.d + HALF_RAW) >> FIXED_POINT_SHIFT)
        }
    }

    #[inline]
    pub fn to_f64(self) -> f64 {
        self.d as f64 / FIXED_POINT_ONE as f64
    }

    #[inline]
    pub fn to_f32(self) -> f32 {
        self.d as f32 / FIXED_POINT_ONE as f32
    }

    /// `true` iff the fractional bits are all zero.
    #[inline]
    pub fn is_integer(self) -> bool {
        self.d & FIXED_POINT_MASK == 0
    }

    /// Fractional bits as a 0..=255 index.
    #[inline]
    pub fn frac_index(self) -> usize {
        (self.d & FIXED_POINT_MASK) as usize
    }

    #[inline]
    pub fn abs(self) -> Self {
        Self { d: self.d.abs() }
    }
}

impl From<i32> for FixedPoint {
    fn from(v: i32) -> Self {
        Self::from_int(v)
    }
}

impl From<f64> for FixedPoint {
    fn from(v: f64) -> Self {
        Self::from_f64(v)
    }
}

impl fmt::Debug for FixedPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FixedPoint({} = {}/256)", self.to_f64(), self.d)
    }
}

impl fmt::Display for FixedPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_f64())
    }
}

// ============================================================================
// Arithmetic
// ============================================================================

impl Add for FixedPoint {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self { d: self.d + rhs.d }
    }
}

impl AddAssign for FixedPoint {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.d += rhs.d;
    }
}

impl Sub for FixedPoint {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self { d: self.d - rhs.d }
    }
}

impl SubAssign for FixedPoint {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        self.d -= rhs.d;
    }
}

impl Neg for FixedPoint {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Self { d: -self.d }
    }
}

/// Widening multiply, then shift the product back down by 8 bits.
impl Mul for FixedPoint {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Self {
            d: ((self.d as i64 * rhs.d as i64) >> FIXED_POINT_SHIFT) as i32,
        }
    }
}

/// Shift the dividend up by 8 bits, then divide (truncating).
impl Div for FixedPoint {
    type Output = Self;
    #[inline]
    fn div(self, rhs: Self) -> Self {
        debug_assert!(rhs.d != 0, "fixed-point division by zero");
        Self {
            d: (((self.d as i64) << FIXED_POINT_SHIFT) / rhs.d as i64) as i32,
        }
    }
}

impl Mul<i32> for FixedPoint {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: i32) -> Self {
        Self { d: self.d * rhs }
    }
}

// ============================================================================
// Tests
// ============================================================================
