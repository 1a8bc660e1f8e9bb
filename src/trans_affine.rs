//! Affine transformation matrix.
//!
//! Stores six components `[sx, shy, shx, sy, tx, ty]`:
//!
//! ```text
//!   | sx  shx tx |
//!   | shy  sy ty |
//!   |  0    0  1 |
//! ```
//!
//! Transform: `x' = x*sx + y*shx + tx`, `y' = x*shy + y*sy + ty`.
//! Coordinates are y-down, so a positive rotation turns clockwise on screen.

use crate::basics::RectD;

/// Epsilon for affine matrix comparisons.
pub const AFFINE_EPSILON: f64 = 1e-14;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransAffine {
    pub sx: f64,
    pub shy: f64,
    pub shx: f64,
    pub sy: f64,
    pub tx: f64,
    pub ty: f64,
}

impl TransAffine {
    /// Identity matrix.
    pub fn new() -> Self {
        Self::new_custom(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    pub fn new_custom(sx: f64, shy: f64, shx: f64, sy: f64, tx: f64, ty: f64) -> Self {
        Self {
            sx,
            shy,
            shx,
            sy,
            tx,
            ty,
        }
    }

    pub fn new_rotation(a: f64) -> Self {
        let (sa, ca) = a.sin_cos();
        Self::new_custom(ca, sa, -sa, ca, 0.0, 0.0)
    }

    /// Rotation by `k` quarter turns with exact zero/one entries.
    pub fn new_quarter_turn(k: i32) -> Self {
        match k.rem_euclid(4) {
            0 => Self::new(),
            1 => Self::new_custom(0.0, 1.0, -1.0, 0.0, 0.0, 0.0),
            2 => Self::new_custom(-1.0, 0.0, 0.0, -1.0, 0.0, 0.0),
            _ => Self::new_custom(0.0, -1.0, 1.0, 0.0, 0.0, 0.0),
        }
    }

    pub fn new_scaling(x: f64, y: f64) -> Self {
        Self::new_custom(x, 0.0, 0.0, y, 0.0, 0.0)
    }

    /// Shear by factors: `x' = x + shx*y`, `y' = shy*x + y`.
    pub fn new_shearing(shx: f64, shy: f64) -> Self {
        Self::new_custom(1.0, shy, shx, 1.0, 0.0, 0.0)
    }

    pub fn new_translation(x: f64, y: f64) -> Self {
        Self::new_custom(1.0, 0.0, 0.0, 1.0, x, y)
    }

    /// Post-multiply: the result applies `self` first, then `m`.
    pub fn multiply(&mut self, m: &TransAffine) -> &mut Self {
        let t0 = self.sx * m.sx + self.shy * m.shx;
        let t2 = self.shx * m.sx + self.sy * m.shx;
        let t4 = self.tx * m.sx + self.ty * m.shx + m.tx;
        self.shy = self.sx * m.shy + self.shy * m.sy;
        self.sy = self.shx * m.shy + self.sy * m.sy;
        self.ty = self.tx * m.shy + self.ty * m.sy + m.ty;
        self.sx = t0;
        self.shx = t2;
        self.tx = t4;
        self
    }

    #[inline]
    pub fn transform(&self, x: f64, y: f64) -> (f64, f64) {
        (
            x * self.sx + y * self.shx + self.tx,
            x * self.shy + y * self.sy + self.ty,
        )
    }

    #[inline]
    pub fn determinant(&self) -> f64 {
        self.sx * self.sy - self.shy * self.shx
    }

    pub fn is_identity(&self, epsilon: f64) -> bool {
        (self.sx - 1.0).abs() <= epsilon
            && self.shy.abs() <= epsilon
            && self.shx.abs() <= epsilon
            && (self.sy - 1.0).abs() <= epsilon
            && self.tx.abs() <= epsilon
            && self.ty.abs() <= epsilon
    }

    /// Bounding box of the image of `r`.
    pub fn map_rect(&self, r: &RectD) -> RectD {
        let corners = [
            self.transform(r.x1, r.y1),
            self.transform(r.x2, r.y1),
            self.transform(r.x1, r.y2),
            self.transform(r.x2, r.y2),
        ];
        let mut out = RectD::new(f64::MAX, f64::MAX, f64::MIN, f64::MIN);
        for (x, y) in corners {
            out.x1 = out.x1.min(x);
            out.y1 = out.y1.min(y);
            out.x2 = out.x2.max(x);
            out.y2 = out.y2.max(y);
        }
        out
    }
}

impl Default for TransAffine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn close(a: (f64, f64), b: (f64, f64)) -> bool {
        (a.0 - b.0).abs() < 1e-9 && (a.1 - b.1).abs() < 1e-9
    }

    #[test]
    fn test_identity() {
        let m = TransAffine::new();
        assert!(m.is_identity(AFFINE_EPSILON));
        assert_eq!(m.transform(3.0, -4.0), (3.0, -4.0));
    }

    #[test]
    fn test_multiply_order() {
        // scale first, then translate
        let mut m = TransAffine::new_scaling(2.0, 3.0);
        m.multiply(&TransAffine::new_translation(1.0, 1.0));
        assert_eq!(m.transform(1.0, 1.0), (3.0, 4.0));
    }

    #[test]
    fn test_quarter_turn_matches_rotation() {
        for k in 0..4 {
            let exact = TransAffine::new_quarter_turn(k);
            let approx = TransAffine::new_rotation(k as f64 * FRAC_PI_2);
            assert!(close(exact.transform(2.0, 5.0), approx.transform(2.0, 5.0)), "k={k}");
        }
        assert_eq!(TransAffine::new_quarter_turn(1).transform(1.0, 0.0), (0.0, 1.0));
        assert_eq!(TransAffine::new_quarter_turn(-1), TransAffine::new_quarter_turn(3));
    }

    #[test]
    fn test_shearing_and_determinant() {
        let m = TransAffine::new_shearing(0.5, 0.0);
        assert_eq!(m.transform(0.0, 2.0), (1.0, 2.0));
        assert_eq!(m.determinant(), 1.0);
        assert_eq!(TransAffine::new_scaling(2.0, -3.0).determinant(), -6.0);
    }

    #[test]
    fn test_map_rect() {
        let m = TransAffine::new_quarter_turn(1);
        let r = m.map_rect(&RectD::new(0.0, 0.0, 4.0, 2.0));
        assert_eq!(r, RectD::new(-2.0, 0.0, 0.0, 4.0));
    }
}
