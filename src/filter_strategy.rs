//! Interpolation kernels used by the resampler.
//!
//! A [`FilterStrategy`] is stateless: it exposes a support radius (in
//! destination pixels) and a weight function sampled in 24.8 fixed-point
//! phase space, returning integer weights in the 8-bit blend range.
//! Negative lobes (Bicubic, Mitchell, Lanczos3) come back as negative
//! integers; the weights buffer normalizes every kernel to sum to 255.

use std::f64::consts::PI;

use crate::basics::iround;
use crate::fixed_point::FIXED_POINT_ONE;

/// Largest weight a kernel sample may take.
pub const FILTER_WEIGHT_FULL: i32 = 255;

// ============================================================================
// FilterStrategy
// ============================================================================

/// The closed set of interpolation kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterStrategy {
    /// Nearest neighbour, support 0.5.
    Box,
    /// Triangle / linear falloff, support 1.0.
    Bilinear,
    /// Cubic Hermite, support 1.0.
    Hermite,
    /// Piecewise quadratic, support 1.5.
    Bell,
    /// Cubic B-spline (smoothing), support 2.0.
    BSpline,
    /// Keys cubic convolution with a = -0.5 (Catmull-Rom), support 2.0.
    Bicubic,
    /// Mitchell-Netravali with B = C = 1/3, support 2.0.
    Mitchell,
    /// Windowed sinc with three lobes, support 3.0.
    Lanczos3,
}

impl FilterStrategy {
    /// Every strategy, in the order the default registry lists them.
    pub const ALL: [FilterStrategy; 8] = [
        FilterStrategy::Box,
        FilterStrategy::Bilinear,
        FilterStrategy::Hermite,
        FilterStrategy::Bell,
        FilterStrategy::BSpline,
        FilterStrategy::Bicubic,
        FilterStrategy::Mitchell,
        FilterStrategy::Lanczos3,
    ];

    /// Stable identifier used by [`FilterRegistry`](crate::filter_registry::FilterRegistry).
    pub fn id(&self) -> &'static str {
        match self {
            FilterStrategy::Box => "Box",
            FilterStrategy::Bilinear => "Bilinear",
            FilterStrategy::Hermite => "Hermite",
            FilterStrategy::Bell => "Bell",
            FilterStrategy::BSpline => "BSpline",
            FilterStrategy::Bicubic => "Bicubic",
            FilterStrategy::Mitchell => "Mitchell",
            FilterStrategy::Lanczos3 => "Lanczos3",
        }
    }

    /// Kernel radius in destination pixels.
    pub fn radius(&self) -> f64 {
        match self {
            FilterStrategy::Box => 0.5,
            FilterStrategy::Bilinear | FilterStrategy::Hermite => 1.0,
            FilterStrategy::Bell => 1.5,
            FilterStrategy::BSpline | FilterStrategy::Bicubic | FilterStrategy::Mitchell => 2.0,
            FilterStrategy::Lanczos3 => 3.0,
        }
    }

    /// Kernel radius in source pixels for a given weights position scale.
    ///
    /// When downsampling the weights buffer samples the kernel every
    /// `weights_position_scale` units, so the kernel covers proportionally
    /// more source pixels. That widening is what anti-aliases a shrink.
    pub fn support(&self, weights_position_scale: f64) -> f64 {
        debug_assert!(weights_position_scale > 0.0);
        self.radius() / weights_position_scale
    }

    /// Kernel radius in destination pixels, as a raw 24.8 value.
    pub fn int_support(&self) -> i32 {
        iround(self.radius() * FIXED_POINT_ONE as f64)
    }

    /// Continuous kernel shape at distance `x >= 0` from the center.
    pub fn value_at(&self, x: f64) -> f64 {
        let x = x.abs();
        match self {
            FilterStrategy::Box => {
                if x <= 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
            FilterStrategy::Bilinear => {
                if x < 1.0 {
                    1.0 - x
                } else {
                    0.0
                }
            }
            FilterStrategy::Hermite => {
                if x < 1.0 {
                    (2.0 * x - 3.0) * x * x + 1.0
                } else {
                    0.0
                }
            }
            FilterStrategy::Bell => {
                if x < 0.5 {
                    0.75 - x * x
                } else if x < 1.5 {
                    let t = x - 1.5;
                    0.5 * t * t
                } else {
                    0.0
                }
            }
            FilterStrategy::BSpline => {
                if x < 1.0 {
                    0.5 * x * x * x - x * x + 2.0 / 3.0
                } else if x < 2.0 {
                    let t = 2.0 - x;
                    t * t * t / 6.0
                } else {
                    0.0
                }
            }
            FilterStrategy::Bicubic => {
                if x < 1.0 {
                    0.5 * (2.0 + x * x * (-5.0 + x * 3.0))
                } else if x < 2.0 {
                    0.5 * (4.0 + x * (-8.0 + x * (5.0 - x)))
                } else {
                    0.0
                }
            }
            FilterStrategy::Mitchell => mitchell(x, 1.0 / 3.0, 1.0 / 3.0),
            FilterStrategy::Lanczos3 => {
                if x == 0.0 {
                    1.0
                } else if x < 3.0 {
                    let px = x * PI;
                    let pxr = px / 3.0;
                    (px.sin() / px) * (pxr.sin() / pxr)
                } else {
                    0.0
                }
            }
        }
    }

    /// Integer weight at raw 24.8 distance `t` (destination pixel units).
    ///
    /// Box and Bilinear are evaluated in pure integer arithmetic; the
    /// others sample [`value_at`](Self::value_at) and round.
    pub fn int_value_at(&self, t: i32) -> i32 {
        match self {
            FilterStrategy::Box => {
                // half-open on the left so two neighbours never both claim
                // the exact midpoint
                if t > -128 && t <= 128 {
                    FILTER_WEIGHT_FULL
                } else {
                    0
                }
            }
            FilterStrategy::Bilinear => {
                let t = t.abs();
                if t < FIXED_POINT_ONE {
                    ((FIXED_POINT_ONE - t) * FILTER_WEIGHT_FULL + 128) >> 8
                } else {
                    0
                }
            }
            _ => iround(
                FILTER_WEIGHT_FULL as f64 * self.value_at(t as f64 / FIXED_POINT_ONE as f64),
            ),
        }
    }

    /// Symmetric kernels give mirrored weights for mirrored phases.
    pub fn is_symmetric(&self) -> bool {
        !matches!(self, FilterStrategy::Box)
    }
}

impl Default for FilterStrategy {
    fn default() -> Self {
        FilterStrategy::Bicubic
    }
}

/// Mitchell-Netravali cubic with parameters `b` and `c`.
fn mitchell(x: f64, b: f64, c: f64) -> f64 {
    if x < 1.0 {
        let p0 = (6.0 - 2.0 * b) / 6.0;
        let p2 = (-18.0 + 12.0 * b + 6.0 * c) / 6.0;
        let p3 = (12.0 - 9.0 * b - 6.0 * c) / 6.0;
        return p0 + x * x * (p2 + x * p3);
    }
    if x < 2.0 {
        let q0 = (8.0 * b + 24.0 * c) / 6.0;
        let q1 = (-12.0 * b - 48.0 * c) / 6.0;
        let q2 = (6.0 * b + 30.0 * c) / 6.0;
        let q3 = (-b - 6.0 * c) / 6.0;
        return q0 + x * (q1 + x * (q2 + x * q3));
    }
    0.0
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radius_and_int_support() {
        assert_eq!(FilterStrategy::Box.int_support(), 128);
        assert_eq!(FilterStrategy::Bilinear.int_support(), 256);
        assert_eq!(FilterStrategy::Bell.int_support(), 384);
        assert_eq!(FilterStrategy::Lanczos3.int_support(), 768);
    }

    #[test]
    fn test_support_widens_when_downsampling() {
        let f = FilterStrategy::Bilinear;
        assert_eq!(f.support(1.0), 1.0);
        assert_eq!(f.support(0.5), 2.0);
        assert_eq!(FilterStrategy::Box.support(0.25), 2.0);
    }

    #[test]
    fn test_box_weights() {
        let f = FilterStrategy::Box;
        assert_eq!(f.int_value_at(0), 255);
        assert_eq!(f.int_value_at(128), 255);
        assert_eq!(f.int_value_at(-128), 0);
        assert_eq!(f.int_value_at(129), 0);
    }

    #[test]
    fn test_bilinear_weights() {
        let f = FilterStrategy::Bilinear;
        assert_eq!(f.int_value_at(0), 255);
        assert_eq!(f.int_value_at(64), 191);
        assert_eq!(f.int_value_at(-192), 64);
        assert_eq!(f.int_value_at(128), 128);
        assert_eq!(f.int_value_at(256), 0);
        assert_eq!(f.int_value_at(-300), 0);
    }

    #[test]
    fn test_shapes_at_center() {
        assert_eq!(FilterStrategy::Hermite.value_at(0.0), 1.0);
        assert_eq!(FilterStrategy::Bicubic.value_at(0.0), 1.0);
        assert_eq!(FilterStrategy::Lanczos3.value_at(0.0), 1.0);
        assert_eq!(FilterStrategy::Bell.value_at(0.0), 0.75);
        assert!((FilterStrategy::BSpline.value_at(0.0) - 2.0 / 3.0).abs() < 1e-12);
        assert!((FilterStrategy::Mitchell.value_at(0.0) - 8.0 / 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_shapes_vanish_outside_support() {
        for f in FilterStrategy::ALL {
            let r = f.radius();
            assert_eq!(f.value_at(r + 0.01), 0.0, "{} leaks past its radius", f.id());
            assert_eq!(f.int_value_at(f.int_support() + 1), 0, "{}", f.id());
        }
    }

    #[test]
    fn test_negative_lobes() {
        assert!(FilterStrategy::Bicubic.int_value_at(384) < 0);
        assert!(FilterStrategy::Lanczos3.value_at(1.5) < 0.0);
    }

    #[test]
    fn test_kernels_are_even_functions() {
        for f in FilterStrategy::ALL {
            if !f.is_symmetric() {
                continue;
            }
            for t in 0..f.int_support() {
                assert_eq!(f.int_value_at(t), f.int_value_at(-t), "{} at {t}", f.id());
            }
        }
    }

    #[test]
    fn test_ids_are_unique() {
        let mut ids: Vec<_> = FilterStrategy::ALL.iter().map(|f| f.id()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), FilterStrategy::ALL.len());
    }
}
