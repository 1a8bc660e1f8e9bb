//! Per-phase filter weight tables.
//!
//! A [`FilterWeightsBuffer`] precomputes, for one filter strategy and one
//! absolute scale factor, the integer blend weights for each of the 256
//! sub-pixel phases of a destination pixel. Every table sums to exactly
//! [`FILTER_WEIGHT_FULL`] so the color mixer never has to renormalize.

use crate::basics::iround;
use crate::filter_strategy::{FilterStrategy, FILTER_WEIGHT_FULL};
use crate::fixed_point::{FixedPoint, FIXED_POINT_ONE};

/// Number of precomputed phases.
pub const FILTER_PHASE_COUNT: usize = FIXED_POINT_ONE as usize;

// ============================================================================
// FilterWeights
// ============================================================================

/// Weights for one sub-pixel phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterWeights {
    /// Number of contributing source samples.
    pub span: usize,
    /// Index within `weight` of the sample the phase is measured from.
    pub center_index: i32,
    /// Signed weights, summing to 255.
    pub weight: Vec<i16>,
}

impl FilterWeights {
    pub fn sum(&self) -> i32 {
        self.weight.iter().map(|&w| w as i32).sum()
    }
}

// ============================================================================
// FilterWeightsBuffer
// ============================================================================

/// Immutable lookup table from phase to [`FilterWeights`].
#[derive(Debug, Clone)]
pub struct FilterWeightsBuffer {
    strategy: FilterStrategy,
    weights_position_scale: FixedPoint,
    max_span: usize,
    weights: Vec<FilterWeights>,
}

impl FilterWeightsBuffer {
    /// Build the table for `strategy` at `scale` (sign ignored).
    pub fn new(strategy: FilterStrategy, scale: f64) -> Self {
        let scale = scale.abs();
        debug_assert!(scale > 0.0, "filter weights need a non-zero scale");

        // When shrinking, consecutive source samples are `scale` apart in
        // destination units, which widens the kernel in source space.
        let wps = if scale < 1.0 {
            FixedPoint::from_f64(scale).to_raw256().max(1)
        } else {
            FIXED_POINT_ONE
        };
        let support = strategy.int_support();

        let mut weights = Vec::with_capacity(FILTER_PHASE_COUNT);
        let mut max_span = 0;
        for phase in 0..FIXED_POINT_ONE {
            let first = ceil_div(-support - phase, wps);
            let last = floor_div(support - phase, wps);

            let positions: Vec<i32> = (first..=last).map(|k| phase + k * wps).collect();
            let mut raw: Vec<i32> = positions.iter().map(|&t| strategy.int_value_at(t)).collect();
            normalize(&mut raw, &positions, -first as usize);

            max_span = max_span.max(raw.len());
            weights.push(FilterWeights {
                span: raw.len(),
                center_index: -first,
                weight: raw.into_iter().map(|w| w as i16).collect(),
            });
        }

        log::trace!(
            "filter weights: {} scale={} wps={} max_span={}",
            strategy.id(),
            scale,
            wps,
            max_span
        );

        Self {
            strategy,
            weights_position_scale: FixedPoint::from_raw256(wps),
            max_span,
            weights,
        }
    }

    /// Weights for the phase given by the fractional bits of `offset`.
    #[inline]
    pub fn weights(&self, offset: FixedPoint) -> &FilterWeights {
        &self.weights[offset.frac_index()]
    }

    /// Largest span over all phases; sizes scratch buffers.
    pub fn max_span(&self) -> usize {
        self.max_span
    }

    /// Sample spacing in destination units (`|scale|` when shrinking, else 1).
    pub fn weights_position_scale(&self) -> FixedPoint {
        self.weights_position_scale
    }

    pub fn strategy(&self) -> FilterStrategy {
        self.strategy
    }

    /// Kernel radius in destination pixels, for
    /// [`process_line`](crate::filter_weights_applicator::FilterWeightsApplicator::process_line).
    pub fn support_in_dst(&self, scale: f64) -> f64 {
        self.strategy
            .support(self.weights_position_scale.to_f64())
            * scale.abs()
    }
}

#[inline]
fn floor_div(a: i32, b: i32) -> i32 {
    a.div_euclid(b)
}

#[inline]
fn ceil_div(a: i32, b: i32) -> i32 {
    -((-a).div_euclid(b))
}

/// Force the weights to sum to exactly 255: rescale, then nudge the largest
/// entry one step at a time.
///
/// Equal largest entries are resolved toward the sample nearest the kernel
/// origin (`positions` are the sample offsets), so mirrored phases stay
/// mirror images of each other.
fn normalize(w: &mut [i32], positions: &[i32], center_index: usize) {
    let mut sum: i32 = w.iter().sum();
    if sum == FILTER_WEIGHT_FULL {
        return;
    }

    debug_assert!(sum != 0, "kernel sampled to all zeros");
    if sum == 0 {
        w.iter_mut().for_each(|v| *v = 0);
        if let Some(c) = w.get_mut(center_index) {
            *c = FILTER_WEIGHT_FULL;
        }
        return;
    }

    let k = FILTER_WEIGHT_FULL as f64 / sum as f64;
    for v in w.iter_mut() {
        *v = iround(*v as f64 * k);
    }
    sum = w.iter().sum();

    while sum != FILTER_WEIGHT_FULL {
        let mut idx = 0;
        for (i, &v) in w.iter().enumerate() {
            if v > w[idx] || (v == w[idx] && positions[i].abs() < positions[idx].abs()) {
                idx = i;
            }
        }
        let inc = if sum > FILTER_WEIGHT_FULL { -1 } else { 1 };
        w[idx] += inc;
        sum += inc;
    }
}

// ============================================================================
// Tests
// ============================================================================
