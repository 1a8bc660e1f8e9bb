//! Whole-device affine transforms built from scanline passes.
//!
//! [`TransformWorker::run`] splits `translate * rotate * shear * scale` into
//! an exact quarter-turn rotation followed by one horizontal and one
//! vertical [`FilterWeightsApplicator`] pass. The quarter turn is chosen so
//! that the horizontal pass scale is as far from zero as possible.
//!
//! The free functions ([`mirror`], [`rotate_right_90`], ...) move pixels
//! without resampling.

use crate::basics::{iround, RectD, RectI};
use crate::filter_strategy::FilterStrategy;
use crate::filter_weights_applicator::{FilterWeightsApplicator, LinePos};
use crate::filter_weights_buffer::FilterWeightsBuffer;
use crate::paint_device::{Axis, PixelDevice};
use crate::trans_affine::TransAffine;

const PASS_EPSILON: f64 = 1e-12;

// ============================================================================
// TransformWorker
// ============================================================================

#[derive(Debug, Clone)]
pub struct TransformWorker {
    filter: FilterStrategy,
    scale_x: f64,
    scale_y: f64,
    shear_x: f64,
    shear_y: f64,
    rotation: f64,
    translate_x: f64,
    translate_y: f64,
    clamp_to_edge: bool,
}

impl TransformWorker {
    /// Identity transform resampling with `filter`.
    pub fn new(filter: FilterStrategy) -> Self {
        Self {
            filter,
            scale_x: 1.0,
            scale_y: 1.0,
            shear_x: 0.0,
            shear_y: 0.0,
            rotation: 0.0,
            translate_x: 0.0,
            translate_y: 0.0,
            clamp_to_edge: false,
        }
    }

    /// Negative factors mirror.
    pub fn set_scale(&mut self, x: f64, y: f64) {
        self.scale_x = x;
        self.scale_y = y;
    }

    pub fn set_shear(&mut self, x: f64, y: f64) {
        self.shear_x = x;
        self.shear_y = y;
    }

    /// Radians, clockwise on screen.
    pub fn set_rotation(&mut self, angle: f64) {
        self.rotation = angle;
    }

    pub fn set_translation(&mut self, x: f64, y: f64) {
        self.translate_x = x;
        self.translate_y = y;
    }

    pub fn set_clamp_to_edge(&mut self, clamp: bool) {
        self.clamp_to_edge = clamp;
    }

    pub fn set_filter(&mut self, filter: FilterStrategy) {
        self.filter = filter;
    }

    pub fn filter(&self) -> FilterStrategy {
        self.filter
    }

    /// The full transform: scale, then shear, then rotate, then translate.
    pub fn transform(&self) -> TransAffine {
        let mut m = TransAffine::new_scaling(self.scale_x, self.scale_y);
        m.multiply(&TransAffine::new_shearing(self.shear_x, self.shear_y));
        m.multiply(&TransAffine::new_rotation(self.rotation));
        m.multiply(&TransAffine::new_translation(self.translate_x, self.translate_y));
        m
    }

    /// Transform `device` in place. Returns its new exact bounds.
    pub fn run(&self, device: &mut PixelDevice) -> RectI {
        let (turns, rest) = split_quarter_turns(&self.transform());
        match turns {
            1 => {
                rotate_right_90(device);
            }
            2 => {
                rotate_180(device);
            }
            3 => {
                rotate_left_90(device);
            }
            _ => {}
        }

        let a = rest.sx;
        if a.abs() < PASS_EPSILON {
            log::warn!("degenerate transform {rest:?}, skipping resampling passes");
            return device.exact_bounds();
        }

        log::debug!(
            "transform: {turns} quarter turns, x' = {a} x + {} y + {}",
            rest.shx,
            rest.tx
        );
        self.pass(device, Axis::Horizontal, a, rest.shx, rest.tx);

        let c = rest.shy;
        self.pass(
            device,
            Axis::Vertical,
            rest.determinant() / a,
            c / a,
            rest.ty - c * rest.tx / a,
        );

        device.exact_bounds()
    }

    /// One in-place pass mapping `pos` to `pos * scale + (line + 0.5) * shear + dx`.
    fn pass(&self, device: &mut PixelDevice, axis: Axis, scale: f64, shear: f64, dx: f64) {
        if (scale - 1.0).abs() < PASS_EPSILON && shear.abs() < PASS_EPSILON && dx.abs() < PASS_EPSILON
        {
            return;
        }
        if scale.abs() < PASS_EPSILON {
            log::warn!("{axis:?} pass with zero scale skipped");
            return;
        }
        let bounds = device.exact_bounds();
        if bounds.is_empty() {
            return;
        }

        let buffer = FilterWeightsBuffer::new(self.filter, scale);
        let support = buffer.support_in_dst(scale);
        let dx = dx + shear * 0.5;
        let mut applicator =
            FilterWeightsApplicator::new(axis, scale, shear, dx, self.clamp_to_edge);
        applicator.set_consume_source(true);

        let (lo, hi) = axis.extent(&bounds);
        let (line_lo, line_hi) = axis.lines(&bounds);
        let src = LinePos::new(lo, hi - lo + 1);

        // Allocate the whole destination once instead of growing per line.
        let mut dst_lo = f64::MAX;
        let mut dst_hi = f64::MIN;
        for line in [line_lo, line_hi] {
            for pos in [lo, hi + 1] {
                let d = pos as f64 * scale + dx + line as f64 * shear;
                dst_lo = dst_lo.min(d);
                dst_hi = dst_hi.max(d);
            }
        }
        let start = (dst_lo - support).floor() as i32 - 1;
        let end = (dst_hi + support).ceil() as i32 + 1;
        let (x1, y1) = axis.xy(start, line_lo);
        let (x2, y2) = axis.xy(end, line_hi);
        device.ensure_contains(&RectI::new(x1, y1, x2, y2));

        log::debug!(
            "{axis:?} pass: scale={scale} shear={shear} dx={dx} lines {line_lo}..={line_hi}"
        );
        for line in line_lo..=line_hi {
            applicator.process_line(device, src, line, &buffer, support);
        }
    }
}

/// Write `M` as `rest * R(k * 90°)` with the `k` that maximizes `|rest.sx|`.
fn split_quarter_turns(m: &TransAffine) -> (i32, TransAffine) {
    let mut best = (0, *m);
    for k in 1..4 {
        let mut rest = TransAffine::new_quarter_turn(-k);
        rest.multiply(m);
        if rest.sx.abs() > best.1.sx.abs() {
            best = (k, rest);
        }
    }
    best
}

// ============================================================================
// Exact operations
// ============================================================================

/// Move every pixel of the exact bounds through `map`.
fn remap_exact(device: &mut PixelDevice, map: impl Fn(i32, i32) -> (i32, i32)) -> RectI {
    let rect = device.exact_bounds();
    if rect.is_empty() {
        return rect;
    }
    let ps = device.pixel_size();
    let mut pixels = vec![0u8; rect.area() * ps];
    device.read_rect(&rect, &mut pixels);
    device.clear_rect(&rect);

    let (ax, ay) = map(rect.x1, rect.y1);
    let (bx, by) = map(rect.x2, rect.y2);
    let out = RectI::new(ax.min(bx), ay.min(by), ax.max(bx), ay.max(by));
    device.ensure_contains(&out);

    let w = rect.width() as usize;
    for (i, px) in pixels.chunks_exact(ps).enumerate() {
        let x = rect.x1 + (i % w) as i32;
        let y = rect.y1 + (i / w) as i32;
        let (nx, ny) = map(x, y);
        device.set_pixel(nx, ny, px);
    }
    out
}

/// Mirror about the line `axis_pos` (a pixel edge or center). `Horizontal`
/// flips left/right, `Vertical` flips top/bottom.
pub fn mirror(device: &mut PixelDevice, axis_pos: f64, orientation: Axis) -> RectI {
    let twice = iround(axis_pos * 2.0);
    match orientation {
        Axis::Horizontal => remap_exact(device, |x, y| (twice - x - 1, y)),
        Axis::Vertical => remap_exact(device, |x, y| (x, twice - y - 1)),
    }
}

/// Mirror left/right about the center of the exact bounds.
pub fn mirror_x(device: &mut PixelDevice) -> RectI {
    let r = device.exact_bounds();
    if r.is_empty() {
        return r;
    }
    let RectD { x1, x2, .. } = r.to_f64();
    mirror(device, (x1 + x2) / 2.0, Axis::Horizontal)
}

/// Mirror top/bottom about the center of the exact bounds.
pub fn mirror_y(device: &mut PixelDevice) -> RectI {
    let r = device.exact_bounds();
    if r.is_empty() {
        return r;
    }
    let RectD { y1, y2, .. } = r.to_f64();
    mirror(device, (y1 + y2) / 2.0, Axis::Vertical)
}

/// Quarter turn clockwise about the origin.
pub fn rotate_right_90(device: &mut PixelDevice) -> RectI {
    remap_exact(device, |x, y| (-y - 1, x))
}

/// Quarter turn counter-clockwise about the origin.
pub fn rotate_left_90(device: &mut PixelDevice) -> RectI {
    remap_exact(device, |x, y| (y, -x - 1))
}

pub fn rotate_180(device: &mut PixelDevice) -> RectI {
    remap_exact(device, |x, y| (-x - 1, -y - 1))
}

// ============================================================================
// Tests
// ============================================================================
