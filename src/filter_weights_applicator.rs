//! One-dimensional scanline resampling.
//!
//! A [`FilterWeightsApplicator`] maps source position `s` on scanline
//! `line` to destination position `s * scale + dx + line * shear` along one
//! [`Axis`], blending every destination pixel from the source samples its
//! kernel covers. Two passes of it (horizontal then vertical) make up a full
//! affine transform; see [`TransformWorker`](crate::transform_worker::TransformWorker).
//!
//! Sub-pixel positions go through [`FixedPoint`] so that every pixel with
//! the same phase picks the same precomputed weights.

use crate::filter_weights_buffer::{FilterWeights, FilterWeightsBuffer};
use crate::fixed_point::FixedPoint;
use crate::paint_device::{Axis, PixelDevice};

// ============================================================================
// LinePos
// ============================================================================

/// Half-open pixel range `[start, start + size)` along a scanline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LinePos {
    pub start: i32,
    pub size: i32,
}

impl LinePos {
    pub const EMPTY: LinePos = LinePos { start: 0, size: 0 };

    pub fn new(start: i32, size: i32) -> Self {
        Self { start, size }
    }

    /// One past the last pixel.
    pub fn end(&self) -> i32 {
        self.start + self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size <= 0
    }
}

// ============================================================================
// BlendSpan
// ============================================================================

/// Where and how one destination pixel samples the source.
#[derive(Debug, Clone, Copy)]
pub struct BlendSpan<'a> {
    pub weights: &'a FilterWeights,
    /// Source index of `weights.weight[0]`.
    pub first_blend_pixel: i32,
    /// Phase of the nearest source center, in kernel units.
    pub offset: FixedPoint,
    /// Phase advance per destination pixel. Informational: blending calls
    /// [`FilterWeightsApplicator::calculate_blend_span`] for every pixel
    /// rather than accumulating this step.
    pub offset_inc: FixedPoint,
}

impl BlendSpan<'_> {
    /// One past the last contributing source index.
    pub fn end(&self) -> i32 {
        self.first_blend_pixel + self.weights.span as i32
    }
}

// ============================================================================
// FilterWeightsApplicator
// ============================================================================

/// Source and destination ranges resolved for one `process_line` call.
struct LinePlan {
    dst: LinePos,
    src_left: i32,
    src_right: i32,
}

#[derive(Debug, Clone)]
pub struct FilterWeightsApplicator {
    axis: Axis,
    scale: f64,
    shear: f64,
    dx: f64,
    clamp_to_edge: bool,
    consume_source: bool,
    scratch: Vec<u8>,
    mixed: Vec<u8>,
}

impl FilterWeightsApplicator {
    pub fn new(axis: Axis, scale: f64, shear: f64, dx: f64, clamp_to_edge: bool) -> Self {
        debug_assert!(scale != 0.0, "zero scale");
        Self {
            axis,
            scale,
            shear,
            dx,
            clamp_to_edge,
            consume_source: false,
            scratch: Vec::new(),
            mixed: Vec::new(),
        }
    }

    /// When set, source pixels are reset to the device default pixel as
    /// they are read. In-place passes need this so that source pixels no
    /// destination pixel covers do not survive the pass.
    pub fn set_consume_source(&mut self, consume: bool) {
        self.consume_source = consume;
    }

    pub fn consume_source(&self) -> bool {
        self.consume_source
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn shear(&self) -> f64 {
        self.shear
    }

    pub fn dx(&self) -> f64 {
        self.dx
    }

    pub fn clamp_to_edge(&self) -> bool {
        self.clamp_to_edge
    }

    #[inline]
    fn to_dst(&self, src: f64, line: i32) -> f64 {
        src * self.scale + self.dx + line as f64 * self.shear
    }

    /// Source samples and weights for destination pixel `dst_l`.
    pub fn calculate_blend_span<'b>(
        &self,
        dst_l: i32,
        line: i32,
        buffer: &'b FilterWeightsBuffer,
    ) -> BlendSpan<'b> {
        let dst_c = dst_l as f64 + 0.5;
        let src_c =
            FixedPoint::from_f64((dst_c - self.dx - line as f64 * self.shear) / self.scale);
        let next_c_in_src =
            FixedPoint::from_int((src_c - FixedPoint::HALF).to_int_ceil()) + FixedPoint::HALF;

        let wps = buffer.weights_position_scale();
        let offset = (next_c_in_src - src_c) * wps;
        let weights = buffer.weights(offset);

        BlendSpan {
            weights,
            first_blend_pixel: next_c_in_src.to_int_floor() - weights.center_index,
            offset,
            offset_inc: wps,
        }
    }

    fn plan(
        &self,
        src: LinePos,
        line: i32,
        buffer: &FilterWeightsBuffer,
        support: f64,
    ) -> Option<LinePlan> {
        if src.is_empty() {
            return None;
        }
        let mut lo = self.to_dst(src.start as f64, line);
        let mut hi = self.to_dst(src.end() as f64, line);
        if self.scale < 0.0 {
            std::mem::swap(&mut lo, &mut hi);
        }

        let support = if self.clamp_to_edge { 0.0 } else { support };
        let dst_start = (lo - support).floor() as i32;
        let dst_end = (hi + support).ceil() as i32;
        if dst_start >= dst_end {
            return None;
        }

        let first = self.calculate_blend_span(dst_start, line, buffer);
        let last = self.calculate_blend_span(dst_end - 1, line, buffer);
        let (left, right) = if self.scale < 0.0 {
            (last.first_blend_pixel, first.end())
        } else {
            (first.first_blend_pixel, last.end())
        };
        if left >= right {
            return None;
        }

        Some(LinePlan {
            dst: LinePos::new(dst_start, dst_end - dst_start),
            src_left: left.min(src.start),
            src_right: right.max(src.end()),
        })
    }

    /// Copy `[plan.src_left, plan.src_right)` of the source scanline into
    /// the scratch buffer, padding outside `src` with the default or edge
    /// pixel.
    fn load_scratch(&mut self, device: &mut PixelDevice, src: LinePos, line: i32, plan: &LinePlan) {
        let ps = device.pixel_size();
        let default_px = device.default_pixel().to_vec();
        let (left_pad, right_pad) = if self.clamp_to_edge {
            let (x0, y0) = self.axis.xy(src.start, line);
            let (x1, y1) = self.axis.xy(src.end() - 1, line);
            (device.pixel(x0, y0).to_vec(), device.pixel(x1, y1).to_vec())
        } else {
            (default_px.clone(), default_px.clone())
        };

        self.scratch.clear();
        self.scratch
            .reserve((plan.src_right - plan.src_left) as usize * ps);

        let mut cursor = device.line_cursor(self.axis, plan.src_left, line);
        while cursor.pos() < plan.src_right {
            let pos = cursor.pos();
            if pos < src.start {
                self.scratch.extend_from_slice(&left_pad);
                cursor.next_pixel();
                continue;
            }
            if pos >= src.end() {
                self.scratch.extend_from_slice(&right_pad);
                cursor.next_pixel();
                continue;
            }

            let run = cursor
                .remaining_contiguous()
                .min((src.end() - pos) as usize);
            if cursor.is_stored() {
                self.scratch.extend_from_slice(cursor.contiguous(run));
            } else {
                for _ in 0..run {
                    self.scratch.extend_from_slice(&default_px);
                }
            }
            cursor.advance(run);
        }

        if self.consume_source {
            device.clear_rect(&self.axis.line_rect(src.start, src.size, line));
        }
    }

    fn blend_into(
        &mut self,
        device: &mut PixelDevice,
        line: i32,
        buffer: &FilterWeightsBuffer,
        plan: &LinePlan,
    ) {
        let model = device.color_model();
        let ps = model.pixel_size();
        self.mixed.resize(ps, 0);
        device.ensure_contains(&self.axis.line_rect(plan.dst.start, plan.dst.size, line));

        let mut cursor = device.line_cursor(self.axis, plan.dst.start, line);
        for dst_l in plan.dst.start..plan.dst.end() {
            let span = self.calculate_blend_span(dst_l, line, buffer);
            let from = (span.first_blend_pixel - plan.src_left) as usize * ps;
            let to = from + span.weights.span * ps;
            model.mix_colors(&self.scratch[from..to], &span.weights.weight, &mut self.mixed);
            cursor.write(&self.mixed);
            cursor.next_pixel();
        }
    }

    /// Resample `src` on scanline `line` of `device` in place.
    ///
    /// `support` is the kernel radius in destination pixels (see
    /// [`FilterWeightsBuffer::support_in_dst`]). Returns the destination
    /// range written, empty when nothing maps.
    pub fn process_line(
        &mut self,
        device: &mut PixelDevice,
        src: LinePos,
        line: i32,
        buffer: &FilterWeightsBuffer,
        support: f64,
    ) -> LinePos {
        let Some(plan) = self.plan(src, line, buffer, support) else {
            log::trace!("line {line}: {src:?} maps to no destination pixels");
            return LinePos::EMPTY;
        };
        self.load_scratch(device, src, line, &plan);
        self.blend_into(device, line, buffer, &plan);
        plan.dst
    }

    /// Resample from `src_device` into the same scanline of `dst_device`.
    pub fn process_line_to(
        &mut self,
        src_device: &mut PixelDevice,
        dst_device: &mut PixelDevice,
        src: LinePos,
        line: i32,
        buffer: &FilterWeightsBuffer,
        support: f64,
    ) -> LinePos {
        debug_assert_eq!(src_device.color_model(), dst_device.color_model());
        let Some(plan) = self.plan(src, line, buffer, support) else {
            log::trace!("line {line}: {src:?} maps to no destination pixels");
            return LinePos::EMPTY;
        };
        self.load_scratch(src_device, src, line, &plan);
        self.blend_into(dst_device, line, buffer, &plan);
        plan.dst
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basics::RectI;
    use crate::color_model::{ColorModel, Rgba8};
    use crate::filter_strategy::FilterStrategy;

    const REDS: [u8; 4] = [10, 20, 30, 40];

    fn source(axis: Axis) -> PixelDevice {
        let mut dev = PixelDevice::new(ColorModel::Rgba8);
        for (i, r) in REDS.iter().enumerate() {
            let (x, y) = axis.xy(i as i32, 0);
            dev.fill(&RectI::from_xywh(x, y, 1, 1), &Rgba8::new_opaque(*r, 0, 0).to_bytes());
        }
        dev
    }

    struct Run {
        range: LinePos,
        red: Vec<u8>,
        alpha: Vec<u8>,
    }

    fn run(axis: Axis, scale: f64, dx: f64, clamp: bool) -> Run {
        let buffer = FilterWeightsBuffer::new(FilterStrategy::Bilinear, scale);
        let mut app = FilterWeightsApplicator::new(axis, scale, 0.0, dx, clamp);
        let mut src = source(axis);
        let mut dst = PixelDevice::new(ColorModel::Rgba8);
        let range = app.process_line_to(
            &mut src,
            &mut dst,
            LinePos::new(0, 4),
            0,
            &buffer,
            buffer.support_in_dst(scale),
        );
        let (mut red, mut alpha) = (Vec::new(), Vec::new());
        for pos in range.start..range.end() {
            let (x, y) = axis.xy(pos, 0);
            let px = dst.pixel(x, y);
            red.push(px[0]);
            alpha.push(px[3]);
        }
        Run { range, red, alpha }
    }

    #[test]
    fn test_line_pos() {
        let p = LinePos::new(-2, 5);
        assert_eq!(p.end(), 3);
        assert!(!p.is_empty());
        assert!(LinePos::EMPTY.is_empty());
    }

    #[test]
    fn test_blend_span_upscale() {
        let buffer = FilterWeightsBuffer::new(FilterStrategy::Bilinear, 2.0);
        let app = FilterWeightsApplicator::new(Axis::Horizontal, 2.0, 0.0, 0.0, false);

        let s0 = app.calculate_blend_span(0, 0, &buffer);
        assert_eq!(s0.first_blend_pixel, -1);
        assert_eq!(s0.offset, FixedPoint::from_f64(0.25));
        assert_eq!(s0.offset_inc, FixedPoint::ONE);

        let s1 = app.calculate_blend_span(1, 0, &buffer);
        assert_eq!(s1.first_blend_pixel, 0);
        assert_eq!(s1.offset, FixedPoint::from_f64(0.75));
        assert_eq!(s1.offset_inc, FixedPoint::ONE);
    }

    #[test]
    fn test_blend_span_downscale() {
        let buffer = FilterWeightsBuffer::new(FilterStrategy::Bilinear, 0.5);
        let app = FilterWeightsApplicator::new(Axis::Horizontal, 0.5, 0.0, 0.0, false);
        let s = app.calculate_blend_span(0, 0, &buffer);
        assert_eq!(s.first_blend_pixel, -1);
        assert_eq!(s.offset, FixedPoint::from_f64(0.25));
        assert_eq!(s.offset_inc, FixedPoint::from_f64(0.5));
    }

    #[test]
    fn test_blend_span_mirrored() {
        let buffer = FilterWeightsBuffer::new(FilterStrategy::Bilinear, -1.0);
        let app = FilterWeightsApplicator::new(Axis::Horizontal, -1.0, 0.0, 0.0, false);
        let s = app.calculate_blend_span(0, 0, &buffer);
        assert_eq!(s.first_blend_pixel, -2);
        assert_eq!(s.offset, FixedPoint::ZERO);
        assert_eq!(s.offset_inc, FixedPoint::ONE);
    }

    #[test]
    fn test_blend_span_shear_shifts_by_line() {
        let buffer = FilterWeightsBuffer::new(FilterStrategy::Bilinear, 1.0);
        let app = FilterWeightsApplicator::new(Axis::Horizontal, 1.0, 0.5, 0.0, false);
        let s0 = app.calculate_blend_span(3, 0, &buffer);
        let s4 = app.calculate_blend_span(5, 4, &buffer);
        assert_eq!(s0.first_blend_pixel, s4.first_blend_pixel);
        assert_eq!(s0.offset, s4.offset);
    }

    #[test]
    fn test_half_pixel_shift() {
        for axis in [Axis::Horizontal, Axis::Vertical] {
            let r = run(axis, 1.0, -0.5, false);
            assert_eq!(r.range, LinePos::new(-2, 7), "{axis:?}");
            assert_eq!(r.red, vec![0, 10, 15, 25, 35, 40, 0], "{axis:?}");
            assert_eq!(r.alpha, vec![0, 128, 255, 255, 255, 127, 0], "{axis:?}");
        }
    }

    #[test]
    fn test_half_pixel_shift_clamped() {
        for axis in [Axis::Horizontal, Axis::Vertical] {
            let r = run(axis, 1.0, -0.5, true);
            assert_eq!(r.range, LinePos::new(-1, 5), "{axis:?}");
            assert_eq!(r.red, vec![10, 15, 25, 35, 40], "{axis:?}");
            assert_eq!(r.alpha, vec![255; 5], "{axis:?}");
        }
    }

    #[test]
    fn test_upscale_by_two() {
        for axis in [Axis::Horizontal, Axis::Vertical] {
            let r = run(axis, 2.0, 0.0, false);
            assert_eq!(r.range, LinePos::new(-2, 12), "{axis:?}");
            assert_eq!(r.red, vec![0, 10, 10, 13, 17, 23, 27, 33, 37, 40, 40, 0]);
            assert_eq!(
                r.alpha,
                vec![0, 64, 191, 255, 255, 255, 255, 255, 255, 191, 64, 0]
            );
        }
    }

    #[test]
    fn test_mirror() {
        let r = run(Axis::Horizontal, -1.0, 0.0, false);
        assert_eq!(r.range, LinePos::new(-5, 6));
        assert_eq!(r.red, vec![0, 40, 30, 20, 10, 0]);
        assert_eq!(r.alpha, vec![0, 255, 255, 255, 255, 0]);
    }

    #[test]
    fn test_downscale_by_two() {
        let r = run(Axis::Horizontal, 0.5, 0.0, false);
        assert_eq!(r.range, LinePos::new(-1, 4));
        assert_eq!(r.red, vec![10, 17, 33, 40]);
        assert_eq!(r.alpha, vec![32, 223, 223, 32]);
    }

    #[test]
    fn test_source_kept_by_default() {
        let buffer = FilterWeightsBuffer::new(FilterStrategy::Bilinear, 0.5);
        let mut app = FilterWeightsApplicator::new(Axis::Horizontal, 0.5, 0.0, 0.0, false);
        let mut dev = source(Axis::Horizontal);
        let dst = app.process_line(&mut dev, LinePos::new(0, 4), 0, &buffer, 1.0);
        assert_eq!(dst, LinePos::new(-1, 4));
        assert_eq!(dev.pixel(3, 0), &Rgba8::new_opaque(40, 0, 0).to_bytes());
    }

    #[test]
    fn test_consume_source_in_place() {
        let buffer = FilterWeightsBuffer::new(FilterStrategy::Bilinear, 0.5);
        let mut app = FilterWeightsApplicator::new(Axis::Horizontal, 0.5, 0.0, 0.0, false);
        app.set_consume_source(true);
        let mut dev = source(Axis::Horizontal);
        app.process_line(&mut dev, LinePos::new(0, 4), 0, &buffer, 1.0);

        assert_eq!(dev.pixel(3, 0), &[0, 0, 0, 0]);
        assert_eq!(dev.pixel(0, 0)[0], 17);
        assert_eq!(dev.exact_bounds(), RectI::from_xywh(-1, 0, 4, 1));
    }

    #[test]
    fn test_empty_range_has_no_side_effects() {
        let buffer = FilterWeightsBuffer::new(FilterStrategy::Bilinear, 1.0);
        for (clamp, dx) in [(true, 0.0), (false, 0.0), (true, 0.25), (false, 0.25)] {
            let mut app = FilterWeightsApplicator::new(Axis::Horizontal, 1.0, 0.0, dx, clamp);
            app.set_consume_source(true);
            let mut dev = PixelDevice::new(ColorModel::Rgba8);
            dev.fill(&RectI::from_xywh(0, 0, 4, 1), &[50, 60, 70, 255]);
            let before = dev.clone();
            let dst = app.process_line(&mut dev, LinePos::new(2, 0), 0, &buffer, 1.0);
            assert!(dst.is_empty(), "clamp={clamp} dx={dx}: {dst:?}");
            assert_eq!(dev, before, "clamp={clamp} dx={dx}");
        }
    }

    #[test]
    fn test_unstored_source_reads_default() {
        let buffer = FilterWeightsBuffer::new(FilterStrategy::Box, 1.0);
        let mut app = FilterWeightsApplicator::new(Axis::Horizontal, 1.0, 0.0, 0.0, true);
        let mut src = PixelDevice::new(ColorModel::Rgba8);
        src.set_default_pixel(&[1, 2, 3, 4]);
        let mut dst = PixelDevice::new(ColorModel::Rgba8);
        let range = app.process_line_to(&mut src, &mut dst, LinePos::new(0, 3), 7, &buffer, 0.5);
        assert_eq!(range, LinePos::new(0, 3));
        assert_eq!(dst.pixel(1, 7), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_sum_of_weights_preserves_flat_color() {
        for f in FilterStrategy::ALL {
            for scale in [0.3, 0.77, 1.0, 1.6, 3.0] {
                let buffer = FilterWeightsBuffer::new(f, scale);
                let mut app = FilterWeightsApplicator::new(Axis::Horizontal, scale, 0.0, 0.25, true);
                let mut src = PixelDevice::new(ColorModel::Rgba8);
                src.fill(&RectI::from_xywh(0, 0, 20, 1), &[90, 140, 200, 255]);
                let mut dst = PixelDevice::new(ColorModel::Rgba8);
                let range = app.process_line_to(
                    &mut src,
                    &mut dst,
                    LinePos::new(0, 20),
                    0,
                    &buffer,
                    buffer.support_in_dst(scale),
                );
                for x in range.start..range.end() {
                    assert_eq!(dst.pixel(x, 0), &[90, 140, 200, 255], "{} scale={scale} x={x}", f.id());
                }
            }
        }
    }
}
