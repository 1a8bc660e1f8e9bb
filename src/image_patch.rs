//! A rectangle of pyramid pixels ready to be painted into a viewport.

use crate::basics::RectI;
use crate::color_model::ColorModel;
use crate::filter_strategy::FilterStrategy;
use crate::paint_device::PixelDevice;
use crate::prescaled_projection::ViewConverter;
use crate::transform_worker::TransformWorker;

const SCALE_EPSILON: f64 = 1e-9;

/// Pixels copied out of one pyramid level.
///
/// `image_rect` is in image coordinates, grown by the border and aligned to
/// the level's pixel grid; `level_rect` is the same area in level pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePatch {
    interest_rect: RectI,
    image_rect: RectI,
    level_rect: RectI,
    level: usize,
    scale: f64,
    border_width: i32,
    model: ColorModel,
    pixels: Vec<u8>,
}

impl ImagePatch {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        interest_rect: RectI,
        image_rect: RectI,
        level_rect: RectI,
        level: usize,
        scale: f64,
        border_width: i32,
        model: ColorModel,
        pixels: Vec<u8>,
    ) -> Self {
        debug_assert_eq!(pixels.len(), level_rect.area() * model.pixel_size());
        Self {
            interest_rect,
            image_rect,
            level_rect,
            level,
            scale,
            border_width,
            model,
            pixels,
        }
    }

    /// A patch with no pixels.
    pub fn invalid() -> Self {
        Self {
            interest_rect: RectI::EMPTY,
            image_rect: RectI::EMPTY,
            level_rect: RectI::EMPTY,
            level: 0,
            scale: 1.0,
            border_width: 0,
            model: ColorModel::default(),
            pixels: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.level_rect.is_empty()
    }

    /// Packed rows of `level_rect`.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn image_rect(&self) -> RectI {
        self.image_rect
    }

    /// The requested area, without border.
    pub fn interest_rect(&self) -> RectI {
        self.interest_rect
    }

    pub fn level_rect(&self) -> RectI {
        self.level_rect
    }

    pub fn level_index(&self) -> usize {
        self.level
    }

    pub fn scale_x(&self) -> f64 {
        self.scale
    }

    pub fn scale_y(&self) -> f64 {
        self.scale
    }

    pub fn border_width(&self) -> i32 {
        self.border_width
    }

    pub fn color_model(&self) -> ColorModel {
        self.model
    }

    /// The pixels as a device in level coordinates.
    pub fn to_device(&self) -> PixelDevice {
        let mut dev = PixelDevice::new(self.model);
        dev.write_rect(&self.level_rect, &self.pixels);
        dev
    }

    /// Paint the interest area into `target`, which is in viewport
    /// coordinates as defined by `view`. Returns the written rectangle.
    ///
    /// When the patch already has the view's resolution and the view offset
    /// is whole, pixels are copied unchanged; otherwise they are resampled
    /// with `filter`.
    pub fn draw_into(
        &self,
        target: &mut PixelDevice,
        view: &ViewConverter,
        filter: FilterStrategy,
    ) -> RectI {
        if !self.is_valid() {
            return RectI::EMPTY;
        }
        let dst_rect = view
            .image_to_viewport(&self.interest_rect.to_f64())
            .to_aligned()
            .intersect(&target.bounds());
        if dst_rect.is_empty() {
            return RectI::EMPTY;
        }

        let sx = view.zoom_x() / self.scale;
        let sy = view.zoom_y() / self.scale;
        let (ox, oy) = view.offset();

        let mut out = self.to_device();
        let direct = (sx - 1.0).abs() < SCALE_EPSILON
            && (sy - 1.0).abs() < SCALE_EPSILON
            && ox.fract() == 0.0
            && oy.fract() == 0.0;
        if direct {
            let mut shifted = PixelDevice::new(self.model);
            shifted.write_rect(
                &self.level_rect.translate(-(ox as i32), -(oy as i32)),
                &self.pixels,
            );
            out = shifted;
        } else {
            let mut worker = TransformWorker::new(filter);
            worker.set_scale(sx, sy);
            worker.set_translation(-ox, -oy);
            worker.run(&mut out);
        }
        log::trace!(
            "patch level {} drawn into {dst_rect:?} ({})",
            self.level,
            if direct { "copy" } else { "resampled" }
        );

        target.copy_rect_from(&out, &dst_rect);
        dst_rect
    }
}
