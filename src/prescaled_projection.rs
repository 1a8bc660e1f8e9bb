//! Viewport-sized, already-zoomed copy of the image.
//!
//! [`PrescaledProjection`] keeps one buffer the size of the viewport that a
//! widget can blit without further scaling. Repaints pull the closest
//! pyramid level through [`ImagePyramid::get_nearest_patch`] and resample
//! only what changed: the dirty rectangle after an edit, the exposed strips
//! after a scroll, or everything after a zoom.

use std::sync::Arc;

use crate::basics::{iceil, RectD, RectI};
use crate::color_model::ColorModel;
use crate::filter_strategy::FilterStrategy;
use crate::image_pyramid::{DisplayFilter, ImagePyramid, ProjectionSource, UpdateInfo};
use crate::paint_device::PixelDevice;

// ============================================================================
// ViewConverter
// ============================================================================

/// Maps image coordinates to viewport coordinates:
/// `viewport = image * zoom - offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewConverter {
    zoom_x: f64,
    zoom_y: f64,
    offset_x: f64,
    offset_y: f64,
}

impl Default for ViewConverter {
    fn default() -> Self {
        Self::new(1.0, 1.0, 0.0, 0.0)
    }
}

impl ViewConverter {
    pub fn new(zoom_x: f64, zoom_y: f64, offset_x: f64, offset_y: f64) -> Self {
        let mut view = Self {
            zoom_x: 1.0,
            zoom_y: 1.0,
            offset_x,
            offset_y,
        };
        view.set_zoom(zoom_x, zoom_y);
        view
    }

    pub fn zoom_x(&self) -> f64 {
        self.zoom_x
    }

    pub fn zoom_y(&self) -> f64 {
        self.zoom_y
    }

    pub fn offset(&self) -> (f64, f64) {
        (self.offset_x, self.offset_y)
    }

    /// Zoom factors must be finite and positive; anything else is ignored.
    pub fn set_zoom(&mut self, x: f64, y: f64) {
        if !(x.is_finite() && y.is_finite() && x > 0.0 && y > 0.0) {
            log::warn!("ignoring invalid zoom ({x}, {y})");
            return;
        }
        self.zoom_x = x;
        self.zoom_y = y;
    }

    pub fn set_offset(&mut self, x: f64, y: f64) {
        self.offset_x = x;
        self.offset_y = y;
    }

    pub fn image_to_viewport_point(&self, x: f64, y: f64) -> (f64, f64) {
        (x * self.zoom_x - self.offset_x, y * self.zoom_y - self.offset_y)
    }

    pub fn viewport_to_image_point(&self, x: f64, y: f64) -> (f64, f64) {
        ((x + self.offset_x) / self.zoom_x, (y + self.offset_y) / self.zoom_y)
    }

    pub fn image_to_viewport(&self, r: &RectD) -> RectD {
        r.scaled(self.zoom_x, self.zoom_y)
            .translated(-self.offset_x, -self.offset_y)
    }

    pub fn viewport_to_image(&self, r: &RectD) -> RectD {
        r.translated(self.offset_x, self.offset_y)
            .scaled(1.0 / self.zoom_x, 1.0 / self.zoom_y)
    }
}

// ============================================================================
// PrescaledProjection
// ============================================================================

#[derive(Debug)]
pub struct PrescaledProjection {
    pyramid: ImagePyramid,
    view: ViewConverter,
    viewport_size: (i32, i32),
    prescaled: PixelDevice,
    filter: FilterStrategy,
}

impl Default for PrescaledProjection {
    fn default() -> Self {
        Self::new()
    }
}

impl PrescaledProjection {
    /// No image, unit zoom and an empty viewport.
    pub fn new() -> Self {
        Self::with_pyramid(ImagePyramid::default())
    }

    pub fn with_pyramid(pyramid: ImagePyramid) -> Self {
        let model = pyramid.monitor_color_model();
        Self {
            pyramid,
            view: ViewConverter::default(),
            viewport_size: (0, 0),
            prescaled: PixelDevice::new(model),
            filter: FilterStrategy::default(),
        }
    }

    pub fn pyramid(&self) -> &ImagePyramid {
        &self.pyramid
    }

    pub fn view(&self) -> &ViewConverter {
        &self.view
    }

    pub fn filter(&self) -> FilterStrategy {
        self.filter
    }

    pub fn viewport_size(&self) -> (i32, i32) {
        self.viewport_size
    }

    /// The zoomed pixels, in viewport coordinates.
    pub fn prescaled_image(&self) -> &PixelDevice {
        &self.prescaled
    }

    fn viewport_rect(&self) -> RectI {
        RectI::from_xywh(0, 0, self.viewport_size.0, self.viewport_size.1)
    }

    pub fn set_image(&mut self, source: Arc<dyn ProjectionSource>) {
        self.pyramid.set_image(source);
        self.pre_scale();
    }

    pub fn set_monitor_color_model(&mut self, model: ColorModel) {
        self.pyramid.set_monitor_color_model(model);
        self.prescaled = PixelDevice::with_bounds(model, self.viewport_rect());
        self.pre_scale();
    }

    pub fn set_display_filter(&mut self, filter: Option<Arc<dyn DisplayFilter>>) {
        self.pyramid.set_display_filter(filter);
        self.pre_scale();
    }

    pub fn set_filter(&mut self, filter: FilterStrategy) {
        self.filter = filter;
        self.pre_scale();
    }

    pub fn image_size_changed(&mut self) {
        self.pyramid.image_size_changed();
        self.pre_scale();
    }

    /// Replace the view without repainting. Follow up with
    /// [`notify_zoom_changed`](Self::notify_zoom_changed) or
    /// [`viewport_moved`](Self::viewport_moved).
    pub fn set_view(&mut self, view: ViewConverter) {
        self.view = view;
    }

    pub fn set_viewport_size(&mut self, width: i32, height: i32) {
        self.viewport_size = (width.max(0), height.max(0));
        self.prescaled =
            PixelDevice::with_bounds(self.pyramid.monitor_color_model(), self.viewport_rect());
        self.pre_scale();
    }

    pub fn notify_zoom_changed(&mut self) {
        self.pre_scale();
    }

    /// Repaint the whole viewport.
    pub fn pre_scale(&mut self) {
        let rect = self.viewport_rect();
        self.update_scaled_image(&rect);
    }

    /// Refresh level 0 for an edit inside `dirty_image_rect`. The returned
    /// viewport rect covers every prescaled pixel the edit can reach.
    pub fn update_cache(&mut self, dirty_image_rect: &RectI) -> UpdateInfo {
        let mut info = self.pyramid.update_cache(dirty_image_rect);
        if info.is_empty() {
            return info;
        }
        let border = self.border_size();
        info.dirty_viewport_rect = self
            .view
            .image_to_viewport(
                &info
                    .dirty_image_rect
                    .adjusted(-border, -border, border, border)
                    .to_f64(),
            )
            .to_aligned()
            .intersect(&self.viewport_rect());
        info
    }

    /// Finish an update started with [`update_cache`](Self::update_cache).
    pub fn recalculate_cache(&mut self, info: &UpdateInfo) {
        if info.is_empty() {
            return;
        }
        self.pyramid.recalculate_cache(info);
        self.update_scaled_image(&info.dirty_viewport_rect);
    }

    /// The view scrolled by `(dx, dy)` viewport pixels; `set_view` has
    /// already been given the new offset. Whole-pixel moves keep the
    /// overlapping pixels and repaint only what scrolled into view.
    pub fn viewport_moved(&mut self, dx: f64, dy: f64) {
        if !self.pyramid.has_image() || self.prescaled.bounds().is_empty() {
            return;
        }
        if dx == 0.0 && dy == 0.0 {
            return;
        }
        if dx.fract() != 0.0 || dy.fract() != 0.0 {
            log::debug!("fractional scroll ({dx}, {dy}), repainting the whole viewport");
            self.pre_scale();
            return;
        }

        let (ox, oy) = (dx as i32, dy as i32);
        let viewport = self.viewport_rect();
        let kept_old = viewport.translate(ox, oy).intersect(&viewport);
        let kept_new = kept_old.translate(-ox, -oy);

        let mut moved = PixelDevice::with_bounds(self.prescaled.color_model(), viewport);
        if !kept_old.is_empty() {
            let mut buf = vec![0u8; kept_old.area() * self.prescaled.pixel_size()];
            self.prescaled.read_rect(&kept_old, &mut buf);
            moved.write_rect(&kept_new, &buf);
        }
        self.prescaled = moved;

        for rect in subtract_rect(&viewport, &kept_new) {
            self.update_scaled_image(&rect);
        }
    }

    /// Image pixels needed around a patch for the filter to see its full
    /// support at the current zoom.
    fn border_size(&self) -> i32 {
        let zoom = self.view.zoom_x().min(self.view.zoom_y()).min(1.0);
        iceil(2.0 * self.filter.radius() / zoom)
    }

    fn update_scaled_image(&mut self, viewport_rect: &RectI) {
        let rect = viewport_rect.intersect(&self.viewport_rect());
        if rect.is_empty() {
            return;
        }
        self.prescaled.clear_rect(&rect);
        if !self.pyramid.has_image() {
            return;
        }

        let image_rect = self
            .view
            .viewport_to_image(&rect.to_f64())
            .to_aligned()
            .intersect(&self.pyramid.image_bounds());
        if image_rect.is_empty() {
            return;
        }

        let patch = self.pyramid.get_nearest_patch(
            self.view.zoom_x(),
            self.view.zoom_y(),
            &image_rect,
            self.border_size(),
        );
        patch.draw_into(&mut self.prescaled, &self.view, self.filter);
    }
}

/// `a` minus `b` as up to four disjoint bands.
fn subtract_rect(a: &RectI, b: &RectI) -> Vec<RectI> {
    let c = a.intersect(b);
    if c.is_empty() {
        return vec![*a];
    }
    [
        RectI::new(a.x1, a.y1, a.x2, c.y1 - 1),
        RectI::new(a.x1, c.y2 + 1, a.x2, a.y2),
        RectI::new(a.x1, c.y1, c.x1 - 1, c.y2),
        RectI::new(c.x2 + 1, c.y1, a.x2, c.y2),
    ]
    .into_iter()
    .filter(|r| !r.is_empty())
    .collect()
}
