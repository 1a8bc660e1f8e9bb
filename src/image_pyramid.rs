//! Multi-resolution cache of a displayable image.
//!
//! Level 0 holds the image converted to the monitor color model (and run
//! through the optional [`DisplayFilter`]); level `k` is level `k - 1`
//! averaged over 2x2 blocks. Updates are incremental: only the dirty
//! rectangle, widened to even bounds, is recomputed on each level.

use std::sync::{Arc, RwLock};

use crate::basics::{align_pow2_hi, iround, RectI};
use crate::color_model::ColorModel;
use crate::image_patch::ImagePatch;
use crate::paint_device::PixelDevice;

pub const DEFAULT_PYRAMID_HEIGHT: usize = 4;

// ============================================================================
// Collaborators
// ============================================================================

/// The authoritative image a pyramid caches.
pub trait ProjectionSource: Send + Sync {
    fn bounds(&self) -> RectI;
    fn color_model(&self) -> ColorModel;
    /// Packed rows of `rect` in [`color_model`](Self::color_model).
    fn read_pixels(&self, rect: &RectI, out: &mut [u8]);
}

impl ProjectionSource for PixelDevice {
    fn bounds(&self) -> RectI {
        PixelDevice::bounds(self)
    }

    fn color_model(&self) -> ColorModel {
        PixelDevice::color_model(self)
    }

    fn read_pixels(&self, rect: &RectI, out: &mut [u8]) {
        self.read_rect(rect, out);
    }
}

/// Shared image that other threads may keep painting on.
impl ProjectionSource for RwLock<PixelDevice> {
    fn bounds(&self) -> RectI {
        self.read().unwrap_or_else(|e| e.into_inner()).bounds()
    }

    fn color_model(&self) -> ColorModel {
        self.read().unwrap_or_else(|e| e.into_inner()).color_model()
    }

    fn read_pixels(&self, rect: &RectI, out: &mut [u8]) {
        self.read().unwrap_or_else(|e| e.into_inner()).read_rect(rect, out);
    }
}

/// Per-pixel transform applied to level 0 after color conversion, e.g. a
/// color-management LUT or an exposure adjustment.
pub trait DisplayFilter: Send + Sync {
    fn apply(&self, model: ColorModel, pixels: &mut [u8]);
}

/// What changed in one cache update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateInfo {
    pub dirty_image_rect: RectI,
    pub dirty_viewport_rect: RectI,
}

impl UpdateInfo {
    pub fn is_empty(&self) -> bool {
        self.dirty_image_rect.is_empty()
    }
}

impl Default for UpdateInfo {
    fn default() -> Self {
        Self {
            dirty_image_rect: RectI::EMPTY,
            dirty_viewport_rect: RectI::EMPTY,
        }
    }
}

// ============================================================================
// ImagePyramid
// ============================================================================

pub struct ImagePyramid {
    height: usize,
    levels: Vec<PixelDevice>,
    source: Option<Arc<dyn ProjectionSource>>,
    monitor_model: ColorModel,
    display_filter: Option<Arc<dyn DisplayFilter>>,
}

impl std::fmt::Debug for ImagePyramid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImagePyramid")
            .field("height", &self.height)
            .field("has_image", &self.source.is_some())
            .field("monitor_model", &self.monitor_model)
            .field("has_display_filter", &self.display_filter.is_some())
            .finish()
    }
}

impl Default for ImagePyramid {
    fn default() -> Self {
        Self::new(DEFAULT_PYRAMID_HEIGHT)
    }
}

impl ImagePyramid {
    /// A pyramid of `height` levels (at least one) with no image.
    pub fn new(height: usize) -> Self {
        Self {
            height: height.max(1),
            levels: Vec::new(),
            source: None,
            monitor_model: ColorModel::Rgba8,
            display_filter: None,
        }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn has_image(&self) -> bool {
        self.source.is_some()
    }

    /// Bounds of the source image, empty without one.
    pub fn image_bounds(&self) -> RectI {
        self.source
            .as_ref()
            .map_or(RectI::EMPTY, |s| s.bounds())
    }

    pub fn monitor_color_model(&self) -> ColorModel {
        self.monitor_model
    }

    pub fn level(&self, index: usize) -> Option<&PixelDevice> {
        self.levels.get(index)
    }

    pub fn set_image(&mut self, source: Arc<dyn ProjectionSource>) {
        self.source = Some(source);
        self.rebuild_pyramid();
    }

    pub fn set_monitor_color_model(&mut self, model: ColorModel) {
        self.monitor_model = model;
        self.rebuild_pyramid();
    }

    pub fn set_display_filter(&mut self, filter: Option<Arc<dyn DisplayFilter>>) {
        self.display_filter = filter;
        self.rebuild_pyramid();
    }

    pub fn image_size_changed(&mut self) {
        self.rebuild_pyramid();
    }

    /// Reallocate every level and refill it from the source.
    fn rebuild_pyramid(&mut self) {
        self.levels.clear();
        let Some(source) = self.source.clone() else {
            return;
        };

        let mut bounds = source.bounds().aligned_to_pow2(2);
        for _ in 0..self.height {
            self.levels
                .push(PixelDevice::with_bounds(self.monitor_model, bounds));
            bounds = half_rect(&bounds).aligned_to_pow2(2);
        }
        log::debug!(
            "pyramid rebuilt: {} levels, base {:?}, {:?}",
            self.height,
            source.bounds(),
            self.monitor_model
        );

        let info = self.update_cache(&source.bounds());
        self.recalculate_cache(&info);
    }

    /// Refresh level 0 inside `dirty_image_rect` from the source.
    pub fn update_cache(&mut self, dirty_image_rect: &RectI) -> UpdateInfo {
        let Some(source) = self.source.as_ref() else {
            return UpdateInfo::default();
        };
        let rect = dirty_image_rect.intersect(&source.bounds());
        if rect.is_empty() || self.levels.is_empty() {
            return UpdateInfo::default();
        }

        let src_model = source.color_model();
        let mut raw = vec![0u8; rect.area() * src_model.pixel_size()];
        source.read_pixels(&rect, &mut raw);

        let mut pixels = vec![0u8; rect.area() * self.monitor_model.pixel_size()];
        self.monitor_model.convert_from(src_model, &raw, &mut pixels);
        if let Some(filter) = &self.display_filter {
            filter.apply(self.monitor_model, &mut pixels);
        }
        self.levels[0].write_rect(&rect, &pixels);

        UpdateInfo {
            dirty_image_rect: rect,
            dirty_viewport_rect: RectI::EMPTY,
        }
    }

    /// Propagate `info.dirty_image_rect` from level 0 to the coarser levels.
    pub fn recalculate_cache(&mut self, info: &UpdateInfo) {
        let mut current = info.dirty_image_rect;
        for i in 1..self.levels.len() {
            if current.is_empty() {
                break;
            }
            let (finer, coarser) = self.levels.split_at_mut(i);
            current =
                downsample_by_factor2(&current.aligned_to_pow2(2), &finer[i - 1], &mut coarser[0]);
        }
    }

    /// The coarsest level that still has at least `scale` resolution, or
    /// one whose rounded size at `scale` is identical.
    pub fn find_first_good_plane_index(&self, scale: f64, size: (i32, i32)) -> usize {
        let mut nearest = 0;
        for i in 0..self.height {
            let plane_scale = plane_scale(i);
            if plane_scale < scale {
                let at_scale = (iround(size.0 as f64 * scale), iround(size.1 as f64 * scale));
                let at_plane = (
                    iround(size.0 as f64 * plane_scale),
                    iround(size.1 as f64 * plane_scale),
                );
                if at_scale == at_plane {
                    nearest = i;
                }
                break;
            }
            nearest = i;
        }
        nearest
    }

    /// Pixels covering `requested` plus a border, taken from the level that
    /// best matches the display scale. Invalid without an image or when
    /// `requested` misses the image entirely.
    pub fn get_nearest_patch(
        &self,
        scale_x: f64,
        scale_y: f64,
        requested: &RectI,
        border_width: i32,
    ) -> ImagePatch {
        if self.levels.is_empty() || !requested.overlaps(&self.image_bounds()) {
            return ImagePatch::invalid();
        }

        let index = self.find_first_good_plane_index(
            scale_x.max(scale_y),
            (requested.width(), requested.height()),
        );
        let alignment = 1 << index;
        let border = align_pow2_hi(border_width.max(0), alignment);
        let patch_rect = requested
            .adjusted(-border, -border, border, border)
            .aligned_to_pow2(alignment);
        let level_rect = RectI::new(
            patch_rect.x1 >> index,
            patch_rect.y1 >> index,
            ((patch_rect.x2 + 1) >> index) - 1,
            ((patch_rect.y2 + 1) >> index) - 1,
        );

        let level = &self.levels[index];
        let mut pixels = vec![0u8; level_rect.area() * level.pixel_size()];
        level.read_rect(&level_rect, &mut pixels);

        ImagePatch::new(
            *requested,
            patch_rect,
            level_rect,
            index,
            plane_scale(index),
            border,
            level.color_model(),
            pixels,
        )
    }
}

#[inline]
fn plane_scale(index: usize) -> f64 {
    1.0 / (1u32 << index) as f64
}

/// `r` halved, rounding the far edge up.
fn half_rect(r: &RectI) -> RectI {
    if r.is_empty() {
        return *r;
    }
    RectI::new(
        r.x1.div_euclid(2),
        r.y1.div_euclid(2),
        (r.x2 + 1 + 1).div_euclid(2) - 1,
        (r.y2 + 1 + 1).div_euclid(2) - 1,
    )
}

/// Box-filter `src_rect` of `src` into half resolution in `dst`.
///
/// An odd origin or size is aligned down to even first, so exactly
/// `floor(w / 2) x floor(h / 2)` pixels are written. Returns the written
/// destination rectangle.
pub fn downsample_by_factor2(src_rect: &RectI, src: &PixelDevice, dst: &mut PixelDevice) -> RectI {
    if src_rect.is_empty() {
        return RectI::EMPTY;
    }
    let x = src_rect.x1 - (src_rect.x1 & 1);
    let y = src_rect.y1 - (src_rect.y1 & 1);
    let w = src_rect.width() - (src_rect.width() & 1);
    let h = src_rect.height() - (src_rect.height() & 1);
    if w < 2 || h < 2 {
        return RectI::EMPTY;
    }

    let model = src.color_model();
    debug_assert_eq!(model, dst.color_model());
    let ps = model.pixel_size();
    let aligned = RectI::from_xywh(x, y, w, h);
    let mut block = vec![0u8; aligned.area() * ps];
    src.read_rect(&aligned, &mut block);

    let (dw, dh) = ((w / 2) as usize, (h / 2) as usize);
    let row = w as usize * ps;
    let mut out = vec![0u8; dw * dh * ps];
    for j in 0..dh {
        let r0 = &block[2 * j * row..(2 * j + 1) * row];
        let r1 = &block[(2 * j + 1) * row..(2 * j + 2) * row];
        for i in 0..dw {
            let a = 2 * i * ps;
            let b = a + ps;
            let o = (j * dw + i) * ps;
            model.average_2x2(
                &r0[a..a + ps],
                &r0[b..b + ps],
                &r1[a..a + ps],
                &r1[b..b + ps],
                &mut out[o..o + ps],
            );
        }
    }

    let dst_rect = RectI::from_xywh(x / 2, y / 2, dw as i32, dh as i32);
    dst.write_rect(&dst_rect, &out);
    dst_rect
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: [u8; 4] = [255, 255, 255, 255];

    fn source(w: i32, h: i32, px: &[u8]) -> Arc<RwLock<PixelDevice>> {
        let mut dev = PixelDevice::new(ColorModel::Rgba8);
        dev.fill(&RectI::from_xywh(0, 0, w, h), px);
        Arc::new(RwLock::new(dev))
    }

    #[test]
    fn test_downsample_aligns_odd_rect_down() {
        let mut src = PixelDevice::new(ColorModel::Rgba8);
        for y in 0..8 {
            for x in 0..8 {
                src.fill(&RectI::from_xywh(x, y, 1, 1), &[(x * 10 + y) as u8, 0, 0, 255]);
            }
        }
        let mut dst = PixelDevice::with_bounds(ColorModel::Rgba8, RectI::from_xywh(0, 0, 4, 4));

        let written = downsample_by_factor2(&RectI::from_xywh(1, 1, 5, 5), &src, &mut dst);
        assert_eq!(written, RectI::from_xywh(0, 0, 2, 2));
        // (0,0) (1,0) (0,1) (1,1): 0 + 10 + 1 + 11 = 22
        assert_eq!(dst.pixel(0, 0), &[5, 0, 0, 255]);
        // (2,2) (3,2) (2,3) (3,3): 22 + 32 + 23 + 33 = 110
        assert_eq!(dst.pixel(1, 1), &[27, 0, 0, 255]);
        assert_eq!(dst.pixel(2, 2), &[0, 0, 0, 0]);
        assert_eq!(dst.exact_bounds(), written);
    }

    #[test]
    fn test_downsample_negative_origin() {
        let mut src = PixelDevice::new(ColorModel::GrayA8);
        src.fill(&RectI::from_xywh(-4, -4, 4, 4), &[200, 255]);
        let mut dst = PixelDevice::new(ColorModel::GrayA8);
        let written = downsample_by_factor2(&RectI::from_xywh(-3, -3, 3, 3), &src, &mut dst);
        assert_eq!(written, RectI::from_xywh(-2, -2, 1, 1));
        assert_eq!(dst.pixel(-2, -2), &[200, 255]);
    }

    #[test]
    fn test_downsample_too_small_is_empty() {
        let src = PixelDevice::new(ColorModel::Rgba8);
        let mut dst = PixelDevice::new(ColorModel::Rgba8);
        assert!(downsample_by_factor2(&RectI::from_xywh(0, 0, 1, 7), &src, &mut dst).is_empty());
        assert!(dst.bounds().is_empty());
    }

    #[test]
    fn test_first_good_plane_index() {
        let pyramid = ImagePyramid::new(4);
        let size = (100, 100);
        assert_eq!(pyramid.find_first_good_plane_index(2.0, size), 0);
        assert_eq!(pyramid.find_first_good_plane_index(1.0, size), 0);
        assert_eq!(pyramid.find_first_good_plane_index(0.6, size), 0);
        assert_eq!(pyramid.find_first_good_plane_index(0.5, size), 1);
        assert_eq!(pyramid.find_first_good_plane_index(0.3, size), 1);
        assert_eq!(pyramid.find_first_good_plane_index(0.25, size), 2);
        assert_eq!(pyramid.find_first_good_plane_index(0.125, size), 3);
        assert_eq!(pyramid.find_first_good_plane_index(0.01, size), 3);
    }

    #[test]
    fn test_first_good_plane_index_equal_rounded_size() {
        let pyramid = ImagePyramid::new(4);
        // 3 * 0.4 and 3 * 0.25 both round to 1 pixel
        assert_eq!(pyramid.find_first_good_plane_index(0.4, (3, 3)), 2);
    }

    #[test]
    fn test_first_good_plane_index_is_monotonic() {
        let pyramid = ImagePyramid::new(DEFAULT_PYRAMID_HEIGHT);
        let mut last = 0;
        let mut scale = 1.0;
        while scale > 0.05 {
            let index = pyramid.find_first_good_plane_index(scale, (640, 480));
            assert!(index >= last, "scale {scale}");
            last = index;
            scale *= 0.9;
        }
        let exact: Vec<_> = [1.0, 0.5, 0.25, 0.125]
            .iter()
            .map(|s| pyramid.find_first_good_plane_index(*s, (640, 480)))
            .collect();
        assert_eq!(exact, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_no_image_is_noop() {
        let mut pyramid = ImagePyramid::default();
        let info = pyramid.update_cache(&RectI::from_xywh(0, 0, 10, 10));
        assert!(info.is_empty());
        pyramid.recalculate_cache(&info);
        assert!(!pyramid
            .get_nearest_patch(1.0, 1.0, &RectI::from_xywh(0, 0, 4, 4), 1)
            .is_valid());
        assert!(pyramid.level(0).is_none());
    }

    #[test]
    fn test_levels_are_padded_to_even() {
        let mut pyramid = ImagePyramid::new(3);
        pyramid.set_image(source(8, 6, &WHITE));
        assert_eq!(pyramid.level(0).map(|l| l.bounds()), Some(RectI::from_xywh(0, 0, 8, 6)));
        assert_eq!(pyramid.level(1).map(|l| l.bounds()), Some(RectI::from_xywh(0, 0, 4, 4)));
        assert_eq!(pyramid.level(2).map(|l| l.bounds()), Some(RectI::from_xywh(0, 0, 2, 2)));

        let l1 = pyramid.level(1).unwrap();
        assert_eq!(l1.pixel(3, 2), &WHITE);
        assert_eq!(l1.pixel(3, 3), &[0, 0, 0, 0]);
        // half of the block below level 1's last real row is padding
        let l2 = pyramid.level(2).unwrap();
        assert_eq!(l2.pixel(0, 0), &WHITE);
        assert_eq!(l2.pixel(1, 1), &[127, 127, 127, 127]);
    }

    #[test]
    fn test_incremental_update_reaches_coarse_levels() {
        let image = source(16, 16, &WHITE);
        let mut pyramid = ImagePyramid::new(3);
        pyramid.set_image(image.clone());

        let dirty = RectI::from_xywh(4, 4, 4, 4);
        image.write().unwrap().fill(&dirty, &[0, 0, 0, 255]);
        let info = pyramid.update_cache(&dirty);
        assert_eq!(info.dirty_image_rect, dirty);
        assert_eq!(pyramid.level(2).unwrap().pixel(1, 1), &WHITE);

        pyramid.recalculate_cache(&info);
        assert_eq!(pyramid.level(1).unwrap().pixel(2, 2), &[0, 0, 0, 255]);
        assert_eq!(pyramid.level(2).unwrap().pixel(1, 1), &[0, 0, 0, 255]);
        assert_eq!(pyramid.level(2).unwrap().pixel(0, 0), &WHITE);
    }

    #[test]
    fn test_dirty_rect_is_clipped_to_image() {
        let mut pyramid = ImagePyramid::new(2);
        pyramid.set_image(source(10, 10, &WHITE));
        let info = pyramid.update_cache(&RectI::from_xywh(8, -5, 10, 10));
        assert_eq!(info.dirty_image_rect, RectI::new(8, 0, 9, 4));
        assert!(pyramid.update_cache(&RectI::from_xywh(20, 20, 3, 3)).is_empty());
    }

    struct InvertRed;

    impl DisplayFilter for InvertRed {
        fn apply(&self, model: ColorModel, pixels: &mut [u8]) {
            for px in pixels.chunks_exact_mut(model.pixel_size()) {
                px[0] = 255 - px[0];
            }
        }
    }

    #[test]
    fn test_display_filter_and_monitor_model() {
        let mut pyramid = ImagePyramid::new(2);
        pyramid.set_image(source(4, 4, &[200, 10, 20, 255]));
        pyramid.set_display_filter(Some(Arc::new(InvertRed)));
        assert_eq!(pyramid.level(0).unwrap().pixel(1, 1), &[55, 10, 20, 255]);

        pyramid.set_display_filter(None);
        pyramid.set_monitor_color_model(ColorModel::GrayA8);
        let l0 = pyramid.level(0).unwrap();
        assert_eq!(l0.pixel_size(), 2);
        assert_eq!(l0.pixel(0, 0)[1], 255);
    }

    #[test]
    fn test_nearest_patch_alignment() {
        let mut pyramid = ImagePyramid::new(3);
        pyramid.set_image(source(16, 16, &WHITE));

        let patch = pyramid.get_nearest_patch(0.5, 0.5, &RectI::from_xywh(3, 3, 5, 5), 1);
        assert!(patch.is_valid());
        assert_eq!(patch.level_index(), 1);
        assert_eq!(patch.scale_x(), 0.5);
        assert_eq!(patch.border_width(), 2);
        assert_eq!(patch.image_rect(), RectI::new(0, 0, 9, 9));
        assert_eq!(patch.level_rect(), RectI::new(0, 0, 4, 4));
        assert_eq!(patch.pixels().len(), 25 * 4);
        assert_eq!(patch.interest_rect(), RectI::from_xywh(3, 3, 5, 5));
    }

    #[test]
    fn test_nearest_patch_outside_image() {
        let mut pyramid = ImagePyramid::new(3);
        pyramid.set_image(source(16, 16, &WHITE));
        let patch = pyramid.get_nearest_patch(1.0, 1.0, &RectI::from_xywh(40, 40, 5, 5), 2);
        assert!(!patch.is_valid());
    }
}
