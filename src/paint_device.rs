//! Pixel storage and scanline access.
//!
//! [`PixelDevice`] is a dense rectangle of pixels in one [`ColorModel`],
//! positioned anywhere on an unbounded integer plane. Reads outside the
//! stored rectangle return the device's default pixel. Bulk writes
//! ([`fill`](PixelDevice::fill), [`write_rect`](PixelDevice::write_rect))
//! grow the storage; single-pixel writes outside it are dropped.
//!
//! [`LineCursor`] walks one row or one column ([`Axis`]) and reports how many
//! pixels from the current position can be handled as one contiguous run,
//! so horizontal and vertical resampling share a single code path.

use crate::basics::RectI;
use crate::color_model::{convert_pixel, ColorModel};

// ============================================================================
// Axis
// ============================================================================

/// Scanline direction. `pos` runs along the axis, `line` across it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    /// Device coordinates of `pos` on scanline `line`.
    #[inline]
    pub fn xy(self, pos: i32, line: i32) -> (i32, i32) {
        match self {
            Axis::Horizontal => (pos, line),
            Axis::Vertical => (line, pos),
        }
    }

    /// Rectangle covering `[start, start + size)` on scanline `line`.
    pub fn line_rect(self, start: i32, size: i32, line: i32) -> RectI {
        match self {
            Axis::Horizontal => RectI::from_xywh(start, line, size, 1),
            Axis::Vertical => RectI::from_xywh(line, start, 1, size),
        }
    }

    /// Inclusive `(lo, hi)` of `r` along the axis.
    pub fn extent(self, r: &RectI) -> (i32, i32) {
        match self {
            Axis::Horizontal => (r.x1, r.x2),
            Axis::Vertical => (r.y1, r.y2),
        }
    }

    /// Inclusive `(lo, hi)` of `r` across the axis: the scanline indices.
    pub fn lines(self, r: &RectI) -> (i32, i32) {
        self.other().extent(r)
    }

    pub fn other(self) -> Axis {
        match self {
            Axis::Horizontal => Axis::Vertical,
            Axis::Vertical => Axis::Horizontal,
        }
    }
}

// ============================================================================
// PixelDevice
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct PixelDevice {
    model: ColorModel,
    bounds: RectI,
    default_pixel: Vec<u8>,
    data: Vec<u8>,
}

impl PixelDevice {
    /// An empty device whose default pixel is transparent.
    pub fn new(model: ColorModel) -> Self {
        Self {
            model,
            bounds: RectI::EMPTY,
            default_pixel: model.transparent_pixel(),
            data: Vec::new(),
        }
    }

    /// A device with `bounds` allocated and filled with the default pixel.
    pub fn with_bounds(model: ColorModel, bounds: RectI) -> Self {
        let mut dev = Self::new(model);
        dev.ensure_contains(&bounds);
        dev
    }

    pub fn color_model(&self) -> ColorModel {
        self.model
    }

    pub fn pixel_size(&self) -> usize {
        self.model.pixel_size()
    }

    /// Stored rectangle. Pixels outside read as the default pixel.
    pub fn bounds(&self) -> RectI {
        self.bounds
    }

    pub fn default_pixel(&self) -> &[u8] {
        &self.default_pixel
    }

    /// Changes the fill value of unstored pixels. Stored pixels keep their
    /// bytes.
    pub fn set_default_pixel(&mut self, px: &[u8]) {
        debug_assert_eq!(px.len(), self.pixel_size());
        self.default_pixel.copy_from_slice(px);
    }

    /// Raw rows of the stored rectangle.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    fn stride(&self) -> usize {
        self.bounds.width() as usize * self.pixel_size()
    }

    #[inline]
    fn offset(&self, x: i32, y: i32) -> Option<usize> {
        if !self.bounds.contains(x, y) {
            return None;
        }
        let col = (x - self.bounds.x1) as usize;
        let row = (y - self.bounds.y1) as usize;
        Some(row * self.stride() + col * self.pixel_size())
    }

    pub fn pixel(&self, x: i32, y: i32) -> &[u8] {
        match self.offset(x, y) {
            Some(o) => &self.data[o..o + self.pixel_size()],
            None => &self.default_pixel,
        }
    }

    /// Returns `false` (and drops the write) outside the stored rectangle.
    pub fn set_pixel(&mut self, x: i32, y: i32, px: &[u8]) -> bool {
        match self.offset(x, y) {
            Some(o) => {
                let ps = self.pixel_size();
                self.data[o..o + ps].copy_from_slice(&px[..ps]);
                true
            }
            None => {
                log::warn!("dropping write at ({x}, {y}) outside {:?}", self.bounds);
                false
            }
        }
    }

    /// Grow the stored rectangle to cover `rect`, keeping existing pixels.
    pub fn ensure_contains(&mut self, rect: &RectI) {
        if rect.is_empty() {
            return;
        }
        let target = self.bounds.unite(rect);
        if target == self.bounds {
            return;
        }

        let ps = self.pixel_size();
        let new_stride = target.width() as usize * ps;
        let mut data = Vec::with_capacity(new_stride * target.height() as usize);
        for _ in 0..target.area() {
            data.extend_from_slice(&self.default_pixel);
        }

        if !self.bounds.is_empty() {
            let old_stride = self.stride();
            let dx = (self.bounds.x1 - target.x1) as usize * ps;
            for row in 0..self.bounds.height() as usize {
                let dy = (self.bounds.y1 - target.y1) as usize + row;
                let src = &self.data[row * old_stride..(row + 1) * old_stride];
                let start = dy * new_stride + dx;
                data[start..start + old_stride].copy_from_slice(src);
            }
        }

        self.bounds = target;
        self.data = data;
    }

    /// Drop all stored pixels.
    pub fn clear(&mut self) {
        self.bounds = RectI::EMPTY;
        self.data.clear();
    }

    /// Reset the stored pixels inside `rect` to the default pixel.
    pub fn clear_rect(&mut self, rect: &RectI) {
        let r = rect.intersect(&self.bounds);
        if r.is_empty() {
            return;
        }
        let px = self.default_pixel.clone();
        for y in r.y1..=r.y2 {
            for x in r.x1..=r.x2 {
                self.set_pixel(x, y, &px);
            }
        }
    }

    /// Fill `rect` with `px`, growing the storage as needed.
    pub fn fill(&mut self, rect: &RectI, px: &[u8]) {
        if rect.is_empty() {
            return;
        }
        self.ensure_contains(rect);
        let ps = self.pixel_size();
        for y in rect.y1..=rect.y2 {
            if let Some(o) = self.offset(rect.x1, y) {
                let row = &mut self.data[o..o + rect.width() as usize * ps];
                for dst in row.chunks_exact_mut(ps) {
                    dst.copy_from_slice(&px[..ps]);
                }
            }
        }
    }

    /// Bounding box of the pixels that differ from the default pixel.
    pub fn exact_bounds(&self) -> RectI {
        let mut r = RectI::EMPTY;
        if self.bounds.is_empty() {
            return r;
        }
        let ps = self.pixel_size();
        for (row, bytes) in self.data.chunks_exact(self.stride()).enumerate() {
            let y = self.bounds.y1 + row as i32;
            let mut first = None;
            let mut last = 0;
            for (col, px) in bytes.chunks_exact(ps).enumerate() {
                if px != self.default_pixel.as_slice() {
                    first.get_or_insert(col);
                    last = col;
                }
            }
            if let Some(first) = first {
                let x1 = self.bounds.x1 + first as i32;
                let x2 = self.bounds.x1 + last as i32;
                r = r.unite(&RectI::new(x1, y, x2, y));
            }
        }
        r
    }

    /// Copy `rect` into `out` as packed rows. Unstored pixels read as the
    /// default pixel.
    pub fn read_rect(&self, rect: &RectI, out: &mut [u8]) {
        if rect.is_empty() {
            return;
        }
        let ps = self.pixel_size();
        let row_len = rect.width() as usize * ps;
        debug_assert!(out.len() >= row_len * rect.height() as usize);

        let inside = rect.intersect(&self.bounds);
        for (i, y) in (rect.y1..=rect.y2).enumerate() {
            let dst = &mut out[i * row_len..(i + 1) * row_len];
            for px in dst.chunks_exact_mut(ps) {
                px.copy_from_slice(&self.default_pixel);
            }
            if inside.is_empty() || y < inside.y1 || y > inside.y2 {
                continue;
            }
            if let Some(o) = self.offset(inside.x1, y) {
                let n = inside.width() as usize * ps;
                let at = (inside.x1 - rect.x1) as usize * ps;
                dst[at..at + n].copy_from_slice(&self.data[o..o + n]);
            }
        }
    }

    /// Write packed rows covering `rect`, growing the storage as needed.
    pub fn write_rect(&mut self, rect: &RectI, data: &[u8]) {
        if rect.is_empty() {
            return;
        }
        self.ensure_contains(rect);
        let row_len = rect.width() as usize * self.pixel_size();
        debug_assert!(data.len() >= row_len * rect.height() as usize);
        for (i, y) in (rect.y1..=rect.y2).enumerate() {
            if let Some(o) = self.offset(rect.x1, y) {
                self.data[o..o + row_len].copy_from_slice(&data[i * row_len..(i + 1) * row_len]);
            }
        }
    }

    /// Copy `rect` from `other`, converting between color models if they
    /// differ.
    pub fn copy_rect_from(&mut self, other: &PixelDevice, rect: &RectI) {
        if rect.is_empty() {
            return;
        }
        let mut buf = vec![0u8; rect.area() * other.pixel_size()];
        other.read_rect(rect, &mut buf);
        if other.color_model() != self.model {
            let mut converted = vec![0u8; rect.area() * self.pixel_size()];
            self.model
                .convert_from(other.color_model(), &buf, &mut converted);
            buf = converted;
        }
        self.write_rect(rect, &buf);
    }

    /// Convert every stored pixel (and the default pixel) to `model`.
    pub fn convert_to(&mut self, model: ColorModel) {
        if model == self.model {
            return;
        }
        let mut data = vec![0u8; self.bounds.area() * model.pixel_size()];
        model.convert_from(self.model, &self.data, &mut data);
        let mut default_pixel = model.transparent_pixel();
        convert_pixel(self.model, &self.default_pixel, model, &mut default_pixel);
        self.model = model;
        self.data = data;
        self.default_pixel = default_pixel;
    }

    /// Cursor at `pos` on scanline `line` along `axis`.
    pub fn line_cursor(&mut self, axis: Axis, pos: i32, line: i32) -> LineCursor<'_> {
        LineCursor {
            device: self,
            axis,
            line,
            pos,
        }
    }
}

// ============================================================================
// LineCursor
// ============================================================================

/// Sequential access along one scanline of a [`PixelDevice`].
pub struct LineCursor<'a> {
    device: &'a mut PixelDevice,
    axis: Axis,
    line: i32,
    pos: i32,
}

impl<'a> LineCursor<'a> {
    pub fn pos(&self) -> i32 {
        self.pos
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    #[inline]
    fn xy(&self) -> (i32, i32) {
        self.axis.xy(self.pos, self.line)
    }

    /// `true` when the current pixel lies in the stored rectangle.
    pub fn is_stored(&self) -> bool {
        let (x, y) = self.xy();
        self.device.bounds.contains(x, y)
    }

    /// Pixels from here that share the current storage state: a run that
    /// can be copied as one byte slice when stored, or the length of the
    /// unstored run otherwise (`usize::MAX` when it never ends).
    pub fn remaining_contiguous(&self) -> usize {
        let bounds = self.device.bounds;
        let (lo, hi) = self.axis.extent(&bounds);
        let (line_lo, line_hi) = self.axis.lines(&bounds);
        if bounds.is_empty() || self.line < line_lo || self.line > line_hi || self.pos > hi {
            return usize::MAX;
        }
        if self.pos < lo {
            return (lo - self.pos) as usize;
        }
        match self.axis {
            Axis::Horizontal => (hi - self.pos + 1) as usize,
            Axis::Vertical => 1,
        }
    }

    /// Bytes of the next `n` stored pixels. `n` must not exceed
    /// [`remaining_contiguous`](Self::remaining_contiguous).
    pub fn contiguous(&self, n: usize) -> &[u8] {
        debug_assert!(self.is_stored() && n <= self.remaining_contiguous());
        let (x, y) = self.xy();
        let ps = self.device.pixel_size();
        match self.device.offset(x, y) {
            Some(o) => &self.device.data[o..o + n * ps],
            None => &[],
        }
    }

    pub fn contiguous_mut(&mut self, n: usize) -> &mut [u8] {
        debug_assert!(self.is_stored() && n <= self.remaining_contiguous());
        let (x, y) = self.xy();
        let ps = self.device.pixel_size();
        match self.device.offset(x, y) {
            Some(o) => &mut self.device.data[o..o + n * ps],
            None => &mut [],
        }
    }

    /// Current pixel, or the default pixel when unstored.
    pub fn raw(&self) -> &[u8] {
        let (x, y) = self.xy();
        self.device.pixel(x, y)
    }

    /// Write the current pixel. Dropped outside the stored rectangle.
    pub fn write(&mut self, px: &[u8]) -> bool {
        let (x, y) = self.xy();
        self.device.set_pixel(x, y, px)
    }

    pub fn advance(&mut self, n: usize) {
        self.pos += n as i32;
    }

    pub fn next_pixel(&mut self) {
        self.pos += 1;
    }
}

// ============================================================================
// Tests
// ============================================================================
