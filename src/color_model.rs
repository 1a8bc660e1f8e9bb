//! Pixel encodings and the color-mixing primitives the resampler and the
//! pyramid are built on.
//!
//! Pixels travel as raw byte slices; a [`ColorModel`] knows how many bytes
//! one pixel takes and how to blend several of them:
//! - `Rgba8`: u8 channels, straight alpha
//! - `GrayA8`: u8 gray + alpha
//! - `RgbaF32`: native-endian f32 channels in 0..1, straight alpha

use crate::basics::iround;
use crate::filter_strategy::FILTER_WEIGHT_FULL;

// ============================================================================
// ColorModel
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorModel {
    #[default]
    Rgba8,
    GrayA8,
    RgbaF32,
}

impl ColorModel {
    /// Bytes per pixel.
    pub fn pixel_size(&self) -> usize {
        match self {
            ColorModel::Rgba8 => 4,
            ColorModel::GrayA8 => 2,
            ColorModel::RgbaF32 => 16,
        }
    }

    /// Channels per pixel, alpha included.
    pub fn channel_count(&self) -> usize {
        match self {
            ColorModel::Rgba8 | ColorModel::RgbaF32 => 4,
            ColorModel::GrayA8 => 2,
        }
    }

    /// All-zero pixel: transparent black in every model.
    pub fn transparent_pixel(&self) -> Vec<u8> {
        vec![0; self.pixel_size()]
    }

    /// Weighted average of `weights.len()` contiguous pixels into `dst`.
    ///
    /// Weights sum to 255. Color channels are weighted by alpha so that
    /// transparent neighbours do not darken the result.
    pub fn mix_colors(&self, pixels: &[u8], weights: &[i16], dst: &mut [u8]) {
        let ps = self.pixel_size();
        debug_assert!(pixels.len() >= weights.len() * ps);
        debug_assert!(dst.len() >= ps);
        match self {
            ColorModel::Rgba8 => mix_u8(pixels, weights, dst, 4),
            ColorModel::GrayA8 => mix_u8(pixels, weights, dst, 2),
            ColorModel::RgbaF32 => mix_f32(pixels, weights, dst),
        }
    }

    /// Unweighted box average of four pixels. 8-bit models truncate.
    pub fn average_2x2(&self, p00: &[u8], p01: &[u8], p10: &[u8], p11: &[u8], dst: &mut [u8]) {
        match self {
            ColorModel::Rgba8 | ColorModel::GrayA8 => {
                for c in 0..self.pixel_size() {
                    let sum = p00[c] as u32 + p01[c] as u32 + p10[c] as u32 + p11[c] as u32;
                    dst[c] = (sum / 4) as u8;
                }
            }
            ColorModel::RgbaF32 => {
                for c in 0..4 {
                    let v = (read_f32(p00, c) + read_f32(p01, c) + read_f32(p10, c) + read_f32(p11, c))
                        / 4.0;
                    write_f32(dst, c, v);
                }
            }
        }
    }

    /// Decode one pixel to normalized straight-alpha RGBA.
    pub fn to_rgba_f64(&self, px: &[u8]) -> [f64; 4] {
        match self {
            ColorModel::Rgba8 => [
                px[0] as f64 / 255.0,
                px[1] as f64 / 255.0,
                px[2] as f64 / 255.0,
                px[3] as f64 / 255.0,
            ],
            ColorModel::GrayA8 => {
                let v = px[0] as f64 / 255.0;
                [v, v, v, px[1] as f64 / 255.0]
            }
            ColorModel::RgbaF32 => [
                read_f32(px, 0) as f64,
                read_f32(px, 1) as f64,
                read_f32(px, 2) as f64,
                read_f32(px, 3) as f64,
            ],
        }
    }

    /// Encode normalized RGBA into one pixel of this model.
    pub fn from_rgba_f64(&self, rgba: [f64; 4], dst: &mut [u8]) {
        match self {
            ColorModel::Rgba8 => {
                for c in 0..4 {
                    dst[c] = to_u8(rgba[c]);
                }
            }
            ColorModel::GrayA8 => {
                dst[0] = to_u8(0.299 * rgba[0] + 0.587 * rgba[1] + 0.114 * rgba[2]);
                dst[1] = to_u8(rgba[3]);
            }
            ColorModel::RgbaF32 => {
                for (c, v) in rgba.iter().enumerate() {
                    write_f32(dst, c, *v as f32);
                }
            }
        }
    }

    /// Convert a run of pixels from `src_model` into `self`.
    /// Same-model conversion is a plain copy.
    pub fn convert_from(&self, src_model: ColorModel, src: &[u8], dst: &mut [u8]) {
        if src_model == *self {
            dst.copy_from_slice(src);
            return;
        }
        let sps = src_model.pixel_size();
        let dps = self.pixel_size();
        for (s, d) in src.chunks_exact(sps).zip(dst.chunks_exact_mut(dps)) {
            self.from_rgba_f64(src_model.to_rgba_f64(s), d);
        }
    }
}

/// Convert one pixel between models.
pub fn convert_pixel(src_model: ColorModel, src: &[u8], dst_model: ColorModel, dst: &mut [u8]) {
    let n = dst_model.pixel_size();
    dst_model.convert_from(src_model, &src[..src_model.pixel_size()], &mut dst[..n]);
}

#[inline]
fn to_u8(v: f64) -> u8 {
    iround(v.clamp(0.0, 1.0) * 255.0) as u8
}

#[inline]
fn read_f32(px: &[u8], channel: usize) -> f32 {
    let o = channel * 4;
    f32::from_ne_bytes([px[o], px[o + 1], px[o + 2], px[o + 3]])
}

#[inline]
fn write_f32(px: &mut [u8], channel: usize, v: f32) {
    let o = channel * 4;
    px[o..o + 4].copy_from_slice(&v.to_ne_bytes());
}

/// Alpha is the last channel; everything before it is color.
fn mix_u8(pixels: &[u8], weights: &[i16], dst: &mut [u8], channels: usize) {
    let alpha = channels - 1;
    let mut total_alpha: i64 = 0;
    let mut totals = [0i64; 3];
    for (px, &w) in pixels.chunks_exact(channels).zip(weights) {
        let aw = px[alpha] as i64 * w as i64;
        total_alpha += aw;
        for c in 0..alpha {
            totals[c] += px[c] as i64 * aw;
        }
    }

    if total_alpha <= 0 {
        dst[..channels].fill(0);
        return;
    }

    for c in 0..alpha {
        let v = (totals[c] + total_alpha / 2).div_euclid(total_alpha);
        dst[c] = v.clamp(0, 255) as u8;
    }
    let full = FILTER_WEIGHT_FULL as i64;
    dst[alpha] = ((total_alpha + full / 2) / full).min(255) as u8;
}

fn mix_f32(pixels: &[u8], weights: &[i16], dst: &mut [u8]) {
    let mut total_alpha = 0.0f64;
    let mut totals = [0.0f64; 3];
    for (px, &w) in pixels.chunks_exact(16).zip(weights) {
        let aw = read_f32(px, 3) as f64 * w as f64;
        total_alpha += aw;
        for (c, t) in totals.iter_mut().enumerate() {
            *t += read_f32(px, c) as f64 * aw;
        }
    }

    if total_alpha <= 0.0 {
        dst[..16].fill(0);
        return;
    }

    for (c, t) in totals.iter().enumerate() {
        write_f32(dst, c, (*t / total_alpha).clamp(0.0, 1.0) as f32);
    }
    let a = total_alpha / FILTER_WEIGHT_FULL as f64;
    write_f32(dst, 3, a.clamp(0.0, 1.0) as f32);
}

// ============================================================================
// Rgba8
// ============================================================================

/// An 8-bit straight-alpha color in `ColorModel::Rgba8` byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const TRANSPARENT: Rgba8 = Rgba8::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn new_opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub fn to_bytes(&self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn from_bytes(px: &[u8]) -> Self {
        Self::new(px[0], px[1], px[2], px[3])
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }

    pub fn is_opaque(&self) -> bool {
        self.a == 255
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn pixels(colors: &[Rgba8]) -> Vec<u8> {
        colors.iter().flat_map(|c| c.to_bytes()).collect()
    }

    fn mix(colors: &[Rgba8], weights: &[i16]) -> Rgba8 {
        let mut dst = [0u8; 4];
        ColorModel::Rgba8.mix_colors(&pixels(colors), weights, &mut dst);
        Rgba8::from_bytes(&dst)
    }

    #[test]
    fn test_pixel_sizes() {
        assert_eq!(ColorModel::Rgba8.pixel_size(), 4);
        assert_eq!(ColorModel::GrayA8.pixel_size(), 2);
        assert_eq!(ColorModel::RgbaF32.pixel_size(), 16);
        assert_eq!(ColorModel::GrayA8.channel_count(), 2);
        assert_eq!(ColorModel::RgbaF32.transparent_pixel(), vec![0; 16]);
    }

    #[test]
    fn test_mix_single_full_weight() {
        let c = Rgba8::new(12, 34, 56, 200);
        assert_eq!(mix(&[c], &[255]), c);
    }

    #[test]
    fn test_mix_opaque_halves() {
        let a = Rgba8::new_opaque(10, 0, 0);
        let b = Rgba8::new_opaque(20, 0, 0);
        let m = mix(&[a, b], &[127, 128]);
        assert_eq!(m.r, 15);
        assert_eq!(m.a, 255);
    }

    #[test]
    fn test_mix_with_transparent_neighbour_keeps_color() {
        let a = Rgba8::TRANSPARENT;
        let b = Rgba8::new_opaque(10, 20, 30);
        let m = mix(&[a, b], &[128, 127]);
        assert_eq!((m.r, m.g, m.b), (10, 20, 30));
        assert_eq!(m.a, 127);
    }

    #[test]
    fn test_mix_all_transparent_is_zero() {
        let m = mix(&[Rgba8::TRANSPARENT, Rgba8::TRANSPARENT], &[100, 155]);
        assert_eq!(m, Rgba8::TRANSPARENT);
    }

    #[test]
    fn test_mix_negative_lobes_clamp() {
        let dark = Rgba8::new_opaque(0, 0, 0);
        let bright = Rgba8::new_opaque(255, 255, 255);
        let m = mix(&[dark, bright, bright], &[-20, 137, 138]);
        assert_eq!(m.r, 255);
        assert_eq!(m.a, 255);
    }

    #[test]
    fn test_mix_gray() {
        let px = [100u8, 255, 200, 255];
        let mut dst = [0u8; 2];
        ColorModel::GrayA8.mix_colors(&px, &[128, 127], &mut dst);
        assert_eq!(dst, [150, 255]);
    }

    #[test]
    fn test_mix_f32() {
        let mut px = vec![0u8; 32];
        ColorModel::RgbaF32.from_rgba_f64([1.0, 0.0, 0.0, 1.0], &mut px[..16]);
        ColorModel::RgbaF32.from_rgba_f64([0.0, 0.0, 1.0, 1.0], &mut px[16..]);
        let mut dst = [0u8; 16];
        ColorModel::RgbaF32.mix_colors(&px, &[51, 204], &mut dst);
        let rgba = ColorModel::RgbaF32.to_rgba_f64(&dst);
        assert!((rgba[0] - 0.2).abs() < 1e-6);
        assert!((rgba[2] - 0.8).abs() < 1e-6);
        assert!((rgba[3] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_average_2x2_truncates() {
        let mut dst = [0u8; 4];
        ColorModel::Rgba8.average_2x2(
            &[1, 0, 0, 255],
            &[2, 0, 0, 255],
            &[2, 0, 0, 255],
            &[2, 3, 0, 0],
            &mut dst,
        );
        assert_eq!(dst, [1, 0, 0, 191]);
    }

    #[test]
    fn test_convert_rgba_to_gray_and_back() {
        let mut gray = [0u8; 2];
        convert_pixel(ColorModel::Rgba8, &[255, 255, 255, 128], ColorModel::GrayA8, &mut gray);
        assert_eq!(gray, [255, 128]);

        let mut rgba = [0u8; 4];
        convert_pixel(ColorModel::GrayA8, &[64, 255], ColorModel::Rgba8, &mut rgba);
        assert_eq!(rgba, [64, 64, 64, 255]);
    }

    #[test]
    fn test_convert_same_model_copies() {
        let src = pixels(&[Rgba8::new(1, 2, 3, 4), Rgba8::new(5, 6, 7, 8)]);
        let mut dst = vec![0u8; 8];
        ColorModel::Rgba8.convert_from(ColorModel::Rgba8, &src, &mut dst);
        assert_eq!(src, dst);
    }
}
