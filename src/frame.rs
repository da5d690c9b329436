//! Pixel plumbing for the mirror: the shared display buffer and the
//! per-frame image transforms (luminance, differencing, colorize, mask,
//! composite).
//!
//! ## Rust concepts
//! - `image::ImageBuffer` for owned pixel data (`RgbImage`, `GrayImage`)
//! - Iterator chains over pixels instead of index arithmetic
//! - Saturating/clamped numeric conversions at the u8 boundary

use crate::{Color, PanelConfig};
use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, Rgb, RgbImage};

/// Divisor applied to the raw frame difference. Dividing by 0.05 amplifies
/// motion 20x before the clamp to u8, so even small luminance changes
/// saturate while static scene content cancels to black.
pub const DIFF_SCALE: f32 = 0.05;

// ── Display buffer ───────────────────────────────────────────────────

/// The 2-D RGB surface shared with the physical driver.
///
/// Exactly one of {mirror, rotator} writes it in a given tick, so there is
/// no locking discipline beyond "last writer wins within a tick".
pub struct DisplayBuffer {
    image: RgbImage,
}

impl DisplayBuffer {
    /// A zeroed (black) buffer shaped to the panel.
    pub fn new(panel: PanelConfig) -> Self {
        Self {
            image: RgbImage::new(panel.cols, panel.rows),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Read access for the physical driver (and tests).
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Overwrite the whole surface with `frame`.
    pub fn copy_from(&mut self, frame: &RgbImage) {
        self.image.copy_from_slice(frame.as_raw());
    }

    /// Bitwise-OR `overlay` onto the surface, channel by channel. Used for
    /// the control overlay so the bars stay visible over dark pixels
    /// without erasing bright ones.
    pub fn or_with(&mut self, overlay: &RgbImage) {
        for (dst, src) in self.image.iter_mut().zip(overlay.as_raw().iter()) {
            *dst |= *src;
        }
    }

    /// Blank the surface to black.
    pub fn clear(&mut self) {
        self.image.fill(0);
    }
}

// ── Frame transforms ─────────────────────────────────────────────────

/// Convert a captured color frame to single-channel luminance and resize
/// it to the panel's pixel dimensions with bilinear interpolation.
pub fn luminance(frame: &RgbImage, panel: PanelConfig) -> GrayImage {
    let gray = imageops::grayscale(frame);
    if gray.width() == panel.cols && gray.height() == panel.rows {
        return gray;
    }
    imageops::resize(&gray, panel.cols, panel.rows, FilterType::Triangle)
}

/// Per-pixel signed difference `previous - current`, divided by
/// [`DIFF_SCALE`] and clamped to u8. Pixels that got brighter (or stayed
/// put) come out black; anything that dimmed since the last frame flares.
pub fn amplified_difference(previous: &GrayImage, current: &GrayImage) -> GrayImage {
    debug_assert_eq!(previous.dimensions(), current.dimensions());
    let (width, height) = current.dimensions();
    let mut out = GrayImage::new(width, height);
    for (dst, (prev, cur)) in out
        .iter_mut()
        .zip(previous.as_raw().iter().zip(current.as_raw().iter()))
    {
        let diff = (*prev as f32 - *cur as f32) / DIFF_SCALE;
        *dst = diff.clamp(0.0, 255.0) as u8;
    }
    out
}

/// Map luminance through a black→`tint` ramp, producing a full-color frame.
pub fn colorize(gray: &GrayImage, tint: Color) -> RgbImage {
    let mut out = RgbImage::new(gray.width(), gray.height());
    for (dst, src) in out.pixels_mut().zip(gray.pixels()) {
        let Luma([v]) = *src;
        *dst = Rgb([
            ((v as u16 * tint.r as u16) / 255) as u8,
            ((v as u16 * tint.g as u16) / 255) as u8,
            ((v as u16 * tint.b as u16) / 255) as u8,
        ]);
    }
    out
}

/// Multiply every channel by `fade`, truncating back to u8. This is the
/// per-tick decay applied to the previous composite. f64 keeps the
/// truncation honest: 100 * 0.9 must come out 90, not 89.
pub fn faded_copy(frame: &RgbImage, fade: f64) -> RgbImage {
    let mut out = frame.clone();
    for channel in out.iter_mut() {
        *channel = (*channel as f64 * fade).clamp(0.0, 255.0) as u8;
    }
    out
}

// ── Motion mask ──────────────────────────────────────────────────────

/// Per-pixel motion flags: set where any RGB channel of the colorized
/// difference frame exceeds the brightness threshold.
pub struct MotionMask {
    width: u32,
    bits: Vec<bool>,
}

impl MotionMask {
    pub fn from_frame(frame: &RgbImage, threshold: u8) -> Self {
        let bits = frame
            .pixels()
            .map(|&Rgb([r, g, b])| r > threshold || g > threshold || b > threshold)
            .collect();
        Self {
            width: frame.width(),
            bits,
        }
    }

    /// Number of pixels flagged as motion.
    pub fn moved_pixels(&self) -> usize {
        self.bits.iter().filter(|b| **b).count()
    }

    pub fn is_set(&self, x: u32, y: u32) -> bool {
        self.bits[(y * self.width + x) as usize]
    }
}

/// Select `fresh` where the mask is set, `faded` elsewhere — the comet
/// trail composite: motion pixels show new color, the rest decays.
pub fn composite(mask: &MotionMask, fresh: &RgbImage, faded: &RgbImage) -> RgbImage {
    debug_assert_eq!(fresh.dimensions(), faded.dimensions());
    let mut out = RgbImage::new(fresh.width(), fresh.height());
    for (i, dst) in out.pixels_mut().enumerate() {
        let x = i as u32 % fresh.width();
        let y = i as u32 / fresh.width();
        *dst = if mask.is_set(x, y) {
            *fresh.get_pixel(x, y)
        } else {
            *faded.get_pixel(x, y)
        };
    }
    out
}

// ── Static backdrop ──────────────────────────────────────────────────

/// Linear vertical shade from black toward dim gray, two brightness units
/// per row on the stock 32-row panel. Used by the fallback cycler, not by
/// the mirror path.
pub fn gradient_background(panel: PanelConfig) -> RgbImage {
    let mut image = RgbImage::new(panel.cols, panel.rows);
    let step = 64 / panel.rows.max(1);
    for (y, row) in image.rows_mut().enumerate() {
        let shade = (step * y as u32).min(255) as u8;
        for pixel in row {
            *pixel = Rgb([shade, shade, shade]);
        }
    }
    image
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn gray_of(panel: PanelConfig, value: u8) -> GrayImage {
        GrayImage::from_pixel(panel.cols, panel.rows, Luma([value]))
    }

    fn rgb_of(panel: PanelConfig, rgb: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(panel.cols, panel.rows, Rgb(rgb))
    }

    const PANEL: PanelConfig = PanelConfig { rows: 4, cols: 6 };

    // ── Differencing ───────────────────────────────────────────────

    #[test]
    fn identical_frames_difference_to_black() {
        let a = gray_of(PANEL, 120);
        let diff = amplified_difference(&a, &a);
        assert!(diff.as_raw().iter().all(|v| *v == 0));
    }

    #[test]
    fn brightening_pixels_difference_to_black() {
        let prev = gray_of(PANEL, 10);
        let cur = gray_of(PANEL, 200);
        let diff = amplified_difference(&prev, &cur);
        assert!(diff.as_raw().iter().all(|v| *v == 0));
    }

    #[test]
    fn small_dimming_saturates_through_amplification() {
        // 13 luminance units of change → 13 / 0.05 = 260, clamps to 255.
        let prev = gray_of(PANEL, 113);
        let cur = gray_of(PANEL, 100);
        let diff = amplified_difference(&prev, &cur);
        assert!(diff.as_raw().iter().all(|v| *v == 255));
    }

    #[rstest]
    #[case(1, 20)]
    #[case(5, 100)]
    #[case(12, 240)]
    fn amplification_is_twenty_x(#[case] delta: u8, #[case] expected: u8) {
        let prev = gray_of(PANEL, 100 + delta);
        let cur = gray_of(PANEL, 100);
        let diff = amplified_difference(&prev, &cur);
        assert_eq!(diff.get_pixel(0, 0), &Luma([expected]));
    }

    // ── Colorize / fade ────────────────────────────────────────────

    #[test]
    fn colorize_maps_white_to_tint_and_black_to_black() {
        let mut gray = gray_of(PANEL, 0);
        gray.put_pixel(0, 0, Luma([255]));
        let tint = Color::new(255, 128, 0);

        let color = colorize(&gray, tint);
        assert_eq!(color.get_pixel(0, 0), &Rgb([255, 128, 0]));
        assert_eq!(color.get_pixel(1, 0), &Rgb([0, 0, 0]));
    }

    #[test]
    fn colorize_scales_midtones_linearly() {
        let gray = gray_of(PANEL, 128);
        let color = colorize(&gray, Color::new(255, 255, 255));
        assert_eq!(color.get_pixel(0, 0), &Rgb([128, 128, 128]));
    }

    #[test]
    fn fade_one_is_identity() {
        let frame = rgb_of(PANEL, [200, 33, 7]);
        assert_eq!(faded_copy(&frame, 1.0), frame);
    }

    #[test]
    fn fade_truncates_toward_zero() {
        let frame = rgb_of(PANEL, [100, 10, 1]);
        let faded = faded_copy(&frame, 0.9);
        assert_eq!(faded.get_pixel(0, 0), &Rgb([90, 9, 0]));
    }

    // ── Mask / composite ───────────────────────────────────────────

    #[test]
    fn mask_counts_pixels_over_threshold_on_any_channel() {
        let mut frame = rgb_of(PANEL, [0, 0, 0]);
        frame.put_pixel(0, 0, Rgb([11, 0, 0]));
        frame.put_pixel(1, 0, Rgb([0, 0, 200]));
        frame.put_pixel(2, 0, Rgb([10, 10, 10])); // at threshold, not over

        let mask = MotionMask::from_frame(&frame, 10);
        assert_eq!(mask.moved_pixels(), 2);
        assert!(mask.is_set(0, 0));
        assert!(mask.is_set(1, 0));
        assert!(!mask.is_set(2, 0));
    }

    #[test]
    fn composite_selects_fresh_on_motion_and_faded_elsewhere() {
        let mut motion = rgb_of(PANEL, [0, 0, 0]);
        motion.put_pixel(3, 2, Rgb([250, 0, 0]));
        let mask = MotionMask::from_frame(&motion, 10);
        let faded = rgb_of(PANEL, [5, 6, 7]);

        let out = composite(&mask, &motion, &faded);
        assert_eq!(out.get_pixel(3, 2), &Rgb([250, 0, 0]));
        assert_eq!(out.get_pixel(0, 0), &Rgb([5, 6, 7]));
    }

    // ── Buffer ─────────────────────────────────────────────────────

    #[test]
    fn buffer_starts_black_and_copies_wholesale() {
        let mut buf = DisplayBuffer::new(PANEL);
        assert!(buf.image().as_raw().iter().all(|v| *v == 0));

        let frame = rgb_of(PANEL, [1, 2, 3]);
        buf.copy_from(&frame);
        assert_eq!(buf.image(), &frame);

        buf.clear();
        assert!(buf.image().as_raw().iter().all(|v| *v == 0));
    }

    #[test]
    fn or_with_combines_channels_bitwise() {
        let mut buf = DisplayBuffer::new(PANEL);
        buf.copy_from(&rgb_of(PANEL, [0b1010, 0, 0]));
        buf.or_with(&rgb_of(PANEL, [0b0101, 0, 255]));
        assert_eq!(buf.image().get_pixel(0, 0), &Rgb([0b1111, 0, 255]));
    }

    // ── Luminance / backdrop ───────────────────────────────────────

    #[test]
    fn luminance_resizes_to_panel_dimensions() {
        let capture = RgbImage::from_pixel(100, 80, Rgb([50, 50, 50]));
        let gray = luminance(&capture, PANEL);
        assert_eq!(gray.dimensions(), (PANEL.cols, PANEL.rows));
    }

    #[test]
    fn gradient_shades_linearly_down_the_panel() {
        let panel = PanelConfig::new(32, 8);
        let bg = gradient_background(panel);
        assert_eq!(bg.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(bg.get_pixel(0, 1), &Rgb([2, 2, 2]));
        assert_eq!(bg.get_pixel(0, 31), &Rgb([62, 62, 62]));
    }
}
