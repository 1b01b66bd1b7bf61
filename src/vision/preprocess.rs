//! Frame binarization
//!
//! Separates the light logs from the darker captcha background. Exposure
//! drifts between captures, so the cut is picked per frame with Otsu's method
//! rather than fixed.

use image::{GrayImage, RgbImage};
use imageproc::contrast::{otsu_level, threshold, ThresholdType};
use imageproc::distance_transform::Norm;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::close;

/// Gaussian sigma matching a 5x5 smoothing kernel
pub const DEFAULT_BLUR_SIGMA: f32 = 1.1;

/// Radius of the elliptical closing element (9x9)
pub const DEFAULT_CLOSE_RADIUS: u8 = 4;

/// Preprocessing parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreprocessParams {
    /// Smoothing strength; 0 disables the blur
    pub blur_sigma: f32,
    /// Closing radius used for the filled variant of the mask
    pub close_radius: u8,
}

impl Default for PreprocessParams {
    fn default() -> Self {
        Self {
            blur_sigma: DEFAULT_BLUR_SIGMA,
            close_radius: DEFAULT_CLOSE_RADIUS,
        }
    }
}

/// Binary masks derived from one frame; both share the frame's dimensions
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryMasks {
    /// Otsu level the frame was cut at
    pub threshold: u8,
    /// Foreground (255) / background (0) after thresholding
    pub raw: GrayImage,
    /// `raw` after morphological closing
    pub closed: GrayImage,
}

impl BinaryMasks {
    /// Pick the mask the shape detector should run on
    pub fn select(&self, use_closed: bool) -> &GrayImage {
        if use_closed {
            &self.closed
        } else {
            &self.raw
        }
    }
}

/// Binarize a frame
pub fn preprocess(frame: &RgbImage, params: &PreprocessParams) -> BinaryMasks {
    let (width, height) = frame.dimensions();
    if width == 0 || height == 0 {
        return BinaryMasks {
            threshold: 0,
            raw: GrayImage::new(width, height),
            closed: GrayImage::new(width, height),
        };
    }

    let gray = image::imageops::grayscale(frame);
    let smoothed = if params.blur_sigma > 0.0 {
        gaussian_blur_f32(&gray, params.blur_sigma)
    } else {
        gray
    };

    let level = otsu_level(&smoothed);
    let raw = threshold(&smoothed, level, ThresholdType::Binary);
    let closed = if params.close_radius > 0 {
        close(&raw, Norm::L2, params.close_radius)
    } else {
        raw.clone()
    };

    BinaryMasks {
        threshold: level,
        raw,
        closed,
    }
}

/// Count of foreground pixels in a mask
pub fn foreground_area(mask: &GrayImage) -> usize {
    mask.pixels().filter(|p| p.0[0] > 0).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::testing::{blank_frame, draw_log, ring_frame, BACKGROUND};
    use image::{Luma, Rgb};
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;

    #[test]
    fn test_preprocess_is_deterministic() {
        let frame = ring_frame(Some(3), 25.0, &[]);
        let params = PreprocessParams::default();

        let first = preprocess(&frame, &params);
        let second = preprocess(&frame, &params);
        assert_eq!(first, second);
        assert_eq!(first.raw.dimensions(), frame.dimensions());
        assert_eq!(first.closed.dimensions(), frame.dimensions());
    }

    #[test]
    fn test_black_frame_has_no_foreground() {
        let frame = RgbImage::new(64, 48);
        let masks = preprocess(&frame, &PreprocessParams::default());
        assert_eq!(foreground_area(&masks.raw), 0);
        assert_eq!(foreground_area(&masks.closed), 0);
    }

    #[test]
    fn test_log_becomes_foreground() {
        let mut frame = blank_frame(120, 120);
        draw_log(&mut frame, (60.0, 60.0), 0.0);

        let masks = preprocess(&frame, &PreprocessParams::default());
        assert!(masks.threshold > 30 && masks.threshold < 163);
        assert_eq!(masks.raw.get_pixel(60, 60), &Luma([255]));
        assert_eq!(masks.raw.get_pixel(5, 5), &Luma([0]));

        // 24x80 log, blur only softens the outline
        let area = foreground_area(&masks.raw) as f64;
        assert!((area - 1920.0).abs() < 250.0, "area was {area}");
    }

    #[test]
    fn test_closing_fills_small_holes() {
        let mut frame = blank_frame(100, 100);
        let light = Rgb([220, 220, 220]);
        draw_filled_rect_mut(&mut frame, Rect::at(20, 20).of_size(60, 60), light);
        draw_filled_rect_mut(&mut frame, Rect::at(48, 48).of_size(4, 4), BACKGROUND);

        let params = PreprocessParams {
            blur_sigma: 0.0,
            ..Default::default()
        };
        let masks = preprocess(&frame, &params);
        assert_eq!(masks.raw.get_pixel(50, 50), &Luma([0]));
        assert_eq!(masks.closed.get_pixel(50, 50), &Luma([255]));
        assert_eq!(masks.select(true), &masks.closed);
        assert_eq!(masks.select(false), &masks.raw);
    }

    #[test]
    fn test_pixels_at_the_otsu_level_are_background() {
        // two flat halves: Otsu lands on the darker level, which stays background
        let mut frame = RgbImage::from_pixel(40, 20, Rgb([60, 60, 60]));
        let light = Rgb([180, 180, 180]);
        draw_filled_rect_mut(&mut frame, Rect::at(20, 0).of_size(20, 20), light);
        let params = PreprocessParams {
            blur_sigma: 0.0,
            close_radius: 0,
        };

        let masks = preprocess(&frame, &params);
        assert!(masks.threshold < 180);
        assert_eq!(masks.raw.get_pixel(5, 5), &Luma([0]));
        assert_eq!(masks.raw.get_pixel(30, 5), &Luma([255]));
        assert_eq!(foreground_area(&masks.raw), 400);
        assert_eq!(masks.closed, masks.raw);
    }
}
