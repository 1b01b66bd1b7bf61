//! Frame differencing
//!
//! The odd log out animates while the others stay put, so the largest region
//! that changes between two consecutive frames points at the answer.

use std::f64::consts::PI;

use image::imageops::FilterType;
use image::{GrayImage, Rgb, RgbImage};
use imageproc::contrast::{threshold, ThresholdType};
use imageproc::distance_transform::Norm;
use imageproc::morphology::{dilate, open};
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};

use super::positions::LogSlot;
use super::shapes::{external_contours, polygon_area};

/// Border trimmed from both frames before differencing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CropMargins {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl CropMargins {
    pub const fn new(top: u32, right: u32, bottom: u32, left: u32) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    /// Trim the margins; margins larger than the frame leave an empty image
    pub fn apply(&self, frame: &RgbImage) -> RgbImage {
        let (width, height) = frame.dimensions();
        let w = width.saturating_sub(self.left + self.right);
        let h = height.saturating_sub(self.top + self.bottom);
        if w == 0 || h == 0 {
            return RgbImage::new(0, 0);
        }
        image::imageops::crop_imm(frame, self.left, self.top, w, h).to_image()
    }
}

/// Differencing parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiffParams {
    pub crop: CropMargins,
    /// Intensity change a pixel needs to count as moved
    pub threshold: u8,
    /// Radius of the square open/dilate element (2 = 5x5)
    pub kernel_radius: u8,
}

impl Default for DiffParams {
    fn default() -> Self {
        Self {
            crop: CropMargins::new(0, 25, 50, 25),
            threshold: 25,
            kernel_radius: 2,
        }
    }
}

/// Largest connected change between two frames
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChangedRegion {
    pub bounds: Rect,
    /// Center of `bounds`, in cropped-frame coordinates
    pub centroid: (i32, i32),
    /// Bounding-box area in pixels
    pub confidence: f64,
}

/// Direction and strength of the change between two frames
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionEstimate {
    pub slot: Option<LogSlot>,
    pub confidence: f64,
    pub region: Option<ChangedRegion>,
}

impl MotionEstimate {
    /// Nothing moved
    pub fn none() -> Self {
        Self {
            slot: None,
            confidence: 0.0,
            region: None,
        }
    }
}

/// Binary mask of pixels that changed between `older` and `newer`
pub fn change_mask(older: &RgbImage, newer: &RgbImage, params: &DiffParams) -> GrayImage {
    let older = params.crop.apply(older);
    let newer = params.crop.apply(newer);

    let (width, height) = older.dimensions();
    if width == 0 || height == 0 {
        return GrayImage::new(width, height);
    }
    let newer = if newer.dimensions() != (width, height) {
        image::imageops::resize(&newer, width, height, FilterType::Triangle)
    } else {
        newer
    };

    let diff = RgbImage::from_fn(width, height, |x, y| {
        let a = older.get_pixel(x, y);
        let b = newer.get_pixel(x, y);
        Rgb([
            a[0].abs_diff(b[0]),
            a[1].abs_diff(b[1]),
            a[2].abs_diff(b[2]),
        ])
    });

    let gray = image::imageops::grayscale(&diff);
    let mask = threshold(&gray, params.threshold, ThresholdType::Binary);
    if params.kernel_radius == 0 {
        return mask;
    }
    // opening drops speckle, dilation reconnects the moving log
    let opened = open(&mask, Norm::LInf, params.kernel_radius);
    dilate(&opened, Norm::LInf, params.kernel_radius)
}

/// The external contour with the largest enclosed area
pub fn largest_changed_region(mask: &GrayImage) -> Option<ChangedRegion> {
    if mask.width() == 0 || mask.height() == 0 {
        return None;
    }

    let mut best: Option<(f64, Rect)> = None;
    for contour in external_contours(mask) {
        let area = polygon_area(&contour.points);
        if area <= best.map_or(0.0, |(a, _)| a) {
            continue;
        }
        let Some(bounds) = bounding_rect(&contour.points) else {
            continue;
        };
        best = Some((area, bounds));
    }

    best.map(|(_, bounds)| ChangedRegion {
        bounds,
        centroid: (
            bounds.left() + bounds.width() as i32 / 2,
            bounds.top() + bounds.height() as i32 / 2,
        ),
        confidence: bounds.width() as f64 * bounds.height() as f64,
    })
}

fn bounding_rect(points: &[imageproc::point::Point<i32>]) -> Option<Rect> {
    let min_x = points.iter().map(|p| p.x).min()?;
    let max_x = points.iter().map(|p| p.x).max()?;
    let min_y = points.iter().map(|p| p.y).min()?;
    let max_y = points.iter().map(|p| p.y).max()?;
    let width = (max_x - min_x + 1) as u32;
    let height = (max_y - min_y + 1) as u32;
    Some(Rect::at(min_x, min_y).of_size(width, height))
}

/// Quantize the direction from the frame center into a clock slot
pub fn sector_slot(dx: f64, dy: f64) -> LogSlot {
    let angle = dy.atan2(dx);
    // half-sector shift puts boundaries between slots; +PI makes it non-negative
    let sector = ((angle + PI + PI / 8.0) / (PI / 4.0)).floor() as usize % 8;
    // sector 2 points up
    LogSlot::ALL[(sector + 6) % 8]
}

/// Locate the log that moved between two frames
pub fn estimate_motion(older: &RgbImage, newer: &RgbImage, params: &DiffParams) -> MotionEstimate {
    let mask = change_mask(older, newer, params);
    let Some(region) = largest_changed_region(&mask) else {
        return MotionEstimate::none();
    };

    let (width, height) = mask.dimensions();
    let dx = region.centroid.0 - (width / 2) as i32;
    let dy = region.centroid.1 - (height / 2) as i32;

    MotionEstimate {
        slot: Some(sector_slot(dx as f64, dy as f64)),
        confidence: region.confidence,
        region: Some(region),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::testing::{blank_frame, ring_center, ring_frame};
    use imageproc::drawing::draw_filled_rect_mut;

    const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

    #[test]
    fn test_identical_frames_have_no_motion() {
        let frame = ring_frame(Some(1), 20.0, &[]);
        let estimate = estimate_motion(&frame, &frame, &DiffParams::default());
        assert_eq!(estimate, MotionEstimate::none());
        assert_eq!(estimate.slot, None);
        assert_eq!(estimate.confidence, 0.0);
    }

    #[test]
    fn test_block_at_right_center() {
        // 300x250 frame crops to 250x200, center (125, 100) in cropped space
        let older = blank_frame(300, 250);
        let mut newer = older.clone();
        draw_filled_rect_mut(&mut newer, Rect::at(200, 75).of_size(50, 50), WHITE);

        let estimate = estimate_motion(&older, &newer, &DiffParams::default());
        assert_eq!(estimate.slot, Some(LogSlot::Right));
        // 50x50 block, grown by the 5x5 dilation
        assert!(
            (2500.0..=3000.0).contains(&estimate.confidence),
            "confidence was {}",
            estimate.confidence
        );
    }

    #[test]
    fn test_speckle_is_removed() {
        let older = blank_frame(200, 200);
        let mut newer = older.clone();
        draw_filled_rect_mut(&mut newer, Rect::at(60, 60).of_size(3, 3), WHITE);

        let params = DiffParams {
            crop: CropMargins::default(),
            ..Default::default()
        };
        assert_eq!(
            estimate_motion(&older, &newer, &params),
            MotionEstimate::none()
        );
    }

    #[test]
    fn test_small_changes_below_threshold() {
        let older = RgbImage::from_pixel(120, 120, Rgb([100, 100, 100]));
        let newer = RgbImage::from_pixel(120, 120, Rgb([120, 120, 120]));
        let mask = change_mask(&older, &newer, &DiffParams::default());
        assert!(mask.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn test_mismatched_sizes_are_resized() {
        let older = blank_frame(200, 200);
        let newer = blank_frame(100, 100);
        let mask = change_mask(&older, &newer, &DiffParams::default());
        assert_eq!(mask.dimensions(), (150, 150));
    }

    #[test]
    fn test_oversized_crop() {
        let frame = blank_frame(40, 40);
        let params = DiffParams {
            crop: CropMargins::new(30, 30, 30, 30),
            ..Default::default()
        };
        assert_eq!(
            estimate_motion(&frame, &frame, &params),
            MotionEstimate::none()
        );
    }

    #[test]
    fn test_sector_slots() {
        assert_eq!(sector_slot(0.0, -10.0), LogSlot::Top);
        assert_eq!(sector_slot(10.0, -10.0), LogSlot::TopRight);
        assert_eq!(sector_slot(10.0, 0.0), LogSlot::Right);
        assert_eq!(sector_slot(10.0, 10.0), LogSlot::BottomRight);
        assert_eq!(sector_slot(0.0, 10.0), LogSlot::Bottom);
        assert_eq!(sector_slot(-10.0, 10.0), LogSlot::BottomLeft);
        assert_eq!(sector_slot(-10.0, 0.0), LogSlot::Left);
        assert_eq!(sector_slot(-10.0, -10.0), LogSlot::TopLeft);
        // 20 degrees off the axis is still the same slot
        assert_eq!(sector_slot(100.0, 36.0), LogSlot::Right);
    }

    #[test]
    fn test_disappearing_log_per_slot() {
        let params = DiffParams {
            crop: CropMargins::default(),
            ..Default::default()
        };
        let full = ring_frame(None, 0.0, &[]);
        for slot in LogSlot::ALL {
            let missing = ring_frame(None, 0.0, &[slot.index()]);
            let estimate = estimate_motion(&missing, &full, &params);
            assert_eq!(
                estimate.slot,
                Some(slot),
                "log at {:?}",
                ring_center(slot.index())
            );
            assert!(estimate.confidence > 500.0);
        }
    }
}
