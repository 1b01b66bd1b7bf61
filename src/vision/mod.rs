//! Vision and image processing module
//!
//! Turns captcha screenshots into answers: binarization, contour detection,
//! rotated-rectangle fitting, clock-position assignment and frame differencing.

pub mod capture;
pub mod debug;
pub mod motion;
pub mod positions;
pub mod preprocess;
pub mod shapes;

use std::path::PathBuf;

pub use capture::{
    decode_frame, frame_path, CaptureRegion, FrameSource, MemorySession, SessionFolder,
};
pub use motion::{estimate_motion, ChangedRegion, CropMargins, DiffParams, MotionEstimate};
pub use positions::{assign_positions, LogSlot, PositionMap};
pub use preprocess::{preprocess, BinaryMasks, PreprocessParams};
pub use shapes::{detect_shapes, extract_features, AreaThreshold, CandidateShape, RectFeature};

/// Vision system errors
#[derive(Debug, thiserror::Error)]
pub enum VisionError {
    #[error("Failed to load frame {path}: {source}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Failed to decode frame bytes: {0}")]
    Decode(#[source] image::ImageError),
    #[error("Failed to save image {path}: {source}")]
    ImageSave {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Invalid frame data")]
    InvalidFrameData,
    #[error("Frame {index} out of range (session has {count} frames)")]
    FrameOutOfRange { index: usize, count: usize },
    #[error("Capture region {region:?} exceeds frame size {width}x{height}")]
    RegionOutOfBounds {
        region: CaptureRegion,
        width: u32,
        height: u32,
    },
    #[error("Capture region is empty")]
    EmptyRegion,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to serialize frame report: {0}")]
    Report(#[from] serde_json::Error),
}

/// Synthetic captcha frames shared by the unit tests.
#[cfg(test)]
pub(crate) mod testing {
    use image::{Rgb, RgbImage};
    use imageproc::drawing::draw_polygon_mut;
    use imageproc::point::Point;

    pub const BACKGROUND: Rgb<u8> = Rgb([30, 40, 50]);
    pub const WOOD: Rgb<u8> = Rgb([200, 160, 90]);

    /// Corners of a `width` x `length` rectangle whose long axis is rotated
    /// `tilt_deg` clockwise from vertical.
    pub fn log_corners(
        center: (f64, f64),
        width: f64,
        length: f64,
        tilt_deg: f64,
    ) -> [Point<i32>; 4] {
        let t = tilt_deg.to_radians();
        // long axis (screen y grows downward) and its perpendicular
        let (ux, uy) = (t.sin(), -t.cos());
        let (vx, vy) = (t.cos(), t.sin());
        let (hl, hw) = (length / 2.0, width / 2.0);
        let corner = |su: f64, sv: f64| {
            Point::new(
                (center.0 + su * hl * ux + sv * hw * vx).round() as i32,
                (center.1 + su * hl * uy + sv * hw * vy).round() as i32,
            )
        };
        [
            corner(1.0, -1.0),
            corner(1.0, 1.0),
            corner(-1.0, 1.0),
            corner(-1.0, -1.0),
        ]
    }

    pub fn blank_frame(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, BACKGROUND)
    }

    pub fn draw_log(frame: &mut RgbImage, center: (f64, f64), tilt_deg: f64) {
        draw_polygon_mut(frame, &log_corners(center, 24.0, 80.0, tilt_deg), WOOD);
    }

    /// Center of the log at clock position `slot` on a 400x400 ring frame.
    pub fn ring_center(slot: usize) -> (f64, f64) {
        let angle = (45.0 * slot as f64).to_radians();
        (200.0 + 140.0 * angle.sin(), 200.0 - 140.0 * angle.cos())
    }

    /// A 400x400 frame with eight upright logs, except `tilted` which leans
    /// by `tilt_deg`. Slots listed in `missing` are left out.
    pub fn ring_frame(tilted: Option<usize>, tilt_deg: f64, missing: &[usize]) -> RgbImage {
        let mut frame = blank_frame(400, 400);
        for slot in (0..8).filter(|s| !missing.contains(s)) {
            let tilt = if tilted == Some(slot) { tilt_deg } else { 0.0 };
            draw_log(&mut frame, ring_center(slot), tilt);
        }
        frame
    }
}
