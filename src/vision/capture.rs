//! Captured captcha frames
//!
//! A captcha episode is recorded as a numbered run of screenshots. Solvers
//! only need random access by index, so anything able to hand back a decoded
//! frame implements [`FrameSource`].

use std::path::{Path, PathBuf};

use image::{ImageBuffer, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};

use super::VisionError;

/// Random access to the frames of one captcha episode
pub trait FrameSource {
    /// Load and decode frame `index`
    fn load(&self, index: usize) -> Result<RgbImage, VisionError>;
}

impl<T: FrameSource + ?Sized> FrameSource for &T {
    fn load(&self, index: usize) -> Result<RgbImage, VisionError> {
        (**self).load(index)
    }
}

/// Screen region holding the captcha logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CaptureRegion {
    /// Build a region from its upper-left and bottom-right corners
    pub fn from_corners(upper_left: (u32, u32), bottom_right: (u32, u32)) -> Self {
        Self {
            x: upper_left.0,
            y: upper_left.1,
            width: bottom_right.0.saturating_sub(upper_left.0),
            height: bottom_right.1.saturating_sub(upper_left.1),
        }
    }

    /// True when `x + width` and `y + height` stay within `u32`
    pub fn is_addressable(&self) -> bool {
        self.x.checked_add(self.width).is_some() && self.y.checked_add(self.height).is_some()
    }

    /// Cut this region out of a full screenshot
    pub fn extract(&self, frame: &RgbImage) -> Result<RgbImage, VisionError> {
        if self.width == 0 || self.height == 0 {
            return Err(VisionError::EmptyRegion);
        }

        let (width, height) = frame.dimensions();
        let fits = |start: u32, len: u32, limit: u32| {
            start.checked_add(len).is_some_and(|end| end <= limit)
        };
        if !fits(self.x, self.width, width) || !fits(self.y, self.height, height) {
            return Err(VisionError::RegionOutOfBounds {
                region: *self,
                width,
                height,
            });
        }

        let cropped = image::imageops::crop_imm(frame, self.x, self.y, self.width, self.height);
        Ok(cropped.to_image())
    }
}

/// Path of frame `index` inside a session directory
pub fn frame_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("screenshot_{index:03}.png"))
}

/// Decode an encoded screenshot (PNG, JPEG, ...) into an RGB frame
pub fn decode_frame(bytes: &[u8]) -> Result<RgbImage, VisionError> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgb8())
        .map_err(VisionError::Decode)
}

/// Session stored on disk as `screenshot_000.png`, `screenshot_001.png`, ...
#[derive(Debug, Clone)]
pub struct SessionFolder {
    dir: PathBuf,
    region: Option<CaptureRegion>,
}

impl SessionFolder {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            region: None,
        }
    }

    /// Crop every loaded frame to `region`
    pub fn with_region(mut self, region: Option<CaptureRegion>) -> Self {
        self.region = region;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of contiguous frames starting at index 0
    pub fn count_frames(&self) -> usize {
        (0..)
            .take_while(|&index| frame_path(&self.dir, index).is_file())
            .count()
    }
}

impl FrameSource for SessionFolder {
    fn load(&self, index: usize) -> Result<RgbImage, VisionError> {
        let path = frame_path(&self.dir, index);
        let frame = image::open(&path)
            .map_err(|source| VisionError::ImageLoad {
                path: path.clone(),
                source,
            })?
            .to_rgb8();

        match self.region {
            Some(region) => region.extract(&frame),
            None => Ok(frame),
        }
    }
}

/// Session held entirely in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySession {
    frames: Vec<RgbImage>,
}

impl MemorySession {
    pub fn new(frames: Vec<RgbImage>) -> Self {
        Self { frames }
    }

    pub fn push(&mut self, frame: RgbImage) {
        self.frames.push(frame);
    }

    /// Append a raw RGBA screen buffer as delivered by the device link
    pub fn push_rgba(
        &mut self,
        frame_data: &[u8],
        width: u32,
        height: u32,
    ) -> Result<(), VisionError> {
        let expected_size = (width as usize) * (height as usize) * 4;
        if frame_data.len() != expected_size {
            return Err(VisionError::InvalidFrameData);
        }

        let image: RgbaImage = ImageBuffer::from_raw(width, height, frame_data.to_vec())
            .ok_or(VisionError::InvalidFrameData)?;
        let frame = image::DynamicImage::ImageRgba8(image).to_rgb8();
        self.frames.push(frame);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FrameSource for MemorySession {
    fn load(&self, index: usize) -> Result<RgbImage, VisionError> {
        self.frames
            .get(index)
            .cloned()
            .ok_or(VisionError::FrameOutOfRange {
                index,
                count: self.frames.len(),
            })
    }
}
