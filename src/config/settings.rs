//! Solver settings
//!
//! Defines every knob the captcha pipeline reads. Settings are plain data and
//! are passed down explicitly; nothing in the pipeline reads global state.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::vision::shapes::LOG_COUNT;
use crate::vision::{AreaThreshold, CaptureRegion, CropMargins, DiffParams, PreprocessParams};

/// Main settings structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    /// Minimum contour area for a log
    pub area_threshold: AreaThreshold,
    /// Number of logs kept per frame
    pub log_count: usize,
    /// Tilt (degrees) a log needs before a frame is trusted
    pub min_tilt_deg: f64,
    /// Changed-region area needed before a frame pair is trusted
    pub min_change_confidence: f64,
    /// Gaussian sigma used before thresholding
    pub blur_sigma: f32,
    /// Elliptical closing radius
    pub close_radius: u8,
    /// Detect shapes on the closed mask instead of the raw one
    pub use_closed_mask: bool,
    /// Per-pixel change cut for frame differencing
    pub diff_threshold: u8,
    /// Open/dilate radius for frame differencing
    pub diff_kernel_radius: u8,
    /// Border ignored by frame differencing
    pub crop: CropMargins,
    /// Region of the screenshot holding the logs
    pub capture_region: Option<CaptureRegion>,
    /// Screen coordinates of each log, in slot order
    pub log_taps: Vec<(i32, i32)>,
    /// Maximum tap jitter in pixels
    pub tap_offset_max: i32,
}

impl Default for SolverSettings {
    fn default() -> Self {
        let diff = DiffParams::default();
        let preprocess = PreprocessParams::default();
        Self {
            area_threshold: AreaThreshold::default(),
            log_count: LOG_COUNT,
            min_tilt_deg: 5.0,
            min_change_confidence: 500.0,
            blur_sigma: preprocess.blur_sigma,
            close_radius: preprocess.close_radius,
            use_closed_mask: false,
            diff_threshold: diff.threshold,
            diff_kernel_radius: diff.kernel_radius,
            crop: diff.crop,
            capture_region: None,
            log_taps: Vec::new(),
            tap_offset_max: 15,
        }
    }
}

impl SolverSettings {
    /// Closed-mask pipeline with a fixed area cut, for captures at a known scale
    pub fn calibrated_preset() -> Self {
        Self {
            area_threshold: AreaThreshold::Absolute(2000.0),
            use_closed_mask: true,
            ..Default::default()
        }
    }

    /// Parse settings from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Check the settings for values the pipeline cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_count == 0 || self.log_count > LOG_COUNT {
            return Err(ConfigError::Invalid(format!(
                "log_count must be between 1 and {LOG_COUNT}, got {}",
                self.log_count
            )));
        }

        let area_ok = match self.area_threshold {
            AreaThreshold::Absolute(area) => area >= 0.0,
            AreaThreshold::FrameRelative { min, fraction } => min >= 0.0 && fraction >= 0.0,
        };
        if !area_ok {
            return Err(ConfigError::Invalid(
                "area_threshold must not be negative".into(),
            ));
        }

        if !(0.0..=90.0).contains(&self.min_tilt_deg) {
            return Err(ConfigError::Invalid(format!(
                "min_tilt_deg must be within [0, 90], got {}",
                self.min_tilt_deg
            )));
        }
        if self.min_change_confidence < 0.0 || self.blur_sigma < 0.0 || self.tap_offset_max < 0 {
            return Err(ConfigError::Invalid(
                "confidence, blur and tap offset must not be negative".into(),
            ));
        }

        if let Some(region) = self.capture_region {
            if !region.is_addressable() {
                return Err(ConfigError::Invalid(format!(
                    "capture_region {region:?} extends past the screen coordinate range"
                )));
            }
        }

        if !self.log_taps.is_empty() && self.log_taps.len() != self.log_count {
            return Err(ConfigError::Invalid(format!(
                "expected {} log tap positions, got {}",
                self.log_count,
                self.log_taps.len()
            )));
        }

        Ok(())
    }

    pub fn preprocess_params(&self) -> PreprocessParams {
        PreprocessParams {
            blur_sigma: self.blur_sigma,
            close_radius: self.close_radius,
        }
    }

    pub fn diff_params(&self) -> DiffParams {
        DiffParams {
            crop: self.crop,
            threshold: self.diff_threshold,
            kernel_radius: self.diff_kernel_radius,
        }
    }
}

/// Settings errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid settings: {0}")]
    Invalid(String),
}
