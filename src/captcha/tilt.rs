//! Tilt-based solver
//!
//! Looks for the log that leans away from vertical in single screenshots. The
//! lean is clearest once the animation settles, so frames are scanned from
//! the newest back to the oldest and the first confident frame wins.

use image::RgbImage;

use super::CaptchaSolver;
use crate::config::SolverSettings;
use crate::vision::shapes::{most_tilted, LOG_COUNT};
use crate::vision::{
    assign_positions, detect_shapes, extract_features, preprocess, AreaThreshold, FrameSource,
    LogSlot, PositionMap, PreprocessParams, RectFeature,
};

/// Parameters of the single-frame pipeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TiltParams {
    pub preprocess: PreprocessParams,
    pub area_threshold: AreaThreshold,
    pub log_count: usize,
    pub min_tilt_deg: f64,
    pub use_closed_mask: bool,
}

impl Default for TiltParams {
    fn default() -> Self {
        Self {
            preprocess: PreprocessParams::default(),
            area_threshold: AreaThreshold::default(),
            log_count: LOG_COUNT,
            min_tilt_deg: 5.0,
            use_closed_mask: false,
        }
    }
}

impl From<&SolverSettings> for TiltParams {
    fn from(settings: &SolverSettings) -> Self {
        Self {
            preprocess: settings.preprocess_params(),
            area_threshold: settings.area_threshold,
            log_count: settings.log_count,
            min_tilt_deg: settings.min_tilt_deg,
            use_closed_mask: settings.use_closed_mask,
        }
    }
}

/// What one frame says about the answer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameVerdict {
    /// No shape survived the area filter
    NoCandidates,
    /// Logs were found but none leans enough
    LowConfidence { max_tilt_deg: f64 },
    /// The most tilted log sits at `slot`
    Tilted { slot: LogSlot, tilt_deg: f64 },
}

/// Detection results for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameAnalysis {
    pub width: u32,
    pub height: u32,
    pub features: Vec<RectFeature>,
    pub positions: PositionMap,
    /// Index of the most tilted feature
    pub winner: Option<usize>,
}

impl FrameAnalysis {
    pub fn winner_feature(&self) -> Option<&RectFeature> {
        let winner = self.winner?;
        self.features.iter().find(|f| f.index == winner)
    }

    /// Judge the frame against a minimum tilt
    pub fn verdict(&self, min_tilt_deg: f64) -> FrameVerdict {
        let Some(winner) = self.winner_feature() else {
            return FrameVerdict::NoCandidates;
        };
        if winner.tilt_deg < min_tilt_deg {
            return FrameVerdict::LowConfidence {
                max_tilt_deg: winner.tilt_deg,
            };
        }

        let slot = self.positions.slot_of(winner.index);
        match slot.and_then(LogSlot::from_index) {
            Some(slot) => FrameVerdict::Tilted {
                slot,
                tilt_deg: winner.tilt_deg,
            },
            None => FrameVerdict::NoCandidates,
        }
    }
}

/// Run binarization, detection, rectangle fitting and slot assignment
pub fn analyze_frame(frame: &RgbImage, params: &TiltParams) -> FrameAnalysis {
    let (width, height) = frame.dimensions();
    let masks = preprocess(frame, &params.preprocess);
    let min_area = params.area_threshold.resolve(width, height);

    let mask = masks.select(params.use_closed_mask);
    let shapes = detect_shapes(mask, min_area, params.log_count);
    let features = extract_features(&shapes);
    let winner = most_tilted(&features).map(|f| f.index);
    let positions = assign_positions(&features, width, height);

    FrameAnalysis {
        width,
        height,
        features,
        positions,
        winner,
    }
}

/// A confident frame found by [`TiltSolver::scan`]
#[derive(Debug, Clone, PartialEq)]
pub struct TiltHit {
    pub frame_index: usize,
    pub slot: LogSlot,
    pub frame: RgbImage,
    pub analysis: FrameAnalysis,
}

/// Solver that picks the most tilted log
#[derive(Debug, Clone, Default)]
pub struct TiltSolver {
    params: TiltParams,
}

impl TiltSolver {
    pub fn new(params: TiltParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &TiltParams {
        &self.params
    }

    /// Scan newest to oldest and stop at the first confident frame
    pub fn scan(&self, frames: &dyn FrameSource, frame_count: usize) -> Option<TiltHit> {
        for index in (0..frame_count).rev() {
            let frame = match frames.load(index) {
                Ok(frame) => frame,
                Err(e) => {
                    log::warn!("Skipping frame {}: {}", index, e);
                    continue;
                }
            };

            let analysis = analyze_frame(&frame, &self.params);
            match analysis.verdict(self.params.min_tilt_deg) {
                FrameVerdict::Tilted { slot, tilt_deg } => {
                    log::debug!("Frame {index}: log at {slot} tilted {tilt_deg:.1} degrees");
                    return Some(TiltHit {
                        frame_index: index,
                        slot,
                        frame,
                        analysis,
                    });
                }
                FrameVerdict::LowConfidence { max_tilt_deg } => {
                    log::debug!("Frame {index}: max tilt {max_tilt_deg:.1} is too small");
                }
                FrameVerdict::NoCandidates => {
                    log::debug!("Frame {}: no log candidates", index);
                }
            }
        }

        None
    }
}

impl CaptchaSolver for TiltSolver {
    fn name(&self) -> &'static str {
        "tilt"
    }

    fn solve(&self, frames: &dyn FrameSource, frame_count: usize) -> Option<LogSlot> {
        self.scan(frames, frame_count).map(|hit| hit.slot)
    }
}
