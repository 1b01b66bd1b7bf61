//! Movement-based solver
//!
//! Compares consecutive frames and follows the biggest change. Pairs are
//! tried newest first; the first pair whose change is large enough wins.

use image::RgbImage;

use super::CaptchaSolver;
use crate::config::SolverSettings;
use crate::vision::{estimate_motion, DiffParams, FrameSource, LogSlot, MotionEstimate};

/// Default minimum changed area for a pair to be trusted
pub const DEFAULT_MIN_CONFIDENCE: f64 = 500.0;

/// Solver that tracks the moving log
#[derive(Debug, Clone)]
pub struct MovementSolver {
    params: DiffParams,
    min_confidence: f64,
}

impl Default for MovementSolver {
    fn default() -> Self {
        Self::new(DiffParams::default(), DEFAULT_MIN_CONFIDENCE)
    }
}

impl From<&SolverSettings> for MovementSolver {
    fn from(settings: &SolverSettings) -> Self {
        Self::new(settings.diff_params(), settings.min_change_confidence)
    }
}

impl MovementSolver {
    pub fn new(params: DiffParams, min_confidence: f64) -> Self {
        Self {
            params,
            min_confidence,
        }
    }

    /// Estimate the motion between frame `older` and the one after it
    pub fn compare(&self, older: &RgbImage, newer: &RgbImage) -> MotionEstimate {
        estimate_motion(older, newer, &self.params)
    }
}

impl CaptchaSolver for MovementSolver {
    fn name(&self) -> &'static str {
        "movement"
    }

    fn solve(&self, frames: &dyn FrameSource, frame_count: usize) -> Option<LogSlot> {
        if frame_count < 2 {
            return None;
        }

        // the older frame of one pair is the newer frame of the next
        let mut newer = match frames.load(frame_count - 1) {
            Ok(frame) => Some(frame),
            Err(e) => {
                log::warn!("Skipping frame {}: {}", frame_count - 1, e);
                None
            }
        };

        for index in (0..frame_count - 1).rev() {
            let older = match frames.load(index) {
                Ok(frame) => frame,
                Err(e) => {
                    log::warn!("Skipping frame {}: {}", index, e);
                    newer = None;
                    continue;
                }
            };

            if let Some(newer_frame) = &newer {
                let estimate = self.compare(&older, newer_frame);
                log::debug!(
                    "Frames {}-{}: slot {:?}, confidence {:.0}",
                    index,
                    index + 1,
                    estimate.slot,
                    estimate.confidence
                );
                if estimate.confidence > self.min_confidence {
                    if let Some(slot) = estimate.slot {
                        return Some(slot);
                    }
                }
            }

            newer = Some(older);
        }

        None
    }
}
