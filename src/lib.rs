//! Grow Castle captcha solver
//!
//! The captcha shows eight logs arranged around a circle and asks for the
//! one that is tilted. This library works on the screenshots recorded while
//! the captcha animates and decides which log to tap.
//!
//! ## Strategies
//!
//! Solvers in [`captcha`] are tried in order: frame differencing first, then
//! per-frame tilt measurement, then a random guess. The chain therefore always
//! returns a slot for a non-empty session.
//!
//! ## Anti-Detection
//!
//! The `stealth` module jitters the final tap position.

pub mod captcha;
pub mod config;
pub mod stealth;
pub mod vision;

use crate::captcha::{CaptchaError, ChainedSolver, RandomSolver};
use crate::config::SolverSettings;
use crate::stealth::Humanizer;
use crate::vision::{FrameSource, LogSlot};

/// Solver chain plus tap placement for one device
pub struct LogCaptcha {
    pub settings: SolverSettings,
    chain: ChainedSolver,
    humanizer: Humanizer,
}

impl LogCaptcha {
    /// Create a solver with the given settings
    pub fn new(settings: SolverSettings) -> Self {
        Self {
            chain: ChainedSolver::from_settings(&settings),
            humanizer: Humanizer::new(),
            settings,
        }
    }

    /// Create a solver whose random choices are reproducible
    pub fn with_seed(settings: SolverSettings, seed: u64) -> Self {
        Self {
            chain: ChainedSolver::from_settings(&settings)
                .with_fallback(RandomSolver::with_seed(seed)),
            humanizer: Humanizer::with_seed(seed),
            settings,
        }
    }

    pub fn chain(&self) -> &ChainedSolver {
        &self.chain
    }

    /// Solve a recorded captcha episode and pick where to tap
    pub fn solve(
        &mut self,
        frames: &dyn FrameSource,
        frame_count: usize,
    ) -> Result<CaptchaAnswer, CaptchaError> {
        let report = self.chain.solve(frames, frame_count)?;
        let tap = self.humanizer.tap_for(
            report.slot,
            &self.settings.log_taps,
            self.settings.tap_offset_max,
        );

        Ok(CaptchaAnswer {
            slot: report.slot,
            strategy: report.strategy,
            tap,
        })
    }
}

/// The log to tap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptchaAnswer {
    pub slot: LogSlot,
    /// Strategy that produced the answer
    pub strategy: &'static str,
    /// Jittered screen position, if log positions are configured
    pub tap: Option<(i32, i32)>,
}

impl CaptchaAnswer {
    /// Input the device link should perform
    pub fn action(&self) -> CaptchaAction {
        match self.tap {
            Some((x, y)) => CaptchaAction::Tap { x, y },
            None => CaptchaAction::None,
        }
    }
}

/// Actions the device link can perform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptchaAction {
    /// No action possible
    None,
    /// Tap at a specific screen coordinate
    Tap { x: i32, y: i32 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::testing::ring_frame;
    use crate::vision::MemorySession;

    #[test]
    fn test_solve_with_taps() {
        let settings = SolverSettings {
            log_taps: (0..8).map(|i| (1000 + i * 10, 500)).collect(),
            tap_offset_max: 0,
            ..Default::default()
        };
        let mut captcha = LogCaptcha::with_seed(settings, 3);
        let frame = ring_frame(Some(2), 30.0, &[]);
        let session = MemorySession::new(vec![frame.clone(), frame]);

        let answer = captcha.solve(&session, 2).unwrap();
        assert_eq!(answer.slot, LogSlot::Right);
        assert_eq!(answer.strategy, "tilt");
        assert_eq!(answer.action(), CaptchaAction::Tap { x: 1020, y: 500 });
    }

    #[test]
    fn test_solve_without_taps() {
        let mut captcha = LogCaptcha::new(SolverSettings::default());
        let session = MemorySession::new(vec![image::RgbImage::new(64, 64)]);

        let answer = captcha.solve(&session, 1).unwrap();
        assert_eq!(answer.strategy, "random");
        assert_eq!(answer.action(), CaptchaAction::None);
        assert!(captcha.solve(&session, 0).is_err());
    }
}
