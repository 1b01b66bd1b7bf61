//! Captcha solving strategies
//!
//! Each strategy looks at the recorded frames of one captcha episode and
//! either names a log slot or gives up. [`ChainedSolver`] tries them in order
//! and ends with a random pick, so it always produces a slot.

pub mod movement;
pub mod random;
pub mod tilt;

use crate::config::SolverSettings;
use crate::vision::{FrameSource, LogSlot, VisionError};

pub use movement::MovementSolver;
pub use random::RandomSolver;
pub use tilt::{analyze_frame, FrameAnalysis, FrameVerdict, TiltParams, TiltSolver};

/// A strategy for picking the odd log out
pub trait CaptchaSolver {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Look at frames `0..frame_count` and name a slot, or `None` if unsure
    fn solve(&self, frames: &dyn FrameSource, frame_count: usize) -> Option<LogSlot>;
}

/// Outcome of a chained solve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolveReport {
    pub slot: LogSlot,
    /// Name of the strategy that produced `slot`
    pub strategy: &'static str,
}

/// Captcha errors
#[derive(Debug, thiserror::Error)]
pub enum CaptchaError {
    #[error("Captcha session has no frames")]
    EmptySession,
    #[error(transparent)]
    Vision(#[from] VisionError),
}

/// Tries strategies in order, falling back to a random slot
pub struct ChainedSolver {
    solvers: Vec<Box<dyn CaptchaSolver>>,
    fallback: RandomSolver,
}

impl ChainedSolver {
    /// Chain with no strategies besides the random fallback
    pub fn new() -> Self {
        Self {
            solvers: Vec::new(),
            fallback: RandomSolver::new(),
        }
    }

    /// Movement first, then tilt, then random
    pub fn from_settings(settings: &SolverSettings) -> Self {
        Self::new()
            .with_solver(MovementSolver::from(settings))
            .with_solver(TiltSolver::new(TiltParams::from(settings)))
    }

    /// Append a strategy ahead of the fallback
    pub fn with_solver(mut self, solver: impl CaptchaSolver + 'static) -> Self {
        self.solvers.push(Box::new(solver));
        self
    }

    /// Replace the terminal random strategy
    pub fn with_fallback(mut self, fallback: RandomSolver) -> Self {
        self.fallback = fallback;
        self
    }

    /// Strategy names in the order they are tried
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.solvers
            .iter()
            .map(|s| s.name())
            .chain(std::iter::once(self.fallback.name()))
            .collect()
    }

    /// Solve a captcha episode
    ///
    /// Only an empty session is an error; strategies that give up simply
    /// hand over to the next one.
    pub fn solve(
        &self,
        frames: &dyn FrameSource,
        frame_count: usize,
    ) -> Result<SolveReport, CaptchaError> {
        if frame_count == 0 {
            return Err(CaptchaError::EmptySession);
        }

        for solver in &self.solvers {
            match solver.solve(frames, frame_count) {
                Some(slot) => {
                    log::info!("Captcha solved by {}: log {}", solver.name(), slot);
                    return Ok(SolveReport {
                        slot,
                        strategy: solver.name(),
                    });
                }
                None => log::info!("{} failed to solve captcha", solver.name()),
            }
        }

        let slot = self.fallback.pick();
        log::warn!("No strategy found the tilted log, guessing log {}", slot);
        Ok(SolveReport {
            slot,
            strategy: self.fallback.name(),
        })
    }
}

impl Default for ChainedSolver {
    fn default() -> Self {
        Self::from_settings(&SolverSettings::default())
    }
}
