//! Random fallback solver
//!
//! Used when nothing better is available; one in eight is better than no tap.

use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::CaptchaSolver;
use crate::vision::{FrameSource, LogSlot};

/// Solver that picks a slot uniformly at random
#[derive(Debug)]
pub struct RandomSolver {
    rng: Mutex<StdRng>,
}

impl Default for RandomSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSolver {
    /// Create a solver seeded from system entropy
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Create a reproducible solver
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Draw a slot
    pub fn pick(&self) -> LogSlot {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        LogSlot::ALL[rng.gen_range(0..LogSlot::ALL.len())]
    }
}

impl CaptchaSolver for RandomSolver {
    fn name(&self) -> &'static str {
        "random"
    }

    fn solve(&self, _frames: &dyn FrameSource, _frame_count: usize) -> Option<LogSlot> {
        Some(self.pick())
    }
}
