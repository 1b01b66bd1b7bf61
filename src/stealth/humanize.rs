//! Human-like tap placement
//!
//! Tapping the exact same pixel on every captcha is an easy bot signature, so
//! each tap lands somewhere within a small square around its target.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::vision::LogSlot;

/// Humanizer for tap positions
pub struct Humanizer {
    rng: StdRng,
}

impl Default for Humanizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Humanizer {
    /// Create a new humanizer
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Create a reproducible humanizer
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Random (offset_x, offset_y), each within `-max_offset..=max_offset`
    pub fn humanize_position(&mut self, max_offset: i32) -> (i32, i32) {
        if max_offset <= 0 {
            return (0, 0);
        }

        (
            self.rng.gen_range(-max_offset..=max_offset),
            self.rng.gen_range(-max_offset..=max_offset),
        )
    }

    /// Screen position to tap for `slot`, given the per-slot log coordinates
    pub fn tap_for(
        &mut self,
        slot: LogSlot,
        log_taps: &[(i32, i32)],
        max_offset: i32,
    ) -> Option<(i32, i32)> {
        let &(x, y) = log_taps.get(slot.index())?;
        let (offset_x, offset_y) = self.humanize_position(max_offset);
        Some((x + offset_x, y + offset_y))
    }
}
