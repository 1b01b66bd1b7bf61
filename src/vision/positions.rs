//! Clock positions of the captcha logs
//!
//! Detection order follows contour area, which says nothing about where a log
//! sits. The tap targets are addressed clockwise from the top, so detected
//! rectangles are re-labelled by their polar angle around the frame center.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::shapes::RectFeature;

/// One of the eight log positions, clockwise from the top
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogSlot {
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
    TopLeft,
}

impl LogSlot {
    /// All slots in index order
    pub const ALL: [LogSlot; 8] = [
        LogSlot::Top,
        LogSlot::TopRight,
        LogSlot::Right,
        LogSlot::BottomRight,
        LogSlot::Bottom,
        LogSlot::BottomLeft,
        LogSlot::Left,
        LogSlot::TopLeft,
    ];

    /// Slot number, 0 = top
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            LogSlot::Top => "top",
            LogSlot::TopRight => "top-right",
            LogSlot::Right => "right",
            LogSlot::BottomRight => "bottom-right",
            LogSlot::Bottom => "bottom",
            LogSlot::BottomLeft => "bottom-left",
            LogSlot::Left => "left",
            LogSlot::TopLeft => "top-left",
        }
    }
}

impl fmt::Display for LogSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.index(), self.label())
    }
}

/// Slot number to feature index mapping for one frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionMap {
    /// `slots[n]` is the index of the feature at slot `n`
    slots: Vec<usize>,
}

impl PositionMap {
    /// Feature index at a slot
    pub fn feature_at(&self, slot: usize) -> Option<usize> {
        self.slots.get(slot).copied()
    }

    /// Slot holding a feature
    pub fn slot_of(&self, feature_index: usize) -> Option<usize> {
        self.slots.iter().position(|&i| i == feature_index)
    }

    /// (slot, feature index) pairs in slot order
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.slots.iter().copied().enumerate()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Counter-clockwise angle of `point` around `origin` in [0, 360), 90 = up
pub fn polar_angle(point: (f64, f64), origin: (f64, f64)) -> f64 {
    let dx = point.0 - origin.0;
    // screen y grows downward
    let dy = point.1 - origin.1;
    ((-dy).atan2(dx).to_degrees() + 360.0) % 360.0
}

/// Label features clockwise starting from the one nearest the top
pub fn assign_positions(features: &[RectFeature], width: u32, height: u32) -> PositionMap {
    if features.is_empty() {
        return PositionMap::default();
    }

    let origin = (width as f64 / 2.0, height as f64 / 2.0);
    let mut ordered: Vec<(usize, f64)> = features
        .iter()
        .map(|f| (f.index, polar_angle(f.center, origin)))
        .collect();
    ordered.sort_by(|a, b| a.1.total_cmp(&b.1));

    let mut top = 0;
    for (i, &(_, angle)) in ordered.iter().enumerate() {
        if (angle - 90.0).abs() < (ordered[top].1 - 90.0).abs() {
            top = i;
        }
    }

    // angles ascend counter-clockwise; keep the top first and flip the rest
    ordered.rotate_left(top);
    ordered[1..].reverse();

    PositionMap {
        slots: ordered.into_iter().map(|(index, _)| index).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::point::Point;

    fn feature(index: usize, center: (f64, f64)) -> RectFeature {
        RectFeature {
            index,
            center,
            angle_deg: 90.0,
            tilt_deg: 0.0,
            corners: [Point::new(0, 0); 4],
        }
    }

    /// Features on a ring around (200, 200), feature `i` at clock slot `slot_of[i]`
    fn ring(slot_of: &[usize]) -> Vec<RectFeature> {
        slot_of
            .iter()
            .enumerate()
            .map(|(i, &slot)| {
                let a = (45.0 * slot as f64).to_radians();
                feature(i, (200.0 + 140.0 * a.sin(), 200.0 - 140.0 * a.cos()))
            })
            .collect()
    }

    #[test]
    fn test_slot_indices() {
        for (i, slot) in LogSlot::ALL.iter().enumerate() {
            assert_eq!(slot.index(), i);
            assert_eq!(LogSlot::from_index(i), Some(*slot));
        }
        assert_eq!(LogSlot::from_index(8), None);
        assert_eq!(LogSlot::Right.to_string(), "2 (right)");
    }

    #[test]
    fn test_polar_angle() {
        let origin = (100.0, 100.0);
        assert!((polar_angle((150.0, 100.0), origin) - 0.0).abs() < 1e-9);
        assert!((polar_angle((100.0, 50.0), origin) - 90.0).abs() < 1e-9);
        assert!((polar_angle((50.0, 100.0), origin) - 180.0).abs() < 1e-9);
        assert!((polar_angle((100.0, 150.0), origin) - 270.0).abs() < 1e-9);
    }

    #[test]
    fn test_ring_is_labelled_clockwise() {
        // scrambled detection order
        let slot_of = [5, 2, 7, 0, 3, 6, 1, 4];
        let map = assign_positions(&ring(&slot_of), 400, 400);

        assert_eq!(map.len(), 8);
        for (feature_index, &slot) in slot_of.iter().enumerate() {
            assert_eq!(map.slot_of(feature_index), Some(slot));
            assert_eq!(map.feature_at(slot), Some(feature_index));
        }
    }

    #[test]
    fn test_map_is_bijection() {
        let features: Vec<_> = (0..8)
            .map(|i| {
                let a = (i as f64 * 41.0 + 7.0).to_radians();
                feature(i, (300.0 + 100.0 * a.cos(), 300.0 - 100.0 * a.sin()))
            })
            .collect();
        let map = assign_positions(&features, 600, 600);

        let mut seen: Vec<usize> = map.iter().map(|(_, feature)| feature).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..8).collect::<Vec<_>>());
        assert_eq!(
            map.iter().map(|(slot, _)| slot).collect::<Vec<_>>(),
            (0..8).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_partial_ring() {
        let map = assign_positions(&ring(&[2, 4, 6]), 400, 400);
        // right is nearest the top, then clockwise: bottom, left
        assert_eq!(map.feature_at(0), Some(0));
        assert_eq!(map.feature_at(1), Some(1));
        assert_eq!(map.feature_at(2), Some(2));
        assert!(assign_positions(&[], 400, 400).is_empty());
    }

    #[test]
    fn test_top_tie_keeps_first_in_angle_order() {
        // 135 and 45 degrees are equally far from the top
        let features = [feature(0, (50.0, 50.0)), feature(1, (150.0, 50.0))];
        let map = assign_positions(&features, 200, 200);
        // feature 1 is at 45 degrees and sorts first
        assert_eq!(map.feature_at(0), Some(1));
        assert_eq!(map.feature_at(1), Some(0));
    }

    #[test]
    fn test_assignment_is_deterministic() {
        let features = ring(&[3, 1, 4, 0, 5, 2, 6, 7]);
        assert_eq!(
            assign_positions(&features, 400, 400),
            assign_positions(&features, 400, 400)
        );
    }
}
