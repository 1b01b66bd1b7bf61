//! Log shape detection and rectangle features
//!
//! Each log shows up as one external contour in the binary mask. The largest
//! contours are kept, fitted with a rotated minimum-area rectangle, and the
//! rectangle's longest edge gives the log's orientation.

use image::GrayImage;
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::geometry::min_area_rect;
use imageproc::point::Point;
use serde::{Deserialize, Serialize};

/// Number of logs in the captcha
pub const LOG_COUNT: usize = 8;

/// Minimum contour area for a shape to count as a log
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaThreshold {
    /// Fixed area in pixels
    Absolute(f64),
    /// `max(min, fraction * frame_area)`, truncated to whole pixels
    FrameRelative { min: f64, fraction: f64 },
}

impl Default for AreaThreshold {
    fn default() -> Self {
        Self::FrameRelative {
            min: 500.0,
            fraction: 0.008,
        }
    }
}

impl AreaThreshold {
    /// Resolve the threshold for a frame of the given size
    pub fn resolve(&self, width: u32, height: u32) -> f64 {
        match *self {
            Self::Absolute(area) => area,
            Self::FrameRelative { min, fraction } => {
                let frame_area = width as f64 * height as f64;
                min.max((frame_area * fraction).trunc())
            }
        }
    }
}

/// A contour that survived area filtering
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateShape {
    /// Rank by area, 0 being the largest
    pub index: usize,
    pub points: Vec<Point<i32>>,
    pub area: f64,
}

/// Orientation features of one detected log
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectFeature {
    /// Index of the shape this was fitted to
    pub index: usize,
    pub center: (f64, f64),
    /// Direction of the longest edge, degrees in (-180, 180]
    pub angle_deg: f64,
    /// Deviation from upright, degrees in [0, 90]
    pub tilt_deg: f64,
    pub corners: [Point<i32>; 4],
}

impl RectFeature {
    /// Derive features from the corners of a fitted rectangle
    pub fn from_corners(index: usize, corners: [Point<i32>; 4]) -> Self {
        let mut longest = (0.0, 0.0, 0.0);
        for j in 0..4 {
            let (p1, p2) = (corners[j], corners[(j + 1) % 4]);
            let dx = (p2.x - p1.x) as f64;
            let dy = (p2.y - p1.y) as f64;
            let length = dx.hypot(dy);
            // first longest edge wins ties
            if length > longest.0 {
                longest = (length, dx, dy);
            }
        }

        let angle_deg = longest.2.atan2(longest.1).to_degrees();
        let center = (
            corners.iter().map(|p| p.x as f64).sum::<f64>() / 4.0,
            corners.iter().map(|p| p.y as f64).sum::<f64>() / 4.0,
        );

        Self {
            index,
            center,
            angle_deg,
            tilt_deg: tilt_from_vertical(angle_deg),
            corners,
        }
    }

    /// Fit the minimum-area rectangle around a candidate shape
    pub fn from_shape(shape: &CandidateShape) -> Self {
        Self::from_corners(shape.index, min_area_rect(&shape.points))
    }
}

/// Fold a line direction into its angle to the horizontal, in [0, 90]
pub fn normalize_to_horizontal(angle_deg: f64) -> f64 {
    // lines have no direction, so reduce modulo 180 first
    let reduced = angle_deg.rem_euclid(180.0);
    if reduced > 90.0 {
        180.0 - reduced
    } else {
        reduced
    }
}

/// Tilt of a line away from vertical, in [0, 90]
pub fn tilt_from_vertical(angle_deg: f64) -> f64 {
    90.0 - normalize_to_horizontal(angle_deg)
}

/// Area enclosed by a closed point chain (shoelace formula)
pub fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }

    let twice_area: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64)
        .sum();
    twice_area.abs() as f64 / 2.0
}

/// Outer borders that are not nested inside another shape
pub fn external_contours(mask: &GrayImage) -> Vec<Contour<i32>> {
    find_contours::<i32>(mask)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .collect()
}

/// Find up to `max_count` shapes larger than `min_area`, largest first
pub fn detect_shapes(mask: &GrayImage, min_area: f64, max_count: usize) -> Vec<CandidateShape> {
    let mut shapes: Vec<(Vec<Point<i32>>, f64)> = external_contours(mask)
        .into_iter()
        .map(|c| {
            let area = polygon_area(&c.points);
            (c.points, area)
        })
        .filter(|(_, area)| *area > min_area)
        .collect();

    shapes.sort_by(|a, b| b.1.total_cmp(&a.1));
    shapes.truncate(max_count);

    shapes
        .into_iter()
        .enumerate()
        .map(|(index, (points, area))| CandidateShape {
            index,
            points,
            area,
        })
        .collect()
}

/// Fit rectangle features to every shape, preserving order
pub fn extract_features(shapes: &[CandidateShape]) -> Vec<RectFeature> {
    shapes.iter().map(RectFeature::from_shape).collect()
}

/// The feature leaning furthest from vertical; first one wins ties
pub fn most_tilted(features: &[RectFeature]) -> Option<&RectFeature> {
    let mut best: Option<&RectFeature> = None;
    for feature in features {
        if best.is_none_or(|b| feature.tilt_deg > b.tilt_deg) {
            best = Some(feature);
        }
    }
    best
}
