//! Diagnostic output for a processed frame
//!
//! The overlay marks every fitted rectangle (red for the most tilted log,
//! green otherwise) and draws a ray from the frame center to slot 0. Angles
//! and slot numbers go into a JSON report written next to the image.

use std::fs;
use std::path::Path;

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use serde::Serialize;

use super::positions::PositionMap;
use super::shapes::RectFeature;
use super::VisionError;

const WINNER: Rgb<u8> = Rgb([255, 0, 0]);
const OUTLINE: Rgb<u8> = Rgb([0, 255, 0]);
const CENTER: Rgb<u8> = Rgb([0, 0, 255]);
const TOP_RAY: Rgb<u8> = Rgb([255, 255, 0]);

/// Per-rectangle entry of a [`FrameReport`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RectReport {
    pub index: usize,
    pub slot: Option<usize>,
    pub center: (f64, f64),
    pub angle_deg: f64,
    pub tilt_deg: f64,
    pub corners: [(i32, i32); 4],
    pub most_tilted: bool,
}

/// Everything detected in one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameReport {
    pub width: u32,
    pub height: u32,
    pub rects: Vec<RectReport>,
}

impl FrameReport {
    pub fn new(
        width: u32,
        height: u32,
        features: &[RectFeature],
        winner: Option<usize>,
        positions: &PositionMap,
    ) -> Self {
        let rects = features
            .iter()
            .map(|f| RectReport {
                index: f.index,
                slot: positions.slot_of(f.index),
                center: f.center,
                angle_deg: f.angle_deg,
                tilt_deg: f.tilt_deg,
                corners: f.corners.map(|p| (p.x, p.y)),
                most_tilted: winner == Some(f.index),
            })
            .collect();

        Self {
            width,
            height,
            rects,
        }
    }
}

/// Draw the detected rectangles onto a copy of `frame`
pub fn render_overlay(
    frame: &RgbImage,
    features: &[RectFeature],
    winner: Option<usize>,
    positions: &PositionMap,
) -> RgbImage {
    let mut canvas = frame.clone();

    for feature in features {
        let color = if winner == Some(feature.index) {
            WINNER
        } else {
            OUTLINE
        };
        for j in 0..4 {
            let p1 = feature.corners[j];
            let p2 = feature.corners[(j + 1) % 4];
            draw_line_segment_mut(
                &mut canvas,
                (p1.x as f32, p1.y as f32),
                (p2.x as f32, p2.y as f32),
                color,
            );
        }
        let (cx, cy) = feature.center;
        let center = (cx.round() as i32, cy.round() as i32);
        draw_filled_circle_mut(&mut canvas, center, 3, CENTER);
    }

    let top = positions
        .feature_at(0)
        .and_then(|index| features.iter().find(|f| f.index == index));
    if let Some(top) = top {
        let (width, height) = frame.dimensions();
        draw_line_segment_mut(
            &mut canvas,
            (width as f32 / 2.0, height as f32 / 2.0),
            (top.center.0 as f32, top.center.1 as f32),
            TOP_RAY,
        );
    }

    canvas
}

/// Save the overlay to `path` and the report to `path` with a `.json` extension
pub fn write_debug_artifacts(
    path: &Path,
    frame: &RgbImage,
    features: &[RectFeature],
    winner: Option<usize>,
    positions: &PositionMap,
) -> Result<(), VisionError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    render_overlay(frame, features, winner, positions)
        .save(path)
        .map_err(|source| VisionError::ImageSave {
            path: path.to_path_buf(),
            source,
        })?;

    let (width, height) = frame.dimensions();
    let report = FrameReport::new(width, height, features, winner, positions);
    let json = serde_json::to_string_pretty(&report)?;
    fs::write(path.with_extension("json"), json)?;

    log::debug!("Wrote debug overlay to {}", path.display());
    Ok(())
}
